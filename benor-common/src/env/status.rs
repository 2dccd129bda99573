use serde::{Deserialize, Serialize};

use crate::env::value::Value;

/// Externally reported state of a node.
///
/// Faulty nodes report only `killed`; the other fields are `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub killed: bool,
    pub x: Option<Value>,
    pub decided: Option<bool>,
    pub k: Option<u64>,
}

impl NodeStatus {
    pub fn faulty(killed: bool) -> Self {
        Self { killed, x: None, decided: None, k: None }
    }

    pub fn is_decided(&self) -> bool {
        self.decided == Some(true)
    }
}

/// Where a node currently sits in its round timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Proposing,
    Voting,
    Decided,
    Killed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faulty_status_serializes_nulls() {
        let json = serde_json::to_string(&NodeStatus::faulty(false)).unwrap();
        assert_eq!(json, r#"{"killed":false,"x":null,"decided":null,"k":null}"#);
    }

    #[test]
    fn test_phase_starts_idle() {
        assert_eq!(Phase::default(), Phase::Idle);
        assert_eq!(serde_json::to_string(&Phase::default()).unwrap(), r#""idle""#);
    }
}
