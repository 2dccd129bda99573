use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{env::value::Value, utils::NodeId};

/// The two message kinds exchanged every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Carries the sender's current guess for the round.
    Proposal,
    /// Carries the candidate value the sender tallied from proposals.
    Vote,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageKind::Proposal => "proposal",
            MessageKind::Vote => "vote",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub value: Value,
    pub round: u64,
    pub sender: NodeId,
}

impl ConsensusMessage {
    pub fn proposal(sender: NodeId, round: u64, value: Value) -> Self {
        Self { kind: MessageKind::Proposal, value, round, sender }
    }

    pub fn vote(sender: NodeId, round: u64, value: Value) -> Self {
        Self { kind: MessageKind::Vote, value, round, sender }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let msg = ConsensusMessage::proposal(NodeId(2), 3, Value::One);
        let json = msg.to_json().unwrap();
        assert_eq!(json, r#"{"type":"proposal","value":1,"round":3,"sender":2}"#);
    }

    #[test]
    fn test_parse_vote() {
        let msg = ConsensusMessage::from_json(r#"{"type":"vote","value":0,"round":7,"sender":4}"#).unwrap();
        assert_eq!(msg, ConsensusMessage::vote(NodeId(4), 7, Value::Zero));
    }

    #[test]
    fn test_rejects_unknown_kind() {
        assert!(ConsensusMessage::from_json(r#"{"type":"commit","value":0,"round":1,"sender":0}"#).is_err());
    }
}
