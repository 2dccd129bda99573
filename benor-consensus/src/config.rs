use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Protocol parameters shared by every node of one simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Total number of participants (N).
    pub nodes: usize,
    /// Number of participants configured as faulty (F).
    pub faulty: usize,
    /// Pause between broadcasting a phase and reading its tally.
    pub settle_interval_ms: u64,
    /// Delay before each round is (re)armed.
    pub round_delay_ms: u64,
    /// Poll period of the readiness gate inside broadcast.
    pub readiness_poll_ms: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            nodes: 3,
            faulty: 0,
            settle_interval_ms: 200,
            round_delay_ms: 50,
            readiness_poll_ms: 20,
        }
    }
}

impl ProtocolConfig {
    pub fn new(nodes: usize, faulty: usize) -> Self {
        Self { nodes, faulty, ..Default::default() }
    }

    /// Maximum number of faulty nodes the protocol tolerates: `floor((N-1)/2)`.
    pub fn tolerance(&self) -> usize {
        self.nodes.saturating_sub(1) / 2
    }

    pub fn exceeds_tolerance(&self) -> bool {
        self.faulty > self.tolerance()
    }

    /// Votes needed for a value to be finalized: `floor(N/2)`.
    pub fn decision_threshold(&self) -> usize {
        self.nodes / 2
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    pub fn round_delay(&self) -> Duration {
        Duration::from_millis(self.round_delay_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_bounds() {
        assert_eq!(ProtocolConfig::new(1, 0).tolerance(), 0);
        assert_eq!(ProtocolConfig::new(4, 0).tolerance(), 1);
        assert_eq!(ProtocolConfig::new(5, 0).tolerance(), 2);

        assert!(!ProtocolConfig::new(5, 2).exceeds_tolerance());
        assert!(ProtocolConfig::new(5, 3).exceeds_tolerance());
        assert!(ProtocolConfig::new(1, 1).exceeds_tolerance());
    }

    #[test]
    fn test_decision_threshold() {
        assert_eq!(ProtocolConfig::new(2, 0).decision_threshold(), 1);
        assert_eq!(ProtocolConfig::new(5, 0).decision_threshold(), 2);
        assert_eq!(ProtocolConfig::new(10, 0).decision_threshold(), 5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: ProtocolConfig = serde_json::from_str(r#"{"nodes": 7, "faulty": 3}"#).unwrap();
        assert_eq!(cfg.nodes, 7);
        assert_eq!(cfg.settle_interval_ms, 200);
    }
}
