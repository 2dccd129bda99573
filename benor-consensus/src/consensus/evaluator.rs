use benor_common::Value;
use tracing::debug;

use super::tally::RoundCounts;
use crate::config::ProtocolConfig;

/// No round below this one may finalize a decision.
pub const MIN_DECISION_ROUND: u64 = 2;

/// Round number reported by nodes whose configuration cannot terminate.
pub const NON_TERMINATING_ROUND: u64 = 11;

/// Value-selection and finalization rules of a round.
#[derive(Debug, Clone, Copy)]
pub struct DecisionRule {
    threshold: usize,
}

impl DecisionRule {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self { threshold: config.decision_threshold() }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Value to vote for after tallying proposals: the strict majority,
    /// otherwise the `round mod 2` fallback.
    pub fn candidate(&self, round: u64, proposals: RoundCounts) -> Value {
        if proposals.zero > proposals.one {
            Value::Zero
        } else if proposals.one > proposals.zero {
            Value::One
        } else {
            Value::for_round(round)
        }
    }

    /// Value the round finalizes on, if any.
    ///
    /// Both values can reach the threshold at once; the larger count wins
    /// and a tie goes to `0`.
    pub fn finalize(&self, round: u64, votes: RoundCounts) -> Option<Value> {
        if round < MIN_DECISION_ROUND {
            debug!("round {} too early to finalize (votes 0={} 1={})", round, votes.zero, votes.one);
            return None;
        }

        let zero_ok = votes.zero >= self.threshold;
        let one_ok = votes.one >= self.threshold;

        match (zero_ok, one_ok) {
            (true, true) if votes.one > votes.zero => Some(Value::One),
            (true, _) => Some(Value::Zero),
            (false, true) => Some(Value::One),
            (false, false) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(zero: usize, one: usize) -> RoundCounts {
        RoundCounts { zero, one, unknown: 0 }
    }

    #[test]
    fn test_candidate_majority_and_fallback() {
        let rule = DecisionRule::new(&ProtocolConfig::new(5, 0));

        assert_eq!(rule.candidate(1, counts(3, 1)), Value::Zero);
        assert_eq!(rule.candidate(2, counts(0, 2)), Value::One);
        // Ties, including silence, fall back to round mod 2.
        assert_eq!(rule.candidate(3, counts(2, 2)), Value::One);
        assert_eq!(rule.candidate(4, counts(0, 0)), Value::Zero);
    }

    #[test]
    fn test_no_decision_in_first_round() {
        let rule = DecisionRule::new(&ProtocolConfig::new(4, 0));
        assert_eq!(rule.threshold(), 2);

        assert_eq!(rule.finalize(1, counts(3, 0)), None);
        assert_eq!(rule.finalize(2, counts(2, 0)), Some(Value::Zero));
    }

    #[test]
    fn test_threshold_is_floor_half() {
        let rule = DecisionRule::new(&ProtocolConfig::new(7, 0));

        assert_eq!(rule.finalize(5, counts(2, 2)), None);
        assert_eq!(rule.finalize(5, counts(1, 3)), Some(Value::One));
    }

    #[test]
    fn test_both_values_over_threshold() {
        let rule = DecisionRule::new(&ProtocolConfig::new(3, 0));

        assert_eq!(rule.finalize(2, counts(1, 2)), Some(Value::One));
        assert_eq!(rule.finalize(2, counts(1, 1)), Some(Value::Zero));
    }
}
