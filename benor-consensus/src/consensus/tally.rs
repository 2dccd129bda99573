use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use benor_common::{MessageKind, Value};

/// Counters of one round for one message kind.
///
/// `unknown` is the `"?"` bucket: it is seeded with the others but no
/// message ever lands in it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundCounts {
    pub zero: usize,
    pub one: usize,
    pub unknown: usize,
}

impl RoundCounts {
    pub fn get(&self, value: Value) -> usize {
        match value {
            Value::Zero => self.zero,
            Value::One => self.one,
        }
    }

    fn bump(&mut self, value: Value) {
        match value {
            Value::Zero => self.zero += 1,
            Value::One => self.one += 1,
        }
    }
}

type RoundLog = BTreeMap<u64, RoundCounts>;

/// Per-node message log: round -> value -> count, one map per message kind.
///
/// Purely additive. Entries are created on first sight (sent or received)
/// and never removed.
#[derive(Debug, Default)]
pub struct MessageTally {
    proposals: RwLock<RoundLog>,
    votes: RwLock<RoundLog>,
}

impl MessageTally {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, kind: MessageKind) -> &RwLock<RoundLog> {
        match kind {
            MessageKind::Proposal => &self.proposals,
            MessageKind::Vote => &self.votes,
        }
    }

    /// Counts one message of `kind` carrying `value` for `round`.
    pub fn record(&self, kind: MessageKind, round: u64, value: Value) {
        let mut log = self.log(kind).write().unwrap_or_else(PoisonError::into_inner);
        log.entry(round).or_default().bump(value);
    }

    /// Creates the zeroed entry for `round` if it does not exist yet.
    pub fn touch(&self, kind: MessageKind, round: u64) {
        let mut log = self.log(kind).write().unwrap_or_else(PoisonError::into_inner);
        log.entry(round).or_default();
    }

    pub fn count_of(&self, kind: MessageKind, round: u64, value: Value) -> usize {
        self.counts(kind, round).get(value)
    }

    /// Snapshot of a round's buckets; all zero when the round was never seen.
    pub fn counts(&self, kind: MessageKind, round: u64) -> RoundCounts {
        let log = self.log(kind).read().unwrap_or_else(PoisonError::into_inner);
        log.get(&round).copied().unwrap_or_default()
    }

    pub fn rounds(&self, kind: MessageKind) -> Vec<u64> {
        let log = self.log(kind).read().unwrap_or_else(PoisonError::into_inner);
        log.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unseen_round_reads_zero() {
        let tally = MessageTally::new();
        assert_eq!(tally.count_of(MessageKind::Vote, 4, Value::One), 0);
        assert!(tally.rounds(MessageKind::Vote).is_empty());
    }

    #[test]
    fn test_record_is_per_kind_and_round() {
        let tally = MessageTally::new();
        tally.record(MessageKind::Proposal, 1, Value::One);
        tally.record(MessageKind::Proposal, 1, Value::One);
        tally.record(MessageKind::Proposal, 2, Value::Zero);
        tally.record(MessageKind::Vote, 1, Value::Zero);

        assert_eq!(tally.count_of(MessageKind::Proposal, 1, Value::One), 2);
        assert_eq!(tally.count_of(MessageKind::Proposal, 1, Value::Zero), 0);
        assert_eq!(tally.count_of(MessageKind::Proposal, 2, Value::Zero), 1);
        assert_eq!(tally.count_of(MessageKind::Vote, 1, Value::Zero), 1);
        assert_eq!(tally.rounds(MessageKind::Proposal), vec![1, 2]);
    }

    #[test]
    fn test_touch_seeds_zeroed_buckets() {
        let tally = MessageTally::new();
        tally.touch(MessageKind::Vote, 3);

        assert_eq!(tally.rounds(MessageKind::Vote), vec![3]);
        assert_eq!(tally.counts(MessageKind::Vote, 3), RoundCounts::default());

        tally.record(MessageKind::Vote, 3, Value::One);
        tally.touch(MessageKind::Vote, 3);
        assert_eq!(tally.count_of(MessageKind::Vote, 3, Value::One), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_not_lost() {
        let tally = Arc::new(MessageTally::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let tally = Arc::clone(&tally);
            handles.push(tokio::spawn(async move {
                for _ in 0..250 {
                    tally.record(MessageKind::Vote, 2, Value::Zero);
                    tokio::task::yield_now().await;
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(tally.count_of(MessageKind::Vote, 2, Value::Zero), 2000);
        assert_eq!(tally.counts(MessageKind::Vote, 2).unknown, 0);
    }
}
