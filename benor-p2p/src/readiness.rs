use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::ports::ReadinessGate;

/// Shared "all participants are up" flag.
///
/// Every node of a simulation receives a clone; the launcher flips it once
/// all listeners are bound.
#[derive(Debug, Clone, Default)]
pub struct ReadinessFlag {
    ready: Arc<AtomicBool>,
}

impl ReadinessFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.ready.store(false, Ordering::Release);
    }
}

impl ReadinessGate for ReadinessFlag {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Gate that never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

impl ReadinessGate for AlwaysReady {
    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = ReadinessFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_ready());

        flag.mark_ready();
        assert!(observer.is_ready());

        observer.reset();
        assert!(!flag.is_ready());
    }
}
