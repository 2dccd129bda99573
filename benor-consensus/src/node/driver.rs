use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::consensus::engine::{ConsensusEngine, RoundOutcome};

/// Explicit scheduling loop around [`ConsensusEngine::run_round`].
///
/// Each iteration waits `round_delay`, runs one round and loops again only
/// while the engine keeps advancing.
pub struct RoundDriver {
    engine: Arc<ConsensusEngine>,
    task: Mutex<Option<JoinHandle<RoundOutcome>>>,
}

impl RoundDriver {
    pub fn new(engine: Arc<ConsensusEngine>) -> Self {
        Self { engine, task: Mutex::new(None) }
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<RoundOutcome>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.task().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Arms the loop. No-op (returns `false`) when the node is faulty,
    /// killed, decided or already running.
    pub fn start(&self) -> bool {
        if !self.engine.can_start() {
            debug!("[{}] start ignored: {:?}", self.engine.id(), self.engine.phase());
            return false;
        }

        let mut task = self.task();
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("[{}] start ignored: already running", self.engine.id());
            return false;
        }

        info!("▶️ [{}] round driver started", self.engine.id());
        let engine = Arc::clone(&self.engine);
        *task = Some(tokio::spawn(Self::drive(engine)));
        true
    }

    /// Kills the engine; the loop notices at its next wait.
    pub fn stop(&self) {
        self.engine.kill();
    }

    /// Waits for the loop to finish. `None` if it was never started.
    pub async fn join(&self) -> Option<RoundOutcome> {
        let handle = self.task().take()?;
        handle.await.ok()
    }

    async fn drive(engine: Arc<ConsensusEngine>) -> RoundOutcome {
        let delay = engine.config().round_delay();

        loop {
            if !engine.pause(delay).await {
                return RoundOutcome::Halted;
            }

            match engine.run_round().await {
                RoundOutcome::Advanced { .. } => continue,
                RoundOutcome::Skipped if engine.is_killed() => return RoundOutcome::Halted,
                outcome => {
                    debug!("[{}] round driver finished: {:?}", engine.id(), outcome);
                    return outcome;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolConfig;
    use crate::consensus::engine::NodeSetup;
    use async_trait::async_trait;
    use benor_common::{ConsensusMessage, NodeId, Value};
    use benor_p2p::{AlwaysReady, Transport};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn broadcast(&self, _message: ConsensusMessage) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn driver(setup: NodeSetup, nodes: usize) -> (RoundDriver, Arc<ConsensusEngine>, Arc<CountingTransport>) {
        let config = ProtocolConfig {
            nodes,
            faulty: 0,
            settle_interval_ms: 5,
            round_delay_ms: 1,
            readiness_poll_ms: 1,
        };
        let transport = Arc::new(CountingTransport::default());
        let engine = Arc::new(ConsensusEngine::new(setup, config, transport.clone(), Arc::new(AlwaysReady)));
        (RoundDriver::new(Arc::clone(&engine)), engine, transport)
    }

    #[tokio::test]
    async fn test_loops_until_decision() {
        let (driver, engine, _) = driver(NodeSetup::new(NodeId(0), Value::One), 3);

        // Round 2 already holds floor(3/2) votes for 0.
        engine.deliver(ConsensusMessage::vote(NodeId(1), 2, Value::Zero));

        assert!(driver.start());
        assert_eq!(driver.join().await, Some(RoundOutcome::Decided { value: Value::Zero, round: 2 }));
        assert!(!driver.is_running());
        assert!(!driver.start());
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (driver, _, _) = driver(NodeSetup::new(NodeId(0), Value::One), 3);

        assert!(driver.start());
        assert!(!driver.start());
        driver.stop();
        assert_eq!(driver.join().await, Some(RoundOutcome::Halted));
    }

    #[tokio::test]
    async fn test_stop_prevents_further_broadcasts() {
        let (driver, engine, transport) = driver(NodeSetup::new(NodeId(0), Value::One), 5);

        driver.start();
        tokio::time::sleep(Duration::from_millis(30)).await;

        driver.stop();
        driver.stop();
        driver.join().await;
        let sent_at_stop = transport.calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), sent_at_stop);
        assert!(engine.status().killed);
        assert!(!driver.start());
    }

    #[tokio::test]
    async fn test_faulty_or_single_node_never_starts() {
        let (faulty, _, transport) = driver(NodeSetup::faulty(NodeId(0)), 3);
        assert!(!faulty.start());
        assert_eq!(faulty.join().await, None);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);

        let (single, _, transport) = driver(NodeSetup::new(NodeId(0), Value::Zero), 1);
        assert!(!single.start());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
