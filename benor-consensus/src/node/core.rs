use std::sync::Arc;

use benor_common::{ConsensusMessage, NodeId, NodeStatus, Phase};
use benor_p2p::{ReadinessGate, Transport};

use super::driver::RoundDriver;
use crate::config::ProtocolConfig;
use crate::consensus::engine::{ConsensusEngine, NodeSetup, RoundOutcome};

/// One participant: its engine plus the driver that schedules it.
///
/// This is the surface the hosting layer (REST handlers, launcher) talks to.
pub struct ConsensusNode {
    engine: Arc<ConsensusEngine>,
    driver: RoundDriver,
}

impl ConsensusNode {
    pub fn new(
        setup: NodeSetup,
        config: ProtocolConfig,
        transport: Arc<dyn Transport>,
        gate: Arc<dyn ReadinessGate>,
    ) -> Self {
        let engine = Arc::new(ConsensusEngine::new(setup, config, transport, gate));
        let driver = RoundDriver::new(Arc::clone(&engine));
        Self { engine, driver }
    }

    pub fn id(&self) -> NodeId {
        self.engine.id()
    }

    pub fn deliver(&self, message: ConsensusMessage) -> bool {
        self.engine.deliver(message)
    }

    pub fn status(&self) -> NodeStatus {
        self.engine.status()
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    pub fn is_alive(&self) -> bool {
        self.engine.is_alive()
    }

    pub fn start(&self) -> bool {
        self.driver.start()
    }

    pub fn stop(&self) {
        self.driver.stop()
    }

    pub async fn join(&self) -> Option<RoundOutcome> {
        self.driver.join().await
    }
}
