use async_trait::async_trait;
use benor_common::ConsensusMessage;

/// Outbound side of the network as seen by the consensus core.
///
/// Implementations deliver to every participant except the sender and
/// swallow per-peer failures: the caller never learns who received what.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn broadcast(&self, message: ConsensusMessage);
}

/// Barrier the core polls before it is allowed to transmit.
pub trait ReadinessGate: Send + Sync {
    fn is_ready(&self) -> bool;
}
