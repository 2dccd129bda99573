use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use benor_common::{ConsensusMessage, MessageKind, NodeId, NodeStatus, Phase, Value};
use benor_p2p::{ReadinessGate, Transport};
use tokio::sync::watch;
use tracing::{debug, info};

use super::{
    evaluator::{DecisionRule, NON_TERMINATING_ROUND},
    tally::{MessageTally, RoundCounts},
};
use crate::config::ProtocolConfig;

/// Identity and starting point of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSetup {
    pub id: NodeId,
    pub initial_value: Value,
    pub faulty: bool,
}

impl NodeSetup {
    pub fn new(id: NodeId, initial_value: Value) -> Self {
        Self { id, initial_value, faulty: false }
    }

    pub fn faulty(id: NodeId) -> Self {
        Self { id, initial_value: Value::Zero, faulty: true }
    }
}

/// What a call to [`ConsensusEngine::run_round`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Guard refused to run (killed, faulty or already decided).
    Skipped,
    /// The node was killed while the round was in flight.
    Halted,
    Advanced { next_round: u64 },
    Decided { value: Value, round: u64 },
}

#[derive(Debug, Clone)]
struct RoundState {
    x: Option<Value>,
    decided: Option<bool>,
    k: Option<u64>,
    phase: Phase,
}

/// Per-node consensus state machine.
///
/// Owns the round state and the message tally of exactly one node; nothing
/// in here is shared with other engines.
pub struct ConsensusEngine {
    id: NodeId,
    config: ProtocolConfig,
    faulty: bool,
    initial_value: Value,
    rule: DecisionRule,
    killed: watch::Sender<bool>,
    state: RwLock<RoundState>,
    tally: MessageTally,
    transport: Arc<dyn Transport>,
    gate: Arc<dyn ReadinessGate>,
}

impl std::fmt::Debug for ConsensusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusEngine")
            .field("id", &self.id)
            .field("faulty", &self.faulty)
            .field("killed", &self.is_killed())
            .field("state", &*self.read_state())
            .finish()
    }
}

impl ConsensusEngine {
    pub fn new(
        setup: NodeSetup,
        config: ProtocolConfig,
        transport: Arc<dyn Transport>,
        gate: Arc<dyn ReadinessGate>,
    ) -> Self {
        let state = if setup.faulty {
            RoundState { x: None, decided: None, k: None, phase: Phase::Idle }
        } else if config.nodes == 1 {
            // A lone participant has nobody to agree with.
            RoundState {
                x: Some(setup.initial_value),
                decided: Some(true),
                k: Some(1),
                phase: Phase::Decided,
            }
        } else {
            RoundState {
                x: Some(setup.initial_value),
                decided: Some(false),
                k: Some(1),
                phase: Phase::Idle,
            }
        };

        let (killed, _) = watch::channel(false);

        Self {
            id: setup.id,
            rule: DecisionRule::new(&config),
            config,
            faulty: setup.faulty,
            initial_value: setup.initial_value,
            killed,
            state: RwLock::new(state),
            tally: MessageTally::new(),
            transport,
            gate,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn tally(&self) -> &MessageTally {
        &self.tally
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RoundState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RoundState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_killed(&self) -> bool {
        *self.killed.borrow()
    }

    pub fn is_decided(&self) -> bool {
        self.read_state().decided == Some(true)
    }

    /// Liveness probe: only faulty nodes report dead.
    pub fn is_alive(&self) -> bool {
        !self.faulty
    }

    /// Whether a round driver may still schedule work for this node.
    pub fn can_start(&self) -> bool {
        !self.faulty && !self.is_killed() && !self.is_decided()
    }

    pub fn phase(&self) -> Phase {
        if self.is_killed() {
            return Phase::Killed;
        }
        self.read_state().phase
    }

    /// Stops the node for good. Calling it again changes nothing.
    pub fn kill(&self) {
        let was_killed = self.killed.send_replace(true);
        if !was_killed {
            info!("🛑 [{}] killed", self.id);
            tracing::info!(target: "consensus", "EVENT:KILL node={}", self.id);
        }
    }

    /// Routes an inbound message into the tally.
    /// Returns `false` when the message was discarded.
    pub fn deliver(&self, message: ConsensusMessage) -> bool {
        if self.faulty || self.is_killed() {
            debug!("[{}] discarding {:?}", self.id, message);
            return false;
        }

        self.tally.record(message.kind, message.round, message.value);
        debug!(
            "📥 [{}] {} {} for round {} from {}",
            self.id, message.kind, message.value, message.round, message.sender
        );
        true
    }

    /// Externally reported state, with the faulty / single-node /
    /// over-tolerance rules applied.
    pub fn status(&self) -> NodeStatus {
        let killed = self.is_killed();

        if self.faulty {
            return NodeStatus::faulty(killed);
        }

        if self.config.nodes == 1 {
            return NodeStatus {
                killed,
                x: Some(self.initial_value),
                decided: Some(true),
                k: Some(1),
            };
        }

        let state = self.read_state();
        let mut status = NodeStatus { killed, x: state.x, decided: state.decided, k: state.k };

        if self.config.exceeds_tolerance() {
            status.decided = Some(false);
            status.k = state.k.map(|k| k.max(NON_TERMINATING_ROUND));
        }

        status
    }

    /// Sleeps for `duration` unless the node gets killed first.
    /// Returns `true` when the node is still alive afterwards.
    pub(crate) async fn pause(&self, duration: Duration) -> bool {
        let mut killed = self.killed.subscribe();

        let wait_killed = async move {
            loop {
                if *killed.borrow_and_update() {
                    return;
                }
                if killed.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_killed(),
            _ = wait_killed => false,
        }
    }

    /// Gated, best-effort broadcast. Returns `false` if nothing was sent.
    async fn broadcast(&self, message: ConsensusMessage) -> bool {
        if self.faulty || self.is_killed() {
            return false;
        }

        self.tally.touch(message.kind, message.round);

        while !self.gate.is_ready() {
            if !self.pause(self.config.readiness_poll()).await {
                debug!("[{}] killed while waiting for readiness, dropping {}", self.id, message.kind);
                return false;
            }
        }

        if self.is_killed() {
            return false;
        }

        self.transport.broadcast(message).await;
        true
    }

    /// Guard + transition into the proposing phase.
    fn begin_round(&self) -> Option<(u64, Option<Value>)> {
        if self.faulty || self.is_killed() {
            return None;
        }

        let mut state = self.write_state();
        if state.decided != Some(false) {
            return None;
        }

        let k = state.k?;
        state.phase = Phase::Proposing;
        Some((k, state.x))
    }

    fn set_phase(&self, phase: Phase) {
        self.write_state().phase = phase;
    }

    /// Runs one full propose → vote → decide-or-advance round.
    pub async fn run_round(&self) -> RoundOutcome {
        let Some((k, x)) = self.begin_round() else {
            return RoundOutcome::Skipped;
        };

        let proposal = x.unwrap_or_else(|| Value::for_round(k));
        tracing::info!(target: "consensus", "EVENT:PROPOSE node={} round={} value={}", self.id, k, proposal);

        if !self.broadcast(ConsensusMessage::proposal(self.id, k, proposal)).await {
            return RoundOutcome::Halted;
        }
        if !self.pause(self.config.settle_interval()).await {
            return RoundOutcome::Halted;
        }

        let proposals = self.tally.counts(MessageKind::Proposal, k);
        let candidate = self.rule.candidate(k, proposals);
        debug!(
            "🗳️ [{}] round {} proposals 0={} 1={} → candidate {}",
            self.id, k, proposals.zero, proposals.one, candidate
        );

        self.set_phase(Phase::Voting);
        tracing::info!(target: "consensus", "EVENT:VOTE node={} round={} value={}", self.id, k, candidate);

        if !self.broadcast(ConsensusMessage::vote(self.id, k, candidate)).await {
            return RoundOutcome::Halted;
        }
        if !self.pause(self.config.settle_interval()).await {
            return RoundOutcome::Halted;
        }

        let votes = self.tally.counts(MessageKind::Vote, k);
        self.conclude_round(k, votes)
    }

    fn conclude_round(&self, k: u64, votes: RoundCounts) -> RoundOutcome {
        let mut state = self.write_state();

        if self.is_killed() {
            return RoundOutcome::Halted;
        }

        match self.rule.finalize(k, votes) {
            Some(value) => {
                state.decided = Some(true);
                state.x = Some(value);
                state.phase = Phase::Decided;

                info!("✅ [{}] decided {} in round {} (votes 0={} 1={})", self.id, value, k, votes.zero, votes.one);
                tracing::info!(target: "consensus", "EVENT:DECIDE node={} round={} value={}", self.id, k, value);
                RoundOutcome::Decided { value, round: k }
            }
            None => {
                let next_round = k + 1;
                state.k = Some(next_round);
                state.x = Some(Value::for_round(k));
                state.phase = Phase::Idle;

                debug!("[{}] no decision in round {} (votes 0={} 1={}), advancing", self.id, k, votes.zero, votes.one);
                tracing::info!(target: "consensus", "EVENT:ADVANCE node={} round={}", self.id, next_round);
                RoundOutcome::Advanced { next_round }
            }
        }
    }
}
