pub mod config;
pub mod consensus;
pub mod node;

pub use config::ProtocolConfig;
pub use consensus::{
    engine::{ConsensusEngine, NodeSetup, RoundOutcome},
    evaluator::DecisionRule,
    tally::{MessageTally, RoundCounts},
};
pub use node::{core::ConsensusNode, driver::RoundDriver};
