pub mod env;
pub mod error;
pub mod utils;

pub use env::{
    message::{ConsensusMessage, MessageKind},
    status::{NodeStatus, Phase},
    value::Value,
};
pub use error::{BenOrError, Result};
pub use utils::NodeId;
