//! Common types shared across the benor crates.

pub mod node_id;
pub use node_id::NodeId;
