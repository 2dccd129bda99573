//! consensus
//!
//! Round-based binary agreement.
//!
//! Every round a node broadcasts a proposal, tallies the proposals it heard,
//! votes for the majority value (or the `round mod 2` fallback) and finally
//! either decides on a value with enough votes or advances to the next round.
//! Inbound messages only ever write into the [`tally::MessageTally`]; the
//! round timeline in [`engine::ConsensusEngine`] only reads it.

pub mod engine;
pub mod evaluator;
pub mod tally;
