pub mod api;
pub mod cli;
pub mod config;
pub mod runtime;

pub use config::{Config, TransportKind};
pub use runtime::launcher::{Launcher, Report};
