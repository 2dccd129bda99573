pub mod error;
pub mod http;
pub mod in_memory;
pub mod ports;
pub mod readiness;

pub use error::P2pError;
pub use http::HttpTransport;
pub use in_memory::InMemoryNetwork;
pub use ports::{ReadinessGate, Transport};
pub use readiness::{AlwaysReady, ReadinessFlag};
