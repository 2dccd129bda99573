use thiserror::Error;

#[derive(Error, Debug)]
pub enum P2pError {
    #[error("Peer not found: {0}")]
    PeerNotFound(String),

    #[error("Failed to send message: {0}")]
    Send(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Peer {peer} answered with status {status}")]
    Status { peer: String, status: u16 },
}
