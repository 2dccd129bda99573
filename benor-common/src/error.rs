use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenOrError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BenOrError>;
