use thiserror::Error;

/// Top-level error type for Tidemark.
#[derive(Error, Debug)]
pub enum TidemarkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Invalid bookmark: {0}")]
    InvalidBookmark(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for TidemarkError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
