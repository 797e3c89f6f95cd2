//! Server error types.

use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Database could not be opened or prepared.
    #[error("database error: {0}")]
    Database(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] boxstore_proto::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
