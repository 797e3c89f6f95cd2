//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The response carried a payload the operation does not produce.
    #[error("unexpected payload for {operation}: {payload}")]
    UnexpectedPayload {
        operation: &'static str,
        payload: &'static str,
    },
}
