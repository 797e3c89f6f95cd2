//! Client error types.

use thiserror::Error;

/// Client errors.
///
/// These cover calls that could not complete. A call that completed but
/// failed logically comes back as a reply with an ERROR status instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] boxstore_proto::Error),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The server answered with an error status where none was expected.
    #[error("server error {code}: {message}")]
    Server { code: u32, message: String },
}
