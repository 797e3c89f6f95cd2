//! Core error types.

use sled::transaction::TransactionError;
use thiserror::Error;

/// Storage adapter errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A document with this `_id` already exists.
    #[error("duplicate key: _id {id} already exists")]
    DuplicateKey { id: i64 },

    /// A write tried to change a field that may not change.
    #[error("field {0} is immutable")]
    ImmutableField(String),

    /// Key decoding error.
    #[error("invalid key format")]
    InvalidKey,

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl From<TransactionError<Error>> for Error {
    fn from(e: TransactionError<Error>) -> Self {
        match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => Error::Storage(e),
        }
    }
}
