//! BoxStore protocol types and serialization.
//!
//! This crate defines the wire model shared by the server and the client,
//! using rkyv for serialization.
//!
//! # Modules
//!
//! - [`record`] - The `BoxRecord` wire model
//! - [`value`] - Field values stored in documents
//! - [`message`] - Request/response message wrappers and status codes
//! - [`reply`] - Typed per-operation replies
//! - [`framing`] - Length-prefix framing and message codecs
//! - [`error`] - Protocol error types

pub mod error;
pub mod framing;
pub mod message;
pub mod record;
pub mod reply;
pub mod value;

pub use error::Error;

pub use message::{error_codes, Operation, Request, Response, ResponsePayload, Status};
pub use record::BoxRecord;
pub use reply::{BoxReply, BoxesReply, StatusReply};
pub use value::Value;

/// Protocol version for wire compatibility.
pub const PROTOCOL_VERSION: u32 = 1;
