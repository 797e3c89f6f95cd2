//! Request and response message types.

use crate::record::BoxRecord;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// A request from client to server.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct Request {
    /// Unique request identifier for correlation.
    pub id: u64,
    /// The operation to perform.
    pub operation: Operation,
}

/// Operations exposed by the record service.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum Operation {
    /// Fetch one record by id.
    GetBox { id: i64 },
    /// Fetch every record.
    GetBoxes,
    /// Insert a new record.
    CreateBox(BoxRecord),
    /// Replace the mutable fields of an existing record.
    UpdateBox(BoxRecord),
    /// Remove a record by id.
    DeleteBox { id: i64 },
    /// Records whose category equals the given string.
    GetBoxesInCategory { category: String },
    /// Records with `start_time <= created_at <= end_time`.
    GetBoxesInTimeRange { start_time: i64, end_time: i64 },
    /// Ping the server (for health checks).
    Ping,
}

impl Operation {
    /// The RPC method name this operation dispatches to.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::GetBox { .. } => "get_box",
            Operation::GetBoxes => "get_boxes",
            Operation::CreateBox(_) => "create_box",
            Operation::UpdateBox(_) => "update_box",
            Operation::DeleteBox { .. } => "delete_box",
            Operation::GetBoxesInCategory { .. } => "get_boxes_in_category",
            Operation::GetBoxesInTimeRange { .. } => "get_boxes_in_time_range",
            Operation::Ping => "ping",
        }
    }
}

impl Request {
    fn new(id: u64, operation: Operation) -> Self {
        Self { id, operation }
    }

    pub fn get_box(id: u64, box_id: i64) -> Self {
        Self::new(id, Operation::GetBox { id: box_id })
    }

    pub fn get_boxes(id: u64) -> Self {
        Self::new(id, Operation::GetBoxes)
    }

    pub fn create_box(id: u64, record: BoxRecord) -> Self {
        Self::new(id, Operation::CreateBox(record))
    }

    pub fn update_box(id: u64, record: BoxRecord) -> Self {
        Self::new(id, Operation::UpdateBox(record))
    }

    pub fn delete_box(id: u64, box_id: i64) -> Self {
        Self::new(id, Operation::DeleteBox { id: box_id })
    }

    pub fn get_boxes_in_category(id: u64, category: impl Into<String>) -> Self {
        Self::new(
            id,
            Operation::GetBoxesInCategory {
                category: category.into(),
            },
        )
    }

    pub fn get_boxes_in_time_range(id: u64, start_time: i64, end_time: i64) -> Self {
        Self::new(
            id,
            Operation::GetBoxesInTimeRange {
                start_time,
                end_time,
            },
        )
    }

    /// Create a ping request.
    pub fn ping(id: u64) -> Self {
        Self::new(id, Operation::Ping)
    }
}

/// A response from server to client.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct Response {
    /// Request ID this response correlates to.
    pub id: u64,
    /// Response status.
    pub status: Status,
    /// Response payload.
    pub payload: ResponsePayload,
}

/// Outcome of an operation.
///
/// This is the only channel for business failures: a call that reached the
/// service always gets a response, and callers branch on this field.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum Status {
    /// Request succeeded.
    Ok,
    /// Request failed.
    Error {
        /// Error code for programmatic handling, see [`error_codes`].
        code: u32,
        /// Human-readable error message.
        message: String,
    },
}

impl Status {
    /// Create a success status.
    pub fn ok() -> Self {
        Status::Ok
    }

    /// Create an error status.
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Status::Error {
            code,
            message: message.into(),
        }
    }

    /// Check if this is a success status.
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Check if this is an error status.
    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error { .. })
    }

    /// The error code, if this is an error status.
    pub fn code(&self) -> Option<u32> {
        match self {
            Status::Ok => None,
            Status::Error { code, .. } => Some(*code),
        }
    }
}

/// Response payload variants.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum ResponsePayload {
    /// A single record.
    Record(BoxRecord),
    /// A list of records (possibly empty).
    Records(Vec<BoxRecord>),
    /// Pong response to ping.
    Pong,
    /// No payload.
    Empty,
}

impl ResponsePayload {
    /// Variant name, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ResponsePayload::Record(_) => "record",
            ResponsePayload::Records(_) => "records",
            ResponsePayload::Pong => "pong",
            ResponsePayload::Empty => "empty",
        }
    }
}

impl Response {
    /// Create a response from its parts.
    pub fn new(id: u64, status: Status, payload: ResponsePayload) -> Self {
        Self {
            id,
            status,
            payload,
        }
    }

    /// Create a successful single-record response.
    pub fn record(id: u64, record: BoxRecord) -> Self {
        Self::new(id, Status::ok(), ResponsePayload::Record(record))
    }

    /// Create a successful record-list response.
    pub fn records(id: u64, records: Vec<BoxRecord>) -> Self {
        Self::new(id, Status::ok(), ResponsePayload::Records(records))
    }

    /// Create a successful response with no payload.
    pub fn ok(id: u64) -> Self {
        Self::new(id, Status::ok(), ResponsePayload::Empty)
    }

    /// Create a pong response.
    pub fn pong(id: u64) -> Self {
        Self::new(id, Status::ok(), ResponsePayload::Pong)
    }

    /// Create an error response.
    pub fn error(id: u64, code: u32, message: impl Into<String>) -> Self {
        Self::new(id, Status::error(code, message), ResponsePayload::Empty)
    }
}

/// Standard error codes.
pub mod error_codes {
    /// Unknown/internal error, including storage faults during a call.
    pub const INTERNAL: u32 = 1;
    /// Invalid request format.
    pub const INVALID_REQUEST: u32 = 2;
    /// No record with the requested id.
    pub const NOT_FOUND: u32 = 3;
    /// A record with the same id already exists.
    pub const DUPLICATE_ID: u32 = 4;
    /// The update matched a record but left it unchanged.
    pub const NO_CHANGE: u32 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names() {
        assert_eq!(Request::get_box(1, 5).operation.name(), "get_box");
        assert_eq!(Request::get_boxes(1).operation.name(), "get_boxes");
        assert_eq!(
            Request::get_boxes_in_time_range(1, 0, 10).operation.name(),
            "get_boxes_in_time_range"
        );
        assert_eq!(Request::ping(1).operation.name(), "ping");
    }

    #[test]
    fn test_get_box_request() {
        let request = Request::get_box(2, 42);
        assert_eq!(request.id, 2);
        assert_eq!(request.operation, Operation::GetBox { id: 42 });
    }

    #[test]
    fn test_error_response() {
        let response = Response::error(42, error_codes::NOT_FOUND, "box 7 not found");

        assert_eq!(response.id, 42);
        assert!(response.status.is_error());
        assert_eq!(response.status.code(), Some(error_codes::NOT_FOUND));
        assert_eq!(response.payload, ResponsePayload::Empty);
    }

    #[test]
    fn test_ok_response_has_no_code() {
        let response = Response::ok(1);
        assert!(response.status.is_ok());
        assert_eq!(response.status.code(), None);
    }

    #[test]
    fn test_message_serialization_roundtrip() {
        let request = Request::update_box(
            100,
            BoxRecord::new(1, "Box1 new").with_description("renamed"),
        );

        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&request).unwrap();
        let archived = rkyv::access::<ArchivedRequest, rkyv::rancor::Error>(&bytes).unwrap();
        let deserialized: Request =
            rkyv::deserialize::<Request, rkyv::rancor::Error>(archived).unwrap();
        assert_eq!(request, deserialized);

        let response = Response::error(100, error_codes::NO_CHANGE, "unchanged");
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&response).unwrap();
        let archived = rkyv::access::<ArchivedResponse, rkyv::rancor::Error>(&bytes).unwrap();
        let deserialized: Response =
            rkyv::deserialize::<Response, rkyv::rancor::Error>(archived).unwrap();
        assert_eq!(response, deserialized);
    }
}
