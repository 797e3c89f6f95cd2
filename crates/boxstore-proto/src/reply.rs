//! Typed replies produced by the record service.
//!
//! Each reply pairs a [`Status`] with the payload its operation returns. The
//! server turns a reply into a [`Response`]; the client turns a [`Response`]
//! back into the reply for the operation it issued.

use crate::error::Error;
use crate::message::{Response, ResponsePayload, Status};
use crate::record::BoxRecord;

/// Reply for `get_box`: a status and the record, if found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxReply {
    pub status: Status,
    pub record: Option<BoxRecord>,
}

/// Reply for `get_boxes` and the filtered queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxesReply {
    pub status: Status,
    pub records: Vec<BoxRecord>,
}

/// Reply for operations without a payload (`create_box`, `update_box`, `delete_box`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReply {
    pub status: Status,
}

impl BoxReply {
    pub fn found(record: BoxRecord) -> Self {
        Self {
            status: Status::ok(),
            record: Some(record),
        }
    }

    pub fn failed(status: Status) -> Self {
        Self {
            status,
            record: None,
        }
    }

    pub fn into_response(self, id: u64) -> Response {
        let payload = match self.record {
            Some(record) => ResponsePayload::Record(record),
            None => ResponsePayload::Empty,
        };
        Response::new(id, self.status, payload)
    }
}

impl TryFrom<Response> for BoxReply {
    type Error = Error;

    fn try_from(response: Response) -> Result<Self, Error> {
        let record = match response.payload {
            ResponsePayload::Record(record) => Some(record),
            ResponsePayload::Empty => None,
            other => {
                return Err(Error::UnexpectedPayload {
                    operation: "get_box",
                    payload: other.kind(),
                })
            }
        };
        Ok(Self {
            status: response.status,
            record,
        })
    }
}

impl BoxesReply {
    pub fn ok(records: Vec<BoxRecord>) -> Self {
        Self {
            status: Status::ok(),
            records,
        }
    }

    pub fn failed(status: Status) -> Self {
        Self {
            status,
            records: Vec::new(),
        }
    }

    pub fn into_response(self, id: u64) -> Response {
        Response::new(id, self.status, ResponsePayload::Records(self.records))
    }
}

impl TryFrom<Response> for BoxesReply {
    type Error = Error;

    fn try_from(response: Response) -> Result<Self, Error> {
        let records = match response.payload {
            ResponsePayload::Records(records) => records,
            ResponsePayload::Empty => Vec::new(),
            other => {
                return Err(Error::UnexpectedPayload {
                    operation: "get_boxes",
                    payload: other.kind(),
                })
            }
        };
        Ok(Self {
            status: response.status,
            records,
        })
    }
}

impl StatusReply {
    pub fn ok() -> Self {
        Self {
            status: Status::ok(),
        }
    }

    pub fn failed(status: Status) -> Self {
        Self { status }
    }

    pub fn into_response(self, id: u64) -> Response {
        Response::new(id, self.status, ResponsePayload::Empty)
    }
}

impl TryFrom<Response> for StatusReply {
    type Error = Error;

    fn try_from(response: Response) -> Result<Self, Error> {
        match response.payload {
            ResponsePayload::Empty => Ok(Self {
                status: response.status,
            }),
            other => Err(Error::UnexpectedPayload {
                operation: "status",
                payload: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_codes;

    #[test]
    fn test_missing_box_maps_to_empty_payload() {
        let reply = BoxReply::failed(Status::error(error_codes::NOT_FOUND, "nope"));
        let response = reply.clone().into_response(5);

        assert_eq!(response.id, 5);
        assert_eq!(response.payload, ResponsePayload::Empty);
        assert_eq!(BoxReply::try_from(response).unwrap(), reply);
    }

    #[test]
    fn test_found_box_survives_response() {
        let reply = BoxReply::found(BoxRecord::new(1, "Box1"));
        let back = BoxReply::try_from(reply.clone().into_response(1)).unwrap();
        assert_eq!(back, reply);
    }

    #[test]
    fn test_boxes_reply_accepts_error_without_records() {
        let response = Response::error(3, error_codes::INTERNAL, "store failure");
        let reply = BoxesReply::try_from(response).unwrap();
        assert!(reply.status.is_error());
        assert!(reply.records.is_empty());
    }

    #[test]
    fn test_status_reply_rejects_records() {
        let response = Response::records(1, vec![]);
        let err = StatusReply::try_from(response).unwrap_err();
        assert!(matches!(err, Error::UnexpectedPayload { payload: "records", .. }));
    }
}
