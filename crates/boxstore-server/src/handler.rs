//! Request handler for processing client requests.

use std::sync::Arc;

use boxstore_core::Collection;
use boxstore_proto::{Operation, Request, Response};

use crate::service::BoxService;

/// Dispatches decoded requests to the record service.
pub struct RequestHandler {
    service: BoxService,
}

impl RequestHandler {
    /// Create a handler over the box collection.
    pub fn new(boxes: Arc<Collection>) -> Self {
        Self {
            service: BoxService::new(boxes),
        }
    }

    /// The record service this handler dispatches to.
    pub fn service(&self) -> &BoxService {
        &self.service
    }

    /// Handle a request and return a response carrying the request id.
    pub fn handle(&self, request: &Request) -> Response {
        let id = request.id;
        tracing::debug!(request_id = id, operation = request.operation.name(), "handling request");

        match &request.operation {
            Operation::GetBox { id: box_id } => self.service.get_box(*box_id).into_response(id),
            Operation::GetBoxes => self.service.get_boxes().into_response(id),
            Operation::CreateBox(record) => {
                self.service.create_box(record.clone()).into_response(id)
            }
            Operation::UpdateBox(record) => {
                self.service.update_box(record.clone()).into_response(id)
            }
            Operation::DeleteBox { id: box_id } => {
                self.service.delete_box(*box_id).into_response(id)
            }
            Operation::GetBoxesInCategory { category } => {
                self.service.get_boxes_in_category(category).into_response(id)
            }
            Operation::GetBoxesInTimeRange {
                start_time,
                end_time,
            } => self
                .service
                .get_boxes_in_time_range(*start_time, *end_time)
                .into_response(id),
            Operation::Ping => Response::pong(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::open_boxes;
    use boxstore_core::StoreConfig;
    use boxstore_proto::{error_codes, BoxRecord, ResponsePayload};

    fn handler() -> RequestHandler {
        RequestHandler::new(open_boxes(&StoreConfig::temporary()).unwrap())
    }

    #[test]
    fn test_ping() {
        let handler = handler();
        let response = handler.handle(&Request::ping(1));

        assert_eq!(response.id, 1);
        assert!(response.status.is_ok());
        assert!(matches!(response.payload, ResponsePayload::Pong));
    }

    #[test]
    fn test_create_and_get() {
        let handler = handler();
        let record = BoxRecord::new(7, "Box7").with_created_at(1_000);

        let created = handler.handle(&Request::create_box(2, record.clone()));
        assert_eq!(created.id, 2);
        assert!(created.status.is_ok());
        assert_eq!(created.payload, ResponsePayload::Empty);

        let fetched = handler.handle(&Request::get_box(3, 7));
        assert_eq!(fetched.id, 3);
        assert_eq!(fetched.payload, ResponsePayload::Record(record));
    }

    #[test]
    fn test_get_missing_has_empty_payload() {
        let handler = handler();
        let response = handler.handle(&Request::get_box(4, 1));

        assert_eq!(response.status.code(), Some(error_codes::NOT_FOUND));
        assert_eq!(response.payload, ResponsePayload::Empty);
    }

    #[test]
    fn test_list_operations_return_records() {
        let handler = handler();
        handler.handle(&Request::create_box(1, BoxRecord::new(1, "a").with_category("A")));
        handler.handle(&Request::create_box(2, BoxRecord::new(2, "b").with_created_at(50)));

        let all = handler.handle(&Request::get_boxes(3));
        let by_category = handler.handle(&Request::get_boxes_in_category(4, "A"));
        let by_time = handler.handle(&Request::get_boxes_in_time_range(5, 0, 100));

        for (response, expected) in [(all, vec![1, 2]), (by_category, vec![1]), (by_time, vec![2])] {
            assert!(response.status.is_ok());
            match response.payload {
                ResponsePayload::Records(records) => {
                    let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
                    assert_eq!(ids, expected);
                }
                other => panic!("Expected Records payload, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_update_and_delete() {
        let handler = handler();
        handler.handle(&Request::create_box(1, BoxRecord::new(1, "a")));

        let updated = handler.handle(&Request::update_box(2, BoxRecord::new(1, "b")));
        assert!(updated.status.is_ok());

        let deleted = handler.handle(&Request::delete_box(3, 1));
        assert!(deleted.status.is_ok());

        let again = handler.handle(&Request::delete_box(4, 1));
        assert_eq!(again.status.code(), Some(error_codes::NOT_FOUND));
    }
}
