//! The record service: box operations over the document collection.

use std::sync::Arc;

use tracing::{debug, error, warn};

use boxstore_core::mapping::{document_to_record, record_to_document, update_changes};
use boxstore_core::storage::key::current_timestamp;
use boxstore_core::{Collection, Filter};
use boxstore_proto::{error_codes, BoxRecord, BoxReply, BoxesReply, Status, StatusReply, Value};

/// Record service for box records.
///
/// Every business outcome is reported through the reply status. Storage
/// faults are logged and become `INTERNAL` errors.
pub struct BoxService {
    boxes: Arc<Collection>,
}

impl BoxService {
    /// Create a service over an opened box collection.
    pub fn new(boxes: Arc<Collection>) -> Self {
        Self { boxes }
    }

    /// Access the underlying collection.
    pub fn collection(&self) -> &Arc<Collection> {
        &self.boxes
    }

    /// Look up one box by id.
    pub fn get_box(&self, id: i64) -> BoxReply {
        match self.boxes.find_one(&Filter::by_id(id)) {
            Ok(Some(doc)) => match document_to_record(&doc) {
                Ok(record) => BoxReply::found(record),
                Err(e) => BoxReply::failed(internal("get_box", e)),
            },
            Ok(None) => BoxReply::failed(not_found(id)),
            Err(e) => BoxReply::failed(internal("get_box", e)),
        }
    }

    /// Every box, ordered by id.
    pub fn get_boxes(&self) -> BoxesReply {
        self.find("get_boxes", &Filter::All)
    }

    /// Store a new box, stamping `created_at` when the caller left it unset.
    pub fn create_box(&self, mut record: BoxRecord) -> StatusReply {
        if record.created_at.is_none() {
            record.created_at = Some(current_timestamp());
        }
        let doc = record_to_document(&record);

        match self.boxes.insert_one(&doc) {
            Ok(()) => {
                debug!(id = record.id, "created box");
                StatusReply::ok()
            }
            Err(e @ boxstore_core::Error::DuplicateKey { .. }) => {
                error!(document = ?doc, error = %e, "create_box rejected duplicate id");
                StatusReply::failed(Status::error(
                    error_codes::DUPLICATE_ID,
                    format!("box {} already exists", record.id),
                ))
            }
            Err(e) => StatusReply::failed(internal("create_box", e)),
        }
    }

    /// Replace every field of an existing box except its id and creation
    /// time.
    ///
    /// Succeeds only when the stored box actually changed: an update that
    /// leaves the box identical is reported as `NO_CHANGE`.
    pub fn update_box(&self, record: BoxRecord) -> StatusReply {
        let changes = update_changes(&record);

        match self.boxes.update_one(&Filter::by_id(record.id), &changes) {
            Ok(result) if result.modified == 1 => {
                debug!(id = record.id, "updated box");
                StatusReply::ok()
            }
            Ok(result) if result.matched == 0 => StatusReply::failed(not_found(record.id)),
            Ok(_) => {
                warn!(id = record.id, "update_box left box unchanged");
                StatusReply::failed(Status::error(
                    error_codes::NO_CHANGE,
                    format!("box {} unchanged", record.id),
                ))
            }
            Err(e) => StatusReply::failed(internal("update_box", e)),
        }
    }

    /// Remove a box by id.
    pub fn delete_box(&self, id: i64) -> StatusReply {
        match self.boxes.delete_one(&Filter::by_id(id)) {
            Ok(result) if result.deleted == 1 => {
                debug!(id, "deleted box");
                StatusReply::ok()
            }
            Ok(_) => StatusReply::failed(not_found(id)),
            Err(e) => StatusReply::failed(internal("delete_box", e)),
        }
    }

    /// Boxes whose category equals `category`. The empty category matches
    /// boxes that never had one set.
    pub fn get_boxes_in_category(&self, category: &str) -> BoxesReply {
        self.find("get_boxes_in_category", &Filter::eq("category", category))
    }

    /// Boxes with `start_time <= created_at <= end_time`.
    pub fn get_boxes_in_time_range(&self, start_time: i64, end_time: i64) -> BoxesReply {
        if start_time > end_time {
            return BoxesReply::ok(Vec::new());
        }
        self.find(
            "get_boxes_in_time_range",
            &Filter::between(
                "created_at",
                Value::Timestamp(start_time),
                Value::Timestamp(end_time),
            ),
        )
    }

    fn find(&self, operation: &'static str, filter: &Filter) -> BoxesReply {
        let docs = match self.boxes.find_many(filter) {
            Ok(docs) => docs,
            Err(e) => return BoxesReply::failed(internal(operation, e)),
        };
        match docs.iter().map(document_to_record).collect::<Result<Vec<_>, _>>() {
            Ok(records) => BoxesReply::ok(records),
            Err(e) => BoxesReply::failed(internal(operation, e)),
        }
    }
}

fn not_found(id: i64) -> Status {
    Status::error(error_codes::NOT_FOUND, format!("box {id} not found"))
}

fn internal(operation: &'static str, e: boxstore_core::Error) -> Status {
    error!(operation, error = %e, "storage failure");
    Status::error(error_codes::INTERNAL, e.to_string())
}
