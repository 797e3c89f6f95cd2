//! Conversion between wire records and stored documents.
//!
//! The wire model calls the primary key `id`; stored documents keep it in
//! the reserved `_id` field. Field names are translated through an explicit
//! [`FieldMapping`] in both directions, so a round trip is lossless.

use boxstore_proto::{BoxRecord, Value};

use crate::error::Error;
use crate::storage::ID_FIELD;

/// Wire field names of a [`BoxRecord`].
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const PRICE: &str = "price";
    pub const DESCRIPTION: &str = "description";
    pub const CATEGORY: &str = "category";
    pub const QUANTITY: &str = "quantity";
    pub const CREATED_AT: &str = "created_at";
}

/// A named, bidirectional mapping between wire and storage field names.
///
/// Fields without an entry keep their name on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pairs: Vec<(&'static str, &'static str)>,
}

impl FieldMapping {
    /// An empty mapping (every field keeps its name).
    pub fn identity() -> Self {
        Self { pairs: Vec::new() }
    }

    /// The mapping used for box records: wire `id` <-> storage `_id`.
    pub fn records() -> Self {
        Self::identity().rename(fields::ID, ID_FIELD)
    }

    /// Add a rename from `wire` to `storage`.
    pub fn rename(mut self, wire: &'static str, storage: &'static str) -> Self {
        self.pairs.push((wire, storage));
        self
    }

    /// Storage name for a wire field.
    pub fn to_storage<'a>(&self, wire: &'a str) -> &'a str {
        self.pairs
            .iter()
            .find(|(w, _)| *w == wire)
            .map_or(wire, |&(_, s)| s)
    }

    /// Wire name for a storage field.
    pub fn to_wire<'a>(&self, storage: &'a str) -> &'a str {
        self.pairs
            .iter()
            .find(|(_, s)| *s == storage)
            .map_or(storage, |&(w, _)| w)
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::records()
    }
}

/// Convert a record to the document stored for it.
///
/// Every field is written; unset optionals are stored as `Null`, so a
/// replace through [`update_changes`] clears them.
pub fn record_to_document(record: &BoxRecord) -> crate::Document {
    let mapping = FieldMapping::records();
    wire_fields(record)
        .into_iter()
        .map(|(field, value)| (mapping.to_storage(field), value))
        .collect()
}

/// `$set` changes that replace a stored record with `record`.
///
/// The primary key and the creation time are left out: neither changes
/// after creation.
pub fn update_changes(record: &BoxRecord) -> crate::Document {
    let mut changes = record_to_document(record);
    changes.remove(ID_FIELD);
    changes.remove(fields::CREATED_AT);
    changes
}

/// Convert a stored document back to a record.
///
/// `Null` and missing optionals become `None`; unknown fields are ignored.
pub fn document_to_record(doc: &crate::Document) -> Result<BoxRecord, Error> {
    let mapping = FieldMapping::records();
    let mut id = None;
    let mut name = None;
    let mut record = BoxRecord::new(0, String::new());

    for (storage_field, value) in doc.iter() {
        match mapping.to_wire(storage_field) {
            fields::ID => id = value.as_i64(),
            fields::NAME => name = value.as_str().map(str::to_string),
            fields::PRICE => record.price = optional(value, Value::as_i64, fields::PRICE)?,
            fields::DESCRIPTION => {
                record.description =
                    optional(value, |v| v.as_str().map(str::to_string), fields::DESCRIPTION)?
            }
            fields::CATEGORY => {
                record.category =
                    optional(value, |v| v.as_str().map(str::to_string), fields::CATEGORY)?
                        .unwrap_or_default()
            }
            fields::QUANTITY => {
                record.quantity = optional(value, Value::as_i64, fields::QUANTITY)?
            }
            fields::CREATED_AT => {
                record.created_at = optional(value, Value::as_timestamp, fields::CREATED_AT)?
            }
            _ => {}
        }
    }

    record.id = id.ok_or_else(|| Error::InvalidData(format!("document has no integer {ID_FIELD}")))?;
    record.name = name.ok_or_else(|| {
        Error::InvalidData(format!("document {} has no string name", record.id))
    })?;
    Ok(record)
}

/// Record fields under their wire names.
fn wire_fields(record: &BoxRecord) -> Vec<(&'static str, Value)> {
    vec![
        (fields::ID, Value::Int64(record.id)),
        (fields::NAME, Value::from(record.name.as_str())),
        (fields::PRICE, Value::from(record.price)),
        (fields::DESCRIPTION, Value::from(record.description.clone())),
        (fields::CATEGORY, Value::from(record.category.as_str())),
        (fields::QUANTITY, Value::from(record.quantity)),
        (
            fields::CREATED_AT,
            record.created_at.map_or(Value::Null, Value::Timestamp),
        ),
    ]
}

/// Read an optional field: `Null` is `None`, a mistyped value is an error.
fn optional<T>(
    value: &Value,
    read: impl Fn(&Value) -> Option<T>,
    field: &str,
) -> Result<Option<T>, Error> {
    if value.is_null() {
        return Ok(None);
    }
    read(value).map(Some).ok_or_else(|| {
        Error::InvalidData(format!(
            "field {field} holds {}, not the expected type",
            value.type_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    fn full_record() -> BoxRecord {
        BoxRecord::new(3, "Box3")
            .with_price(102)
            .with_description("some description")
            .with_category("CATEGORY 1")
            .with_quantity(4)
            .with_created_at(1_658_391_499_000_000)
    }

    #[test]
    fn test_mapping_is_bidirectional() {
        let mapping = FieldMapping::records();
        assert_eq!(mapping.to_storage("id"), "_id");
        assert_eq!(mapping.to_wire("_id"), "id");
        assert_eq!(mapping.to_storage("name"), "name");
        assert_eq!(mapping.to_wire("category"), "category");
    }

    #[test]
    fn test_record_roundtrip_through_document() {
        let record = full_record();
        let doc = record_to_document(&record);

        assert_eq!(doc.id(), Some(3));
        assert!(doc.get("id").is_none());
        assert_eq!(doc.get("created_at"), Some(&Value::Timestamp(1_658_391_499_000_000)));
        assert_eq!(document_to_record(&doc).unwrap(), record);
    }

    #[test]
    fn test_unset_optionals_roundtrip() {
        let record = BoxRecord::new(1, "Box1");
        let doc = record_to_document(&record);

        assert!(doc.get("price").unwrap().is_null());
        assert_eq!(doc.get("category"), Some(&Value::from("")));
        assert_eq!(document_to_record(&doc).unwrap(), record);
    }

    #[test]
    fn test_sparse_document_reads_defaults() {
        let doc = Document::new()
            .with(ID_FIELD, 9i64)
            .with("name", "Box9")
            .with("colour", "red");
        let record = document_to_record(&doc).unwrap();
        assert_eq!(record, BoxRecord::new(9, "Box9"));
    }

    #[test]
    fn test_update_changes_skip_identity_and_creation_time() {
        let changes = update_changes(&full_record());
        assert!(changes.get(ID_FIELD).is_none());
        assert!(changes.get("created_at").is_none());
        assert_eq!(changes.get("price"), Some(&Value::Int64(102)));
        assert!(update_changes(&BoxRecord::new(1, "x")).get("price").unwrap().is_null());
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        let no_id = Document::new().with("name", "x");
        assert!(matches!(document_to_record(&no_id), Err(Error::InvalidData(_))));

        let no_name = Document::new().with(ID_FIELD, 1i64);
        assert!(matches!(document_to_record(&no_name), Err(Error::InvalidData(_))));

        let bad_price = Document::new()
            .with(ID_FIELD, 1i64)
            .with("name", "x")
            .with("price", "cheap");
        assert!(matches!(document_to_record(&bad_price), Err(Error::InvalidData(_))));
    }
}
