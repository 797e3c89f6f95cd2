//! BoxStore Core - document storage adapter and record mapping.
//!
//! [`storage::Collection`] is a small document collection on top of sled with
//! named secondary indexes. [`mapping`] converts between the wire
//! [`BoxRecord`](boxstore_proto::BoxRecord) and stored [`Document`]s.

pub mod error;
pub mod mapping;
pub mod storage;

pub use error::Error;
pub use mapping::{document_to_record, record_to_document, update_changes, FieldMapping};
pub use storage::{
    Collection, DeleteResult, Document, Filter, IndexSpec, StoreConfig, UpdateResult,
};

/// Re-export protocol types.
pub use boxstore_proto as proto;
