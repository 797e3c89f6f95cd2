//! Opening the box collection and its indexes.

use std::sync::Arc;

use tracing::info;

use boxstore_core::storage::StoreConfig;
use boxstore_core::Collection;

use crate::error::Error;

/// Collection holding box records.
pub const COLLECTION_NAME: &str = "boxes";

/// Equality index on `category`.
pub const CATEGORY_INDEX: &str = "category_index";

/// Range index on `created_at`.
pub const CREATED_AT_INDEX: &str = "created_at_index";

/// Secondary indexes every box collection carries, as (name, field).
pub const BOX_INDEXES: [(&str, &str); 2] = [
    (CATEGORY_INDEX, "category"),
    (CREATED_AT_INDEX, "created_at"),
];

/// Open the box collection and make sure its indexes exist.
///
/// Any failure here means the service cannot start.
pub fn open_boxes(config: &StoreConfig) -> Result<Arc<Collection>, Error> {
    if !config.temporary {
        std::fs::create_dir_all(&config.path).map_err(|e| {
            Error::Database(format!(
                "failed to create data directory {}: {}",
                config.path.display(),
                e
            ))
        })?;
    }

    let collection = Collection::open(config, COLLECTION_NAME)
        .map_err(|e| Error::Database(format!("failed to open store: {}", e)))?;

    let existing = collection.index_names();
    for (name, field) in BOX_INDEXES {
        if existing.iter().any(|n| n == name) {
            continue;
        }
        collection
            .ensure_index(name, field)
            .map_err(|e| Error::Database(format!("failed to create index {}: {}", name, e)))?;
    }

    info!(
        collection = collection.name(),
        documents = collection.count(),
        indexes = ?collection.index_names(),
        "box collection ready"
    );

    Ok(Arc::new(collection))
}
