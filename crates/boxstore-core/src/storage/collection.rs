//! Document collection with named secondary indexes.

use parking_lot::RwLock;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use tracing::{debug, info, warn};

use super::document::{Document, ID_FIELD};
use super::filter::Filter;
use super::key::{self, encode_id};
use super::StoreConfig;
use crate::error::Error;

/// Suffix of the tree holding index entries.
const INDEX_ENTRIES_SUFFIX: &str = ":index";

/// Suffix of the tree recording index name -> field.
const INDEX_CATALOG_SUFFIX: &str = ":indexes";

/// Index entries carry no value; the key is the whole entry.
const EMPTY: &[u8] = &[];

/// A named secondary index over one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub field: String,
}

/// Outcome of [`Collection::update_one`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents matched by the filter (0 or 1).
    pub matched: u64,
    /// Documents actually changed (0 when the new data equals the old).
    pub modified: u64,
}

/// Outcome of [`Collection::delete_one`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted: u64,
}

/// A collection of documents keyed by their `_id` field.
///
/// Each collection owns three sled trees: the documents, the index entries
/// of every secondary index, and a catalog of index definitions. A write to
/// one document and its index entries commits in a single transaction.
pub struct Collection {
    name: String,
    db: Db,
    documents: Tree,
    index_entries: Tree,
    catalog: Tree,
    indexes: RwLock<Vec<IndexSpec>>,
}

impl Collection {
    /// Open the store described by `config` and the named collection in it.
    pub fn open(config: &StoreConfig, name: &str) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        if db.was_recovered() {
            debug!(path = %config.path.display(), "Recovered existing store");
        }
        Self::open_in(&db, name)
    }

    /// Open the named collection in an already open database.
    pub fn open_in(db: &Db, name: &str) -> Result<Self, Error> {
        let documents = db.open_tree(name)?;
        let index_entries = db.open_tree(format!("{name}{INDEX_ENTRIES_SUFFIX}"))?;
        let catalog = db.open_tree(format!("{name}{INDEX_CATALOG_SUFFIX}"))?;

        let mut indexes = Vec::new();
        for item in catalog.iter() {
            let (name_bytes, field_bytes) = item?;
            let index_name =
                String::from_utf8(name_bytes.to_vec()).map_err(|_| Error::InvalidKey)?;
            let field = String::from_utf8(field_bytes.to_vec())
                .map_err(|e| Error::InvalidData(format!("index {index_name}: {e}")))?;
            indexes.push(IndexSpec {
                name: index_name,
                field,
            });
        }

        Ok(Self {
            name: name.to_string(),
            db: db.clone(),
            documents,
            index_entries,
            catalog,
            indexes: RwLock::new(indexes),
        })
    }

    /// Name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the secondary indexes that exist on this collection.
    pub fn index_names(&self) -> Vec<String> {
        self.indexes.read().iter().map(|i| i.name.clone()).collect()
    }

    /// Create the named index on `field` unless an index with that name
    /// already exists.
    ///
    /// Returns `true` when the index was created. Documents already in the
    /// collection are indexed before this returns.
    pub fn ensure_index(&self, name: &str, field: &str) -> Result<bool, Error> {
        if let Some(existing) = self.indexes.read().iter().find(|i| i.name == name) {
            if existing.field != field {
                warn!(
                    collection = %self.name,
                    index = name,
                    field = %existing.field,
                    requested = field,
                    "Index exists on a different field, keeping it"
                );
            }
            return Ok(false);
        }

        let spec = IndexSpec {
            name: name.to_string(),
            field: field.to_string(),
        };
        // Writes racing the backfill see the index and maintain it.
        self.indexes.write().push(spec.clone());

        let mut backfilled = 0usize;
        for item in self.documents.iter() {
            let (_, bytes) = item?;
            let doc = Document::from_bytes(&bytes)?;
            let id = document_id(&doc)?;
            self.index_entries.insert(
                key::index_entry_key(&spec.name, doc.get_or_null(&spec.field), id),
                EMPTY,
            )?;
            backfilled += 1;
        }

        self.catalog.insert(name.as_bytes(), field.as_bytes())?;

        info!(
            collection = %self.name,
            index = name,
            field,
            backfilled,
            "Created index"
        );
        Ok(true)
    }

    /// Find the first document matching `filter`.
    pub fn find_one(&self, filter: &Filter) -> Result<Option<Document>, Error> {
        if let Some(id) = filter.target_id() {
            return self.get_by_id(id);
        }
        Ok(self.find_many(filter)?.into_iter().next())
    }

    /// Find every document matching `filter`.
    ///
    /// Lookups on `_id` read the document directly. Filters on an indexed
    /// field scan that index; anything else scans the collection in id order.
    pub fn find_many(&self, filter: &Filter) -> Result<Vec<Document>, Error> {
        if let Some(id) = filter.target_id() {
            return Ok(self.get_by_id(id)?.into_iter().collect());
        }

        if let Some(ids) = self.index_lookup(filter)? {
            let mut docs = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(doc) = self.get_by_id(id)? {
                    if filter.matches(&doc) {
                        docs.push(doc);
                    }
                }
            }
            return Ok(docs);
        }

        let mut docs = Vec::new();
        for item in self.documents.iter() {
            let (_, bytes) = item?;
            let doc = Document::from_bytes(&bytes)?;
            if filter.matches(&doc) {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    /// Insert a new document.
    ///
    /// Fails with [`Error::DuplicateKey`] if a document with the same `_id`
    /// exists; the stored document is left untouched.
    pub fn insert_one(&self, doc: &Document) -> Result<(), Error> {
        let id = document_id(doc)?;
        let doc_key = encode_id(id);
        let bytes = doc.to_bytes()?;
        let entries: Vec<Vec<u8>> = self
            .indexes
            .read()
            .iter()
            .map(|ix| key::index_entry_key(&ix.name, doc.get_or_null(&ix.field), id))
            .collect();

        let result: Result<(), TransactionError<Error>> = (&self.documents, &self.index_entries)
            .transaction(|(docs, index_tx)| {
                if docs.get(doc_key)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(Error::DuplicateKey { id }));
                }
                docs.insert(&doc_key[..], bytes.as_slice())?;
                for entry in &entries {
                    index_tx.insert(entry.as_slice(), EMPTY)?;
                }
                Ok(())
            });
        result?;

        debug!(collection = %self.name, id, "Inserted document");
        Ok(())
    }

    /// Apply `changes` to the first document matching `filter`.
    ///
    /// Fields in `changes` replace fields of the same name; other fields are
    /// kept. Changing `_id` fails with [`Error::ImmutableField`].
    pub fn update_one(&self, filter: &Filter, changes: &Document) -> Result<UpdateResult, Error> {
        let Some(target) = self.find_one(filter)? else {
            return Ok(UpdateResult::default());
        };
        let id = document_id(&target)?;
        if let Some(new_id) = changes.get(ID_FIELD) {
            if new_id.as_i64() != Some(id) {
                return Err(Error::ImmutableField(ID_FIELD.to_string()));
            }
        }

        let doc_key = encode_id(id);
        let indexes = self.indexes.read().clone();

        let result: Result<UpdateResult, TransactionError<Error>> =
            (&self.documents, &self.index_entries).transaction(|(docs, index_tx)| {
                let current = match docs.get(doc_key)? {
                    Some(bytes) => {
                        Document::from_bytes(&bytes).map_err(ConflictableTransactionError::Abort)?
                    }
                    None => return Ok(UpdateResult::default()),
                };
                if !filter.matches(&current) {
                    return Ok(UpdateResult::default());
                }

                let updated = current.merged(changes);
                if updated == current {
                    return Ok(UpdateResult {
                        matched: 1,
                        modified: 0,
                    });
                }

                let bytes = updated
                    .to_bytes()
                    .map_err(ConflictableTransactionError::Abort)?;
                docs.insert(&doc_key[..], bytes)?;

                for ix in &indexes {
                    let old = current.get_or_null(&ix.field);
                    let new = updated.get_or_null(&ix.field);
                    if old != new {
                        index_tx.remove(key::index_entry_key(&ix.name, old, id))?;
                        index_tx.insert(key::index_entry_key(&ix.name, new, id), EMPTY)?;
                    }
                }

                Ok(UpdateResult {
                    matched: 1,
                    modified: 1,
                })
            });
        let outcome = result?;

        debug!(
            collection = %self.name,
            id,
            matched = outcome.matched,
            modified = outcome.modified,
            "Updated document"
        );
        Ok(outcome)
    }

    /// Delete the first document matching `filter`.
    pub fn delete_one(&self, filter: &Filter) -> Result<DeleteResult, Error> {
        let Some(target) = self.find_one(filter)? else {
            return Ok(DeleteResult::default());
        };
        let id = document_id(&target)?;
        let doc_key = encode_id(id);
        let indexes = self.indexes.read().clone();

        let result: Result<DeleteResult, TransactionError<Error>> =
            (&self.documents, &self.index_entries).transaction(|(docs, index_tx)| {
                let current = match docs.remove(&doc_key[..])? {
                    Some(bytes) => {
                        Document::from_bytes(&bytes).map_err(ConflictableTransactionError::Abort)?
                    }
                    None => return Ok(DeleteResult::default()),
                };
                for ix in &indexes {
                    index_tx.remove(key::index_entry_key(
                        &ix.name,
                        current.get_or_null(&ix.field),
                        id,
                    ))?;
                }
                Ok(DeleteResult { deleted: 1 })
            });
        let outcome = result?;

        debug!(collection = %self.name, id, deleted = outcome.deleted, "Deleted document");
        Ok(outcome)
    }

    /// Number of documents in the collection.
    pub fn count(&self) -> usize {
        self.documents.len()
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Document>, Error> {
        match self.documents.get(encode_id(id))? {
            Some(bytes) => Ok(Some(Document::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn index_for(&self, field: &str) -> Option<IndexSpec> {
        self.indexes.read().iter().find(|i| i.field == field).cloned()
    }

    /// Candidate ids for `filter` from a secondary index, or `None` when no
    /// index can serve it.
    fn index_lookup(&self, filter: &Filter) -> Result<Option<Vec<i64>>, Error> {
        let Some(index) = filter.field().and_then(|f| self.index_for(f)) else {
            return Ok(None);
        };

        let mut ids = Vec::new();
        match filter {
            Filter::All => return Ok(None),
            Filter::Eq { value, .. } => {
                let prefix = key::index_value_prefix(&index.name, value);
                let entry_len = prefix.len() + key::ID_KEY_SIZE;
                for item in self.index_entries.scan_prefix(&prefix) {
                    let (entry, _) = item?;
                    // Longer keys belong to values that merely start with this one.
                    if entry.len() != entry_len {
                        continue;
                    }
                    ids.push(key::index_entry_id(&entry).ok_or(Error::InvalidKey)?);
                }
            }
            Filter::Range { gte, lte, .. } => {
                let Some(bounds) = key::index_range_bounds(&index.name, gte.as_ref(), lte.as_ref())
                else {
                    return Ok(None);
                };
                for item in self.index_entries.range(bounds) {
                    let (entry, _) = item?;
                    ids.push(key::index_entry_id(&entry).ok_or(Error::InvalidKey)?);
                }
            }
        }

        debug!(
            collection = %self.name,
            index = %index.name,
            candidates = ids.len(),
            "Index lookup"
        );
        Ok(Some(ids))
    }
}

fn document_id(doc: &Document) -> Result<i64, Error> {
    doc.id()
        .ok_or_else(|| Error::InvalidData(format!("document has no integer {ID_FIELD}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxstore_proto::Value;

    fn open() -> Collection {
        Collection::open(&StoreConfig::temporary(), "boxes").unwrap()
    }

    fn doc(id: i64, category: &str, created_at: i64) -> Document {
        Document::new()
            .with(ID_FIELD, id)
            .with("name", format!("Box{id}"))
            .with("category", category)
            .with("created_at", Value::Timestamp(created_at))
    }

    fn ids(docs: &[Document]) -> Vec<i64> {
        docs.iter().filter_map(Document::id).collect()
    }

    #[test]
    fn test_insert_and_find_by_id() {
        let coll = open();
        coll.insert_one(&doc(1, "A", 10)).unwrap();

        let found = coll.find_one(&Filter::by_id(1)).unwrap().unwrap();
        assert_eq!(found, doc(1, "A", 10));
        assert!(coll.find_one(&Filter::by_id(2)).unwrap().is_none());
        assert_eq!(coll.count(), 1);
    }

    #[test]
    fn test_duplicate_insert_keeps_original() {
        let coll = open();
        coll.insert_one(&doc(1, "A", 10)).unwrap();

        let err = coll.insert_one(&doc(1, "B", 20)).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { id: 1 }));

        let stored = coll.find_one(&Filter::by_id(1)).unwrap().unwrap();
        assert_eq!(stored.get("category"), Some(&Value::from("A")));
    }

    #[test]
    fn test_insert_requires_id() {
        let coll = open();
        let err = coll.insert_one(&Document::new().with("name", "x")).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_ensure_index_is_idempotent() {
        let coll = open();
        assert!(coll.ensure_index("category_index", "category").unwrap());
        assert!(!coll.ensure_index("category_index", "category").unwrap());
        assert_eq!(coll.index_names(), vec!["category_index".to_string()]);
    }

    #[test]
    fn test_ensure_index_backfills_existing_documents() {
        let coll = open();
        coll.insert_one(&doc(1, "A", 10)).unwrap();
        coll.insert_one(&doc(2, "B", 20)).unwrap();

        coll.ensure_index("category_index", "category").unwrap();
        let found = coll.find_many(&Filter::eq("category", "B")).unwrap();
        assert_eq!(ids(&found), vec![2]);
    }

    #[test]
    fn test_indexed_and_scanned_queries_agree() {
        let indexed = open();
        indexed.ensure_index("category_index", "category").unwrap();
        indexed.ensure_index("created_at_index", "created_at").unwrap();
        let scanned = open();

        for coll in [&indexed, &scanned] {
            coll.insert_one(&doc(1, "", 100)).unwrap();
            coll.insert_one(&doc(2, "", 200)).unwrap();
            coll.insert_one(&doc(3, "A", 300)).unwrap();
            coll.insert_one(&doc(4, "A", 400)).unwrap();
            coll.insert_one(&doc(5, "AB", 500)).unwrap();
        }

        let filters = [
            Filter::eq("category", "A"),
            Filter::eq("category", ""),
            Filter::between("created_at", Value::Timestamp(200), Value::Timestamp(400)),
            Filter::between("created_at", Value::Timestamp(401), Value::Timestamp(499)),
        ];
        for filter in &filters {
            assert_eq!(
                ids(&indexed.find_many(filter).unwrap()),
                ids(&scanned.find_many(filter).unwrap()),
                "{filter:?}"
            );
        }
        assert_eq!(
            ids(&indexed.find_many(&Filter::eq("category", "A")).unwrap()),
            vec![3, 4]
        );
    }

    #[test]
    fn test_update_reports_matched_and_modified() {
        let coll = open();
        coll.ensure_index("category_index", "category").unwrap();
        coll.insert_one(&doc(1, "A", 10)).unwrap();

        let missing = coll
            .update_one(&Filter::by_id(9), &Document::new().with("name", "x"))
            .unwrap();
        assert_eq!(missing, UpdateResult::default());

        let same = coll
            .update_one(&Filter::by_id(1), &Document::new().with("name", "Box1"))
            .unwrap();
        assert_eq!(same, UpdateResult { matched: 1, modified: 0 });

        let changed = coll
            .update_one(&Filter::by_id(1), &Document::new().with("category", "B"))
            .unwrap();
        assert_eq!(changed, UpdateResult { matched: 1, modified: 1 });

        // Index entries follow the change.
        assert!(coll.find_many(&Filter::eq("category", "A")).unwrap().is_empty());
        assert_eq!(ids(&coll.find_many(&Filter::eq("category", "B")).unwrap()), vec![1]);
    }

    #[test]
    fn test_update_rejects_id_change() {
        let coll = open();
        coll.insert_one(&doc(1, "A", 10)).unwrap();

        let err = coll
            .update_one(&Filter::by_id(1), &Document::new().with(ID_FIELD, 2i64))
            .unwrap_err();
        assert!(matches!(err, Error::ImmutableField(_)));

        // Restating the same id is allowed.
        let same = coll
            .update_one(&Filter::by_id(1), &Document::new().with(ID_FIELD, 1i64))
            .unwrap();
        assert_eq!(same.modified, 0);
    }

    #[test]
    fn test_delete_removes_document_and_index_entries() {
        let coll = open();
        coll.ensure_index("category_index", "category").unwrap();
        coll.insert_one(&doc(1, "A", 10)).unwrap();

        assert_eq!(coll.delete_one(&Filter::by_id(1)).unwrap().deleted, 1);
        assert_eq!(coll.delete_one(&Filter::by_id(1)).unwrap().deleted, 0);
        assert!(coll.find_many(&Filter::eq("category", "A")).unwrap().is_empty());
        assert_eq!(coll.count(), 0);
    }

    #[test]
    fn test_find_all_is_ordered_by_id() {
        let coll = open();
        for id in [5, -1, 3] {
            coll.insert_one(&doc(id, "", 0)).unwrap();
        }
        assert_eq!(ids(&coll.find_many(&Filter::All).unwrap()), vec![-1, 3, 5]);
    }
}
