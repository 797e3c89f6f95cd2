//! Integration tests for the document collection and record mapping.

use boxstore_core::mapping::{document_to_record, record_to_document, update_changes};
use boxstore_core::storage::ID_FIELD;
use boxstore_core::{Collection, Filter, StoreConfig};
use boxstore_proto::{BoxRecord, Value};

struct TestContext {
    collection: Collection,
    _dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let collection = Collection::open(&StoreConfig::new(dir.path()), "boxes").unwrap();
        collection.ensure_index("category_index", "category").unwrap();
        collection
            .ensure_index("created_at_index", "created_at")
            .unwrap();
        Self {
            collection,
            _dir: dir,
        }
    }

    fn insert(&self, record: &BoxRecord) {
        self.collection
            .insert_one(&record_to_document(record))
            .unwrap();
    }

    fn ids(&self, filter: &Filter) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .collection
            .find_many(filter)
            .unwrap()
            .iter()
            .map(|doc| document_to_record(doc).unwrap().id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

#[test]
fn test_indexes_survive_reopen_without_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path());

    {
        let collection = Collection::open(&config, "boxes").unwrap();
        assert!(collection.ensure_index("category_index", "category").unwrap());
        collection
            .insert_one(&record_to_document(&BoxRecord::new(1, "Box1").with_category("A")))
            .unwrap();
        collection.flush().unwrap();
    }

    let collection = Collection::open(&config, "boxes").unwrap();
    assert_eq!(collection.index_names(), vec!["category_index".to_string()]);
    assert!(!collection.ensure_index("category_index", "category").unwrap());

    let found = collection.find_many(&Filter::eq("category", "A")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), Some(1));
}

#[test]
fn test_category_scenario() {
    let ctx = TestContext::new();
    ctx.insert(&BoxRecord::new(1, "Box1"));
    ctx.insert(&BoxRecord::new(2, "Box2"));
    ctx.insert(&BoxRecord::new(3, "Box3").with_category("A"));
    ctx.insert(&BoxRecord::new(4, "Box4").with_category("A"));

    assert_eq!(ctx.ids(&Filter::eq("category", "A")), vec![3, 4]);
    assert_eq!(ctx.ids(&Filter::eq("category", "")), vec![1, 2]);
}

#[test]
fn test_time_range_is_boundary_exact() {
    let ctx = TestContext::new();
    for (id, ts) in [(1, 1_000), (2, 2_000), (3, 3_000), (4, 3_001)] {
        ctx.insert(&BoxRecord::new(id, format!("Box{id}")).with_created_at(ts));
    }

    let range = |lo, hi| Filter::between("created_at", Value::Timestamp(lo), Value::Timestamp(hi));
    assert_eq!(ctx.ids(&range(1_000, 3_000)), vec![1, 2, 3]);
    assert_eq!(ctx.ids(&range(1_001, 2_999)), vec![2]);
    assert_eq!(ctx.ids(&range(3_000, 1_000)), Vec::<i64>::new());
}

#[test]
fn test_replace_keeps_creation_time() {
    let ctx = TestContext::new();
    let original = BoxRecord::new(7, "Box7")
        .with_price(10)
        .with_category("A")
        .with_created_at(5_000);
    ctx.insert(&original);

    let replacement = BoxRecord::new(7, "Box7 renamed").with_category("B");
    let result = ctx
        .collection
        .update_one(&Filter::by_id(7), &update_changes(&replacement))
        .unwrap();
    assert_eq!(result.modified, 1);

    let stored = ctx
        .collection
        .find_one(&Filter::eq(ID_FIELD, 7i64))
        .unwrap()
        .unwrap();
    let record = document_to_record(&stored).unwrap();
    assert_eq!(record.name, "Box7 renamed");
    assert_eq!(record.price, None);
    assert_eq!(record.created_at, Some(5_000));
    assert_eq!(ctx.ids(&Filter::eq("category", "A")), Vec::<i64>::new());
    assert_eq!(ctx.ids(&Filter::eq("category", "B")), vec![7]);
}
