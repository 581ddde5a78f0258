//! Integration tests for CRUD and batch operations against the in-memory engine.

use serde_json::json;

use strata_core::{
    ArrayType, BatchOp, Error, IndexDefinition, Key, MemoryEngine, ObjectStore, SchemaError, Slot,
};

fn simple_store() -> ObjectStore {
    ObjectStore::builder("store-simple")
        .open(MemoryEngine::new())
        .unwrap()
}

fn out_of_line_store() -> ObjectStore {
    ObjectStore::builder("store-out-of-line")
        .out_of_line_keys()
        .auto_increment(false)
        .open(MemoryEngine::new())
        .unwrap()
}

async fn seed_three(store: &ObjectStore) {
    store
        .put_batch(vec![
            json!({"id": 1, "name": "John"}),
            json!({"id": 2, "name": "Joe"}),
            json!({"id": 3, "name": "James"}),
        ])
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// In-line keys
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_inline_put_returns_key_path_value() {
    let store = simple_store();
    let key = store.put(json!({"id": 1, "name": "John"})).await.unwrap();
    assert_eq!(key, Key::from(1));

    let record = store.get(1).await.unwrap().unwrap();
    assert_eq!(record, json!({"id": 1, "name": "John"}));
}

#[tokio::test]
async fn test_inline_overwrite_is_last_write_wins() {
    let store = simple_store();
    store.put(json!({"id": 1, "name": "John"})).await.unwrap();
    store.put(json!({"id": 1, "name": "James"})).await.unwrap();

    assert_eq!(store.get(1).await.unwrap().unwrap()["name"], "James");
    assert_eq!(store.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_inline_put_without_id_generates_key() {
    let store = simple_store();
    store.put(json!({"id": 1, "name": "John"})).await.unwrap();

    let key = store.put(json!({"name": "Joe"})).await.unwrap();
    assert_eq!(key, Key::from(2));
    let record = store.get(key).await.unwrap().unwrap();
    assert_eq!(record["name"], "Joe");
    assert_eq!(record["id"], 2);
}

#[tokio::test]
async fn test_generated_key_at_nested_path() {
    let store = ObjectStore::builder("nested")
        .key_path("meta.uid")
        .open(MemoryEngine::new())
        .unwrap();
    let key = store.put(json!({"name": "Joe"})).await.unwrap();
    assert_eq!(key, Key::from(1));
    let record = store.get(1).await.unwrap().unwrap();
    assert_eq!(record["meta"]["uid"], 1);
}

#[tokio::test]
async fn test_generator_skips_past_explicit_keys() {
    let store = simple_store();
    store.put(json!({"id": 10.7})).await.unwrap();
    let key = store.put(json!({"name": "next"})).await.unwrap();
    assert_eq!(key, Key::from(11));

    // Lower explicit keys and non-numeric keys leave it alone.
    store.put(json!({"id": 3})).await.unwrap();
    store.put(json!({"id": "text"})).await.unwrap();
    let key = store.put(json!({"name": "after"})).await.unwrap();
    assert_eq!(key, Key::from(12));
}

#[tokio::test]
async fn test_generator_survives_clear() {
    let store = simple_store();
    store.put(json!({"name": "a"})).await.unwrap();
    store.put(json!({"name": "b"})).await.unwrap();
    store.clear().await.unwrap();
    let key = store.put(json!({"name": "c"})).await.unwrap();
    assert_eq!(key, Key::from(3));
}

#[tokio::test]
async fn test_missing_key_without_generator() {
    let store = ObjectStore::builder("strict")
        .auto_increment(false)
        .open(MemoryEngine::new())
        .unwrap();
    let err = store.put(json!({"name": "Joe"})).await.unwrap_err();
    assert!(matches!(err, Error::MissingKey { ref key_path } if key_path == "id"));
    assert!(store.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_key_value_is_rejected() {
    let store = simple_store();
    let err = store.put(json!({"id": true})).await.unwrap_err();
    assert!(matches!(err, Error::Encoding(_)));
}

#[tokio::test]
async fn test_get_missing_is_none() {
    let store = simple_store();
    assert!(store.get(42).await.unwrap().is_none());
}

#[tokio::test]
async fn test_remove_then_get_is_absent() {
    let store = simple_store();
    store.put(json!({"id": 1, "name": "John"})).await.unwrap();
    store.remove(1).await.unwrap();
    assert!(store.get(1).await.unwrap().is_none());

    // Removing again, or removing something never stored, succeeds.
    store.remove(1).await.unwrap();
    store.remove("never").await.unwrap();
}

#[tokio::test]
async fn test_get_all_in_key_order() {
    let store = simple_store();
    store.put(json!({"id": "b"})).await.unwrap();
    store.put(json!({"id": 10})).await.unwrap();
    store.put(json!({"id": "a"})).await.unwrap();
    store.put(json!({"id": 2})).await.unwrap();

    let ids: Vec<_> = store
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r["id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(2), json!(10), json!("a"), json!("b")]);
}

#[tokio::test]
async fn test_clear_is_idempotent() {
    let store = simple_store();
    seed_three(&store).await;
    store.clear().await.unwrap();
    assert!(store.get_all().await.unwrap().is_empty());
    store.clear().await.unwrap();
    assert!(store.get_all().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Out-of-line keys
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_out_of_line_crud() {
    let store = out_of_line_store();
    let key = store
        .put_with_key(1, json!({"name": "John"}))
        .await
        .unwrap();
    assert_eq!(key, Key::from(1));
    assert_eq!(store.get(1).await.unwrap().unwrap()["name"], "John");

    store
        .put_with_key(1, json!({"name": "James"}))
        .await
        .unwrap();
    assert_eq!(store.get(1).await.unwrap().unwrap()["name"], "James");

    store.remove(1).await.unwrap();
    assert!(store.get(1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_out_of_line_requires_key() {
    let store = out_of_line_store();
    let err = store.put(json!({"name": "John"})).await.unwrap_err();
    assert!(matches!(err, Error::MissingKey { .. }));
}

#[tokio::test]
async fn test_out_of_line_with_generator() {
    let store = ObjectStore::builder("generated")
        .out_of_line_keys()
        .open(MemoryEngine::new())
        .unwrap();
    let first = store.put(json!({"name": "a"})).await.unwrap();
    let second = store.put(json!({"name": "b"})).await.unwrap();
    assert_eq!(first, Key::from(1));
    assert_eq!(second, Key::from(2));
    // The record is stored as given; nothing is injected.
    assert_eq!(store.get(1).await.unwrap().unwrap(), json!({"name": "a"}));
}

#[tokio::test]
async fn test_explicit_key_on_inline_store_conflicts() {
    let store = simple_store();
    let err = store
        .put_with_key(1, json!({"id": 1}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Schema(SchemaError::InlineKeyConflict(ref path)) if path == "id"
    ));
}

#[tokio::test]
async fn test_composite_keys() {
    let store = out_of_line_store();
    let key = Key::from(vec![Key::from("users"), Key::from(7)]);
    store
        .put_with_key(key.clone(), json!({"name": "Seven"}))
        .await
        .unwrap();
    assert_eq!(store.get(key).await.unwrap().unwrap()["name"], "Seven");
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_put_batch_and_get_batch() {
    let store = simple_store();
    seed_three(&store).await;

    let batch = store
        .get_batch(vec![1, 2, 3], ArrayType::Sparse)
        .await
        .unwrap();
    assert_eq!(batch.get(0).unwrap()["name"], "John");
    assert_eq!(batch.get(1).unwrap()["name"], "Joe");
    assert_eq!(batch.get(2).unwrap()["name"], "James");
}

#[tokio::test]
async fn test_remove_batch() {
    let store = simple_store();
    seed_three(&store).await;
    store.remove_batch(vec![1, 2, 99]).await.unwrap();

    let all = store.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["name"], "James");
}

#[tokio::test]
async fn test_get_batch_sparse() {
    let store = simple_store();
    seed_three(&store).await;

    let data = store
        .get_batch(vec![1, 10, 3], ArrayType::Sparse)
        .await
        .unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data.get(0).unwrap()["name"], "John");
    assert!(data.get(1).is_none());
    assert_eq!(data.get(2).unwrap()["name"], "James");
    assert_eq!(data.iter().count(), 2);
}

#[tokio::test]
async fn test_get_batch_dense() {
    let store = simple_store();
    seed_three(&store).await;

    let data = store
        .get_batch(vec![1, 10, 3], ArrayType::Dense)
        .await
        .unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data.get(0).unwrap()["name"], "John");
    assert!(data.get(1).is_none());
    assert_eq!(data.get(2).unwrap()["name"], "James");
    assert_eq!(data.iter().count(), 3);
    assert_eq!(data.slots()[1], Slot::Absent);
}

#[tokio::test]
async fn test_get_batch_skip() {
    let store = simple_store();
    seed_three(&store).await;

    let data = store
        .get_batch(vec![1, 10, 3], ArrayType::Skip)
        .await
        .unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data.get(0).unwrap()["name"], "John");
    assert_eq!(data.get(1).unwrap()["name"], "James");
}

#[tokio::test]
async fn test_failed_put_batch_leaves_store_unchanged() {
    let store = ObjectStore::builder("strict")
        .auto_increment(false)
        .open(MemoryEngine::new())
        .unwrap();
    store.put(json!({"id": 0, "name": "existing"})).await.unwrap();

    let err = store
        .put_batch(vec![
            json!({"id": 1, "name": "John"}),
            json!({"name": "no key"}),
            json!({"id": 3, "name": "James"}),
        ])
        .await
        .unwrap_err();

    match err {
        Error::BatchWriteFailed { position, source } => {
            assert_eq!(position, 1);
            assert!(matches!(*source, Error::MissingKey { .. }));
        }
        other => panic!("expected BatchWriteFailed, got {other:?}"),
    }
    let all = store.get_all().await.unwrap();
    assert_eq!(all, vec![json!({"id": 0, "name": "existing"})]);
}

#[tokio::test]
async fn test_failed_batch_rolls_back_generator() {
    let store = simple_store();
    let err = store
        .batch(vec![
            BatchOp::put(json!({"name": "gets key 1"})),
            BatchOp::put(json!({"id": false})),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BatchWriteFailed { position: 1, .. }));

    let key = store.put(json!({"name": "first"})).await.unwrap();
    assert_eq!(key, Key::from(1));
}

#[tokio::test]
async fn test_mixed_batch_applies_in_order() {
    let store = simple_store();
    store
        .batch(vec![
            BatchOp::put(json!({"id": 1, "v": "old"})),
            BatchOp::remove(1),
            BatchOp::put(json!({"id": 1, "v": "new"})),
            BatchOp::put(json!({"id": 2})),
        ])
        .await
        .unwrap();
    assert_eq!(store.get(1).await.unwrap().unwrap()["v"], "new");
    assert_eq!(store.get_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_writers_serialize() {
    let store = simple_store();
    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.put(json!({"name": "w"})).await.unwrap()
        }));
    }
    let mut keys = Vec::new();
    for handle in handles {
        keys.push(handle.await.unwrap());
    }
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 16);
    assert_eq!(store.get_all().await.unwrap().len(), 16);
}

#[tokio::test]
async fn test_index_list() {
    let store = ObjectStore::builder("store-indexes")
        .index(IndexDefinition::new("basic", "name"))
        .index(IndexDefinition::new("deep", "address.email"))
        .index(IndexDefinition::new("date", "joined"))
        .index(IndexDefinition::new("compound", ["name", "age"]))
        .open(MemoryEngine::new())
        .unwrap();
    let names = store.index_names();
    assert_eq!(names.len(), 4);
    assert!(names.contains(&"deep".to_string()));
    assert!(store.has_index("compound"));

    let key = store
        .put(json!({
            "id": 1,
            "name": "John",
            "lastname": "Doe",
            "age": 42,
            "joined": {"$date": 807926400000_i64},
            "address": {"email": "j.doe@example.com", "city": "New Boston"}
        }))
        .await
        .unwrap();
    assert_eq!(key, Key::from(1));
}
