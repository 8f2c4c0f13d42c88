use domain::MappingSchema;
use regdoc_storage::{
    CollectionRef, CreateOutcome, Document, DocumentStore, InMemoryDocumentStore, StorageError,
    UpdateOutcome, prepare,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn body(value: Value) -> Document {
    value.as_object().cloned().expect("object")
}

async fn provisioned() -> (InMemoryDocumentStore, CollectionRef) {
    let store = InMemoryDocumentStore::new();
    let location = CollectionRef::new("modbus", "devices");
    prepare(&store, &location, &MappingSchema::default())
        .await
        .expect("prepare");
    (store, location)
}

#[tokio::test]
async fn get_missing_document_returns_none() {
    let (store, location) = provisioned().await;
    let doc = store.get_document(&location, "7").await.expect("get");
    assert!(doc.is_none());
}

#[tokio::test]
async fn update_missing_document_reports_not_found() {
    let (store, location) = provisioned().await;
    let outcome = store
        .update_document(&location, "7", &body(json!({ "holding": { "10": 42 } })), 10)
        .await
        .expect("update");
    assert_eq!(outcome, UpdateOutcome::NotFound);
    assert_eq!(store.document_count(&location), 0);
}

#[tokio::test]
async fn create_then_update_merges_fields() {
    let (store, location) = provisioned().await;
    let created = store
        .create_document(&location, "7", &body(json!({ "holding": { "10": 42 } })))
        .await
        .expect("create");
    assert_eq!(created, CreateOutcome::Created);

    let outcome = store
        .update_document(&location, "7", &body(json!({ "holding": { "11": 43 } })), 10)
        .await
        .expect("update");
    assert_eq!(outcome, UpdateOutcome::Updated { attempts: 1 });

    let doc = store
        .get_document(&location, "7")
        .await
        .expect("get")
        .expect("document");
    assert_eq!(Value::Object(doc), json!({ "holding": { "10": 42, "11": 43 } }));
}

#[tokio::test]
async fn second_create_reports_already_exists() {
    let (store, location) = provisioned().await;
    let first = store
        .create_document(&location, "3", &body(json!({ "coil": { "0": true } })))
        .await
        .expect("create");
    let second = store
        .create_document(&location, "3", &body(json!({ "coil": { "1": true } })))
        .await
        .expect("create");
    assert_eq!(first, CreateOutcome::Created);
    assert_eq!(second, CreateOutcome::AlreadyExists);
    assert_eq!(store.document_count(&location), 1);
}

#[tokio::test]
async fn conflicts_consume_retry_budget() {
    let (store, location) = provisioned().await;
    store
        .create_document(&location, "1", &body(json!({ "holding": { "0": 1 } })))
        .await
        .expect("create");

    store.force_conflicts(2);
    let outcome = store
        .update_document(&location, "1", &body(json!({ "holding": { "0": 2 } })), 5)
        .await
        .expect("update");
    assert_eq!(outcome, UpdateOutcome::Updated { attempts: 3 });

    store.force_conflicts(10);
    let outcome = store
        .update_document(&location, "1", &body(json!({ "holding": { "0": 3 } })), 3)
        .await
        .expect("update");
    assert_eq!(outcome, UpdateOutcome::Conflict { attempts: 4 });

    let doc = store
        .get_document(&location, "1")
        .await
        .expect("get")
        .expect("document");
    assert_eq!(doc["holding"]["0"], json!(2));
}

#[tokio::test]
async fn concurrent_updates_keep_every_address() {
    let (store, location) = provisioned().await;
    let store = Arc::new(store);
    store
        .create_document(&location, "9", &body(json!({ "holding": {} })))
        .await
        .expect("create");

    let writers = 16u32;
    let mut handles = Vec::new();
    for addr in 0..writers {
        let store = Arc::clone(&store);
        let location = location.clone();
        handles.push(tokio::spawn(async move {
            let patch = body(json!({ "holding": { addr.to_string(): addr } }));
            store
                .update_document(&location, "9", &patch, writers)
                .await
                .expect("update")
        }));
    }
    for handle in handles {
        let outcome = handle.await.expect("join");
        assert!(matches!(outcome, UpdateOutcome::Updated { .. }));
    }

    let doc = store
        .get_document(&location, "9")
        .await
        .expect("get")
        .expect("document");
    let holding = doc["holding"].as_object().expect("holding");
    assert_eq!(holding.len(), writers as usize);
}

#[tokio::test]
async fn strict_mapping_rejects_undeclared_fields() {
    let (store, location) = provisioned().await;
    let err = store
        .create_document(&location, "5", &body(json!({ "firmware": "1.0" })))
        .await
        .expect_err("strict mapping");
    assert!(matches!(err, StorageError::MappingViolation { .. }));
}

#[tokio::test]
async fn unprovisioned_collection_is_a_backend_error() {
    let store = InMemoryDocumentStore::new();
    let location = CollectionRef::new("modbus", "devices");
    let err = store
        .get_document(&location, "1")
        .await
        .expect_err("no collection");
    assert!(matches!(err, StorageError::Backend(_)));
}
