use domain::{DynamicMode, MappingSchema};
use regdoc_storage::{
    CollectionRef, DocumentStore, InMemoryDocumentStore, ProvisionOutcome, prepare,
};

#[tokio::test]
async fn prepare_creates_index_collection_and_mapping() {
    let store = InMemoryDocumentStore::new();
    let location = CollectionRef::new("modbus", "devices");

    let outcome = prepare(&store, &location, &MappingSchema::default())
        .await
        .expect("prepare");
    assert_eq!(outcome, ProvisionOutcome::Created);
    assert!(store.index_exists("modbus").await.expect("exists"));
    assert_eq!(store.mapping(&location), Some(MappingSchema::default()));
}

#[tokio::test]
async fn prepare_is_idempotent_and_reapplies_mapping() {
    let store = InMemoryDocumentStore::new();
    let location = CollectionRef::new("modbus", "devices");
    prepare(&store, &location, &MappingSchema::default())
        .await
        .expect("first prepare");

    let relaxed = MappingSchema {
        dynamic: DynamicMode::Enabled,
        ..MappingSchema::default()
    };
    let outcome = prepare(&store, &location, &relaxed)
        .await
        .expect("second prepare");
    assert_eq!(outcome, ProvisionOutcome::AlreadyPresent);
    assert_eq!(store.mapping(&location), Some(relaxed));
}

#[tokio::test]
async fn prepare_fails_when_index_exists_without_collection() {
    let store = InMemoryDocumentStore::new();
    store.create_index("modbus").await.expect("index");
    let location = CollectionRef::new("modbus", "devices");

    let result = prepare(&store, &location, &MappingSchema::default()).await;
    assert!(result.is_err());
}
