use async_trait::async_trait;
use domain::{MappingSchema, RegisterBank, RegisterValue, UnitId};
use regdoc_bridge::{
    BridgeError, BridgeOptions, PollOnlyLifecycle, ProtocolLifecycle, RegisterBridge,
};
use regdoc_storage::{
    CollectionRef, CreateOutcome, Document, DocumentStore, StorageError, UpdateOutcome,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// 所有文档操作都返回连接错误的存储。
#[derive(Default)]
struct UnreachableStore {
    creates: AtomicU32,
}

#[async_trait]
impl DocumentStore for UnreachableStore {
    async fn index_exists(&self, _index: &str) -> Result<bool, StorageError> {
        Err(StorageError::Connection("refused".to_string()))
    }

    async fn create_index(&self, _index: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("refused".to_string()))
    }

    async fn create_collection(&self, _location: &CollectionRef) -> Result<(), StorageError> {
        Err(StorageError::Connection("refused".to_string()))
    }

    async fn update_mapping(
        &self,
        _location: &CollectionRef,
        _mapping: &MappingSchema,
    ) -> Result<(), StorageError> {
        Err(StorageError::Connection("refused".to_string()))
    }

    async fn get_document(
        &self,
        _location: &CollectionRef,
        _id: &str,
    ) -> Result<Option<Document>, StorageError> {
        Err(StorageError::Connection("refused".to_string()))
    }

    async fn create_document(
        &self,
        _location: &CollectionRef,
        _id: &str,
        _body: &Document,
    ) -> Result<CreateOutcome, StorageError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Connection("refused".to_string()))
    }

    async fn update_document(
        &self,
        _location: &CollectionRef,
        _id: &str,
        _patch: &Document,
        _retry_on_conflict: u32,
    ) -> Result<UpdateOutcome, StorageError> {
        Err(StorageError::Connection("refused".to_string()))
    }
}

/// 文档读取永不返回的存储。
struct HangingStore;

#[async_trait]
impl DocumentStore for HangingStore {
    async fn index_exists(&self, _index: &str) -> Result<bool, StorageError> {
        Ok(true)
    }

    async fn create_index(&self, _index: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn create_collection(&self, _location: &CollectionRef) -> Result<(), StorageError> {
        Ok(())
    }

    async fn update_mapping(
        &self,
        _location: &CollectionRef,
        _mapping: &MappingSchema,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    async fn get_document(
        &self,
        _location: &CollectionRef,
        _id: &str,
    ) -> Result<Option<Document>, StorageError> {
        std::future::pending().await
    }

    async fn create_document(
        &self,
        _location: &CollectionRef,
        _id: &str,
        _body: &Document,
    ) -> Result<CreateOutcome, StorageError> {
        Ok(CreateOutcome::Created)
    }

    async fn update_document(
        &self,
        _location: &CollectionRef,
        _id: &str,
        _patch: &Document,
        _retry_on_conflict: u32,
    ) -> Result<UpdateOutcome, StorageError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn read_failure_is_not_converted_to_default() {
    let bridge = RegisterBridge::new(Arc::new(UnreachableStore::default()), BridgeOptions::default());
    let err = bridge
        .read(UnitId(1), RegisterBank::Holding, 0)
        .await
        .expect_err("connection error");
    assert!(matches!(err, BridgeError::Store(StorageError::Connection(_))));
}

#[tokio::test]
async fn write_failure_propagates_without_create_fallback() {
    let store = Arc::new(UnreachableStore::default());
    let bridge = RegisterBridge::new(Arc::clone(&store), BridgeOptions::default());
    let err = bridge
        .write(UnitId(1), RegisterBank::Holding, 0, RegisterValue::Int(5))
        .await
        .expect_err("connection error");
    assert!(matches!(err, BridgeError::Store(StorageError::Connection(_))));
    assert_eq!(store.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn hung_store_call_times_out() {
    let options = BridgeOptions {
        store_timeout: Some(Duration::from_millis(50)),
        ..BridgeOptions::default()
    };
    let bridge = RegisterBridge::new(Arc::new(HangingStore), options);

    let err = bridge
        .read(UnitId(1), RegisterBank::Input, 0)
        .await
        .expect_err("timeout");
    assert!(matches!(err, BridgeError::Timeout(50)));

    let err = bridge
        .write(UnitId(1), RegisterBank::Holding, 0, RegisterValue::Int(1))
        .await
        .expect_err("timeout");
    assert!(err.is_transient());
}

#[test]
fn unsupported_operations_fail_with_precondition() {
    let lifecycle = PollOnlyLifecycle;
    let channels = vec!["room".to_string()];
    let payload = json!({ "hello": "world" });

    assert!(matches!(
        lifecycle.disconnect("conn-1"),
        Err(BridgeError::Precondition(_))
    ));
    assert!(matches!(
        lifecycle.broadcast(&channels, &payload),
        Err(BridgeError::Precondition(_))
    ));
    assert!(matches!(
        lifecycle.notify(&channels, "conn-1", &payload),
        Err(BridgeError::Precondition(_))
    ));
    assert!(matches!(
        lifecycle.join_channel("room", "conn-1"),
        Err(BridgeError::Precondition(_))
    ));
    assert!(matches!(
        lifecycle.leave_channel("room", "conn-1"),
        Err(BridgeError::Precondition(_))
    ));
}
