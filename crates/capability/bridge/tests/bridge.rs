use domain::{MappingSchema, RegisterBank, RegisterValue, UnitId};
use regdoc_bridge::{BridgeError, BridgeOptions, RegisterAccess, RegisterBridge};
use regdoc_storage::{CollectionRef, DocumentStore, InMemoryDocumentStore, prepare};
use serde_json::{Value, json};
use std::sync::Arc;

async fn bridge_with(retry_on_conflict: u32) -> (Arc<InMemoryDocumentStore>, RegisterBridge<InMemoryDocumentStore>) {
    let store = Arc::new(InMemoryDocumentStore::new());
    let options = BridgeOptions {
        retry_on_conflict,
        ..BridgeOptions::default()
    };
    prepare(store.as_ref(), &options.location, &MappingSchema::default())
        .await
        .expect("prepare");
    let bridge = RegisterBridge::new(Arc::clone(&store), options);
    (store, bridge)
}

fn location() -> CollectionRef {
    CollectionRef::new("modbus", "devices")
}

#[tokio::test]
async fn reads_default_when_no_document() {
    let (store, bridge) = bridge_with(10).await;
    let unit = UnitId(3);

    assert_eq!(
        bridge.read(unit, RegisterBank::Input, 0).await.expect("input"),
        RegisterValue::Int(0)
    );
    assert_eq!(
        bridge.read(unit, RegisterBank::Holding, 65535).await.expect("holding"),
        RegisterValue::Int(0)
    );
    assert_eq!(
        bridge.read(unit, RegisterBank::Coil, 12).await.expect("coil"),
        RegisterValue::Bool(false)
    );
    // 读取不会创建文档
    assert_eq!(store.document_count(&location()), 0);
}

#[tokio::test]
async fn first_write_creates_document_then_reads_back() {
    let (store, bridge) = bridge_with(10).await;
    let unit = UnitId(7);

    assert_eq!(
        bridge.read(unit, RegisterBank::Holding, 10).await.expect("read"),
        RegisterValue::Int(0)
    );
    bridge
        .write(unit, RegisterBank::Holding, 10, RegisterValue::Int(42))
        .await
        .expect("write");
    assert_eq!(
        bridge.read(unit, RegisterBank::Holding, 10).await.expect("read"),
        RegisterValue::Int(42)
    );

    assert_eq!(store.document_count(&location()), 1);
    let doc = store
        .get_document(&location(), "7")
        .await
        .expect("get")
        .expect("document");
    assert_eq!(Value::Object(doc), json!({ "holding": { "10": 42 } }));

    assert_eq!(
        bridge.read(unit, RegisterBank::Input, 10).await.expect("read"),
        RegisterValue::Int(0)
    );
    assert_eq!(
        bridge.read(unit, RegisterBank::Coil, 10).await.expect("read"),
        RegisterValue::Bool(false)
    );
}

#[tokio::test]
async fn later_writes_update_existing_document() {
    let (store, bridge) = bridge_with(10).await;
    let unit = UnitId(1);

    bridge.set_coil(unit, 0, true).await.expect("coil");
    bridge.set_holding_register(unit, 5, 500).await.expect("holding");
    bridge.set_holding_register(unit, 5, 501).await.expect("holding");

    assert_eq!(store.document_count(&location()), 1);
    assert_eq!(
        bridge.get_coil(unit, 0).await.expect("coil"),
        RegisterValue::Bool(true)
    );
    assert_eq!(
        bridge.get_holding_register(unit, 5).await.expect("holding"),
        RegisterValue::Int(501)
    );
}

#[tokio::test]
async fn range_operations_use_one_document() {
    let (_store, bridge) = bridge_with(10).await;
    let unit = UnitId(2);

    bridge
        .set_holding_registers(unit, 100, &[1, 2, 3])
        .await
        .expect("write range");
    let values = bridge
        .get_registers(unit, RegisterBank::Holding, 99, 5)
        .await
        .expect("read range");
    assert_eq!(
        values,
        vec![
            RegisterValue::Int(0),
            RegisterValue::Int(1),
            RegisterValue::Int(2),
            RegisterValue::Int(3),
            RegisterValue::Int(0),
        ]
    );

    bridge
        .set_coils(unit, 0, &[true, false, true])
        .await
        .expect("coils");
    let coils = bridge
        .get_registers(unit, RegisterBank::Coil, 0, 3)
        .await
        .expect("read coils");
    assert_eq!(
        coils,
        vec![
            RegisterValue::Bool(true),
            RegisterValue::Bool(false),
            RegisterValue::Bool(true),
        ]
    );
}

#[tokio::test]
async fn concurrent_first_writes_keep_every_address() {
    let writers: u16 = 12;
    let (store, bridge) = bridge_with(u32::from(writers)).await;
    let bridge = Arc::new(bridge);
    let unit = UnitId(9);

    let mut handles = Vec::new();
    for addr in 0..writers {
        let bridge = Arc::clone(&bridge);
        handles.push(tokio::spawn(async move {
            bridge
                .write(unit, RegisterBank::Holding, addr, RegisterValue::Int(i64::from(addr) * 10))
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("write");
    }

    assert_eq!(store.document_count(&location()), 1);
    let values = bridge
        .read_range(unit, RegisterBank::Holding, 0, writers)
        .await
        .expect("read");
    for (addr, value) in values.into_iter().enumerate() {
        assert_eq!(value, RegisterValue::Int(addr as i64 * 10));
    }
}

#[tokio::test]
async fn exhausted_conflict_budget_fails_write() {
    let (store, bridge) = bridge_with(2).await;
    let unit = UnitId(4);
    bridge
        .write(unit, RegisterBank::Holding, 0, RegisterValue::Int(1))
        .await
        .expect("create");

    store.force_conflicts(3);
    let err = bridge
        .write(unit, RegisterBank::Holding, 0, RegisterValue::Int(2))
        .await
        .expect_err("conflict");
    assert!(matches!(err, BridgeError::ConflictExhausted { attempts: 3, .. }));
    assert!(err.is_transient());
    assert_eq!(
        bridge.read(unit, RegisterBank::Holding, 0).await.expect("read"),
        RegisterValue::Int(1)
    );
}

#[tokio::test]
async fn identity_is_sparse_and_keyed_by_object_codes() {
    let (store, bridge) = bridge_with(10).await;
    let unit = UnitId(11);

    let empty = bridge.read_device_identity(unit).await.expect("identity");
    assert_eq!(empty.codes().collect::<Vec<_>>(), vec![0x00, 0x01, 0x02, 0x05, 0x97, 0xAB]);
    assert_eq!(empty.present().count(), 0);

    let body = json!({ "vendor": "ACME", "majorMinorRevision": "1.4", "extended1": "line-3" });
    store
        .create_document(&location(), "11", body.as_object().expect("object"))
        .await
        .expect("create");

    let identity = bridge
        .read_device_identification(unit)
        .await
        .expect("identity");
    assert_eq!(identity.get(0x00), Some("ACME"));
    assert_eq!(identity.get(0x02), Some("1.4"));
    assert_eq!(identity.get(0x97), Some("line-3"));
    assert_eq!(identity.get(0x01), None);
    assert_eq!(identity.get(0x05), None);
    assert_eq!(identity.get(0xAB), None);
}

#[tokio::test]
async fn mistyped_fields_do_not_break_other_reads() {
    let (store, bridge) = bridge_with(10).await;
    let body = json!({
        "holding": { "10": 42, "11": 1.5 },
        "productCode": 1234,
        "vendor": "ACME"
    });
    store
        .create_document(&location(), "5", body.as_object().expect("object"))
        .await
        .expect("create");
    let unit = UnitId(5);

    assert_eq!(
        bridge.read(unit, RegisterBank::Holding, 10).await.expect("read"),
        RegisterValue::Int(42)
    );
    assert_eq!(
        bridge.read(unit, RegisterBank::Input, 0).await.expect("read"),
        RegisterValue::Int(0)
    );

    let identity = bridge.read_device_identity(unit).await.expect("identity");
    assert_eq!(identity.get(0x00), Some("ACME"));
    assert_eq!(identity.get(0x01), None);
}

#[tokio::test]
async fn unreadable_register_is_not_defaulted() {
    let (store, bridge) = bridge_with(10).await;
    let body = json!({ "holding": { "3": "not-a-number" } });
    store
        .create_document(&location(), "6", body.as_object().expect("object"))
        .await
        .expect("create");

    let err = bridge
        .read(UnitId(6), RegisterBank::Holding, 3)
        .await
        .expect_err("unreadable");
    assert!(matches!(err, BridgeError::UnreadableRegister { .. }));
}

#[tokio::test]
async fn empty_write_does_not_create_document() {
    let (store, bridge) = bridge_with(10).await;
    bridge
        .write_range(UnitId(8), RegisterBank::Holding, 0, &[])
        .await
        .expect("empty write");
    assert_eq!(store.document_count(&location()), 0);
}

#[tokio::test]
async fn address_range_overflow_is_rejected() {
    let (_store, bridge) = bridge_with(10).await;
    let err = bridge
        .read_range(UnitId(1), RegisterBank::Holding, 65535, 2)
        .await
        .expect_err("overflow");
    assert!(matches!(err, BridgeError::AddressRange { .. }));
}
