//! Entity store integration tests against the scripted transport.

use std::sync::Arc;
use std::time::Duration;

use clinic_sync_core::models::{Entity, EntityId, EntityKind, Patient};
use clinic_sync_core::store::{EntityStore, OperationFailure};
use clinic_sync_core::transport::fake::{FakeTransport, Reply};
use clinic_sync_core::transport::{Method, TransportError};
use serde_json::{json, Value};

fn setup(kind: EntityKind) -> (Arc<FakeTransport>, EntityStore) {
    let fake = Arc::new(FakeTransport::new());
    let store = EntityStore::new(kind, fake.clone());
    (fake, store)
}

fn entity(value: Value) -> Entity {
    Entity::from_value(value).unwrap()
}

fn names(store: &EntityStore) -> Vec<String> {
    store
        .items()
        .iter()
        .map(|e| e.get_str("namaLengkap").unwrap_or("<missing>").to_string())
        .collect()
}

#[tokio::test]
async fn test_fetch_all_sets_items() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(Method::Get, "/patients", json!([{ "id": 1, "name": "John Doe" }]));

    store.fetch_all().await;

    let items = store.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].get_str("name"), Some("John Doe"));
    assert_eq!(store.error(), None);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_fetch_all_reconciles_names() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(
        Method::Get,
        "/patients",
        json!([
            { "id": 1, "nama": "Budi", "namaLengkap": "Budi Santoso" },
            { "id": 2, "nama": "Siti" },
            { "id": 3, "keluhan": "Demam" }
        ]),
    );

    store.fetch_all().await;

    assert_eq!(names(&store), vec!["Budi Santoso", "Siti", ""]);
    assert!(store.items().iter().all(|e| !e.contains_key("nama")));
}

#[tokio::test]
async fn test_fetch_all_sets_error_on_failure() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.reject(Method::Get, "/patients", "Error fetching");

    store.fetch_all().await;

    assert_eq!(store.error().as_deref(), Some("Error fetching"));
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_fetch_all_default_message_per_kind() {
    let (fake, store) = setup(EntityKind::DOCTOR);
    fake.push(
        Method::Get,
        "/doctors",
        Reply::err(TransportError::Network("connection refused".into())),
    );

    store.fetch_all().await;

    assert_eq!(store.error().as_deref(), Some("Failed to fetch doctors"));
}

#[tokio::test]
async fn test_fetch_all_replaces_previous_items() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(Method::Get, "/patients", json!([{ "id": 1, "nama": "A" }, { "id": 2, "nama": "B" }]))
        .ok(Method::Get, "/patients", json!([{ "id": 3, "nama": "C" }]));

    store.fetch_all().await;
    store.fetch_all().await;

    assert_eq!(names(&store), vec!["C"]);
}

#[tokio::test]
async fn test_fetch_all_twice_is_idempotent() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(Method::Get, "/patients", json!([{ "id": 1, "nama": "A" }, { "id": 2, "nama": "B" }]));

    store.fetch_all().await;
    let once = store.snapshot();
    store.fetch_all().await;

    assert_eq!(store.snapshot(), once);
}

#[tokio::test]
async fn test_error_cleared_when_next_operation_starts() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.reject(Method::Get, "/patients", "Server down");
    fake.ok(Method::Get, "/patients/1", json!({ "id": 1, "nama": "A" }));

    store.fetch_all().await;
    assert!(store.error().is_some());

    store.fetch_one(&EntityId::from(1u64)).await;
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn test_fetch_one_sets_current() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(Method::Get, "/patients/5", json!({ "id": 5, "nama": "Rudi", "alamat": "Bandung" }));

    let fetched = store.fetch_one(&EntityId::from(5u64)).await.unwrap();

    assert_eq!(fetched.get_str("namaLengkap"), Some("Rudi"));
    assert_eq!(store.current(), Some(fetched));
}

#[tokio::test]
async fn test_fetch_one_failure_keeps_current() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(Method::Get, "/patients/5", json!({ "id": 5, "nama": "Rudi" }));
    store.fetch_one(&EntityId::from(5u64)).await;

    let missing = store.fetch_one(&EntityId::from(6u64)).await;

    assert!(missing.is_none());
    assert_eq!(store.error().as_deref(), Some("Failed to fetch patient"));
    assert_eq!(
        store.current().and_then(|e| e.id()),
        Some(EntityId::from(5u64))
    );
}

#[tokio::test]
async fn test_create_appends_and_sends_wire_shape() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(Method::Get, "/patients", json!([{ "id": 1, "nama": "Z" }]));
    fake.ok(
        Method::Post,
        "/patients",
        json!({ "id": 2, "nama": "Jane Doe", "noHp": "0812" }),
    );
    store.fetch_all().await;

    let mut form = Patient::new("Jane Doe");
    form.no_hp = Some("0812".into());
    let created = store.create(form.to_entity().unwrap()).await.unwrap();

    assert_eq!(created.get_str("namaLengkap"), Some("Jane Doe"));
    assert_eq!(store.count(), 2);
    assert_eq!(names(&store), vec!["Z", "Jane Doe"]);

    let sent = fake.calls().last().cloned().unwrap();
    assert_eq!(sent.body, Some(json!({ "nama": "Jane Doe", "noHp": "0812" })));
}

#[tokio::test]
async fn test_create_failure_returns_message() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.reject(Method::Post, "/patients", "Create failed");

    let result = store.create(entity(json!({ "name": "Fail" }))).await;

    assert_eq!(result, Err(OperationFailure::new("Create failed")));
    assert_eq!(store.count(), 0);
    assert_eq!(store.error().as_deref(), Some("Create failed"));
}

#[tokio::test]
async fn test_update_replaces_in_place() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(
        Method::Get,
        "/patients",
        json!([{ "id": 1, "nama": "A" }, { "id": 2, "nama": "B" }, { "id": 3, "nama": "C" }]),
    );
    fake.ok(Method::Put, "/patients/2", json!({ "id": 2, "nama": "B2" }));
    store.fetch_all().await;

    let result = store
        .update(&EntityId::from(2u64), entity(json!({ "namaLengkap": "B2" })))
        .await;

    assert!(result.is_ok());
    assert_eq!(names(&store), vec!["A", "B2", "C"]);
}

#[tokio::test]
async fn test_update_unknown_id_is_noop() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(Method::Get, "/patients", json!([{ "id": 1, "nama": "A" }]));
    fake.ok(Method::Put, "/patients/99", json!({ "id": 99, "nama": "Ghost" }));
    store.fetch_all().await;

    let result = store
        .update(&EntityId::from(99u64), entity(json!({ "namaLengkap": "Ghost" })))
        .await;

    assert!(result.is_ok());
    assert_eq!(names(&store), vec!["A"]);
}

#[tokio::test]
async fn test_update_failure_default_message() {
    let (fake, store) = setup(EntityKind::APPOINTMENT);
    fake.push(
        Method::Put,
        "/appointments/4",
        Reply::err(TransportError::Rejected { status: 500, message: None }),
    );

    let result = store.update(&EntityId::from(4u64), Entity::new()).await;

    assert_eq!(result.unwrap_err().message, "Failed to update appointment");
}

#[tokio::test]
async fn test_delete_removes_every_copy() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(
        Method::Get,
        "/patients",
        json!([{ "id": 1, "nama": "A" }, { "id": "2", "nama": "B" }, { "id": 2, "nama": "B'" }]),
    );
    fake.ok(Method::Delete, "/patients/2", Value::Null);
    store.fetch_all().await;

    store.delete(&EntityId::from(2u64)).await.unwrap();

    assert_eq!(names(&store), vec!["A"]);
    assert!(store.find(&EntityId::from(2u64)).is_none());
}

#[tokio::test]
async fn test_delete_failure_keeps_items() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(Method::Get, "/patients", json!([{ "id": 1, "nama": "A" }]));
    fake.reject(Method::Delete, "/patients/1", "Patient has appointments");
    store.fetch_all().await;

    let result = store.delete(&EntityId::from(1u64)).await;

    assert_eq!(result.unwrap_err().message, "Patient has appointments");
    assert_eq!(store.count(), 1);
}

#[tokio::test]
async fn test_overlapping_calls_run_in_call_order() {
    let fake = Arc::new(FakeTransport::new());
    fake.push(
        Method::Get,
        "/patients",
        Reply::ok(json!([{ "id": 1, "nama": "stale" }])).after(Duration::from_millis(60)),
    )
    .ok(Method::Get, "/patients", json!([{ "id": 2, "nama": "fresh" }]));
    let store = Arc::new(EntityStore::new(EntityKind::PATIENT, fake.clone()));

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.fetch_all().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = tokio::spawn({
        let store = store.clone();
        async move { store.fetch_all().await }
    });

    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(names(&store), vec!["fresh"]);
    assert!(!store.is_loading());
    assert_eq!(fake.call_count(), 2);
}

#[tokio::test]
async fn test_timeout_uses_failure_path() {
    let fake = Arc::new(FakeTransport::new());
    fake.push(Method::Get, "/medical-records", Reply::hang());
    let store = EntityStore::new(EntityKind::MEDICAL_RECORD, fake)
        .with_timeout(Some(Duration::from_millis(30)));

    store.fetch_all().await;

    assert_eq!(store.error().as_deref(), Some("Failed to fetch medical records"));
    assert!(!store.is_loading());
}

#[tokio::test]
async fn test_subscribers_see_final_state() {
    let (fake, store) = setup(EntityKind::PATIENT);
    fake.ok(Method::Get, "/patients", json!([{ "id": 1, "nama": "A" }]));
    let mut rx = store.subscribe();

    store.fetch_all().await;

    assert!(rx.has_changed().unwrap());
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.items.len(), 1);
    assert!(!state.loading);
}
