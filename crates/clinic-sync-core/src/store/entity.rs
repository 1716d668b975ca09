//! Entity store: one reactive collection per entity kind.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use strsim::jaro_winkler;
use tokio::sync::{watch, Mutex};

use super::lifecycle::InFlight;
use super::{OperationFailure, Outcome};
use crate::models::{Entity, EntityId, EntityKind};
use crate::transport::{failure_message, send_bounded, Method, Transport, TransportError, TransportResult};

/// Minimum fuzzy score for a name to count as a search hit.
const MIN_SEARCH_SCORE: f64 = 0.85;

/// Observable state of an entity store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityState {
    /// Client-shape entities: fetch order, then creation order.
    pub items: Vec<Entity>,
    /// Last entity loaded by `fetch_one`.
    pub current: Option<Entity>,
    /// True while an operation is running.
    pub loading: bool,
    /// Message of the last failed operation; cleared when the next one starts.
    pub error: Option<String>,
}

/// CRUD store for one [`EntityKind`].
///
/// Operations on the same store run one at a time in call order; a call
/// made while another is pending waits for it.
pub struct EntityStore {
    kind: EntityKind,
    transport: Arc<dyn Transport>,
    request_timeout: Option<Duration>,
    state: watch::Sender<EntityState>,
    gate: Mutex<()>,
}

impl EntityStore {
    pub fn new(kind: EntityKind, transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(EntityState::default());
        Self {
            kind,
            transport,
            request_timeout: None,
            state,
            gate: Mutex::new(()),
        }
    }

    /// Give up on requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<EntityState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> EntityState {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<Entity> {
        self.state.borrow().items.clone()
    }

    pub fn current(&self) -> Option<Entity> {
        self.state.borrow().current.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn count(&self) -> usize {
        self.state.borrow().items.len()
    }

    /// First held entity with this id.
    pub fn find(&self, id: &EntityId) -> Option<Entity> {
        self.state
            .borrow()
            .items
            .iter()
            .find(|e| e.id().as_ref() == Some(id))
            .cloned()
    }

    /// Search held entities by name.
    ///
    /// Substring matches rank first (in item order), then fuzzy matches by
    /// descending similarity. An empty query returns the first `limit` items.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Entity> {
        let state = self.state.borrow();
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return state.items.iter().take(limit).cloned().collect();
        }

        let mut scored: Vec<(f64, &Entity)> = state
            .items
            .iter()
            .filter_map(|entity| {
                let name = self.kind.display_name(entity).to_lowercase();
                let score = if name.contains(&query) {
                    1.0
                } else {
                    jaro_winkler(&query, &name)
                };
                (score >= MIN_SEARCH_SCORE).then_some((score, entity))
            })
            .collect();

        // Stable sort keeps item order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, entity)| entity.clone())
            .collect()
    }

    /// Replace `items` with the server's collection.
    pub async fn fetch_all(&self) {
        let op = InFlight::begin(&self.gate, &self.state).await;
        tracing::debug!("Fetching {}", self.kind.plural);

        let result = self
            .send(Method::Get, self.kind.collection_path, None)
            .await
            .and_then(|body| self.decode_list(body));

        match result {
            Ok(items) => {
                tracing::info!("Loaded {} {}", items.len(), self.kind.plural);
                op.succeed(|s| s.items = items);
            }
            Err(e) => {
                let message = failure_message(&e, &self.kind.fetch_all_failed());
                tracing::warn!("Fetching {} failed: {}", self.kind.plural, e);
                op.fail(&message);
            }
        }
    }

    /// Load one entity into `current`. Returns `None` on failure, leaving
    /// `current` untouched.
    pub async fn fetch_one(&self, id: &EntityId) -> Option<Entity> {
        let op = InFlight::begin(&self.gate, &self.state).await;
        let path = self.kind.item_path(id);

        let result = self
            .send(Method::Get, &path, None)
            .await
            .and_then(|body| self.decode_one(body));

        match result {
            Ok(entity) => {
                let current = entity.clone();
                op.succeed(|s| s.current = Some(current));
                Some(entity)
            }
            Err(e) => {
                let message = failure_message(&e, &self.kind.fetch_one_failed());
                tracing::warn!("Fetching {} {} failed: {}", self.kind.singular, id, e);
                op.fail(&message);
                None
            }
        }
    }

    /// Create an entity and append the server's copy to `items`.
    pub async fn create(&self, data: Entity) -> Outcome<Entity> {
        let op = InFlight::begin(&self.gate, &self.state).await;
        let payload = self.kind.to_wire(data).into_value();

        let result = self
            .send(Method::Post, self.kind.collection_path, Some(payload))
            .await
            .and_then(|body| self.decode_one(body));

        match result {
            Ok(entity) => {
                tracing::info!(
                    "Created {} {}",
                    self.kind.singular,
                    entity.id().map(|id| id.to_string()).unwrap_or_default()
                );
                let appended = entity.clone();
                op.succeed(|s| s.items.push(appended));
                Ok(entity)
            }
            Err(e) => Err(self.failed(op, &e, self.kind.create_failed())),
        }
    }

    /// Update an entity, replacing the held copy in place. An id that is not
    /// held leaves `items` unchanged.
    pub async fn update(&self, id: &EntityId, data: Entity) -> Outcome<Entity> {
        let op = InFlight::begin(&self.gate, &self.state).await;
        let path = self.kind.item_path(id);
        let payload = self.kind.to_wire(data).into_value();

        let result = self
            .send(Method::Put, &path, Some(payload))
            .await
            .and_then(|body| self.decode_one(body));

        match result {
            Ok(entity) => {
                let replacement = entity.clone();
                op.succeed(|s| {
                    match s.items.iter().position(|e| e.id().as_ref() == Some(id)) {
                        Some(index) => s.items[index] = replacement,
                        None => tracing::debug!("Updated {} {} is not held", self.kind.singular, id),
                    }
                });
                Ok(entity)
            }
            Err(e) => Err(self.failed(op, &e, self.kind.update_failed())),
        }
    }

    /// Delete an entity and drop every held copy of it.
    pub async fn delete(&self, id: &EntityId) -> Outcome<()> {
        let op = InFlight::begin(&self.gate, &self.state).await;
        let path = self.kind.item_path(id);

        match self.send(Method::Delete, &path, None).await {
            Ok(_) => {
                tracing::info!("Deleted {} {}", self.kind.singular, id);
                op.succeed(|s| s.items.retain(|e| e.id().as_ref() != Some(id)));
                Ok(())
            }
            Err(e) => Err(self.failed(op, &e, self.kind.delete_failed())),
        }
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> TransportResult<Value> {
        send_bounded(self.transport.as_ref(), self.request_timeout, method, path, body).await
    }

    fn failed(&self, op: InFlight<'_>, error: &TransportError, default: String) -> OperationFailure {
        let message = failure_message(error, &default);
        tracing::warn!("{} ({})", message, error);
        op.fail(&message);
        OperationFailure::new(message)
    }

    fn decode_one(&self, body: Value) -> TransportResult<Entity> {
        Entity::from_value(body)
            .map(|entity| self.kind.to_client(entity))
            .ok_or_else(|| {
                TransportError::Decode(format!("expected a {} object", self.kind.singular))
            })
    }

    fn decode_list(&self, body: Value) -> TransportResult<Vec<Entity>> {
        let Value::Array(values) = body else {
            return Err(TransportError::Decode(format!(
                "expected a list of {}",
                self.kind.plural
            )));
        };

        Ok(values
            .into_iter()
            .filter_map(|value| match Entity::from_value(value) {
                Some(entity) => Some(self.kind.to_client(entity)),
                None => {
                    tracing::warn!("Skipping non-object entry in {} list", self.kind.plural);
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::FakeTransport;
    use serde_json::json;

    fn store_with(fake: Arc<FakeTransport>) -> EntityStore {
        EntityStore::new(EntityKind::PATIENT, fake)
    }

    fn entity(value: Value) -> Entity {
        Entity::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_all_skips_non_objects() {
        let fake = Arc::new(FakeTransport::new());
        fake.ok(Method::Get, "/patients", json!([{ "id": 1, "nama": "A" }, 5, null]));
        let store = store_with(fake);

        store.fetch_all().await;

        assert_eq!(store.count(), 1);
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn test_fetch_all_non_array_is_failure() {
        let fake = Arc::new(FakeTransport::new());
        fake.ok(Method::Get, "/patients", json!({ "data": [] }));
        let store = store_with(fake);

        store.fetch_all().await;

        assert_eq!(store.error().as_deref(), Some("Failed to fetch patients"));
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_loading_observed_while_in_flight() {
        let fake = Arc::new(FakeTransport::new());
        fake.push(
            Method::Get,
            "/patients",
            crate::transport::fake::Reply::ok(json!([])).after(Duration::from_millis(50)),
        );
        let store = Arc::new(store_with(fake));
        let mut rx = store.subscribe();

        let task = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_all().await }
        });

        rx.wait_for(|s| s.loading).await.unwrap();
        task.await.unwrap();
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_abandoned_operation_clears_loading() {
        let fake = Arc::new(FakeTransport::new());
        fake.push(Method::Get, "/patients", crate::transport::fake::Reply::hang());
        let store = store_with(fake);

        let abandoned = tokio::time::timeout(Duration::from_millis(20), store.fetch_all()).await;
        assert!(abandoned.is_err());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_search() {
        let fake = Arc::new(FakeTransport::new());
        fake.ok(
            Method::Get,
            "/patients",
            json!([
                { "id": 1, "nama": "Budi Santoso" },
                { "id": 2, "nama": "Siti Aminah" },
                { "id": 3, "nama": "Budiman" }
            ]),
        );
        let store = store_with(fake);
        store.fetch_all().await;

        let hits = store.search("budi", 10);
        let ids: Vec<_> = hits.iter().filter_map(Entity::id).collect();
        assert_eq!(ids, vec![EntityId::from(1u64), EntityId::from(3u64)]);

        assert_eq!(store.search("", 2).len(), 2);
        assert!(store.search("zzzz", 10).is_empty());
    }

    #[tokio::test]
    async fn test_update_payload_uses_wire_shape() {
        let fake = Arc::new(FakeTransport::new());
        fake.ok(Method::Put, "/patients/1", json!({ "id": 1, "nama": "Baru" }));
        let store = store_with(fake.clone());

        let updated = store
            .update(&EntityId::from(1u64), entity(json!({ "namaLengkap": "Baru" })))
            .await
            .unwrap();

        assert_eq!(updated.get_str("namaLengkap"), Some("Baru"));
        assert_eq!(fake.calls()[0].body, Some(json!({ "nama": "Baru" })));
    }
}
