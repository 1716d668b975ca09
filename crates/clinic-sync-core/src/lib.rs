//! Clinic Sync Core Library
//!
//! Client-side synchronization layer for clinic records (patients, doctors,
//! appointments, medical records) kept in step with a REST backend.
//!
//! # Architecture
//!
//! ```text
//!                    UI (lists, forms, reports)
//!                               │
//!            ┌──────────────────┼──────────────────┐
//!            │                  │                  │
//!            ▼                  ▼                  ▼
//!     NavigationGuard      SessionStore      EntityStore × kind
//!     (before each         (login/logout,    (fetch/create/update/
//!      transition)          init_auth)        delete, loading/error)
//!            │                  │                  │
//!            └──── reads ───────┤                  │
//!                               ▼                  │
//!                      KeyValueStore               │
//!                      (token, user)               │
//!                               │                  │
//!                               └──── Transport ◄──┘
//!                                  (HTTP / fake)
//! ```
//!
//! # Core Principle
//!
//! **Failures become data.** Store operations never return a transport
//! error; they record a message in the store's `error` field or return an
//! [`OperationFailure`].
//!
//! # Modules
//!
//! - [`db`]: Durable key-value storage (SQLite) for the session
//! - [`models`]: Entities, entity kinds and field reconciliation, session types
//! - [`transport`]: Transport trait, HTTP client, scripted fake
//! - [`store`]: Entity and session stores
//! - [`routes`] / [`guard`]: Route table and navigation guard
//! - [`config`] / [`logging`]: Client settings and tracing setup

pub mod config;
pub mod db;
pub mod guard;
pub mod logging;
pub mod models;
pub mod routes;
pub mod store;
pub mod transport;

// Re-export commonly used types
pub use config::ClientConfig;
pub use db::{Database, KeyValueStore, MemoryStore, PersistentStore};
pub use guard::{Navigation, NavigationGuard};
pub use models::{Credentials, Entity, EntityId, EntityKind, Patient, SessionState, User};
pub use store::{EntityState, EntityStore, OperationFailure, Outcome, SessionStore};
pub use transport::{Transport, TransportError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

use transport::http::HttpTransport;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicSyncError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Transport error: {0}")]
    TransportError(String),
}

impl From<db::DbError> for ClinicSyncError {
    fn from(e: db::DbError) -> Self {
        ClinicSyncError::StorageError(e.to_string())
    }
}

impl From<config::ConfigError> for ClinicSyncError {
    fn from(e: config::ConfigError) -> Self {
        ClinicSyncError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for ClinicSyncError {
    fn from(e: serde_json::Error) -> Self {
        ClinicSyncError::SerializationError(e.to_string())
    }
}

impl From<transport::TransportError> for ClinicSyncError {
    fn from(e: transport::TransportError) -> Self {
        ClinicSyncError::TransportError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Build a client from JSON configuration (environment overrides apply),
/// restoring any persisted session.
///
/// `storage_path` is required: the session must outlive the process.
#[uniffi::export]
pub fn open_client(config_json: String) -> Result<Arc<ClinicClient>, ClinicSyncError> {
    let config = ClientConfig::from_json_with_env(&config_json)?;
    logging::init_logging(&config.logging);

    let path = config.storage_path.as_ref().ok_or_else(|| {
        ClinicSyncError::ConfigError("storage_path must be set".to_string())
    })?;
    let storage: Arc<dyn KeyValueStore> = Arc::new(PersistentStore::open(path)?);
    let transport = HttpTransport::new(config.base_url.clone())?
        .with_token_store(storage.clone(), config.storage_keys.token.clone());

    Ok(Arc::new(ClinicClient::new(config, Arc::new(transport), storage)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Session store, one entity store per kind, and the navigation guard.
#[derive(uniffi::Object)]
pub struct ClinicClient {
    session: Arc<SessionStore>,
    patients: EntityStore,
    doctors: EntityStore,
    appointments: EntityStore,
    medical_records: EntityStore,
    guard: NavigationGuard<Arc<SessionStore>>,
}

impl ClinicClient {
    /// Wire the stores together and run `init_auth`.
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let session = Arc::new(SessionStore::from_config(&config, transport.clone(), storage));
        session.init_auth();

        let timeout = config.request_timeout();
        let entity_store =
            |kind: EntityKind| EntityStore::new(kind, transport.clone()).with_timeout(timeout);

        Self {
            guard: NavigationGuard::new(session.clone()),
            session,
            patients: entity_store(EntityKind::PATIENT),
            doctors: entity_store(EntityKind::DOCTOR),
            appointments: entity_store(EntityKind::APPOINTMENT),
            medical_records: entity_store(EntityKind::MEDICAL_RECORD),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn guard(&self) -> &NavigationGuard<Arc<SessionStore>> {
        &self.guard
    }

    pub fn store(&self, kind: FfiEntityKind) -> &EntityStore {
        match kind {
            FfiEntityKind::Patient => &self.patients,
            FfiEntityKind::Doctor => &self.doctors,
            FfiEntityKind::Appointment => &self.appointments,
            FfiEntityKind::MedicalRecord => &self.medical_records,
        }
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl ClinicClient {
    // =========================================================================
    // Session Operations
    // =========================================================================

    /// Log in; the local administrator never reaches the network.
    pub async fn login(&self, username: String, password: String) -> FfiOutcome {
        let credentials = Credentials::new(username, password);
        FfiOutcome::from_outcome(self.session.login(&credentials).await.map(|()| None))
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn current_user(&self) -> Option<FfiUser> {
        self.session.user().map(Into::into)
    }

    /// Guard a transition to `path`.
    pub fn navigate(&self, path: String) -> FfiNavigation {
        self.guard.navigate(&path).into()
    }

    // =========================================================================
    // Entity Operations
    // =========================================================================

    pub async fn fetch_all(&self, kind: FfiEntityKind) {
        self.store(kind).fetch_all().await;
    }

    /// Load one entity as JSON; `None` on failure (see `state().error`).
    pub async fn fetch_one(
        &self,
        kind: FfiEntityKind,
        id: String,
    ) -> Result<Option<String>, ClinicSyncError> {
        let entity = self.store(kind).fetch_one(&EntityId::from(id)).await;
        entity.map(|e| serde_json::to_string(&e)).transpose().map_err(ClinicSyncError::from)
    }

    pub async fn create(
        &self,
        kind: FfiEntityKind,
        data_json: String,
    ) -> Result<FfiOutcome, ClinicSyncError> {
        let data = parse_entity(&data_json)?;
        let outcome = self.store(kind).create(data).await;
        Ok(FfiOutcome::from_outcome(outcome.map(Some)))
    }

    pub async fn update(
        &self,
        kind: FfiEntityKind,
        id: String,
        data_json: String,
    ) -> Result<FfiOutcome, ClinicSyncError> {
        let data = parse_entity(&data_json)?;
        let outcome = self.store(kind).update(&EntityId::from(id), data).await;
        Ok(FfiOutcome::from_outcome(outcome.map(Some)))
    }

    pub async fn delete(&self, kind: FfiEntityKind, id: String) -> FfiOutcome {
        let outcome = self.store(kind).delete(&EntityId::from(id)).await;
        FfiOutcome::from_outcome(outcome.map(|()| None))
    }

    /// Current state of a store, entities as JSON.
    pub fn state(&self, kind: FfiEntityKind) -> Result<FfiEntityState, ClinicSyncError> {
        let snapshot = self.store(kind).snapshot();
        Ok(FfiEntityState {
            items: snapshot
                .items
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<_, _>>()?,
            current: snapshot
                .current
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            loading: snapshot.loading,
            error: snapshot.error,
        })
    }

    /// Search held entities by name.
    pub fn search(
        &self,
        kind: FfiEntityKind,
        query: String,
        limit: u32,
    ) -> Result<Vec<String>, ClinicSyncError> {
        self.store(kind)
            .search(&query, limit as usize)
            .iter()
            .map(|e| serde_json::to_string(e).map_err(ClinicSyncError::from))
            .collect()
    }
}

fn parse_entity(json: &str) -> Result<Entity, ClinicSyncError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    Entity::from_value(value)
        .ok_or_else(|| ClinicSyncError::InvalidInput("entity must be a JSON object".into()))
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiEntityKind {
    Patient,
    Doctor,
    Appointment,
    MedicalRecord,
}

/// FFI-safe operation result.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiOutcome {
    pub success: bool,
    pub message: Option<String>,
    /// Resulting entity as JSON, for create/update.
    pub data: Option<String>,
}

impl FfiOutcome {
    fn from_outcome(outcome: Outcome<Option<Entity>>) -> Self {
        match outcome {
            Ok(entity) => Self {
                success: true,
                message: None,
                data: entity.and_then(|e| serde_json::to_string(&e).ok()),
            },
            Err(failure) => Self {
                success: false,
                message: Some(failure.message),
                data: None,
            },
        }
    }
}

/// FFI-safe user.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiUser {
    pub username: String,
    pub role: String,
}

impl From<User> for FfiUser {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            role: user.role,
        }
    }
}

/// FFI-safe entity store state.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiEntityState {
    pub items: Vec<String>,
    pub current: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

/// FFI-safe navigation decision.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum FfiNavigation {
    Allow,
    Redirect { path: String },
}

impl From<Navigation> for FfiNavigation {
    fn from(navigation: Navigation) -> Self {
        match navigation {
            Navigation::Allow => FfiNavigation::Allow,
            Navigation::Redirect(path) => FfiNavigation::Redirect {
                path: path.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use transport::fake::FakeTransport;
    use transport::Method;

    fn client(fake: Arc<FakeTransport>) -> ClinicClient {
        ClinicClient::new(ClientConfig::default(), fake, Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_login_and_navigate() {
        let client = client(Arc::new(FakeTransport::new()));
        assert_eq!(
            client.navigate("/patients".into()),
            FfiNavigation::Redirect { path: "/login".into() }
        );

        let outcome = client.login("admin".into(), "admin123".into()).await;
        assert!(outcome.success);
        assert_eq!(client.current_user().map(|u| u.role), Some("admin".to_string()));
        assert_eq!(client.navigate("/patients".into()), FfiNavigation::Allow);
        assert_eq!(
            client.navigate("/login".into()),
            FfiNavigation::Redirect { path: "/".into() }
        );
    }

    #[test]
    fn test_open_client_requires_storage_path() {
        let result = open_client(r#"{ "base_url": "http://localhost:3000/api" }"#.into());
        assert!(matches!(result, Err(ClinicSyncError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_open_client_restores_session_after_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = json!({ "storage_path": dir.path().join("session.db") }).to_string();

        let first = open_client(config.clone()).unwrap();
        assert!(!first.is_authenticated());
        assert!(first.login("admin".into(), "admin123".into()).await.success);
        drop(first);

        let second = open_client(config).unwrap();
        assert!(second.is_authenticated());
        assert_eq!(second.current_user().map(|u| u.username), Some("admin".to_string()));
    }

    #[tokio::test]
    async fn test_create_and_state_as_json() {
        let fake = Arc::new(FakeTransport::new());
        fake.ok(Method::Post, "/doctors", json!({ "id": 3, "nama": "dr. Sari" }));
        let client = client(fake);

        let outcome = client
            .create(FfiEntityKind::Doctor, r#"{"namaLengkap":"dr. Sari"}"#.into())
            .await
            .unwrap();
        assert!(outcome.success);

        let state = client.state(FfiEntityKind::Doctor).unwrap();
        assert_eq!(state.items.len(), 1);
        let item: serde_json::Value = serde_json::from_str(&state.items[0]).unwrap();
        assert_eq!(item["namaLengkap"], "dr. Sari");
        assert!(client.state(FfiEntityKind::Patient).unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_non_object() {
        let client = client(Arc::new(FakeTransport::new()));
        let err = client
            .create(FfiEntityKind::Patient, "[1,2]".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ClinicSyncError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_failure_message() {
        let fake = Arc::new(FakeTransport::new());
        fake.reject(Method::Delete, "/appointments/9", "Appointment is locked");
        let client = client(fake);

        let outcome = client.delete(FfiEntityKind::Appointment, "9".into()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("Appointment is locked"));
    }
}
