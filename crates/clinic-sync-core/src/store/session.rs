//! Session store: authenticated identity and its persistence.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::watch;

use super::{OperationFailure, Outcome};
use crate::config::{ClientConfig, StorageKeys};
use crate::db::{DbResult, KeyValueStore};
use crate::models::{
    Credentials, LoginResponse, LoginStrategy, SessionState, User, LOCAL_ADMIN_TOKEN,
};
use crate::transport::{failure_message, send_bounded, Method, Transport};

/// Login endpoint.
pub const LOGIN_PATH: &str = "/auth/login";

/// Message used when a login fails without a server message.
pub const LOGIN_FAILED: &str = "Login failed";

/// Owns the session identity. The only reader and writer of the persisted
/// token and user keys.
pub struct SessionStore {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    allow_local_admin: bool,
    request_timeout: Option<Duration>,
    state: watch::Sender<SessionState>,
}

impl SessionStore {
    /// Unauthenticated store with default keys; call [`init_auth`] to
    /// rehydrate a persisted session.
    ///
    /// [`init_auth`]: SessionStore::init_auth
    pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            transport,
            storage,
            keys: StorageKeys::default(),
            allow_local_admin: true,
            request_timeout: None,
            state,
        }
    }

    pub fn from_config(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self::new(transport, storage)
            .with_storage_keys(config.storage_keys.clone())
            .with_local_admin(config.allow_local_admin)
            .with_timeout(config.request_timeout())
    }

    pub fn with_storage_keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Enable or disable the built-in local administrator.
    pub fn with_local_admin(mut self, allow: bool) -> Self {
        self.allow_local_admin = allow;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token().map(str::to_owned)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Authenticate and persist the session.
    ///
    /// On failure the session is left exactly as it was.
    pub async fn login(&self, credentials: &Credentials) -> Outcome<()> {
        let (user, token) = match LoginStrategy::classify(credentials, self.allow_local_admin) {
            LoginStrategy::LocalAdmin => {
                tracing::info!("Local administrator login");
                (User::local_admin(), LOCAL_ADMIN_TOKEN.to_string())
            }
            LoginStrategy::RemoteCredential => self.remote_login(credentials).await?,
        };

        if let Err(e) = self.persist(&user, &token) {
            tracing::warn!("Could not persist session for {}: {}", user.username, e);
            return Err(OperationFailure::new(LOGIN_FAILED));
        }

        tracing::info!(
            "Session established for {} (token {})",
            user.username,
            fingerprint(&token)
        );
        self.state.send_replace(SessionState::authenticated(user, token));
        Ok(())
    }

    /// Forget the session, in memory and in storage.
    pub fn logout(&self) {
        self.state.send_replace(SessionState::default());
        self.clear_persisted();
        tracing::info!("Logged out");
    }

    /// Restore a persisted session. Only a complete, readable pair of token
    /// and user is accepted; anything else is discarded and the session
    /// stays unauthenticated.
    pub fn init_auth(&self) {
        let stored_user = self.read(&self.keys.user);
        let stored_token = self.read(&self.keys.token);

        match (stored_user, stored_token) {
            (Some(user_json), Some(token)) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) => {
                    tracing::info!("Restored session for {}", user.username);
                    self.state.send_replace(SessionState::authenticated(user, token));
                }
                Err(e) => {
                    tracing::warn!("Discarding unreadable persisted user: {}", e);
                    self.clear_persisted();
                }
            },
            (None, None) => tracing::debug!("No persisted session"),
            _ => {
                tracing::warn!("Discarding incomplete persisted session");
                self.clear_persisted();
            }
        }
    }

    async fn remote_login(&self, credentials: &Credentials) -> Outcome<(User, String)> {
        let body = serde_json::to_value(credentials).map_err(|e| {
            tracing::warn!("Could not encode credentials: {}", e);
            OperationFailure::new(LOGIN_FAILED)
        })?;

        let response = send_bounded(
            self.transport.as_ref(),
            self.request_timeout,
            Method::Post,
            LOGIN_PATH,
            Some(body),
        )
        .await
        .map_err(|e| {
            tracing::warn!("Login for {} failed: {}", credentials.username, e);
            OperationFailure::new(failure_message(&e, LOGIN_FAILED))
        })?;

        match serde_json::from_value::<LoginResponse>(response) {
            Ok(LoginResponse {
                user: Some(user),
                token: Some(token),
            }) => Ok((user, token)),
            Ok(_) => {
                tracing::warn!("Login response is missing the user or token");
                Err(OperationFailure::new(LOGIN_FAILED))
            }
            Err(e) => {
                tracing::warn!("Unreadable login response: {}", e);
                Err(OperationFailure::new(LOGIN_FAILED))
            }
        }
    }

    /// Write token then user. A failed user write puts the previous token
    /// back, so storage keeps mirroring the in-memory session.
    fn persist(&self, user: &User, token: &str) -> DbResult<()> {
        let user_json = serde_json::to_string(user)?;
        let prior_token = self.storage.get(&self.keys.token)?;
        self.storage.set(&self.keys.token, token)?;
        if let Err(e) = self.storage.set(&self.keys.user, &user_json) {
            self.restore(&self.keys.token, prior_token.as_deref());
            return Err(e);
        }
        Ok(())
    }

    fn restore(&self, key: &str, prior: Option<&str>) {
        let result = match prior {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            tracing::warn!("Could not roll back persisted {}: {}", key, e);
        }
    }

    fn clear_persisted(&self) {
        for key in [&self.keys.token, &self.keys.user] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!("Could not remove persisted {}: {}", key, e);
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Could not read persisted {}: {}", key, e);
                None
            }
        }
    }
}

/// Short, non-reversible token identifier for logs.
fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..4])
}
