//! Session identity models.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Username of the built-in local administrator.
pub const LOCAL_ADMIN_USERNAME: &str = "admin";
/// Password of the built-in local administrator.
pub const LOCAL_ADMIN_PASSWORD: &str = "admin123";
/// Token issued to the local administrator without contacting the server.
pub const LOCAL_ADMIN_TOKEN: &str = "admin-token";
/// Role granted to the local administrator.
pub const LOCAL_ADMIN_ROLE: &str = "admin";

/// Authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub role: String,
    /// Any further attributes the server sent, kept for persistence.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
            extra: Map::new(),
        }
    }

    /// The identity synthesized for the local administrator.
    pub fn local_admin() -> Self {
        Self::new(LOCAL_ADMIN_USERNAME, LOCAL_ADMIN_ROLE)
    }
}

/// Login form input.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How a login attempt is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStrategy {
    /// Built-in administrator, resolved locally with no network call.
    LocalAdmin,
    /// Credentials checked by the server.
    RemoteCredential,
}

impl LoginStrategy {
    /// Pick the strategy. The local administrator is checked first and only
    /// when enabled.
    pub fn classify(credentials: &Credentials, allow_local_admin: bool) -> Self {
        if allow_local_admin
            && credentials.username == LOCAL_ADMIN_USERNAME
            && credentials.password == LOCAL_ADMIN_PASSWORD
        {
            LoginStrategy::LocalAdmin
        } else {
            LoginStrategy::RemoteCredential
        }
    }
}

/// Body returned by `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Identity held by the session store.
///
/// The token is present exactly when the user is; both are set and cleared
/// together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    user: Option<User>,
    token: Option<String>,
}

impl SessionState {
    pub fn authenticated(user: User, token: String) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}
