//! Transport to the REST backend.
//!
//! Stores only depend on the [`Transport`] trait. [`http::HttpTransport`]
//! talks to a real server; [`fake::FakeTransport`] replays scripted replies.

mod error;
pub mod fake;
pub mod http;

pub use error::*;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// HTTP verb used by the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request/response channel to the backend.
///
/// A successful call resolves to the decoded response body (`Value::Null`
/// when the body is empty).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> TransportResult<Value>;

    async fn get(&self, path: &str) -> TransportResult<Value> {
        self.request(Method::Get, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> TransportResult<Value> {
        self.request(Method::Post, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> TransportResult<Value> {
        self.request(Method::Put, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> TransportResult<Value> {
        self.request(Method::Delete, path, None).await
    }
}

/// Issue a request, giving up after `timeout` when one is set.
pub async fn send_bounded(
    transport: &dyn Transport,
    timeout: Option<Duration>,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> TransportResult<Value> {
    let call = transport.request(method, path, body);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(TransportError::Timeout(limit))),
        None => call.await,
    }
}
