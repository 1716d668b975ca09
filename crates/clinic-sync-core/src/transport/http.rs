//! HTTP transport built on `reqwest`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;

use super::{Method, Transport, TransportError, TransportResult};
use crate::db::KeyValueStore;

/// User agent string for API requests.
const USER_AGENT_VALUE: &str = concat!("clinic-sync-core/", env!("CARGO_PKG_VERSION"));

/// Header carrying a per-request correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// JSON-over-HTTP client for the clinic REST API.
///
/// When a token store is attached, the persisted session token is sent as a
/// bearer token on every request.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token_source: Option<(Arc<dyn KeyValueStore>, String)>,
}

impl HttpTransport {
    /// Creates a client for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> TransportResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token_source: None,
        })
    }

    /// Read the bearer token from `store` under `key` before each request.
    pub fn with_token_store(mut self, store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        self.token_source = Some((store, key.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn bearer_token(&self) -> Option<String> {
        let (store, key) = self.token_source.as_ref()?;
        match store.get(key) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Could not read session token: {}", e);
                None
            }
        }
    }

    /// Checks the status and decodes the body.
    async fn handle_response(response: reqwest::Response) -> TransportResult<Value> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message: error_message_from_body(&bytes),
            });
        }

        decode_body(&bytes)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> TransportResult<Value> {
        let url = self.url(path);
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::debug!("{} {} (request {})", method, url, request_id);

        let mut builder = self
            .client
            .request(to_reqwest(method), &url)
            .header(REQUEST_ID_HEADER, request_id.as_str());
        if let Some(token) = self.bearer_token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let result = Self::handle_response(response).await;

        if let Err(e) = &result {
            tracing::debug!("{} {} failed (request {}): {}", method, url, request_id, e);
        }
        result
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

/// Successful body: empty means `null`, anything else must be JSON.
fn decode_body(bytes: &[u8]) -> TransportResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| TransportError::Decode(e.to_string()))
}

/// The `message` string of a JSON error body.
fn error_message_from_body(bytes: &[u8]) -> Option<String> {
    let body: Value = serde_json::from_slice(bytes).ok()?;
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
}
