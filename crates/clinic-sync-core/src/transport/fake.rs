//! Scripted in-process transport for tests and demos.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{Method, Transport, TransportError, TransportResult};

/// When a scripted reply is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    Immediate,
    After(Duration),
    /// Never resolves.
    Never,
}

/// A scripted reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub result: TransportResult<Value>,
    pub latency: Latency,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            result: Ok(body),
            latency: Latency::Immediate,
        }
    }

    pub fn err(error: TransportError) -> Self {
        Self {
            result: Err(error),
            latency: Latency::Immediate,
        }
    }

    /// A request that never completes.
    pub fn hang() -> Self {
        Self {
            result: Err(TransportError::Network("unreachable".into())),
            latency: Latency::Never,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.latency = Latency::After(delay);
        self
    }
}

/// A request seen by the fake.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Transport that answers from a script instead of the network.
///
/// Replies are queued per `(method, path)` and consumed in order; the last
/// reply of a queue is repeated for any further calls. Requests with no
/// script fail with a 404 rejection.
#[derive(Debug, Default)]
pub struct FakeTransport {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn push(&self, method: Method, path: &str, reply: Reply) -> &Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies
                .entry((method, path.to_string()))
                .or_default()
                .push_back(reply);
        }
        self
    }

    /// Queue a successful body.
    pub fn ok(&self, method: Method, path: &str, body: Value) -> &Self {
        self.push(method, path, Reply::ok(body))
    }

    /// Queue a 400 rejection carrying `message`.
    pub fn reject(&self, method: Method, path: &str, message: &str) -> &Self {
        self.push(method, path, Reply::err(TransportError::rejected(400, message)))
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn next_reply(&self, method: Method, path: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().ok()?;
        let queue = replies.get_mut(&(method, path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> TransportResult<Value> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                method,
                path: path.to_string(),
                body,
            });
        }

        let Some(reply) = self.next_reply(method, path) else {
            return Err(TransportError::Rejected {
                status: 404,
                message: None,
            });
        };

        match reply.latency {
            Latency::Immediate => {}
            Latency::After(delay) => tokio::time::sleep(delay).await,
            Latency::Never => std::future::pending::<()>().await,
        }
        reply.result
    }
}
