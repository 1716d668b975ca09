//! Transport errors and failure-message extraction.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("request rejected with status {status}")]
    Rejected {
        status: u16,
        /// `message` field of the error body, when the server sent one.
        message: Option<String>,
    },

    /// The request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// No response within the configured limit.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body could not be interpreted.
    #[error("invalid response body: {0}")]
    Decode(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

impl TransportError {
    /// Shorthand for a rejection carrying a server message.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: Some(message.into()),
        }
    }

    /// The server-supplied message, if any. Blank messages count as absent.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }
}

/// Text shown to the user for a failed operation: the server's message when
/// present, otherwise the operation's default.
pub fn failure_message(error: &TransportError, default: &str) -> String {
    error
        .server_message()
        .map(str::to_owned)
        .unwrap_or_else(|| default.to_owned())
}
