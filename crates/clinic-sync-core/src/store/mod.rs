//! Reactive stores that mirror server state.
//!
//! Every operation converts transport failures into data: an
//! [`OperationFailure`] for mutations and logins, or the store's `error`
//! field for fetches. Nothing fails past the store boundary.

mod entity;
mod lifecycle;
mod session;

pub use entity::*;
pub use session::*;

use thiserror::Error;

/// Failed store operation, carrying the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct OperationFailure {
    pub message: String,
}

impl OperationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of a store operation.
pub type Outcome<T> = Result<T, OperationFailure>;
