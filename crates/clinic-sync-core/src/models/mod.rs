//! Domain models for the clinic sync core.

mod entity;
mod kind;
mod patient;
mod session;

pub use entity::*;
pub use kind::*;
pub use patient::*;
pub use session::*;
