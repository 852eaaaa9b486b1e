//! HTTP middleware: sessions and authentication extractors.

pub mod auth;
pub mod session;

pub use auth::{CurrentUser, MaybeUser};
pub use session::{create_memory_session_layer, create_session_layer};
