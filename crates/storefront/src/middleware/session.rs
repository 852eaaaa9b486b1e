//! Session middleware configuration and session-state helpers.
//!
//! Sessions carry the guest cart, the logged-in user ID, the selected
//! checkout address and the checkout key. Production uses the
//! `PostgreSQL`-backed store; tests use the in-memory store with the same
//! cookie settings.

use sqlx::PgPool;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;
use uuid::Uuid;

use crate::models::session_keys;
use crate::services::GuestCart;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "mg_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

fn configure<S: SessionStore>(store: S, is_secure: bool) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Create the session layer with the `PostgreSQL` store.
///
/// Runs the store's own schema migration (separate from the application
/// migrations).
///
/// # Errors
///
/// Returns `sqlx::Error` if the session table cannot be created.
pub async fn create_session_layer(
    pool: &PgPool,
    base_url: &str,
) -> Result<SessionManagerLayer<PostgresStore>, sqlx::Error> {
    let store = PostgresStore::new(pool.clone());
    store.migrate().await?;
    Ok(configure(store, base_url.starts_with("https://")))
}

/// Create a session layer with the in-memory store (tests, local runs).
#[must_use]
pub fn create_memory_session_layer() -> SessionManagerLayer<MemoryStore> {
    configure(MemoryStore::default(), false)
}

/// Load the guest cart from the session, empty if absent.
///
/// # Errors
///
/// Returns a session error if the store is unreachable.
pub async fn load_guest_cart(session: &Session) -> Result<GuestCart, tower_sessions::session::Error> {
    Ok(session
        .get::<GuestCart>(session_keys::GUEST_CART)
        .await?
        .unwrap_or_default())
}

/// Write the guest cart back to the session.
///
/// # Errors
///
/// Returns a session error if the store is unreachable.
pub async fn save_guest_cart(
    session: &Session,
    cart: &GuestCart,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::GUEST_CART, cart).await
}

/// The checkout key for this session, minting one on first use.
///
/// The key scopes every at-most-once checkout guard. It survives a
/// placed order so late duplicate submits still land on that order;
/// [`rotate_checkout_key`] retires it when the next checkout starts.
///
/// # Errors
///
/// Returns a session error if the store is unreachable.
pub async fn checkout_key(session: &Session) -> Result<String, tower_sessions::session::Error> {
    if let Some(key) = session.get::<String>(session_keys::CHECKOUT_KEY).await? {
        return Ok(key);
    }
    let key = Uuid::new_v4().to_string();
    session.insert(session_keys::CHECKOUT_KEY, &key).await?;
    Ok(key)
}

/// Replace the checkout key, returning the new one.
///
/// Called when a resolve finds the current key already produced an
/// order; the fresh key gets fresh at-most-once guards.
///
/// # Errors
///
/// Returns a session error if the store is unreachable.
pub async fn rotate_checkout_key(
    session: &Session,
) -> Result<String, tower_sessions::session::Error> {
    let key = Uuid::new_v4().to_string();
    session.insert(session_keys::CHECKOUT_KEY, &key).await?;
    Ok(key)
}
