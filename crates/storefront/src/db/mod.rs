//! Persistence layer for the storefront.
//!
//! Every repository is a trait with two backends:
//!
//! - [`postgres`] - production backend on sqlx/`PostgreSQL`. Uniqueness is
//!   enforced with database constraints (order numbers, cart-item dedup)
//!   and stock decrements are relative-delta updates, never
//!   read-in-application-then-write-back.
//! - [`memory`] - `RwLock`-guarded maps with identical semantics, used by
//!   tests and local development.
//!
//! # Tables
//!
//! - `products` - catalog collaborator surface (price, stock, active flag)
//! - `carts` / `cart_items` - persisted authenticated carts
//! - `addresses` - saved shipping addresses (≤3 per owner, single default)
//! - `orders` / `order_items` / `return_requests` - the order lifecycle
//!
//! Migrations live in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p marigold-cli -- migrate
//! ```

pub mod addresses;
pub mod carts;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod products;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use carts::CartRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;

/// Errors surfaced by repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness or precondition conflict (duplicate order number,
    /// concurrent cancellation, address limit, insufficient stock).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored value failed domain validation on the way out.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Result type alias for repository operations.
pub type RepoResult<T> = Result<T, RepositoryError>;

/// The bundle of repositories the services operate on.
#[derive(Clone)]
pub struct Store {
    pub products: Arc<dyn ProductRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub addresses: Arc<dyn AddressRepository>,
    pub orders: Arc<dyn OrderRepository>,
}

impl Store {
    /// Build a store backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            products: Arc::new(postgres::PgProducts::new(pool.clone())),
            carts: Arc::new(postgres::PgCarts::new(pool.clone())),
            addresses: Arc::new(postgres::PgAddresses::new(pool.clone())),
            orders: Arc::new(postgres::PgOrders::new(pool)),
        }
    }

    /// Build an in-memory store (tests, local development).
    #[must_use]
    pub fn memory() -> Self {
        Self {
            products: Arc::new(memory::MemoryProducts::new()),
            carts: Arc::new(memory::MemoryCarts::new()),
            addresses: Arc::new(memory::MemoryAddresses::new()),
            orders: Arc::new(memory::MemoryOrders::new()),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
