//! `PostgreSQL` repository implementations.
//!
//! Queries are bound at runtime (`sqlx::query`), statuses travel as text,
//! prices as NUMERIC. The schema's constraints back the application-level
//! checks: the unique index on `orders.order_number`, the expression index
//! deduplicating `cart_items`, and the `stock >= 0` check.

mod addresses;
mod carts;
mod orders;
mod products;

use std::str::FromStr;

use sqlx::PgPool;

pub use addresses::PgAddresses;
pub use carts::PgCarts;
pub use orders::PgOrders;
pub use products::PgProducts;

use marigold_core::StatusParseError;

use super::{RepoResult, RepositoryError};

/// Run the storefront schema migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Convert a stored quantity column to `u32`.
fn qty_from_db(value: i32, field: &str) -> RepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {field}: {value}")))
}

/// Parse a stored status column.
fn status_from_db<T>(value: &str) -> RepoResult<T>
where
    T: FromStr<Err = StatusParseError>,
{
    value
        .parse()
        .map_err(|e: StatusParseError| RepositoryError::DataCorruption(e.to_string()))
}

/// Map a unique-constraint violation to `Conflict`, everything else to
/// `Database`.
fn map_unique(error: sqlx::Error, conflict_message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = error
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(conflict_message.to_owned());
    }
    RepositoryError::Database(error)
}
