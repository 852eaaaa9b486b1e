//! Product repository trait.

use async_trait::async_trait;

use marigold_core::ProductId;

use super::RepoResult;
use crate::models::{NewProduct, Product};

/// Repository over the product collaborator surface.
///
/// The checkout core reads products fresh (price, stock, active status) and
/// decrements stock after order commit. Catalog management is out of scope.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Fetch a product by ID.
    async fn get(&self, id: ProductId) -> RepoResult<Option<Product>>;

    /// Insert a product (seeding and tests).
    async fn insert(&self, product: NewProduct) -> RepoResult<Product>;

    /// Decrement stock by `quantity` as a relative delta at the data store.
    ///
    /// Never expressed as read-then-write in the application, so concurrent
    /// checkouts of the same product cannot lose updates.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product is missing or has
    /// fewer than `quantity` units left. Callers treat this as a
    /// reconciliation event, not an order failure.
    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> RepoResult<()>;

    /// Toggle the active flag (tests and seeding).
    async fn set_active(&self, id: ProductId, is_active: bool) -> RepoResult<()>;
}
