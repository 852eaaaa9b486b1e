//! Address repository trait.

use async_trait::async_trait;

use marigold_core::{AddressId, UserId};

use super::RepoResult;
use crate::models::{Address, NewAddress};

/// Repository for saved shipping addresses.
///
/// Enforces both address invariants server-side, inside one transaction:
/// at most [`Address::MAX_PER_OWNER`] rows per owner, and when a row is
/// created or updated with `is_default = true`, every sibling default is
/// unset first (sequential unset-then-set, never two defaults at once).
#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// List the owner's addresses, default first.
    async fn list(&self, owner: UserId) -> RepoResult<Vec<Address>>;

    /// Fetch one address.
    async fn get(&self, id: AddressId) -> RepoResult<Option<Address>>;

    /// Create an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when the owner already has
    /// [`Address::MAX_PER_OWNER`] addresses.
    async fn create(&self, owner: UserId, data: NewAddress) -> RepoResult<Address>;

    /// Update an address owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist or
    /// belongs to someone else.
    async fn update(&self, id: AddressId, owner: UserId, data: NewAddress) -> RepoResult<Address>;
}
