//! Persisted cart repository trait.

use async_trait::async_trait;

use marigold_core::{CartId, CartItemId, UserId};

use super::RepoResult;
use crate::models::{Cart, CartItem, NewCartItem};

/// Repository for authenticated carts.
///
/// One cart row per owner; items are keyed on `(cart_id, product_id,
/// variant)` so concurrent adds of the same pair resolve to one row with a
/// summed quantity. The unique index is the backstop; the increment itself
/// is read-modify-write inside [`CartRepository::upsert_item`].
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Fetch the owner's cart, creating it if absent.
    async fn get_or_create(&self, owner: UserId) -> RepoResult<Cart>;

    /// List all items in a cart.
    async fn list_items(&self, cart_id: CartId) -> RepoResult<Vec<CartItem>>;

    /// Add `item.quantity` units of `(product, variant)` to the cart.
    ///
    /// Increments the existing row's quantity if one exists, otherwise
    /// inserts. Returns the resulting row.
    async fn upsert_item(&self, cart_id: CartId, item: NewCartItem) -> RepoResult<CartItem>;

    /// Overwrite an item's quantity. Callers remove the row instead of
    /// passing zero.
    async fn set_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> RepoResult<()>;

    /// Remove one item from the cart.
    async fn remove_item(&self, cart_id: CartId, item_id: CartItemId) -> RepoResult<()>;

    /// Remove every item from the cart.
    async fn clear(&self, cart_id: CartId) -> RepoResult<()>;
}
