//! Cart domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marigold_core::{CartId, CartItemId, Price, ProductId, UserId};

/// A persisted (authenticated) cart.
///
/// Guest carts have no server identity; they live in the session as a
/// [`crate::services::cart::GuestCart`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// Unique cart ID.
    pub id: CartId,
    /// Owning account. Exactly one cart per owner.
    pub owner_id: UserId,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
}

/// One line in a cart.
///
/// Within a cart, `(product_id, variant)` is unique — re-adding the same
/// pair increments `quantity` instead of duplicating the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Item ID. For guest carts this is a session-local counter value.
    pub id: CartItemId,
    /// The product this line refers to.
    pub product_id: ProductId,
    /// Units of the product. Always at least 1; zero removes the row.
    pub quantity: u32,
    /// Variant selector (e.g. size), if the product has variants.
    pub variant: Option<String>,
    /// Unit price at the time the item was added, when known.
    pub unit_price: Option<Price>,
}

impl CartItem {
    /// Whether this line is for the given product/variant pair.
    #[must_use]
    pub fn matches(&self, product_id: ProductId, variant: Option<&str>) -> bool {
        self.product_id == product_id && self.variant.as_deref() == variant
    }
}

/// Data for inserting or merging a cart line.
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub variant: Option<String>,
    pub unit_price: Option<Price>,
}
