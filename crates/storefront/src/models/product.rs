//! Product collaborator types.
//!
//! The catalog itself (browsing, admin CRUD) is outside this service; the
//! checkout core only needs price, stock and active status, fetched fresh at
//! resolution time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marigold_core::{Price, ProductId};

/// A sellable product as seen by the checkout core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name, snapshotted onto order items at purchase.
    pub name: String,
    /// Current unit price.
    pub price: Price,
    /// Units on hand. Decremented best-effort after order commit.
    pub stock: u32,
    /// Inactive products cannot be purchased.
    pub is_active: bool,
    /// Allowed variant selectors (e.g. sizes). Empty means no variants.
    pub variants: Vec<String>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product can currently be bought.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.is_active
    }
}

/// Data for inserting a product (seeding and tests).
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price: Price,
    pub stock: u32,
    pub is_active: bool,
    pub variants: Vec<String>,
}
