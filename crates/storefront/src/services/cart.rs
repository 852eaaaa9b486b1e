//! Cart operations over both cart backends.
//!
//! Guests carry their cart inside the session cookie as a [`GuestCart`];
//! authenticated users get a persisted cart row. Both speak the same item
//! shape ([`CartItem`]) so the checkout resolver does not care which backend
//! a line came from.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use marigold_core::{CartItemId, ProductId, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{CartItem, NewCartItem, Product};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Client-supplied input failed validation.
    #[error("Invalid cart input: {0}")]
    Validation(String),

    /// The referenced product or cart line does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A guest's cart, serialized into the session.
///
/// Item IDs are session-local counter values; they are only meaningful for
/// addressing lines within this cart and are discarded on merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuestCart {
    next_item_id: i32,
    items: Vec<CartItem>,
}

impl GuestCart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Add units of a product/variant pair, merging into an existing line.
    /// Returns the ID of the affected line.
    pub fn add(&mut self, item: NewCartItem) -> CartItemId {
        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.matches(item.product_id, item.variant.as_deref()))
        {
            line.quantity += item.quantity;
            return line.id;
        }

        self.next_item_id += 1;
        let id = CartItemId::new(self.next_item_id);
        self.items.push(CartItem {
            id,
            product_id: item.product_id,
            quantity: item.quantity,
            variant: item.variant,
            unit_price: item.unit_price,
        });
        id
    }

    /// Overwrite a line's quantity. Returns false if the line is unknown.
    pub fn set_quantity(&mut self, item_id: CartItemId, quantity: u32) -> bool {
        match self.items.iter_mut().find(|line| line.id == item_id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns false if the line is unknown.
    pub fn remove(&mut self, item_id: CartItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.id != item_id);
        self.items.len() < before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Outcome of merging a guest cart into an account cart.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOutcome {
    /// Lines successfully merged into the account cart.
    pub merged: usize,
    /// Lines that failed and were left in the guest cart.
    pub failed: usize,
}

/// Cart operations shared by guest and authenticated flows.
#[derive(Clone)]
pub struct CartService {
    store: Store,
}

impl CartService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Validate an add-to-cart request against the live product and produce
    /// the line to insert.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` for missing or inactive products and
    /// `CartError::Validation` for bad quantities or unknown variants.
    pub async fn validated_line(
        &self,
        product_id: ProductId,
        quantity: u32,
        variant: Option<String>,
    ) -> Result<(Product, NewCartItem), CartError> {
        if quantity == 0 {
            return Err(CartError::Validation(
                "quantity must be at least 1".to_owned(),
            ));
        }

        let product = self
            .store
            .products
            .get(product_id)
            .await?
            .filter(|product| product.is_active)
            .ok_or_else(|| CartError::NotFound(format!("product {product_id}")))?;

        match (&variant, product.variants.is_empty()) {
            (Some(v), false) if !product.variants.iter().any(|known| known == v) => {
                return Err(CartError::Validation(format!(
                    "unknown variant '{v}' for product {product_id}"
                )));
            }
            (Some(_), true) => {
                return Err(CartError::Validation(format!(
                    "product {product_id} has no variants"
                )));
            }
            (None, false) => {
                return Err(CartError::Validation(format!(
                    "product {product_id} requires a variant"
                )));
            }
            _ => {}
        }

        let line = NewCartItem {
            product_id,
            quantity,
            variant,
            unit_price: Some(product.price),
        };
        Ok((product, line))
    }

    /// Add a validated line to the owner's persisted cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on persistence failure.
    pub async fn add_for_user(&self, owner: UserId, line: NewCartItem) -> Result<CartItem, CartError> {
        let cart = self.store.carts.get_or_create(owner).await?;
        Ok(self.store.carts.upsert_item(cart.id, line).await?)
    }

    /// List the owner's persisted cart items.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on persistence failure.
    pub async fn list_for_user(&self, owner: UserId) -> Result<Vec<CartItem>, CartError> {
        let cart = self.store.carts.get_or_create(owner).await?;
        Ok(self.store.carts.list_items(cart.id).await?)
    }

    /// Set a persisted line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if the line is unknown.
    pub async fn set_quantity_for_user(
        &self,
        owner: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<(), CartError> {
        let cart = self.store.carts.get_or_create(owner).await?;
        if quantity == 0 {
            self.store.carts.remove_item(cart.id, item_id).await?;
        } else {
            self.store.carts.set_quantity(cart.id, item_id, quantity).await?;
        }
        Ok(())
    }

    /// Remove a persisted line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on persistence failure.
    pub async fn remove_for_user(&self, owner: UserId, item_id: CartItemId) -> Result<(), CartError> {
        let cart = self.store.carts.get_or_create(owner).await?;
        self.store.carts.remove_item(cart.id, item_id).await?;
        Ok(())
    }

    /// Empty the owner's persisted cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` on persistence failure.
    pub async fn clear_for_user(&self, owner: UserId) -> Result<(), CartError> {
        let cart = self.store.carts.get_or_create(owner).await?;
        self.store.carts.clear(cart.id).await?;
        Ok(())
    }

    /// Merge a guest cart into the owner's persisted cart at login.
    ///
    /// Best-effort per line: a line that fails to merge is kept in the guest
    /// cart and logged, and every other line still goes through. Quantities
    /// for an already-present product/variant pair are summed by the
    /// repository upsert, not overwritten.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` only if the owner's cart itself
    /// cannot be fetched; per-line failures never abort the merge.
    pub async fn merge_guest_into_user(
        &self,
        owner: UserId,
        guest: &mut GuestCart,
    ) -> Result<MergeOutcome, CartError> {
        if guest.is_empty() {
            return Ok(MergeOutcome::default());
        }

        let cart = self.store.carts.get_or_create(owner).await?;
        let mut outcome = MergeOutcome::default();
        let mut remaining = Vec::new();

        for line in guest.items.drain(..) {
            let item = NewCartItem {
                product_id: line.product_id,
                quantity: line.quantity,
                variant: line.variant.clone(),
                unit_price: line.unit_price,
            };
            match self.store.carts.upsert_item(cart.id, item).await {
                Ok(_) => outcome.merged += 1,
                Err(e) => {
                    warn!(
                        product_id = %line.product_id,
                        error = %e,
                        "Failed to merge guest cart line, keeping it in the guest cart"
                    );
                    outcome.failed += 1;
                    remaining.push(line);
                }
            }
        }

        guest.items = remaining;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marigold_core::Price;

    fn line(product: i32, quantity: u32, variant: Option<&str>) -> NewCartItem {
        NewCartItem {
            product_id: ProductId::new(product),
            quantity,
            variant: variant.map(String::from),
            unit_price: Some(Price::from_rupees(100)),
        }
    }

    #[test]
    fn test_guest_cart_merges_same_pair() {
        let mut cart = GuestCart::new();
        cart.add(line(1, 2, Some("M")));
        cart.add(line(1, 3, Some("M")));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn test_guest_cart_variants_stay_separate() {
        let mut cart = GuestCart::new();
        cart.add(line(1, 1, Some("M")));
        cart.add(line(1, 1, Some("L")));
        cart.add(line(1, 1, None));

        assert_eq!(cart.items().len(), 3);
    }

    #[test]
    fn test_guest_cart_set_and_remove() {
        let mut cart = GuestCart::new();
        let id = cart.add(line(1, 1, None));

        assert!(cart.set_quantity(id, 4));
        assert_eq!(cart.items()[0].quantity, 4);

        assert!(cart.remove(id));
        assert!(cart.is_empty());
        assert!(!cart.remove(id));
    }

    #[tokio::test]
    async fn test_validated_line_checks_variants() {
        let store = Store::memory();
        let service = CartService::new(store.clone());

        let product = store
            .products
            .insert(crate::models::NewProduct {
                name: "Kurta".into(),
                price: Price::from_rupees(799),
                stock: 10,
                is_active: true,
                variants: vec!["S".into(), "M".into()],
            })
            .await
            .unwrap();

        assert!(
            service
                .validated_line(product.id, 1, Some("M".into()))
                .await
                .is_ok()
        );
        assert!(matches!(
            service.validated_line(product.id, 1, Some("XXL".into())).await,
            Err(CartError::Validation(_))
        ));
        assert!(matches!(
            service.validated_line(product.id, 1, None).await,
            Err(CartError::Validation(_))
        ));
        assert!(matches!(
            service.validated_line(product.id, 0, Some("M".into())).await,
            Err(CartError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_merge_sums_quantities() {
        let store = Store::memory();
        let service = CartService::new(store.clone());
        let owner = UserId::new(7);

        let product = store
            .products
            .insert(crate::models::NewProduct {
                name: "Mojari".into(),
                price: Price::from_rupees(1299),
                stock: 10,
                is_active: true,
                variants: Vec::new(),
            })
            .await
            .unwrap();

        service
            .add_for_user(owner, line(product.id.as_i32(), 1, None))
            .await
            .unwrap();

        let mut guest = GuestCart::new();
        guest.add(line(product.id.as_i32(), 2, None));

        let outcome = service.merge_guest_into_user(owner, &mut guest).await.unwrap();
        assert_eq!(outcome.merged, 1);
        assert_eq!(outcome.failed, 0);
        assert!(guest.is_empty());

        let items = service.list_for_user(owner).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
    }
}
