//! Authenticated cart repository on `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};

use marigold_core::{CartId, CartItemId, Price, ProductId, UserId};

use super::{super::CartRepository, map_unique, qty_from_db};
use crate::db::{RepoResult, RepositoryError};
use crate::models::{Cart, CartItem, NewCartItem};

/// `PostgreSQL`-backed cart repository.
#[derive(Clone)]
pub struct PgCarts {
    pool: PgPool,
}

impl PgCarts {
    /// Create a new repository on the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_item(row: &PgRow) -> RepoResult<CartItem> {
    Ok(CartItem {
        id: row.try_get::<CartItemId, _>("id")?,
        product_id: row.try_get::<ProductId, _>("product_id")?,
        quantity: qty_from_db(row.try_get("quantity")?, "quantity")?,
        variant: row.try_get::<Option<String>, _>("variant")?,
        unit_price: row
            .try_get::<Option<Decimal>, _>("unit_price")?
            .map(Price::new),
    })
}

#[async_trait]
impl CartRepository for PgCarts {
    async fn get_or_create(&self, owner: UserId) -> RepoResult<Cart> {
        // Upsert keyed on the owner's unique constraint; the no-op update
        // lets RETURNING yield the existing row.
        let row = sqlx::query(
            "INSERT INTO carts (owner_id) VALUES ($1)
             ON CONFLICT (owner_id) DO UPDATE SET updated_at = now()
             RETURNING id, owner_id, created_at",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        Ok(Cart {
            id: row.try_get::<CartId, _>("id")?,
            owner_id: row.try_get::<UserId, _>("owner_id")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    async fn list_items(&self, cart_id: CartId) -> RepoResult<Vec<CartItem>> {
        let rows = sqlx::query(
            "SELECT id, product_id, quantity, variant, unit_price
             FROM cart_items WHERE cart_id = $1 ORDER BY id",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn upsert_item(&self, cart_id: CartId, item: NewCartItem) -> RepoResult<CartItem> {
        // The conflict target matches the cart_items_dedup expression index,
        // so a concurrent add of the same (product, variant) lands on the
        // same row and the quantities sum instead of duplicating.
        let row = sqlx::query(
            "INSERT INTO cart_items (cart_id, product_id, quantity, variant, unit_price)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (cart_id, product_id, (COALESCE(variant, '')))
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity,
                           updated_at = now()
             RETURNING id, product_id, quantity, variant, unit_price",
        )
        .bind(cart_id)
        .bind(item.product_id)
        .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
        .bind(&item.variant)
        .bind(item.unit_price.map(|price| price.amount()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, "cart item updated concurrently"))?;

        row_to_item(&row)
    }

    async fn set_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: u32,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3, updated_at = now()
             WHERE id = $2 AND cart_id = $1",
        )
        .bind(cart_id)
        .bind(item_id)
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("cart item {item_id}")));
        }
        Ok(())
    }

    async fn remove_item(&self, cart_id: CartId, item_id: CartItemId) -> RepoResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE id = $2 AND cart_id = $1")
            .bind(cart_id)
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self, cart_id: CartId) -> RepoResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
