//! Product repository on `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};

use marigold_core::{Price, ProductId};

use super::{super::ProductRepository, qty_from_db};
use crate::db::{RepoResult, RepositoryError};
use crate::models::{NewProduct, Product};

/// `PostgreSQL`-backed product repository.
#[derive(Clone)]
pub struct PgProducts {
    pool: PgPool,
}

impl PgProducts {
    /// Create a new repository on the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &PgRow) -> RepoResult<Product> {
    Ok(Product {
        id: row.try_get::<ProductId, _>("id")?,
        name: row.try_get("name")?,
        price: Price::new(row.try_get::<Decimal, _>("price")?),
        stock: qty_from_db(row.try_get("stock")?, "stock")?,
        is_active: row.try_get("is_active")?,
        variants: row.try_get::<Vec<String>, _>("variants")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl ProductRepository for PgProducts {
    async fn get(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, price, stock, is_active, variants, created_at
             FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn insert(&self, product: NewProduct) -> RepoResult<Product> {
        let row = sqlx::query(
            "INSERT INTO products (name, price, stock, is_active, variants)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, name, price, stock, is_active, variants, created_at",
        )
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(i32::try_from(product.stock).unwrap_or(i32::MAX))
        .bind(product.is_active)
        .bind(&product.variants)
        .fetch_one(&self.pool)
        .await?;

        row_to_product(&row)
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> RepoResult<()> {
        // Relative delta at the store; the WHERE clause makes the decrement
        // conditional so concurrent checkouts cannot drive stock negative.
        let result = sqlx::query(
            "UPDATE products
             SET stock = stock - $2, updated_at = now()
             WHERE id = $1 AND stock >= $2",
        )
        .bind(id)
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "insufficient stock for product {id} (need {quantity})"
            )));
        }
        Ok(())
    }

    async fn set_active(&self, id: ProductId, is_active: bool) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("product {id}")));
        }
        Ok(())
    }
}
