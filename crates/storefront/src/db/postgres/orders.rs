//! Order repository on `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};

use marigold_core::{
    OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductId,
    ReturnRequestId, ReturnStatus, UserId,
};

use super::{super::OrderRepository, map_unique, qty_from_db, status_from_db};
use crate::db::{RepoResult, RepositoryError};
use crate::models::{AddressSnapshot, NewOrder, NewOrderItem, Order, OrderItem, ReturnRequest};

/// `PostgreSQL`-backed order repository.
#[derive(Clone)]
pub struct PgOrders {
    pool: PgPool,
}

impl PgOrders {
    /// Create a new repository on the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: &str =
    "id, order_number, owner_id, status, payment_method, payment_status, subtotal, \
     shipping, total, shipping_address, gateway_order_id, gateway_payment_id, created_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, unit_price, quantity, total_price, variant, \
     cancelled_quantity";

fn row_to_order(row: &PgRow) -> RepoResult<Order> {
    let shipping_address: AddressSnapshot =
        serde_json::from_value(row.try_get::<serde_json::Value, _>("shipping_address")?).map_err(
            |e| RepositoryError::DataCorruption(format!("invalid address snapshot: {e}")),
        )?;

    Ok(Order {
        id: row.try_get::<OrderId, _>("id")?,
        order_number: row.try_get("order_number")?,
        owner_id: row.try_get::<Option<UserId>, _>("owner_id")?,
        status: status_from_db::<OrderStatus>(&row.try_get::<String, _>("status")?)?,
        payment_method: status_from_db::<PaymentMethod>(
            &row.try_get::<String, _>("payment_method")?,
        )?,
        payment_status: status_from_db::<PaymentStatus>(
            &row.try_get::<String, _>("payment_status")?,
        )?,
        subtotal: Price::new(row.try_get::<Decimal, _>("subtotal")?),
        shipping: Price::new(row.try_get::<Decimal, _>("shipping")?),
        total: Price::new(row.try_get::<Decimal, _>("total")?),
        shipping_address,
        gateway_order_id: row.try_get("gateway_order_id")?,
        gateway_payment_id: row.try_get("gateway_payment_id")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn row_to_item(row: &PgRow) -> RepoResult<OrderItem> {
    Ok(OrderItem {
        id: row.try_get::<OrderItemId, _>("id")?,
        order_id: row.try_get::<OrderId, _>("order_id")?,
        product_id: row.try_get::<ProductId, _>("product_id")?,
        product_name: row.try_get("product_name")?,
        unit_price: Price::new(row.try_get::<Decimal, _>("unit_price")?),
        quantity: qty_from_db(row.try_get("quantity")?, "quantity")?,
        total_price: Price::new(row.try_get::<Decimal, _>("total_price")?),
        variant: row.try_get::<Option<String>, _>("variant")?,
        cancelled_quantity: qty_from_db(row.try_get("cancelled_quantity")?, "cancelled_quantity")?,
    })
}

fn row_to_return(row: &PgRow) -> RepoResult<ReturnRequest> {
    let approved: Option<i32> = row.try_get("approved_quantity")?;
    Ok(ReturnRequest {
        id: row.try_get::<ReturnRequestId, _>("id")?,
        order_item_id: row.try_get::<OrderItemId, _>("order_item_id")?,
        requested_quantity: qty_from_db(row.try_get("requested_quantity")?, "requested_quantity")?,
        approved_quantity: approved
            .map(|value| qty_from_db(value, "approved_quantity"))
            .transpose()?,
        reason: row.try_get("reason")?,
        status: status_from_db::<ReturnStatus>(&row.try_get::<String, _>("status")?)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl OrderRepository for PgOrders {
    async fn order_number_exists(&self, number: &str) -> RepoResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE order_number = $1)")
                .bind(number)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> RepoResult<(Order, Vec<OrderItem>)> {
        if items.is_empty() {
            return Err(RepositoryError::Conflict(
                "order must contain at least one item".to_owned(),
            ));
        }

        let shipping_address = serde_json::to_value(&order.shipping_address).map_err(|e| {
            RepositoryError::DataCorruption(format!("unserializable address snapshot: {e}"))
        })?;

        let mut tx = self.pool.begin().await?;

        // Order row first; items reference the returned ID. A unique
        // violation here means the generated number collided and the caller
        // should regenerate.
        let order_row = sqlx::query(&format!(
            "INSERT INTO orders
                 (order_number, owner_id, status, payment_method, payment_status,
                  subtotal, shipping, total, shipping_address,
                  gateway_order_id, gateway_payment_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&order.order_number)
        .bind(order.owner_id)
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.subtotal.amount())
        .bind(order.shipping.amount())
        .bind(order.total.amount())
        .bind(shipping_address)
        .bind(&order.gateway_order_id)
        .bind(&order.gateway_payment_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique(e, "order number already exists"))?;

        let created = row_to_order(&order_row)?;

        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let item_row = sqlx::query(&format!(
                "INSERT INTO order_items
                     (order_id, product_id, product_name, unit_price, quantity,
                      total_price, variant)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING {ITEM_COLUMNS}"
            ))
            .bind(created.id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.unit_price.amount())
            .bind(i32::try_from(item.quantity).unwrap_or(i32::MAX))
            .bind(item.total_price.amount())
            .bind(&item.variant)
            .fetch_one(&mut *tx)
            .await?;

            inserted.push(row_to_item(&item_row)?);
        }

        tx.commit().await?;
        Ok((created, inserted))
    }

    async fn get(&self, id: OrderId) -> RepoResult<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn items(&self, order_id: OrderId) -> RepoResult<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn get_item(&self, id: OrderItemId) -> RepoResult<Option<OrderItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_item).transpose()
    }

    async fn list_for_owner(&self, owner: UserId) -> RepoResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE owner_id = $1 ORDER BY id DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    async fn set_status(&self, id: OrderId, status: OrderStatus) -> RepoResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("order {id}")));
        }
        Ok(())
    }

    async fn apply_cancellation(
        &self,
        item_id: OrderItemId,
        expected_cancelled: u32,
        new_cancelled: u32,
        new_item_total: Price,
        new_order_total: Price,
        new_order_status: OrderStatus,
    ) -> RepoResult<Order> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-swap on the previously observed cancelled quantity
        let updated = sqlx::query(
            "UPDATE order_items
             SET cancelled_quantity = $3, total_price = $4
             WHERE id = $1 AND cancelled_quantity = $2
             RETURNING order_id",
        )
        .bind(item_id)
        .bind(i32::try_from(expected_cancelled).unwrap_or(i32::MAX))
        .bind(i32::try_from(new_cancelled).unwrap_or(i32::MAX))
        .bind(new_item_total.amount())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            RepositoryError::Conflict("order item was cancelled concurrently".to_owned())
        })?;

        let order_id = updated.try_get::<OrderId, _>("order_id")?;

        let order_row = sqlx::query(&format!(
            "UPDATE orders SET total = $2, status = $3
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(new_order_total.amount())
        .bind(new_order_status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let order = row_to_order(&order_row)?;
        tx.commit().await?;
        Ok(order)
    }

    async fn return_requests(&self, item_id: OrderItemId) -> RepoResult<Vec<ReturnRequest>> {
        let rows = sqlx::query(
            "SELECT id, order_item_id, requested_quantity, approved_quantity, reason,
                    status, created_at
             FROM return_requests WHERE order_item_id = $1 ORDER BY id",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_return).collect()
    }

    async fn get_return_request(&self, id: ReturnRequestId) -> RepoResult<Option<ReturnRequest>> {
        let row = sqlx::query(
            "SELECT id, order_item_id, requested_quantity, approved_quantity, reason,
                    status, created_at
             FROM return_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_return).transpose()
    }

    async fn create_return_request(
        &self,
        item_id: OrderItemId,
        quantity: u32,
        reason: &str,
    ) -> RepoResult<ReturnRequest> {
        let row = sqlx::query(
            "INSERT INTO return_requests (order_item_id, requested_quantity, reason, status)
             VALUES ($1, $2, $3, $4)
             RETURNING id, order_item_id, requested_quantity, approved_quantity, reason,
                       status, created_at",
        )
        .bind(item_id)
        .bind(i32::try_from(quantity).unwrap_or(i32::MAX))
        .bind(reason)
        .bind(ReturnStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;

        row_to_return(&row)
    }

    async fn update_return_request(
        &self,
        id: ReturnRequestId,
        status: ReturnStatus,
        approved_quantity: Option<u32>,
    ) -> RepoResult<ReturnRequest> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query(
            "SELECT id, order_item_id, requested_quantity, approved_quantity, reason,
                    status, created_at
             FROM return_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("return request {id}")))?;

        let current = row_to_return(&current)?;

        // Repeating a transition is a no-op
        if current.status == status {
            return Ok(current);
        }

        if current.status.is_terminal() {
            return Err(RepositoryError::Conflict(format!(
                "return request {id} already resolved as {}",
                current.status
            )));
        }

        let approved = approved_quantity
            .map(|value| i32::try_from(value).unwrap_or(i32::MAX))
            .or_else(|| {
                current
                    .approved_quantity
                    .map(|value| i32::try_from(value).unwrap_or(i32::MAX))
            });

        let row = sqlx::query(
            "UPDATE return_requests SET status = $2, approved_quantity = $3
             WHERE id = $1
             RETURNING id, order_item_id, requested_quantity, approved_quantity, reason,
                       status, created_at",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(approved)
        .fetch_one(&mut *tx)
        .await?;

        let request = row_to_return(&row)?;
        tx.commit().await?;
        Ok(request)
    }

    async fn apply_refund(
        &self,
        id: ReturnRequestId,
        refund_amount: Price,
    ) -> RepoResult<(ReturnRequest, Order)> {
        let mut tx = self.pool.begin().await?;

        // Conditional on the approved status, so a racing duplicate loses
        let row = sqlx::query(
            "UPDATE return_requests SET status = $2
             WHERE id = $1 AND status = $3
             RETURNING id, order_item_id, requested_quantity, approved_quantity, reason,
                       status, created_at",
        )
        .bind(id)
        .bind(ReturnStatus::Refunded.as_str())
        .bind(ReturnStatus::Approved.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::Conflict(format!("return request {id} is not approved")))?;

        let request = row_to_return(&row)?;

        let order_row = sqlx::query(&format!(
            "UPDATE orders SET total = total - $2
             WHERE id = (SELECT order_id FROM order_items WHERE id = $1)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(request.order_item_id)
        .bind(refund_amount.amount())
        .fetch_one(&mut *tx)
        .await?;

        let order = row_to_order(&order_row)?;
        tx.commit().await?;
        Ok((request, order))
    }
}
