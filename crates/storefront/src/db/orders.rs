//! Order repository trait.

use async_trait::async_trait;

use marigold_core::{OrderId, OrderItemId, OrderStatus, Price, ReturnRequestId, ReturnStatus, UserId};

use super::RepoResult;
use crate::models::{NewOrder, NewOrderItem, Order, OrderItem, ReturnRequest};

/// Repository for orders, order items and return requests.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Whether an order with this human-readable number already exists.
    ///
    /// Best-effort pre-check only; the unique constraint on `order_number`
    /// at insert time is authoritative.
    async fn order_number_exists(&self, number: &str) -> RepoResult<bool>;

    /// Persist an order together with its items as a single logical unit.
    ///
    /// The order row is committed first and the items reference its ID, so
    /// a crash can never leave orphan items. Items must be non-empty.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` when `order_number` collides;
    /// callers regenerate the number and retry.
    async fn create(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> RepoResult<(Order, Vec<OrderItem>)>;

    /// Fetch one order.
    async fn get(&self, id: OrderId) -> RepoResult<Option<Order>>;

    /// Fetch an order's items.
    async fn items(&self, order_id: OrderId) -> RepoResult<Vec<OrderItem>>;

    /// Fetch one order item.
    async fn get_item(&self, id: OrderItemId) -> RepoResult<Option<OrderItem>>;

    /// List an owner's orders, newest first.
    async fn list_for_owner(&self, owner: UserId) -> RepoResult<Vec<Order>>;

    /// Overwrite an order's lifecycle status (e.g. mark delivered).
    async fn set_status(&self, id: OrderId, status: OrderStatus) -> RepoResult<()>;

    /// Apply an item-level cancellation and the recomputed parent totals in
    /// one transaction.
    ///
    /// Compare-and-swap on the item's current `cancelled_quantity`
    /// (`expected_cancelled`), so two racing cancellations cannot
    /// double-decrement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the item's cancelled quantity
    /// no longer matches `expected_cancelled`.
    #[allow(clippy::too_many_arguments)]
    async fn apply_cancellation(
        &self,
        item_id: OrderItemId,
        expected_cancelled: u32,
        new_cancelled: u32,
        new_item_total: Price,
        new_order_total: Price,
        new_order_status: OrderStatus,
    ) -> RepoResult<Order>;

    /// Fetch the return requests filed against an item.
    async fn return_requests(&self, item_id: OrderItemId) -> RepoResult<Vec<ReturnRequest>>;

    /// Fetch one return request.
    async fn get_return_request(&self, id: ReturnRequestId) -> RepoResult<Option<ReturnRequest>>;

    /// File a pending return request.
    async fn create_return_request(
        &self,
        item_id: OrderItemId,
        quantity: u32,
        reason: &str,
    ) -> RepoResult<ReturnRequest>;

    /// Transition a return request (withdraw/approve/reject).
    async fn update_return_request(
        &self,
        id: ReturnRequestId,
        status: ReturnStatus,
        approved_quantity: Option<u32>,
    ) -> RepoResult<ReturnRequest>;

    /// Refund an approved return request and deduct `refund_amount` from
    /// its order's recorded total, as one transaction.
    ///
    /// The status transition is conditional on the request still being
    /// `Approved`, so two racing refunds cannot deduct twice.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the request is not currently
    /// approved.
    async fn apply_refund(
        &self,
        id: ReturnRequestId,
        refund_amount: Price,
    ) -> RepoResult<(ReturnRequest, Order)>;
}
