//! Post-order mutations: item cancellation and return requests.
//!
//! Each order item's quantity is partitioned into active, cancelled and
//! return-held buckets that always sum to the original quantity. Purchase
//! history (unit price, ordered quantity) is never overwritten; only the
//! derived active totals move.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use marigold_core::{OrderItemId, OrderStatus, Price, ReturnRequestId, ReturnStatus, UserId};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::{Order, OrderItem, ReturnRequest};

/// Errors from post-order mutations.
#[derive(Debug, Error)]
pub enum ReturnsError {
    /// Client-supplied input failed validation.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The mutation is not allowed in the order's current state.
    #[error("Not allowed: {0}")]
    NotAllowed(String),

    /// The referenced order item or request does not exist (or is not
    /// the caller's).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A concurrent mutation won; the caller should re-read and retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ReturnsError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            RepositoryError::NotFound(message) => Self::NotFound(message),
            other => Self::Repository(other),
        }
    }
}

/// Item cancellation and return-request state machines.
#[derive(Clone)]
pub struct ReturnsService {
    orders: Arc<dyn OrderRepository>,
}

impl ReturnsService {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    /// Cancel `quantity` units of an order item.
    ///
    /// Allowed while the order is not delivered or fully cancelled, and
    /// only up to the item's remaining active quantity (ordered minus
    /// already cancelled minus units held by open returns). The item's
    /// derived total and the order's recorded total are recomputed in the
    /// same write; if every unit of every item ends up cancelled the order
    /// itself becomes cancelled and its shipping charge is released.
    ///
    /// A compare-and-swap on the item's current cancelled quantity makes
    /// double submission safe: the loser of a race gets `Conflict`, never a
    /// double decrement.
    ///
    /// # Errors
    ///
    /// `NotAllowed` outside the cancellation window, `Validation` for a
    /// quantity above the active remainder, `Conflict` on a lost race.
    pub async fn cancel_item(
        &self,
        owner: UserId,
        item_id: OrderItemId,
        quantity: u32,
    ) -> Result<Order, ReturnsError> {
        if quantity == 0 {
            return Err(ReturnsError::Validation(
                "cancellation quantity must be at least 1".to_owned(),
            ));
        }

        let (order, item) = self.owned_item(owner, item_id).await?;

        if !order.status.allows_cancellation() {
            return Err(ReturnsError::NotAllowed(format!(
                "order {} is {}, items can no longer be cancelled",
                order.order_number, order.status
            )));
        }

        let held = self.held_by_returns(item_id).await?;
        let active = item
            .quantity
            .saturating_sub(item.cancelled_quantity)
            .saturating_sub(held);
        if quantity > active {
            return Err(ReturnsError::Validation(format!(
                "cannot cancel {quantity} units, only {active} active"
            )));
        }

        let new_cancelled = item.cancelled_quantity + quantity;
        let new_item_total = item.total_for_cancelled(new_cancelled);
        let refunded: Price = item.unit_price * quantity;

        let fully_cancelled =
            new_cancelled == item.quantity && self.siblings_all_cancelled(&order, item_id).await?;

        let (new_status, new_total) = if fully_cancelled {
            (OrderStatus::Cancelled, Price::ZERO)
        } else {
            (order.status, order.total - refunded)
        };

        let updated = self
            .orders
            .apply_cancellation(
                item_id,
                item.cancelled_quantity,
                new_cancelled,
                new_item_total,
                new_total,
                new_status,
            )
            .await?;

        info!(
            order_number = %updated.order_number,
            item_id = %item_id,
            quantity,
            new_status = %updated.status,
            "Order item cancelled"
        );
        Ok(updated)
    }

    /// File a return request for `quantity` units of a delivered item.
    ///
    /// Does not change any totals; only the administrative refund
    /// transition does.
    ///
    /// # Errors
    ///
    /// `NotAllowed` unless the order is delivered, `Validation` for an
    /// empty reason or a quantity above the returnable remainder.
    pub async fn request_return(
        &self,
        owner: UserId,
        item_id: OrderItemId,
        quantity: u32,
        reason: &str,
    ) -> Result<ReturnRequest, ReturnsError> {
        if quantity == 0 {
            return Err(ReturnsError::Validation(
                "return quantity must be at least 1".to_owned(),
            ));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ReturnsError::Validation(
                "a return reason is required".to_owned(),
            ));
        }

        let (order, item) = self.owned_item(owner, item_id).await?;

        if !order.status.allows_returns() {
            return Err(ReturnsError::NotAllowed(format!(
                "order {} is {}, only delivered orders accept returns",
                order.order_number, order.status
            )));
        }

        let held = self.held_by_returns(item_id).await?;
        let returnable = item
            .quantity
            .saturating_sub(item.cancelled_quantity)
            .saturating_sub(held);
        if quantity > returnable {
            return Err(ReturnsError::Validation(format!(
                "cannot return {quantity} units, only {returnable} available"
            )));
        }

        let request = self
            .orders
            .create_return_request(item_id, quantity, reason)
            .await?;

        info!(
            order_number = %order.order_number,
            item_id = %item_id,
            request_id = %request.id,
            quantity,
            "Return requested"
        );
        Ok(request)
    }

    /// Buyer withdraws their own pending return request.
    ///
    /// # Errors
    ///
    /// `NotAllowed` once the request has been decided.
    pub async fn cancel_return(
        &self,
        owner: UserId,
        request_id: ReturnRequestId,
    ) -> Result<ReturnRequest, ReturnsError> {
        let request = self.owned_request(owner, request_id).await?;
        if request.status != ReturnStatus::Pending {
            return Err(ReturnsError::NotAllowed(format!(
                "return request is already {}",
                request.status
            )));
        }
        Ok(self
            .orders
            .update_return_request(request_id, ReturnStatus::Cancelled, None)
            .await?)
    }

    /// Administrative approval, optionally for fewer units than requested.
    ///
    /// # Errors
    ///
    /// `Validation` if `approved_quantity` exceeds the request, `Conflict`
    /// if the request is already decided differently.
    pub async fn approve_return(
        &self,
        request_id: ReturnRequestId,
        approved_quantity: Option<u32>,
    ) -> Result<ReturnRequest, ReturnsError> {
        let request = self.request(request_id).await?;
        let approved = approved_quantity.unwrap_or(request.requested_quantity);
        if approved == 0 || approved > request.requested_quantity {
            return Err(ReturnsError::Validation(format!(
                "approved quantity must be between 1 and {}",
                request.requested_quantity
            )));
        }
        Ok(self
            .orders
            .update_return_request(request_id, ReturnStatus::Approved, Some(approved))
            .await?)
    }

    /// Administrative rejection. Rejecting an already-rejected request is
    /// a no-op.
    ///
    /// # Errors
    ///
    /// `Conflict` if the request reached a different terminal state.
    pub async fn reject_return(
        &self,
        request_id: ReturnRequestId,
    ) -> Result<ReturnRequest, ReturnsError> {
        Ok(self
            .orders
            .update_return_request(request_id, ReturnStatus::Rejected, None)
            .await?)
    }

    /// Administrative refund of an approved return. This is the transition
    /// that moves money: the order's recorded total drops by the refunded
    /// units' price.
    ///
    /// # Errors
    ///
    /// `NotAllowed` unless the request is approved, `Conflict` when a
    /// concurrent refund of the same request wins.
    pub async fn refund_return(
        &self,
        request_id: ReturnRequestId,
    ) -> Result<ReturnRequest, ReturnsError> {
        let request = self.request(request_id).await?;
        if request.status != ReturnStatus::Approved {
            return Err(ReturnsError::NotAllowed(format!(
                "only approved returns can be refunded, this one is {}",
                request.status
            )));
        }

        let approved = request.approved_quantity.unwrap_or(request.requested_quantity);
        let item = self
            .orders
            .get_item(request.order_item_id)
            .await?
            .ok_or_else(|| ReturnsError::NotFound(format!("order item {}", request.order_item_id)))?;

        // The amount derives from immutable fields (unit price, approved
        // quantity); the status transition and the total deduction commit
        // together, conditional on the approved status, so a racing
        // duplicate refund gets Conflict instead of a second deduction.
        let refunded: Price = item.unit_price * approved;
        let (updated, order) = self.orders.apply_refund(request_id, refunded).await?;

        info!(
            order_number = %order.order_number,
            request_id = %request_id,
            refunded = %refunded,
            "Return refunded"
        );
        Ok(updated)
    }

    /// The return requests visible to an item's owner.
    ///
    /// # Errors
    ///
    /// `NotFound` if the item is missing or not theirs.
    pub async fn list_for_item(
        &self,
        owner: UserId,
        item_id: OrderItemId,
    ) -> Result<Vec<ReturnRequest>, ReturnsError> {
        self.owned_item(owner, item_id).await?;
        Ok(self.orders.return_requests(item_id).await?)
    }

    async fn owned_item(
        &self,
        owner: UserId,
        item_id: OrderItemId,
    ) -> Result<(Order, OrderItem), ReturnsError> {
        let item = self
            .orders
            .get_item(item_id)
            .await?
            .ok_or_else(|| ReturnsError::NotFound(format!("order item {item_id}")))?;
        let order = self
            .orders
            .get(item.order_id)
            .await?
            .filter(|order| order.owner_id == Some(owner))
            .ok_or_else(|| ReturnsError::NotFound(format!("order item {item_id}")))?;
        Ok((order, item))
    }

    async fn owned_request(
        &self,
        owner: UserId,
        request_id: ReturnRequestId,
    ) -> Result<ReturnRequest, ReturnsError> {
        let request = self.request(request_id).await?;
        self.owned_item(owner, request.order_item_id).await?;
        Ok(request)
    }

    async fn request(&self, request_id: ReturnRequestId) -> Result<ReturnRequest, ReturnsError> {
        self.orders
            .get_return_request(request_id)
            .await?
            .ok_or_else(|| ReturnsError::NotFound(format!("return request {request_id}")))
    }

    async fn held_by_returns(&self, item_id: OrderItemId) -> Result<u32, ReturnsError> {
        let requests = self.orders.return_requests(item_id).await?;
        Ok(requests.iter().map(ReturnRequest::held_quantity).sum())
    }

    async fn siblings_all_cancelled(
        &self,
        order: &Order,
        cancelling: OrderItemId,
    ) -> Result<bool, ReturnsError> {
        let items = self.orders.items(order.id).await?;
        Ok(items
            .iter()
            .filter(|item| item.id != cancelling)
            .all(|item| item.cancelled_quantity == item.quantity))
    }
}
