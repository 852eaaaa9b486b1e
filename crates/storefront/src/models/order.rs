//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marigold_core::{
    OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductId,
    ReturnRequestId, ReturnStatus, UserId,
};

use super::address::AddressSnapshot;

/// A durable order record.
///
/// Created in a single persistence step together with its items — no order
/// exists without at least one item, and no item without its parent order
/// already committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Short human-readable identifier (e.g. "MG-48213"). Unique.
    pub order_number: String,
    /// Owning account; `None` for guest COD orders.
    pub owner_id: Option<UserId>,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// How the buyer paid.
    pub payment_method: PaymentMethod,
    /// Payment confirmation state.
    pub payment_status: PaymentStatus,
    /// Sum of item totals at placement.
    pub subtotal: Price,
    /// Shipping charge at placement.
    pub shipping: Price,
    /// Currently owed/paid total. Recomputed on item cancellation;
    /// `subtotal` and `shipping` keep their at-placement values.
    pub total: Price,
    /// Denormalized shipping address.
    pub shipping_address: AddressSnapshot,
    /// Gateway order reference for UPI/card payments.
    pub gateway_order_id: Option<String>,
    /// Gateway payment reference once verified.
    pub gateway_payment_id: Option<String>,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
}

/// One purchased line within an order.
///
/// `unit_price`, `quantity` and `product_name` are snapshots from the time
/// of purchase and are never overwritten; only `cancelled_quantity` and the
/// derived `total_price` change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// Unique item ID.
    pub id: OrderItemId,
    /// Parent order.
    pub order_id: OrderId,
    /// Purchased product.
    pub product_id: ProductId,
    /// Product name at purchase time.
    pub product_name: String,
    /// Unit price at purchase time.
    pub unit_price: Price,
    /// Units purchased. Never changes.
    pub quantity: u32,
    /// `unit_price × (quantity − cancelled_quantity)`.
    pub total_price: Price,
    /// Variant selector at purchase time.
    pub variant: Option<String>,
    /// Units cancelled after placement. `0 ≤ cancelled_quantity ≤ quantity`.
    pub cancelled_quantity: u32,
}

impl OrderItem {
    /// Units not yet cancelled.
    #[must_use]
    pub const fn uncancelled_quantity(&self) -> u32 {
        self.quantity - self.cancelled_quantity
    }

    /// The derived active total for a given cancelled quantity.
    #[must_use]
    pub fn total_for_cancelled(&self, cancelled: u32) -> Price {
        self.unit_price * self.quantity.saturating_sub(cancelled)
    }
}

/// A buyer's request to return part of an order item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRequest {
    /// Unique request ID.
    pub id: ReturnRequestId,
    /// The order item being returned.
    pub order_item_id: OrderItemId,
    /// Units the buyer asked to return.
    pub requested_quantity: u32,
    /// Units granted by the approval transition, if any.
    pub approved_quantity: Option<u32>,
    /// Buyer-supplied reason. Never empty.
    pub reason: String,
    /// Request lifecycle state.
    pub status: ReturnStatus,
    /// When the request was filed.
    pub created_at: DateTime<Utc>,
}

impl ReturnRequest {
    /// Units this request currently holds against the item's active
    /// quantity (see [`ReturnStatus::holds_quantity`]).
    #[must_use]
    pub fn held_quantity(&self) -> u32 {
        if self.status.holds_quantity() {
            self.approved_quantity.unwrap_or(self.requested_quantity)
        } else {
            0
        }
    }
}

/// Data for the order insert inside the creation transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub owner_id: Option<UserId>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
    pub shipping_address: AddressSnapshot,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
}

/// Data for one item insert inside the creation transaction.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub total_price: Price,
    pub variant: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: u32, cancelled: u32) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::new(1),
            product_id: ProductId::new(1),
            product_name: "Kurta".into(),
            unit_price: Price::from_rupees(500),
            quantity,
            total_price: Price::from_rupees(500) * (quantity - cancelled),
            variant: None,
            cancelled_quantity: cancelled,
        }
    }

    #[test]
    fn test_derived_totals() {
        let it = item(3, 1);
        assert_eq!(it.uncancelled_quantity(), 2);
        assert_eq!(it.total_for_cancelled(2), Price::from_rupees(500));
        assert_eq!(it.total_for_cancelled(3), Price::ZERO);
    }

    #[test]
    fn test_return_held_quantity() {
        let mut request = ReturnRequest {
            id: ReturnRequestId::new(1),
            order_item_id: OrderItemId::new(1),
            requested_quantity: 2,
            approved_quantity: None,
            reason: "size issue".into(),
            status: ReturnStatus::Pending,
            created_at: Utc::now(),
        };
        assert_eq!(request.held_quantity(), 2);

        request.status = ReturnStatus::Approved;
        request.approved_quantity = Some(1);
        assert_eq!(request.held_quantity(), 1);

        request.status = ReturnStatus::Rejected;
        assert_eq!(request.held_quantity(), 0);
    }
}
