//! Order creation and lifecycle.
//!
//! `place_order` is the single write path for every payment method: COD
//! submits come here directly, gateway submits come here from payment
//! verification. The order row and its items commit as one unit; the stock
//! decrement runs after commit and is deliberately decoupled — a paid order
//! stands even if stock reconciliation is needed.

use tracing::{error, info};

use marigold_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{AddressSnapshot, NewOrder, NewOrderItem, Order, PurchaseIntent};
use crate::services::checkout::{CheckoutError, PlacedOrder};
use crate::services::order_number::OrderNumberGenerator;

/// Insert attempts before an order-number conflict stops being retried.
const MAX_NUMBER_RETRIES: u32 = 5;

/// Shipping pricing policy.
#[derive(Debug, Clone, Copy)]
pub struct ShippingPolicy {
    /// Flat fee below the free-shipping threshold.
    pub fee: Price,
    /// Subtotal at or above which shipping is free.
    pub free_threshold: Price,
}

impl ShippingPolicy {
    /// Shipping charge for a given subtotal.
    #[must_use]
    pub fn charge_for(&self, subtotal: Price) -> Price {
        if subtotal >= self.free_threshold {
            Price::ZERO
        } else {
            self.fee
        }
    }
}

/// Order creation and post-placement lifecycle transitions.
#[derive(Clone)]
pub struct OrderService {
    store: Store,
    numbers: OrderNumberGenerator,
    shipping: ShippingPolicy,
}

impl OrderService {
    #[must_use]
    pub fn new(store: Store, shipping: ShippingPolicy) -> Self {
        let numbers = OrderNumberGenerator::new(store.orders.clone());
        Self {
            store,
            numbers,
            shipping,
        }
    }

    #[must_use]
    pub const fn shipping_policy(&self) -> &ShippingPolicy {
        &self.shipping
    }

    /// Persist an order from a resolved intent.
    ///
    /// COD orders are confirmed at placement (`paid`/`completed`); gateway
    /// orders only reach here after signature verification, carrying their
    /// gateway references. An order-number conflict at insert time is
    /// retried with a fresh number up to a bound.
    ///
    /// # Errors
    ///
    /// `Conflict` when number generation stays contended past the retry
    /// bound; `Repository` on other persistence failures.
    pub async fn place_order(
        &self,
        intent: &PurchaseIntent,
        owner_id: Option<UserId>,
        address: AddressSnapshot,
        method: PaymentMethod,
        gateway_order_id: Option<String>,
        gateway_payment_id: Option<String>,
    ) -> Result<PlacedOrder, CheckoutError> {
        let subtotal = intent.subtotal();
        let shipping = self.shipping.charge_for(subtotal);
        let total = subtotal + shipping;

        let items: Vec<NewOrderItem> = intent
            .items
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.product_id,
                product_name: line.name.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                total_price: line.line_total(),
                variant: line.variant.clone(),
            })
            .collect();

        let mut last_conflict = String::new();
        for _ in 0..MAX_NUMBER_RETRIES {
            let order_number = self.numbers.generate().await?;
            let order = NewOrder {
                order_number,
                owner_id,
                status: OrderStatus::Paid,
                payment_method: method,
                payment_status: PaymentStatus::Completed,
                subtotal,
                shipping,
                total,
                shipping_address: address.clone(),
                gateway_order_id: gateway_order_id.clone(),
                gateway_payment_id: gateway_payment_id.clone(),
            };

            match self.store.orders.create(order, items.clone()).await {
                Ok((order, items)) => {
                    info!(
                        order_id = %order.id,
                        order_number = %order.order_number,
                        method = %order.payment_method,
                        total = %order.total,
                        "Order placed"
                    );
                    self.decrement_stock(&order, intent).await;
                    return Ok(PlacedOrder { order, items });
                }
                Err(RepositoryError::Conflict(message)) => {
                    // Someone inserted the same number between our check
                    // and the insert; regenerate and try again.
                    last_conflict = message;
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(CheckoutError::Conflict(format!(
            "could not allocate a unique order number: {last_conflict}"
        )))
    }

    /// Best-effort stock decrement after the order is committed.
    ///
    /// A failure here never unwinds the order; it is logged as a
    /// reconciliation event with enough context for manual follow-up.
    async fn decrement_stock(&self, order: &Order, intent: &PurchaseIntent) {
        for line in &intent.items {
            if let Err(e) = self
                .store
                .products
                .decrement_stock(line.product_id, line.quantity)
                .await
            {
                error!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    error = %e,
                    "RECONCILIATION: stock decrement failed for a placed order"
                );
            }
        }
    }

    /// Fetch an order with its items, checking ownership.
    ///
    /// # Errors
    ///
    /// `Repository` with not-found semantics if missing or not theirs.
    pub async fn get_owned(
        &self,
        id: OrderId,
        owner: UserId,
    ) -> Result<Option<PlacedOrder>, RepositoryError> {
        let Some(order) = self.store.orders.get(id).await? else {
            return Ok(None);
        };
        if order.owner_id != Some(owner) {
            return Ok(None);
        }
        let items = self.store.orders.items(id).await?;
        Ok(Some(PlacedOrder { order, items }))
    }

    /// List an owner's orders, newest first.
    ///
    /// # Errors
    ///
    /// Propagates repository failures.
    pub async fn list_for_owner(&self, owner: UserId) -> Result<Vec<Order>, RepositoryError> {
        self.store.orders.list_for_owner(owner).await
    }

    /// Mark a paid order as delivered.
    ///
    /// # Errors
    ///
    /// `Conflict` unless the order is currently `paid`.
    pub async fn mark_delivered(&self, id: OrderId) -> Result<(), RepositoryError> {
        let order = self
            .store
            .orders
            .get(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("order {id}")))?;

        if order.status != OrderStatus::Paid {
            return Err(RepositoryError::Conflict(format!(
                "order {id} is {}, only paid orders can be delivered",
                order.status
            )));
        }
        self.store.orders.set_status(id, OrderStatus::Delivered).await
    }

    /// Expose the store for collaborating services.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use marigold_core::{IntentSource, ProductId};

    fn policy() -> ShippingPolicy {
        ShippingPolicy {
            fee: Price::from_rupees(49),
            free_threshold: Price::from_rupees(499),
        }
    }

    fn snapshot() -> AddressSnapshot {
        AddressSnapshot {
            full_name: "Asha Rao".into(),
            line1: "14 MG Road".into(),
            city: "Bengaluru".into(),
            state: "Karnataka".into(),
            pin_code: "560001".into(),
            phone: "9876543210".into(),
        }
    }

    fn intent_of(price: i64, quantity: u32) -> PurchaseIntent {
        PurchaseIntent {
            items: vec![LineItem {
                product_id: ProductId::new(1),
                name: "Kurta".into(),
                unit_price: Price::from_rupees(price),
                quantity,
                variant: None,
            }],
            source: IntentSource::Cart,
        }
    }

    #[test]
    fn test_shipping_policy_threshold() {
        let policy = policy();
        assert_eq!(policy.charge_for(Price::from_rupees(498)), Price::from_rupees(49));
        assert_eq!(policy.charge_for(Price::from_rupees(499)), Price::ZERO);
        assert_eq!(policy.charge_for(Price::from_rupees(5000)), Price::ZERO);
    }

    #[tokio::test]
    async fn test_cod_order_is_paid_at_creation() {
        let store = Store::memory();
        let service = OrderService::new(store.clone(), policy());

        let placed = service
            .place_order(
                &intent_of(799, 1),
                Some(UserId::new(1)),
                snapshot(),
                PaymentMethod::Cod,
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(placed.order.status, OrderStatus::Paid);
        assert_eq!(placed.order.payment_status, PaymentStatus::Completed);
        assert_eq!(placed.order.subtotal, Price::from_rupees(799));
        assert_eq!(placed.order.shipping, Price::ZERO);
        assert_eq!(placed.order.total, Price::from_rupees(799));
        assert_eq!(placed.items.len(), 1);
        assert!(placed.order.order_number.starts_with("MG-"));
    }

    #[tokio::test]
    async fn test_shipping_added_below_threshold() {
        let store = Store::memory();
        let service = OrderService::new(store.clone(), policy());

        let placed = service
            .place_order(
                &intent_of(199, 1),
                None,
                snapshot(),
                PaymentMethod::Cod,
                None,
                None,
            )
            .await
            .unwrap();

        assert_eq!(placed.order.shipping, Price::from_rupees(49));
        assert_eq!(placed.order.total, Price::from_rupees(248));
    }

    #[tokio::test]
    async fn test_order_survives_stock_decrement_failure() {
        let store = Store::memory();
        let service = OrderService::new(store.clone(), policy());

        // No such product in the store: the decrement fails, the order
        // still stands.
        let placed = service
            .place_order(
                &intent_of(799, 2),
                Some(UserId::new(1)),
                snapshot(),
                PaymentMethod::Cod,
                None,
                None,
            )
            .await
            .unwrap();

        let fetched = service
            .get_owned(placed.order.id, UserId::new(1))
            .await
            .unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn test_mark_delivered_requires_paid() {
        let store = Store::memory();
        let service = OrderService::new(store.clone(), policy());

        let placed = service
            .place_order(
                &intent_of(799, 1),
                Some(UserId::new(1)),
                snapshot(),
                PaymentMethod::Cod,
                None,
                None,
            )
            .await
            .unwrap();

        service.mark_delivered(placed.order.id).await.unwrap();

        // Second delivery attempt conflicts.
        assert!(matches!(
            service.mark_delivered(placed.order.id).await,
            Err(RepositoryError::Conflict(_))
        ));
    }
}
