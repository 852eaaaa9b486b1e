//! Checkout session state and the purchase intent resolver.
//!
//! A checkout session is identified by a random key stored in the browser
//! session. Everything that must happen at most once per checkout —
//! resolving the intent, registering a gateway order, submitting the order —
//! is guarded by caches keyed on that checkout key, so redundant triggers
//! (double-clicks, retried requests, racing tabs) all observe the one
//! in-flight or completed result instead of repeating side effects.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;

use marigold_core::{PaymentMethod, Price, ProductId, UserId};

use crate::db::{ProductRepository, RepositoryError};
use crate::models::{
    AddressSnapshot, CartItem, DirectPurchase, LineItem, Order, OrderItem, PurchaseIntent,
};
use marigold_core::IntentSource;

/// How long checkout session state (resolved intents, pending gateway
/// payments, placement results) stays alive.
const SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Errors from the checkout flow.
///
/// Clonable because results are shared between concurrent callers through
/// the single-flight caches.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    /// Cart checkout was requested but the cart has no items.
    #[error("Cart is empty")]
    CartEmpty,

    /// A referenced product is missing or inactive.
    #[error("Product {0} is unavailable")]
    ProductUnavailable(ProductId),

    /// A referenced product has fewer units than requested.
    #[error("Product {product_id} has only {available} left")]
    InsufficientStock {
        product_id: ProductId,
        available: u32,
    },

    /// Client-supplied input failed validation.
    #[error("Invalid checkout input: {0}")]
    Validation(String),

    /// Submit arrived without a resolved intent for this checkout session.
    #[error("No resolved purchase intent for this checkout session")]
    NoIntent,

    /// Submit arrived without a selected shipping address.
    #[error("No shipping address selected")]
    NoAddress,

    /// The payment gateway declined or failed the request.
    #[error("Payment gateway rejected the request: {0}")]
    GatewayRejected(String),

    /// The payment signature did not verify.
    #[error("Payment signature mismatch")]
    SignatureMismatch,

    /// Verification referenced a gateway order we are not waiting on.
    #[error("Unknown or expired payment reference")]
    UnknownPayment,

    /// An internal conflict that exhausted its retries.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Payment captured but the order could not be recorded. Never
    /// swallowed; logged with full context for manual follow-up.
    #[error("Reconciliation required: {0}")]
    Reconciliation(String),

    /// Underlying repository failure.
    #[error("Storage error: {0}")]
    Repository(String),
}

impl From<RepositoryError> for CheckoutError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Repository(other.to_string()),
        }
    }
}

/// A successfully placed order, shared with every duplicate submit.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Server-side record of a gateway order awaiting client authorization.
///
/// Holds everything needed to create the real order once the signature
/// verifies, so verification never trusts client-supplied pricing.
#[derive(Debug, Clone)]
pub struct PendingPayment {
    /// The checkout session that initiated this payment.
    pub checkout_key: String,
    /// The resolved intent being paid for.
    pub intent: PurchaseIntent,
    /// Buyer account, if authenticated.
    pub owner_id: Option<UserId>,
    /// Address snapshot taken at intent creation.
    pub address: AddressSnapshot,
    /// UPI or card.
    pub method: PaymentMethod,
    /// Shipping charge computed at intent creation.
    pub shipping: Price,
}

/// The per-checkout-session single-flight caches.
#[derive(Clone)]
pub struct CheckoutSessions {
    /// Resolved intent per checkout key.
    intents: Cache<String, PurchaseIntent>,
    /// Placement result per checkout key; duplicate submits for the same
    /// key return the already-placed order.
    placements: Cache<String, PlacedOrder>,
    /// Pending gateway payments keyed by gateway order ID. Entries expire
    /// with the session TTL, which bounds how long a payment window stays
    /// open.
    pending: Cache<String, PendingPayment>,
}

impl CheckoutSessions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            intents: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(SESSION_TTL)
                .build(),
            placements: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(SESSION_TTL)
                .build(),
            pending: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(SESSION_TTL)
                .build(),
        }
    }

    /// The resolved intent for a checkout key, if any.
    pub async fn intent(&self, key: &str) -> Option<PurchaseIntent> {
        self.intents.get(key).await
    }

    /// Drop the resolved intent (e.g. the buyer went back to the cart).
    pub async fn clear_intent(&self, key: &str) {
        self.intents.invalidate(key).await;
    }

    /// Run the placement future at most once per checkout key.
    ///
    /// Every concurrent or subsequent call with the same key observes the
    /// one result; a failed placement is not cached, so the buyer can
    /// retry.
    ///
    /// # Errors
    ///
    /// Propagates the future's `CheckoutError`.
    pub async fn place_once<F>(&self, key: &str, place: F) -> Result<PlacedOrder, CheckoutError>
    where
        F: Future<Output = Result<PlacedOrder, CheckoutError>>,
    {
        self.placements
            .try_get_with(key.to_owned(), place)
            .await
            .map_err(|e: Arc<CheckoutError>| (*e).clone())
    }

    /// The placed order for a checkout key, if one already completed.
    pub async fn placement(&self, key: &str) -> Option<PlacedOrder> {
        self.placements.get(key).await
    }

    /// Record a gateway order we are waiting on.
    pub async fn insert_pending(&self, gateway_order_id: String, pending: PendingPayment) {
        self.pending.insert(gateway_order_id, pending).await;
    }

    /// The pending payment for a gateway order, if still open.
    pub async fn pending(&self, gateway_order_id: &str) -> Option<PendingPayment> {
        self.pending.get(gateway_order_id).await
    }

    /// Close a payment window (verified or cancelled).
    pub async fn remove_pending(&self, gateway_order_id: &str) {
        self.pending.invalidate(gateway_order_id).await;
    }
}

impl Default for CheckoutSessions {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves what a checkout session is buying.
#[derive(Clone)]
pub struct CheckoutService {
    products: Arc<dyn ProductRepository>,
    sessions: CheckoutSessions,
}

impl CheckoutService {
    #[must_use]
    pub fn new(products: Arc<dyn ProductRepository>, sessions: CheckoutSessions) -> Self {
        Self { products, sessions }
    }

    #[must_use]
    pub const fn sessions(&self) -> &CheckoutSessions {
        &self.sessions
    }

    /// Resolve the purchase intent for a checkout session, at most once.
    ///
    /// A well-formed direct-purchase signal always wins over the cart, even
    /// a non-empty one. Products are fetched fresh here — price, stock and
    /// active status as of resolution — and the snapshot never re-reads
    /// them afterwards. Concurrent calls for the same checkout key share
    /// one resolution: one set of product fetches, one intent.
    ///
    /// # Errors
    ///
    /// `CartEmpty` when a cart checkout has nothing to buy,
    /// `ProductUnavailable` / `InsufficientStock` per offending product,
    /// `Validation` for a malformed direct-purchase signal.
    pub async fn resolve_intent(
        &self,
        checkout_key: &str,
        direct: Option<DirectPurchase>,
        cart_items: Vec<CartItem>,
    ) -> Result<PurchaseIntent, CheckoutError> {
        self.sessions
            .intents
            .try_get_with(
                checkout_key.to_owned(),
                self.resolve_fresh(direct, cart_items),
            )
            .await
            .map_err(|e: Arc<CheckoutError>| (*e).clone())
    }

    async fn resolve_fresh(
        &self,
        direct: Option<DirectPurchase>,
        cart_items: Vec<CartItem>,
    ) -> Result<PurchaseIntent, CheckoutError> {
        if let Some(direct) = direct {
            if direct.quantity == 0 {
                return Err(CheckoutError::Validation(
                    "direct purchase quantity must be at least 1".to_owned(),
                ));
            }
            let item = self
                .resolve_line(direct.product_id, direct.quantity, direct.variant)
                .await?;
            return Ok(PurchaseIntent {
                items: vec![item],
                source: IntentSource::Direct,
            });
        }

        if cart_items.is_empty() {
            return Err(CheckoutError::CartEmpty);
        }

        let mut items = Vec::with_capacity(cart_items.len());
        for line in cart_items {
            items.push(
                self.resolve_line(line.product_id, line.quantity, line.variant)
                    .await?,
            );
        }
        Ok(PurchaseIntent {
            items,
            source: IntentSource::Cart,
        })
    }

    async fn resolve_line(
        &self,
        product_id: ProductId,
        quantity: u32,
        variant: Option<String>,
    ) -> Result<LineItem, CheckoutError> {
        let product = self
            .products
            .get(product_id)
            .await?
            .filter(|product| product.is_active)
            .ok_or(CheckoutError::ProductUnavailable(product_id))?;

        if product.stock < quantity {
            return Err(CheckoutError::InsufficientStock {
                product_id,
                available: product.stock,
            });
        }

        Ok(LineItem {
            product_id,
            name: product.name,
            unit_price: product.price,
            quantity,
            variant,
        })
    }
}
