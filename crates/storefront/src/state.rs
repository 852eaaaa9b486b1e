//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::MarigoldConfig;
use crate::db::Store;
use crate::gateway::{MockGateway, PaymentGateway, RestGateway};
use crate::services::{
    AddressService, CartService, CheckoutService, CheckoutSessions, OrderService, PaymentService,
    ReturnsService, ShippingPolicy,
};
use marigold_core::Price;
use secrecy::SecretString;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Store,
    pool: Option<PgPool>,
    carts: CartService,
    addresses: AddressService,
    checkout: CheckoutService,
    orders: OrderService,
    payments: PaymentService,
    returns: ReturnsService,
}

impl AppState {
    /// Production state: `PostgreSQL` store and the REST gateway client.
    #[must_use]
    pub fn new(config: &MarigoldConfig, pool: PgPool) -> Self {
        let store = Store::postgres(pool.clone());
        let gateway = Arc::new(RestGateway::new(
            config.gateway.api_url.clone(),
            config.gateway.key_id.clone(),
            config.gateway.key_secret.clone(),
        ));
        let shipping = ShippingPolicy {
            fee: config.shipping_fee,
            free_threshold: config.free_shipping_threshold,
        };
        Self::build(
            store,
            gateway,
            config.gateway.key_secret.clone(),
            shipping,
            Some(pool),
        )
    }

    /// In-memory state with the mock gateway (tests, local development).
    #[must_use]
    pub fn in_memory(gateway: Arc<MockGateway>, key_secret: &str) -> Self {
        let shipping = ShippingPolicy {
            fee: Price::from_rupees(49),
            free_threshold: Price::from_rupees(499),
        };
        Self::build(
            Store::memory(),
            gateway,
            SecretString::from(key_secret.to_owned()),
            shipping,
            None,
        )
    }

    fn build(
        store: Store,
        gateway: Arc<dyn PaymentGateway>,
        key_secret: SecretString,
        shipping: ShippingPolicy,
        pool: Option<PgPool>,
    ) -> Self {
        let sessions = CheckoutSessions::new();
        let orders = OrderService::new(store.clone(), shipping);
        let payments = PaymentService::new(gateway, key_secret, sessions.clone(), orders.clone());
        let checkout = CheckoutService::new(store.products.clone(), sessions);
        let carts = CartService::new(store.clone());
        let addresses = AddressService::new(store.addresses.clone());
        let returns = ReturnsService::new(store.orders.clone());

        Self {
            inner: Arc::new(AppStateInner {
                store,
                pool,
                carts,
                addresses,
                checkout,
                orders,
                payments,
                returns,
            }),
        }
    }

    /// The repository bundle (seeding, tests, readiness checks).
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// The database pool, when running on `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressService {
        &self.inner.addresses
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn payments(&self) -> &PaymentService {
        &self.inner.payments
    }

    #[must_use]
    pub fn returns(&self) -> &ReturnsService {
        &self.inner.returns
    }
}
