//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /ready                       - Readiness check (database ping)
//!
//! # Products (collaborator surface)
//! GET  /products/{id}               - Product detail
//!
//! # Cart
//! GET    /cart                      - Current cart (guest or account)
//! POST   /cart/items                - Add item
//! POST   /cart/items/{id}           - Update quantity (0 removes)
//! DELETE /cart/items/{id}           - Remove item
//! DELETE /cart                      - Clear cart
//!
//! # Auth
//! POST /auth/login                  - Log in; merges the guest cart
//! POST /auth/logout                 - Log out
//!
//! # Addresses (requires auth)
//! GET  /addresses                   - List saved addresses
//! POST /addresses                   - Create (≤3 per account)
//! PUT  /addresses/{id}              - Update
//! POST /addresses/{id}/select       - Select for this checkout session
//!
//! # Checkout
//! POST /checkout/resolve            - Resolve the purchase intent
//! POST /checkout/submit             - Place a COD order
//! POST /checkout/payment/intent     - Register a gateway order
//! POST /checkout/payment/verify     - Verify payment, finalize the order
//! POST /checkout/payment/cancel     - Buyer dismissed the gateway UI
//!
//! # Orders (requires auth)
//! GET  /orders                      - Order history
//! GET  /orders/{id}                 - Order detail with items
//! POST /orders/{id}/deliver         - Mark delivered
//! POST /orders/items/{id}/cancel    - Cancel units of an item
//! POST /orders/items/{id}/return    - Request a return
//! GET  /orders/items/{id}/returns   - Return requests for an item
//! POST /returns/{id}/cancel         - Withdraw a pending return
//!
//! # Administrative return transitions
//! POST /admin/returns/{id}/approve
//! POST /admin/returns/{id}/reject
//! POST /admin/returns/{id}/refund
//! ```

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{id}", post(cart::update).delete(cart::remove))
}

/// Create the address routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::list).post(addresses::create))
        .route("/{id}", put(addresses::update))
        .route("/{id}/select", post(addresses::select))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/resolve", post(checkout::resolve))
        .route("/submit", post(checkout::submit))
        .route("/payment/intent", post(checkout::payment_intent))
        .route("/payment/verify", post(checkout::payment_verify))
        .route("/payment/cancel", post(checkout::payment_cancel))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/{id}", get(orders::show))
        .route("/{id}/deliver", post(orders::deliver))
        .route("/items/{id}/cancel", post(orders::cancel_item))
        .route("/items/{id}/return", post(orders::request_return))
        .route("/items/{id}/returns", get(orders::list_returns))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/products/{id}", get(products::show))
        .nest("/cart", cart_routes())
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .nest("/addresses", address_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
        .route("/returns/{id}/cancel", post(orders::cancel_return))
        .route("/admin/returns/{id}/approve", post(orders::approve_return))
        .route("/admin/returns/{id}/reject", post(orders::reject_return))
        .route("/admin/returns/{id}/refund", post(orders::refund_return))
}

/// Liveness probe.
async fn health() -> &'static str {
    "OK"
}

/// Readiness probe; pings the database when one is configured.
async fn ready(State(state): State<AppState>) -> StatusCode {
    match state.pool() {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => StatusCode::OK,
            Err(_) => StatusCode::SERVICE_UNAVAILABLE,
        },
        None => StatusCode::OK,
    }
}
