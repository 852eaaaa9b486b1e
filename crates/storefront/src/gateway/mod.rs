//! Payment gateway integration.
//!
//! Gateway-backed payment methods (UPI, cards) go through a hosted checkout:
//! the server registers an order with the gateway, the client completes the
//! payment in the gateway's widget, and the gateway hands back a payment ID
//! plus an HMAC signature that the server verifies before trusting anything.

mod mock;
mod rest;

use async_trait::async_trait;
use thiserror::Error;

pub use mock::MockGateway;
pub use rest::RestGateway;

/// Errors from the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP request itself failed.
    #[error("Gateway request failed: {0}")]
    Request(String),

    /// The gateway answered with a non-success status.
    #[error("Gateway rejected the order: {status}: {body}")]
    Rejected {
        /// HTTP status returned by the gateway.
        status: u16,
        /// Response body, for the logs.
        body: String,
    },

    /// The gateway answered 2xx but the body did not parse.
    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),
}

/// An order registered with the gateway, awaiting payment.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    /// Gateway-issued order identifier (e.g. `order_Nxxxxx`).
    pub id: String,
    /// Amount in the currency's minor unit (paise).
    pub amount_paise: i64,
    /// ISO currency code.
    pub currency: String,
}

/// Server-side client for the payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register an order with the gateway for the given amount.
    ///
    /// `receipt` is an opaque reference echoed back in gateway dashboards;
    /// we pass the checkout key so payments can be traced to a session.
    async fn create_order(
        &self,
        amount_paise: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;

    /// Key ID handed to the client so the gateway widget can open.
    fn key_id(&self) -> &str;
}
