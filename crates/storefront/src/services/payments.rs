//! Gateway payment protocol: intent creation and verification.
//!
//! Three steps: the server registers a gateway order for the computed total
//! (no local order exists yet), the buyer authorizes in the gateway widget,
//! and the client posts back `(gateway_order_id, gateway_payment_id,
//! signature)`. Only after the server re-computes and matches the signature
//! does the real order get created. The client's "success" callback is
//! never trusted on its own.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, error, info};

use marigold_core::{PaymentMethod, Price, UserId};

use crate::gateway::PaymentGateway;
use crate::models::{AddressSnapshot, PurchaseIntent};
use crate::services::checkout::{CheckoutError, CheckoutSessions, PendingPayment, PlacedOrder};
use crate::services::orders::OrderService;

/// Currency every gateway order is denominated in.
const CURRENCY: &str = "INR";

/// What the client needs to open the gateway's payment widget.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub gateway_order_id: String,
    pub amount_paise: i64,
    pub currency: String,
    /// Public key ID for the gateway's client library.
    pub key: String,
}

/// Client-posted payment reference to verify.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PaymentReference {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    /// Hex-encoded HMAC-SHA256 over `"{gateway_order_id}|{gateway_payment_id}"`.
    pub signature: String,
}

/// Orchestrates the gateway payment protocol.
#[derive(Clone)]
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    key_secret: SecretString,
    sessions: CheckoutSessions,
    orders: OrderService,
}

impl PaymentService {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        key_secret: SecretString,
        sessions: CheckoutSessions,
        orders: OrderService,
    ) -> Self {
        Self {
            gateway,
            key_secret,
            sessions,
            orders,
        }
    }

    /// Register a gateway order for this checkout's computed total.
    ///
    /// No local order exists after this step; the intent, address and
    /// pricing are parked server-side keyed on the gateway order ID, so
    /// verification later never trusts client-supplied amounts.
    ///
    /// # Errors
    ///
    /// `Validation` for a non-gateway payment method, `GatewayRejected`
    /// when the gateway declines the registration.
    pub async fn create_intent(
        &self,
        checkout_key: &str,
        intent: PurchaseIntent,
        owner_id: Option<UserId>,
        address: AddressSnapshot,
        method: PaymentMethod,
    ) -> Result<PaymentIntent, CheckoutError> {
        if !method.is_gateway() {
            return Err(CheckoutError::Validation(format!(
                "payment method {method} does not use the gateway"
            )));
        }

        let subtotal = intent.subtotal();
        let shipping = self.orders.shipping_policy().charge_for(subtotal);
        let total: Price = subtotal + shipping;

        let gateway_order = self
            .gateway
            .create_order(total.paise(), CURRENCY, checkout_key)
            .await
            .map_err(|e| CheckoutError::GatewayRejected(e.to_string()))?;

        self.sessions
            .insert_pending(
                gateway_order.id.clone(),
                PendingPayment {
                    checkout_key: checkout_key.to_owned(),
                    intent,
                    owner_id,
                    address,
                    method,
                    shipping,
                },
            )
            .await;

        debug!(
            gateway_order_id = %gateway_order.id,
            amount_paise = gateway_order.amount_paise,
            "Gateway payment intent created"
        );

        Ok(PaymentIntent {
            gateway_order_id: gateway_order.id,
            amount_paise: gateway_order.amount_paise,
            currency: gateway_order.currency,
            key: self.gateway.key_id().to_owned(),
        })
    }

    /// Verify a client-posted payment reference and finalize the order.
    ///
    /// On signature mismatch no order is created and the payment window
    /// stays open, so a legitimate retry can still land. A persistence
    /// failure after a verified capture is the dangerous case — payment
    /// taken, no order — and is surfaced as `Reconciliation`, logged with
    /// the gateway references, never as a generic error.
    ///
    /// # Errors
    ///
    /// `UnknownPayment`, `SignatureMismatch`, `Reconciliation` as above.
    pub async fn verify(&self, reference: &PaymentReference) -> Result<PlacedOrder, CheckoutError> {
        let pending = self
            .sessions
            .pending(&reference.gateway_order_id)
            .await
            .ok_or(CheckoutError::UnknownPayment)?;

        if !self.signature_matches(
            &reference.gateway_order_id,
            &reference.gateway_payment_id,
            &reference.signature,
        ) {
            info!(
                gateway_order_id = %reference.gateway_order_id,
                "Payment signature mismatch, order not created"
            );
            return Err(CheckoutError::SignatureMismatch);
        }

        let placed = self
            .sessions
            .place_once(&pending.checkout_key, async {
                self.orders
                    .place_order(
                        &pending.intent,
                        pending.owner_id,
                        pending.address.clone(),
                        pending.method,
                        Some(reference.gateway_order_id.clone()),
                        Some(reference.gateway_payment_id.clone()),
                    )
                    .await
                    .map_err(|e| {
                        error!(
                            gateway_order_id = %reference.gateway_order_id,
                            gateway_payment_id = %reference.gateway_payment_id,
                            error = %e,
                            "RECONCILIATION: payment captured but order creation failed"
                        );
                        CheckoutError::Reconciliation(format!(
                            "payment {} captured but order creation failed",
                            reference.gateway_payment_id
                        ))
                    })
            })
            .await?;

        self.sessions
            .remove_pending(&reference.gateway_order_id)
            .await;
        self.sessions.clear_intent(&pending.checkout_key).await;

        Ok(placed)
    }

    /// Close a payment window after the buyer dismissed the gateway UI.
    ///
    /// Dismissal is a normal terminal state, not an error; the checkout can
    /// start over with a fresh intent.
    pub async fn cancel(&self, gateway_order_id: &str) {
        self.sessions.remove_pending(gateway_order_id).await;
        debug!(gateway_order_id, "Pending payment cancelled");
    }

    fn signature_matches(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let Ok(mut mac) =
            Hmac::<Sha256>::new_from_slice(self.key_secret.expose_secret().as_bytes())
        else {
            return false;
        };
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());
        constant_time_compare(&expected, signature)
    }
}

/// Constant-time string comparison to avoid timing side channels.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// Compute the signature the gateway would attach (test and tooling use).
#[must_use]
pub fn sign_reference(key_secret: &str, order_id: &str, payment_id: &str) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key_secret.as_bytes()).ok()?;
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc123", "abc12"));
    }

    #[test]
    fn test_sign_reference_is_deterministic() {
        let a = sign_reference("secret", "order_1", "pay_1").unwrap();
        let b = sign_reference("secret", "order_1", "pay_1").unwrap();
        let c = sign_reference("secret", "order_1", "pay_2").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
