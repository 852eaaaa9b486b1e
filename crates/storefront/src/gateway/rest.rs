//! REST client for the hosted payment gateway.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{GatewayError, GatewayOrder, PaymentGateway};

/// HTTP client for the gateway's order API.
#[derive(Clone)]
pub struct RestGateway {
    client: Client,
    api_url: String,
    key_id: String,
    key_secret: SecretString,
}

impl std::fmt::Debug for RestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestGateway")
            .field("api_url", &self.api_url)
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

impl RestGateway {
    /// Create a new gateway client.
    #[must_use]
    pub fn new(api_url: String, key_id: String, key_secret: SecretString) -> Self {
        Self {
            client: Client::new(),
            api_url,
            key_id,
            key_secret,
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for RestGateway {
    #[instrument(skip(self), fields(amount_paise, receipt = %receipt))]
    async fn create_order(
        &self,
        amount_paise: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.api_url))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&CreateOrderRequest {
                amount: amount_paise,
                currency,
                receipt,
            })
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let order: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        debug!(gateway_order_id = %order.id, "Gateway order created");

        Ok(GatewayOrder {
            id: order.id,
            amount_paise: order.amount,
            currency: order.currency,
        })
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
