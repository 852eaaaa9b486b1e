//! In-process gateway stand-in for tests and local development.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::{GatewayError, GatewayOrder, PaymentGateway};

/// Gateway that fabricates order IDs without any network traffic.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    counter: Arc<AtomicU64>,
    fail: Arc<AtomicBool>,
}

impl MockGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create_order` calls fail as if the gateway
    /// rejected them.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(
        &self,
        amount_paise: i64,
        currency: &str,
        _receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status: 400,
                body: "mock gateway set to fail".to_owned(),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_MOCK{n}"),
            amount_paise,
            currency: currency.to_owned(),
        })
    }

    fn key_id(&self) -> &str {
        "key_mock"
    }
}
