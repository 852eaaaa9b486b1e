//! Human-readable order number generation.
//!
//! Numbers look like `MG-48213`: short enough to read over the phone.
//! Generation picks a random 5-digit suffix and checks it against existing
//! orders, retrying a bounded number of times. The pre-check only reduces
//! collisions; the unique constraint at insert time is what actually
//! guarantees uniqueness, and [`crate::services::orders::OrderService`]
//! regenerates on an insert conflict.

use rand::Rng;
use std::sync::Arc;

use crate::db::{OrderRepository, RepoResult};

/// Prefix on every order number.
pub const ORDER_NUMBER_PREFIX: &str = "MG-";

/// Random candidates tried before falling back to a timestamp.
const MAX_ATTEMPTS: u32 = 10;

fn random_candidate() -> String {
    let suffix: u32 = rand::rng().random_range(10_000..=99_999);
    format!("{ORDER_NUMBER_PREFIX}{suffix}")
}

/// Fallback when the random space is too contended: millisecond timestamps
/// are monotonic enough to not collide with each other in practice.
fn timestamp_fallback() -> String {
    format!("{ORDER_NUMBER_PREFIX}{}", chrono::Utc::now().timestamp_millis())
}

/// Generates order numbers against the order repository.
#[derive(Clone)]
pub struct OrderNumberGenerator {
    orders: Arc<dyn OrderRepository>,
}

impl OrderNumberGenerator {
    #[must_use]
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    /// Produce a candidate number that did not exist at check time.
    ///
    /// # Errors
    ///
    /// Returns a repository error if the existence check fails.
    pub async fn generate(&self) -> RepoResult<String> {
        for _ in 0..MAX_ATTEMPTS {
            let candidate = random_candidate();
            if !self.orders.order_number_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Ok(timestamp_fallback())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_shape() {
        for _ in 0..100 {
            let candidate = random_candidate();
            let suffix = candidate.strip_prefix(ORDER_NUMBER_PREFIX).unwrap();
            assert_eq!(suffix.len(), 5);
            let value: u32 = suffix.parse().unwrap();
            assert!((10_000..=99_999).contains(&value));
        }
    }

    #[test]
    fn test_fallback_shape() {
        let fallback = timestamp_fallback();
        let suffix = fallback.strip_prefix(ORDER_NUMBER_PREFIX).unwrap();
        assert!(suffix.len() > 5);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }
}
