//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. The response body is always
//! `{ "code": ..., "message": ... }` so clients can branch on the error
//! class; server-side failures are captured to Sentry before responding.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AddressError, CartError, CheckoutError, ReturnsError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad client input; the user re-prompts and retries.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The checkout cannot proceed with what the session has (empty cart,
    /// product gone, stock out). Terminal for the session; back to
    /// browsing.
    #[error("Unavailable: {message}")]
    Unavailable { code: &'static str, message: String },

    /// Resource not found (or not the caller's).
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized")]
    Unauthorized,

    /// A conflicting concurrent mutation or exhausted internal retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The payment gateway declined the request; the user may retry.
    #[error("Gateway rejected: {0}")]
    GatewayRejected(String),

    /// Payment verification failed; no order was created.
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// Payment captured but persistence failed. Logged with full context;
    /// the user is told to contact support, never to blindly retry.
    #[error("Reconciliation required: {0}")]
    Reconciliation(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CheckoutError> for AppError {
    fn from(error: CheckoutError) -> Self {
        match error {
            CheckoutError::CartEmpty => Self::Unavailable {
                code: "CART_EMPTY",
                message: "Your cart is empty".to_owned(),
            },
            CheckoutError::ProductUnavailable(id) => Self::Unavailable {
                code: "PRODUCT_UNAVAILABLE",
                message: format!("Product {id} is no longer available"),
            },
            CheckoutError::InsufficientStock {
                product_id,
                available,
            } => Self::Unavailable {
                code: "INSUFFICIENT_STOCK",
                message: format!("Product {product_id} has only {available} left"),
            },
            CheckoutError::Validation(message) => Self::Validation(message),
            CheckoutError::NoIntent => {
                Self::Validation("Checkout has not been started for this session".to_owned())
            }
            CheckoutError::NoAddress => {
                Self::Validation("Select a shipping address first".to_owned())
            }
            CheckoutError::GatewayRejected(message) => Self::GatewayRejected(message),
            CheckoutError::SignatureMismatch => {
                Self::PaymentFailed("Payment could not be verified".to_owned())
            }
            CheckoutError::UnknownPayment => {
                Self::NotFound("No pending payment for that reference".to_owned())
            }
            CheckoutError::Conflict(message) => Self::Conflict(message),
            CheckoutError::Reconciliation(message) => Self::Reconciliation(message),
            CheckoutError::Repository(message) => Self::Internal(message),
        }
    }
}

impl From<CartError> for AppError {
    fn from(error: CartError) -> Self {
        match error {
            CartError::Validation(message) => Self::Validation(message),
            CartError::NotFound(message) => Self::NotFound(message),
            CartError::Repository(inner) => Self::Database(inner),
        }
    }
}

impl From<AddressError> for AppError {
    fn from(error: AddressError) -> Self {
        match error {
            AddressError::Validation(message) => Self::Validation(message),
            AddressError::LimitReached => {
                Self::Conflict("Address limit reached, remove one first".to_owned())
            }
            AddressError::NotFound => Self::NotFound("Address not found".to_owned()),
            AddressError::Repository(inner) => Self::Database(inner),
        }
    }
}

impl From<ReturnsError> for AppError {
    fn from(error: ReturnsError) -> Self {
        match error {
            ReturnsError::Validation(message) | ReturnsError::NotAllowed(message) => {
                Self::Validation(message)
            }
            ReturnsError::NotFound(message) => Self::NotFound(message),
            ReturnsError::Conflict(message) => Self::Conflict(message),
            ReturnsError::Repository(inner) => Self::Database(inner),
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(error: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {error}"))
    }
}

impl AppError {
    const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::Unavailable { code, .. } => code,
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Conflict(_) => "CONFLICT",
            Self::GatewayRejected(_) => "GATEWAY_REJECTED",
            Self::PaymentFailed(_) => "PAYMENT_FAILED",
            Self::Reconciliation(_) => "RECONCILIATION",
            Self::Database(_) | Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry; reconciliation events are the
        // one class that must never pass silently.
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Reconciliation(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable { .. } => StatusCode::GONE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::GatewayRejected(_) => StatusCode::PAYMENT_REQUIRED,
            Self::PaymentFailed(_) => StatusCode::BAD_REQUEST,
            Self::Reconciliation(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Reconciliation(_) => {
                "Your payment was received but we hit a problem recording the order. \
                 Please contact support — do not pay again."
                    .to_owned()
            }
            Self::Unavailable { message, .. } => message.clone(),
            other => other.to_string(),
        };

        (
            status,
            Json(json!({ "code": self.code(), "message": message })),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: AppError) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::Validation("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(CheckoutError::CartEmpty.into()),
            StatusCode::GONE
        );
        assert_eq!(
            status_of(AppError::GatewayRejected("declined".into())),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(CheckoutError::SignatureMismatch.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Reconciliation("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unavailable_codes_distinguish_causes() {
        let empty: AppError = CheckoutError::CartEmpty.into();
        let gone: AppError = CheckoutError::ProductUnavailable(marigold_core::ProductId::new(3)).into();
        assert_eq!(empty.code(), "CART_EMPTY");
        assert_eq!(gone.code(), "PRODUCT_UNAVAILABLE");
        assert_eq!(empty.to_string(), "Unavailable: Your cart is empty");
    }
}
