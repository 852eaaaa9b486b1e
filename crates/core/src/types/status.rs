//! Status enums for the order lifecycle.
//!
//! Stored in `PostgreSQL` as text columns; the `as_str`/`FromStr` pair is the
//! canonical wire and storage representation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error parsing a status string from storage or the wire.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct StatusParseError {
    /// Which status enum failed to parse.
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

macro_rules! status_str {
    ($ty:ident, $kind:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            /// Canonical string form (matches the serde representation).
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = StatusParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    other => Err(StatusParseError {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, payment not yet confirmed (gateway orders never persist in
    /// this state; it exists for data imported from legacy systems).
    #[default]
    Pending,
    /// Payment confirmed (COD counts as confirmed at placement).
    Paid,
    /// Handed over to the buyer.
    Delivered,
    /// Every item cancelled.
    Cancelled,
}

status_str!(OrderStatus, "order status", {
    Pending => "pending",
    Paid => "paid",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Whether item-level cancellation is still allowed.
    #[must_use]
    pub const fn allows_cancellation(&self) -> bool {
        !matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether return requests are allowed (delivered orders only).
    #[must_use]
    pub const fn allows_returns(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Payment status recorded on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

status_str!(PaymentStatus, "payment status", {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

/// How the buyer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery — confirmed at placement.
    Cod,
    /// UPI via the payment gateway.
    Upi,
    /// Card via the payment gateway.
    Card,
}

status_str!(PaymentMethod, "payment method", {
    Cod => "cod",
    Upi => "upi",
    Card => "card",
});

impl PaymentMethod {
    /// Whether this method settles through the external gateway
    /// (deferred order creation, §verify-then-create).
    #[must_use]
    pub const fn is_gateway(&self) -> bool {
        matches!(self, Self::Upi | Self::Card)
    }
}

/// Lifecycle of a return request on an order item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Refunded,
    Cancelled,
}

status_str!(ReturnStatus, "return status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
    Refunded => "refunded",
    Cancelled => "cancelled",
});

impl ReturnStatus {
    /// Whether this request still reserves quantity against the item.
    ///
    /// Rejected and cancelled requests release their quantity back to the
    /// active bucket; pending/approved/refunded requests hold it.
    #[must_use]
    pub const fn holds_quantity(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved | Self::Refunded)
    }

    /// Whether the request has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Refunded | Self::Cancelled)
    }
}

/// Where a purchase intent's line items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    /// Checkout of the persisted or guest cart.
    Cart,
    /// Single-product "buy now" checkout that bypasses the cart.
    Direct,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_cancellation_windows() {
        assert!(OrderStatus::Paid.allows_cancellation());
        assert!(!OrderStatus::Delivered.allows_cancellation());
        assert!(!OrderStatus::Cancelled.allows_cancellation());
        assert!(OrderStatus::Delivered.allows_returns());
        assert!(!OrderStatus::Paid.allows_returns());
    }

    #[test]
    fn test_gateway_methods() {
        assert!(!PaymentMethod::Cod.is_gateway());
        assert!(PaymentMethod::Upi.is_gateway());
        assert!(PaymentMethod::Card.is_gateway());
    }

    #[test]
    fn test_return_quantity_holds() {
        assert!(ReturnStatus::Pending.holds_quantity());
        assert!(ReturnStatus::Refunded.holds_quantity());
        assert!(!ReturnStatus::Rejected.holds_quantity());
        assert!(!ReturnStatus::Cancelled.holds_quantity());
    }
}
