//! Shipping address domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marigold_core::{AddressId, PhoneNumber, PinCode, UserId};

/// A saved shipping address.
///
/// At most [`Address::MAX_PER_OWNER`] addresses per account, and at most one
/// with `is_default = true`. Both invariants are enforced in the repository,
/// not just the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    /// Unique address ID.
    pub id: AddressId,
    /// Owning account.
    pub owner_id: UserId,
    /// Recipient name.
    pub full_name: String,
    /// Street address.
    pub line1: String,
    /// City.
    pub city: String,
    /// State.
    pub state: String,
    /// 6-digit PIN code.
    pub pin_code: PinCode,
    /// 10-digit contact number.
    pub phone: PhoneNumber,
    /// Whether this is the owner's default address.
    pub is_default: bool,
    /// When the address was created.
    pub created_at: DateTime<Utc>,
    /// When the address was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Maximum saved addresses per account.
    pub const MAX_PER_OWNER: i64 = 3;
}

/// Validated data for creating or updating an address.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub full_name: String,
    pub line1: String,
    pub city: String,
    pub state: String,
    pub pin_code: PinCode,
    pub phone: PhoneNumber,
    pub is_default: bool,
}

/// Denormalized copy of an address persisted on an order.
///
/// Orders keep this snapshot so that later edits or deletions of the saved
/// address never change what an order shipped to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub full_name: String,
    pub line1: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
    pub phone: String,
}

impl From<&Address> for AddressSnapshot {
    fn from(address: &Address) -> Self {
        Self {
            full_name: address.full_name.clone(),
            line1: address.line1.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            pin_code: address.pin_code.as_str().to_owned(),
            phone: address.phone.as_str().to_owned(),
        }
    }
}
