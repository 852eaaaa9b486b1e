//! Session key constants.
//!
//! Everything the checkout flow keeps per-browser lives in the
//! tower-session under these keys.

/// Session keys used across route handlers.
pub mod session_keys {
    /// Logged-in user ID (`i32`). Absent for guests.
    pub const USER_ID: &str = "user_id";
    /// Serialized guest cart (`GuestCart`). Absent for authenticated users
    /// once merged.
    pub const GUEST_CART: &str = "guest_cart";
    /// Address selected for the current checkout (`i32`). Session-local
    /// state, not a mutation of the address record.
    pub const SELECTED_ADDRESS: &str = "selected_address";
    /// Checkout session key (`String`, uuid). Scopes the single-flight
    /// guards for intent resolution and order submission. Rotated after a
    /// successful placement.
    pub const CHECKOUT_KEY: &str = "checkout_key";
}
