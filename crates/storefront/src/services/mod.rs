//! Business logic services.
//!
//! Routes stay thin; everything that enforces an invariant lives here, over
//! the repository traits in [`crate::db`].

pub mod addresses;
pub mod cart;
pub mod checkout;
pub mod order_number;
pub mod orders;
pub mod payments;
pub mod returns;

pub use addresses::{AddressError, AddressService, NewAddressInput};
pub use cart::{CartError, CartService, GuestCart, MergeOutcome};
pub use checkout::{
    CheckoutError, CheckoutService, CheckoutSessions, PendingPayment, PlacedOrder,
};
pub use order_number::OrderNumberGenerator;
pub use orders::{OrderService, ShippingPolicy};
pub use payments::{PaymentIntent, PaymentReference, PaymentService};
pub use returns::{ReturnsError, ReturnsService};
