//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from database row types.
//! Row decoding lives in `crate::db::postgres`.

pub mod address;
pub mod cart;
pub mod intent;
pub mod order;
pub mod product;
pub mod session;

pub use address::{Address, AddressSnapshot, NewAddress};
pub use cart::{Cart, CartItem, NewCartItem};
pub use intent::{DirectPurchase, LineItem, PurchaseIntent};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, ReturnRequest};
pub use product::{NewProduct, Product};
pub use session::session_keys;
