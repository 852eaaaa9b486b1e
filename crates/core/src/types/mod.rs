//! Core types for Marigold.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod id;
pub mod price;
pub mod status;

pub use contact::{PhoneNumber, PhoneNumberError, PinCode, PinCodeError};
pub use id::*;
pub use price::Price;
pub use status::*;
