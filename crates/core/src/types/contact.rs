//! Validated contact fields for shipping addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PinCode`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PinCodeError {
    /// The input string is empty.
    #[error("PIN code cannot be empty")]
    Empty,
    /// The input is not exactly six digits.
    #[error("PIN code must be exactly 6 digits")]
    InvalidFormat,
}

/// An Indian postal PIN code.
///
/// ## Constraints
///
/// - Exactly 6 ASCII digits
/// - First digit non-zero (no PIN zone starts with 0)
///
/// ## Examples
///
/// ```
/// use marigold_core::PinCode;
///
/// assert!(PinCode::parse("560001").is_ok());
/// assert!(PinCode::parse("12345").is_err());  // 5 digits
/// assert!(PinCode::parse("1234567").is_err()); // 7 digits
/// assert!(PinCode::parse("56000a").is_err());  // non-digit
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PinCode(String);

impl PinCode {
    /// Length of a PIN code.
    pub const LENGTH: usize = 6;

    /// Parse a `PinCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or is not exactly six digits
    /// with a non-zero leading digit.
    pub fn parse(s: &str) -> Result<Self, PinCodeError> {
        if s.is_empty() {
            return Err(PinCodeError::Empty);
        }

        if s.len() != Self::LENGTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PinCodeError::InvalidFormat);
        }

        if s.starts_with('0') {
            return Err(PinCodeError::InvalidFormat);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the PIN code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhoneNumberError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input is not exactly ten digits.
    #[error("phone number must be exactly 10 digits")]
    InvalidFormat,
}

/// A 10-digit Indian mobile number (no country code).
///
/// ## Examples
///
/// ```
/// use marigold_core::PhoneNumber;
///
/// assert!(PhoneNumber::parse("9876543210").is_ok());
/// assert!(PhoneNumber::parse("987654321").is_err());   // 9 digits
/// assert!(PhoneNumber::parse("98765432100").is_err()); // 11 digits
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Length of a mobile number.
    pub const LENGTH: usize = 10;

    /// Parse a `PhoneNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or is not exactly ten ASCII
    /// digits.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        if s.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        if s.len() != Self::LENGTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PhoneNumberError::InvalidFormat);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_code_validation() {
        assert!(PinCode::parse("560001").is_ok());
        assert!(PinCode::parse("123456").is_ok());
        assert!(PinCode::parse("").is_err());
        assert!(PinCode::parse("12345").is_err());
        assert!(PinCode::parse("1234567").is_err());
        assert!(PinCode::parse("05600a").is_err());
        assert!(PinCode::parse("056001").is_err());
    }

    #[test]
    fn test_phone_validation() {
        assert!(PhoneNumber::parse("9876543210").is_ok());
        assert!(PhoneNumber::parse("").is_err());
        assert!(PhoneNumber::parse("98765").is_err());
        assert!(PhoneNumber::parse("98765432ab").is_err());
    }
}
