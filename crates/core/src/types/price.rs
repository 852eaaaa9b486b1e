//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are INR amounts in rupees (not paise) backed by [`Decimal`], so
//! money never goes through floating point. The gateway wants amounts in
//! paise; use [`Price::paise`] at that boundary.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A price in Indian rupees.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// The zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal rupee amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from a whole-rupee amount.
    #[must_use]
    pub fn from_rupees(rupees: i64) -> Self {
        Self(Decimal::from(rupees))
    }

    /// Create a price from an amount in paise (1/100 rupee).
    #[must_use]
    pub fn from_paise(paise: i64) -> Self {
        Self(Decimal::from_i128_with_scale(i128::from(paise), 2))
    }

    /// The rupee amount as a decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// The amount in paise, rounded to the nearest paisa.
    ///
    /// This is the unit the payment gateway bills in.
    #[must_use]
    pub fn paise(&self) -> i64 {
        (self.0 * Decimal::from(100))
            .round()
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    /// Whether the price is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Format for display (e.g., "₹499.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!("₹{:.2}", self.0)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, qty: u32) -> Self {
        Self(self.0 * Decimal::from(qty))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paise_conversion() {
        assert_eq!(Price::from_rupees(499).paise(), 49_900);
        assert_eq!(Price::from_paise(49_950).paise(), 49_950);
        assert_eq!(Price::from_paise(49_950).display(), "₹499.50");
    }

    #[test]
    fn test_arithmetic() {
        let unit = Price::from_paise(19_900);
        let line = unit * 3;
        assert_eq!(line.paise(), 59_700);

        let total: Price = [unit, line].into_iter().sum();
        assert_eq!(total.paise(), 79_600);
        assert_eq!((line - unit).paise(), 39_800);
    }

    #[test]
    fn test_serde_as_string() {
        // serde-with-str feature serializes Decimal as a string
        let p = Price::from_paise(12_345);
        let json = serde_json::to_string(&p).unwrap();
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
