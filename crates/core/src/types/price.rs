//! Per-pack price representation using decimal arithmetic.
//!
//! Stock is costed and sold per pack, so every monetary value attached to a
//! line or batch is a price *per pack*. Multiplying by a number of packs gives
//! the line total.

use core::fmt;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price for a single pack.
///
/// Serialized as a plain decimal string (`"12.50"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an integer amount of minor units (e.g. cents).
    #[must_use]
    pub fn from_minor(minor: i64) -> Self {
        Self(Decimal::new(minor, 2))
    }

    /// Create a price from a floating-point amount, as GraphQL `Float`
    /// fields deliver it. Returns `None` for NaN and infinities.
    #[must_use]
    pub fn from_f64(amount: f64) -> Option<Self> {
        Decimal::try_from(amount).ok().map(Self)
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Total for the given number of packs.
    #[must_use]
    pub fn total_for(&self, number_of_packs: u32) -> Decimal {
        self.0 * Decimal::from(number_of_packs)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_total_for() {
        let price = Price::from_minor(250);
        assert_eq!(price.total_for(4), Decimal::new(1000, 2));
        assert_eq!(price.total_for(0), Decimal::ZERO);
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Price::from_f64(2.25), Some(Price::from_minor(225)));
        assert_eq!(Price::from_f64(0.1), Some(Price::new(Decimal::new(1, 1))));
        assert_eq!(Price::from_f64(f64::NAN), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_minor(1999).to_string(), "19.99");
        assert_eq!(Price::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_serde_roundtrip() {
        let price = Price::from_minor(1250);
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"12.50\"");
        let parsed: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, price);
    }
}
