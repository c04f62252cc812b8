//! Decimal prices.
//!
//! Prices are stored as `NUMERIC(12,2)` and handled as [`Decimal`] end to end
//! so that line totals and order totals add up exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("price cannot be negative")]
    Negative,
    #[error("price cannot have more than 2 decimal places")]
    TooPrecise,
    #[error("price exceeds the maximum of {max}")]
    TooLarge { max: Decimal },
}

/// A unit price in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Largest value that fits `NUMERIC(12,2)`.
    pub const MAX: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

    /// Validate a decimal amount as a price.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has more than two decimal
    /// places, or does not fit the column.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        if amount > Self::MAX {
            return Err(PriceError::TooLarge { max: Self::MAX });
        }
        Ok(Self(amount))
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Total for one order or cart line.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_price_accepts_cents() {
        let price = Price::new(dec("1299.90")).unwrap();
        assert_eq!(price.to_string(), "1299.90");
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_price_rejects_invalid_amounts() {
        assert_eq!(Price::new(dec("-0.01")), Err(PriceError::Negative));
        assert_eq!(Price::new(dec("9.999")), Err(PriceError::TooPrecise));
        assert!(matches!(
            Price::new(dec("10000000000.00")),
            Err(PriceError::TooLarge { .. })
        ));
        assert!(Price::new(dec("9999999999.99")).is_ok());
    }

    #[test]
    fn test_line_total_is_exact() {
        assert_eq!(line_total(dec("19.99"), 3), dec("59.97"));
        assert_eq!(line_total(dec("0.10"), 0), Decimal::ZERO);
    }

    #[test]
    fn test_price_deserializes_from_string() {
        let price: Price = serde_json::from_str("\"49.50\"").unwrap();
        assert_eq!(price.amount(), dec("49.50"));
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
    }
}
