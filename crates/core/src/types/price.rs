//! Price display type backed by decimal arithmetic.
//!
//! Prices arrive from the remote API as plain JSON numbers with a separate
//! currency field. This type pairs the two for rendering; money math in the
//! cart stays on [`Decimal`] and only the end result becomes a `Price`.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount of money with an optional currency code.
///
/// Displays with exactly two decimal places, followed by the currency code
/// when one is present: `249.00 NOK`, `12.50`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g. kroner, not øre).
    pub amount: Decimal,
    /// Currency code as reported by the API (e.g. `NOK`). Not validated
    /// against ISO 4217; the API owns the vocabulary.
    pub currency: Option<String>,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Option<String>) -> Self {
        Self { amount, currency }
    }

    /// A zero price with no currency.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            amount: Decimal::ZERO,
            currency: None,
        }
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.currency {
            Some(code) => write!(f, "{:.2} {code}", self.amount),
            None => write!(f, "{:.2}", self.amount),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_currency() {
        let price = Price::new(Decimal::new(2_4900, 2), Some("NOK".to_owned()));
        assert_eq!(price.to_string(), "249.00 NOK");
    }

    #[test]
    fn test_display_without_currency() {
        let price = Price::new(Decimal::new(1250, 2), None);
        assert_eq!(price.to_string(), "12.50");
    }

    #[test]
    fn test_display_pads_decimals() {
        let price = Price::new(Decimal::new(10, 0), Some("NOK".to_owned()));
        assert_eq!(price.to_string(), "10.00 NOK");
    }

    #[test]
    fn test_zero() {
        assert!(Price::zero().is_zero());
        assert_eq!(Price::zero().to_string(), "0.00");
    }
}
