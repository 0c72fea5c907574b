use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub number: Decimal,
    pub currency_code: String,
}

impl Price {
    pub fn new(number: Decimal, currency_code: impl Into<String>) -> Self {
        Self { number, currency_code: currency_code.into() }
    }

    pub fn zero(currency_code: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Currency-aware addition. Amounts in different currencies are never summed.
    pub fn checked_add(&self, other: &Price) -> Result<Price, DomainError> {
        if self.currency_code != other.currency_code {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency_code.clone(),
                found: other.currency_code.clone(),
            });
        }

        Ok(Price::new(self.number + other.number, self.currency_code.clone()))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::Price;
    use crate::errors::DomainError;

    #[test]
    fn adds_prices_in_the_same_currency() {
        let total = Price::zero("USD")
            .checked_add(&Price::new(Decimal::new(1999, 2), "USD"))
            .and_then(|sum| sum.checked_add(&Price::new(Decimal::new(501, 2), "USD")))
            .expect("same currency");

        assert_eq!(total, Price::new(Decimal::new(2500, 2), "USD"));
    }

    #[test]
    fn rejects_mixed_currency_addition() {
        let error = Price::zero("USD")
            .checked_add(&Price::new(Decimal::new(1000, 2), "EUR"))
            .expect_err("mixed currency should fail");

        assert_eq!(
            error,
            DomainError::CurrencyMismatch { expected: "USD".to_string(), found: "EUR".to_string() }
        );
    }
}
