//! Type-safe monetary value with embedded currency.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Currencies moved by the remittance engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Trading-account balance currency.
    USD,
    /// Mobile-money rail currency.
    KES,
}

impl Currency {
    /// Returns the number of decimal places for this currency.
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::USD | Currency::KES => 2,
        }
    }

    /// Returns the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::KES => "KSh",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Type-safe money representation with embedded currency.
///
/// Amount is stored in the smallest unit of the currency (cents)
/// to avoid floating-point precision issues. All internal arithmetic
/// is integer arithmetic; decimal input is tolerated only at the
/// system boundary via [`Money::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    cents: i64,
    currency: Currency,
}

impl Money {
    /// Creates a new Money value.
    pub fn new(cents: i64, currency: Currency) -> Result<Self, DomainError> {
        if cents < 0 {
            return Err(DomainError::InvalidAmount);
        }
        Ok(Self { cents, currency })
    }

    /// Creates a zero-value Money for the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self { cents: 0, currency }
    }

    /// Parses a decimal string into cents, rounding half-up at two
    /// decimal places.
    ///
    /// This is the only place decimal input is accepted; everything past
    /// the boundary works in integer cents.
    pub fn parse(input: &str, currency: Currency) -> Result<Self, DomainError> {
        let s = input.trim();
        if s.is_empty() || s.starts_with('-') || s.starts_with('+') {
            return Err(DomainError::Validation(format!(
                "malformed amount: {input:?}"
            )));
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DomainError::Validation(format!(
                "malformed amount: {input:?}"
            )));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(DomainError::Validation(format!(
                "malformed amount: {input:?}"
            )));
        }

        let major: i64 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| DomainError::Validation(format!("amount out of range: {input:?}")))?
        };

        let mut digits = frac_part.chars();
        let d1 = digits.next().map(|c| c as i64 - '0' as i64).unwrap_or(0);
        let d2 = digits.next().map(|c| c as i64 - '0' as i64).unwrap_or(0);
        // half-up on the first truncated digit
        let round_up = digits.next().map(|c| c >= '5').unwrap_or(false);

        let cents = major
            .checked_mul(100)
            .and_then(|v| v.checked_add(d1 * 10 + d2))
            .and_then(|v| v.checked_add(i64::from(round_up)))
            .ok_or_else(|| DomainError::Validation(format!("amount out of range: {input:?}")))?;

        Self::new(cents, currency)
    }

    /// Returns the amount in smallest currency unit.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Checked addition - returns error if currencies don't match.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        Ok(Money {
            cents: self.cents.saturating_add(other.cents),
            currency: self.currency,
        })
    }

    /// Checked subtraction - returns error if currencies don't match or
    /// the result would be negative.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                got: other.currency,
            });
        }
        if self.cents < other.cents {
            return Err(DomainError::InsufficientFunds {
                available: self.cents,
                requested: other.cents,
            });
        }
        Ok(Money {
            cents: self.cents - other.cents,
            currency: self.currency,
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let major = self.cents / 100;
        let minor = self.cents % 100;
        write!(f, "{}{}.{:02}", self.currency.symbol(), major, minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let money = Money::new(1000, Currency::USD).unwrap();
        assert_eq!(money.cents(), 1000);
        assert_eq!(money.currency(), Currency::USD);
    }

    #[test]
    fn test_negative_money_fails() {
        let result = Money::new(-100, Currency::KES);
        assert!(matches!(result, Err(DomainError::InvalidAmount)));
    }

    #[test]
    fn test_money_addition() {
        let a = Money::new(100, Currency::USD).unwrap();
        let b = Money::new(50, Currency::USD).unwrap();
        let sum = a.checked_add(b).unwrap();
        assert_eq!(sum.cents(), 150);
    }

    #[test]
    fn test_addition_is_commutative_and_associative() {
        let a = Money::new(123, Currency::KES).unwrap();
        let b = Money::new(456, Currency::KES).unwrap();
        let c = Money::new(789, Currency::KES).unwrap();

        assert_eq!(a.checked_add(b).unwrap(), b.checked_add(a).unwrap());
        assert_eq!(
            a.checked_add(b).unwrap().checked_add(c).unwrap(),
            a.checked_add(b.checked_add(c).unwrap()).unwrap()
        );
    }

    #[test]
    fn test_currency_mismatch() {
        let usd = Money::new(100, Currency::USD).unwrap();
        let kes = Money::new(50, Currency::KES).unwrap();
        let result = usd.checked_add(kes);
        assert!(matches!(result, Err(DomainError::CurrencyMismatch { .. })));
    }

    #[test]
    fn test_subtraction_underflow_fails() {
        let a = Money::new(100, Currency::USD).unwrap();
        let b = Money::new(200, Currency::USD).unwrap();
        let result = a.checked_sub(b);
        assert!(matches!(
            result,
            Err(DomainError::InsufficientFunds {
                available: 100,
                requested: 200
            })
        ));
        // exact boundary succeeds
        assert_eq!(b.checked_sub(b).unwrap().cents(), 0);
    }

    #[test]
    fn test_parse_rounds_half_up() {
        assert_eq!(Money::parse("500.00", Currency::KES).unwrap().cents(), 50000);
        assert_eq!(Money::parse("10.005", Currency::USD).unwrap().cents(), 1001);
        assert_eq!(Money::parse("10.0049", Currency::USD).unwrap().cents(), 1000);
        assert_eq!(Money::parse("0.1", Currency::USD).unwrap().cents(), 10);
        assert_eq!(Money::parse(".5", Currency::USD).unwrap().cents(), 50);
        assert_eq!(Money::parse("7", Currency::USD).unwrap().cents(), 700);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(Money::parse("", Currency::USD).is_err());
        assert!(Money::parse("-5", Currency::USD).is_err());
        assert!(Money::parse("1.2.3", Currency::USD).is_err());
        assert!(Money::parse("12a", Currency::USD).is_err());
        assert!(Money::parse(".", Currency::USD).is_err());
    }

    #[test]
    fn test_money_display() {
        let usd = Money::new(1050, Currency::USD).unwrap();
        assert_eq!(format!("{}", usd), "$10.50");
        let kes = Money::new(50000, Currency::KES).unwrap();
        assert_eq!(format!("{}", kes), "KSh500.00");
    }
}
