//! Locked FX-rate snapshot.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::{Currency, Money};
use crate::error::DomainError;

/// A frozen exchange-rate snapshot with an explicit usage window.
///
/// Settlement is asynchronous, so a rate is only safe to use inside its
/// TTL; orchestrators re-lock instead of reusing a stale snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LockedRate {
    rate: f64,
    from: Currency,
    to: Currency,
    locked_at: DateTime<Utc>,
    ttl_seconds: i64,
}

impl LockedRate {
    /// Captures a rate at the given instant.
    ///
    /// # Validation
    /// - Rate must be finite and strictly positive
    /// - The pair must actually convert between two currencies
    pub fn lock(
        rate: f64,
        from: Currency,
        to: Currency,
        locked_at: DateTime<Utc>,
        ttl_seconds: i64,
    ) -> Result<Self, DomainError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(DomainError::InvalidRate(rate));
        }
        if from == to {
            return Err(DomainError::Validation(
                "rate lock requires two distinct currencies".into(),
            ));
        }
        if ttl_seconds <= 0 {
            return Err(DomainError::Validation(
                "rate lock TTL must be positive".into(),
            ));
        }
        Ok(Self {
            rate,
            from,
            to,
            locked_at,
            ttl_seconds,
        })
    }

    /// Converts money from the source to the target currency at the
    /// locked rate, rounding half-up.
    pub fn convert(&self, money: Money) -> Result<Money, DomainError> {
        if money.currency() != self.from {
            return Err(DomainError::CurrencyMismatch {
                expected: self.from,
                got: money.currency(),
            });
        }
        let cents = (money.cents() as f64 * self.rate).round() as i64;
        Money::new(cents, self.to)
    }

    /// Returns the instant at which the lock stops being usable.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.locked_at + Duration::seconds(self.ttl_seconds)
    }

    /// Returns true once the usage window has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn from_currency(&self) -> Currency {
        self.from
    }

    pub fn to_currency(&self) -> Currency {
        self.to
    }

    pub fn locked_at(&self) -> DateTime<Utc> {
        self.locked_at
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }
}

impl fmt::Display for LockedRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{} @ {}", self.from, self.to, self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn locked_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_lock_rejects_non_positive_rate() {
        for bad in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            let result = LockedRate::lock(bad, Currency::KES, Currency::USD, locked_at(), 45);
            assert!(result.is_err(), "rate {bad} should be rejected");
        }
    }

    #[test]
    fn test_lock_rejects_same_currency_pair() {
        let result = LockedRate::lock(1.0, Currency::USD, Currency::USD, locked_at(), 45);
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_convert_requires_source_currency() {
        let rate = LockedRate::lock(0.0076, Currency::KES, Currency::USD, locked_at(), 45).unwrap();
        let usd = Money::new(100, Currency::USD).unwrap();
        assert!(matches!(
            rate.convert(usd),
            Err(DomainError::CurrencyMismatch {
                expected: Currency::KES,
                got: Currency::USD
            })
        ));
    }

    #[test]
    fn test_convert_kes_deposit_scenario() {
        // KES 500.00 at 0.0076 -> 380 USD cents
        let rate = LockedRate::lock(0.0076, Currency::KES, Currency::USD, locked_at(), 45).unwrap();
        let kes = Money::new(50000, Currency::KES).unwrap();
        let usd = rate.convert(kes).unwrap();
        assert_eq!(usd.cents(), 380);
        assert_eq!(usd.currency(), Currency::USD);
    }

    #[test]
    fn test_convert_rounds_half_up() {
        let rate = LockedRate::lock(0.0076, Currency::KES, Currency::USD, locked_at(), 45).unwrap();
        // 66 KES cents * 0.0076 = 0.5016 -> 1 USD cent
        let tiny = Money::new(66, Currency::KES).unwrap();
        assert_eq!(rate.convert(tiny).unwrap().cents(), 1);
        // 65 KES cents * 0.0076 = 0.494 -> 0 USD cents
        let tinier = Money::new(65, Currency::KES).unwrap();
        assert_eq!(rate.convert(tinier).unwrap().cents(), 0);
    }

    #[test]
    fn test_expiry_window() {
        let rate = LockedRate::lock(128.2, Currency::USD, Currency::KES, locked_at(), 45).unwrap();
        assert!(!rate.is_expired(locked_at()));
        assert!(!rate.is_expired(locked_at() + Duration::seconds(44)));
        assert!(rate.is_expired(locked_at() + Duration::seconds(45)));
        assert!(rate.is_expired(locked_at() + Duration::seconds(300)));
    }
}
