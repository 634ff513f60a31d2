//! Validated construction of transactions.

use std::sync::Arc;

use tuma_types::{
    Clock, Currency, DomainError, IdempotencyKey, LockedRate, Money, Transaction, TransactionId,
    TransactionType, UserId,
};

/// Builds transactions with ids and timestamps from the injected clock.
///
/// Construction is the only way a transaction comes into existence, so
/// every invariant (positive amount, correctly oriented rate) is
/// enforced here before anything is persisted.
pub struct TransactionFactory {
    clock: Arc<dyn Clock>,
}

impl TransactionFactory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Builds a CREATED deposit: KES collected on the rail, quoted into
    /// USD at the locked rate.
    pub fn deposit(
        &self,
        user_id: UserId,
        amount: Money,
        idempotency_key: IdempotencyKey,
        rate: LockedRate,
    ) -> Result<Transaction, DomainError> {
        if amount.currency() != Currency::KES {
            return Err(DomainError::CurrencyMismatch {
                expected: Currency::KES,
                got: amount.currency(),
            });
        }
        if rate.from_currency() != Currency::KES || rate.to_currency() != Currency::USD {
            return Err(DomainError::Validation(
                "deposit rate must convert KES to USD".into(),
            ));
        }
        let now = self.clock.now();
        Transaction::new(
            TransactionId::new_at(now),
            user_id,
            TransactionType::Deposit,
            amount,
            idempotency_key,
            rate,
            now,
        )
    }

    /// Builds a CREATED withdrawal: USD leaving the trading balance,
    /// quoted into KES at the locked rate.
    pub fn withdrawal(
        &self,
        user_id: UserId,
        amount: Money,
        idempotency_key: IdempotencyKey,
        rate: LockedRate,
    ) -> Result<Transaction, DomainError> {
        if amount.currency() != Currency::USD {
            return Err(DomainError::CurrencyMismatch {
                expected: Currency::USD,
                got: amount.currency(),
            });
        }
        if rate.from_currency() != Currency::USD || rate.to_currency() != Currency::KES {
            return Err(DomainError::Validation(
                "withdrawal rate must convert USD to KES".into(),
            ));
        }
        let now = self.clock.now();
        Transaction::new(
            TransactionId::new_at(now),
            user_id,
            TransactionType::Withdrawal,
            amount,
            idempotency_key,
            rate,
            now,
        )
    }
}
