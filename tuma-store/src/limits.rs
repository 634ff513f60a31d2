//! Ledger-backed daily volume policy.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use tuma_types::{
    Clock, Currency, DailyLimitPolicy, Money, RepoError, TransactionType, UserId,
};

/// Policy store reading today's moved volume from the ledger and the
/// caps from static per-kind configuration.
///
/// Deposits are capped in KES, withdrawals in USD - the source currency
/// of each operation.
pub struct SqliteLimitPolicy {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    deposit_cap_kes_cents: i64,
    withdrawal_cap_usd_cents: i64,
}

impl SqliteLimitPolicy {
    pub fn new(
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
        deposit_cap_kes_cents: i64,
        withdrawal_cap_usd_cents: i64,
    ) -> Self {
        Self {
            pool,
            clock,
            deposit_cap_kes_cents,
            withdrawal_cap_usd_cents,
        }
    }

    fn cap_currency(kind: TransactionType) -> Currency {
        match kind {
            TransactionType::Deposit => Currency::KES,
            TransactionType::Withdrawal => Currency::USD,
        }
    }
}

#[async_trait]
impl DailyLimitPolicy for SqliteLimitPolicy {
    async fn amount_moved_today(
        &self,
        user_id: UserId,
        kind: TransactionType,
    ) -> Result<Money, RepoError> {
        let column = match Self::cap_currency(kind) {
            Currency::USD => "amount_usd_cents",
            Currency::KES => "amount_kes_cents",
        };
        let sql = format!(
            "SELECT COALESCE(SUM(le.{column}), 0)
             FROM ledger_entries le
             JOIN transactions t ON t.id = le.transaction_id
             WHERE le.owner = ? AND t.kind = ? AND date(le.occurred_at) = date(?)"
        );
        let moved: i64 = sqlx::query_scalar(&sql)
            .bind(user_id.to_string())
            .bind(kind.to_string())
            .bind(self.clock.now().to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Money::new(moved, Self::cap_currency(kind)).map_err(RepoError::Domain)
    }

    async fn limit_for_user(
        &self,
        _user_id: UserId,
        kind: TransactionType,
    ) -> Result<Money, RepoError> {
        let cents = match kind {
            TransactionType::Deposit => self.deposit_cap_kes_cents,
            TransactionType::Withdrawal => self.withdrawal_cap_usd_cents,
        };
        Money::new(cents, Self::cap_currency(kind)).map_err(RepoError::Domain)
    }
}
