//! Daily-volume policy gate.

use std::sync::Arc;

use tuma_types::{DailyLimitPolicy, EngineError, Money, TransactionType, UserId};

/// Pure decision over the injected policy store: holds no state of its
/// own, just reads and compares.
///
/// The boundary is inclusive - a request that lands exactly on the cap
/// is allowed. Because the gate and the eventual ledger write are not
/// the same instant, the cap is re-checked inside the settlement
/// commit; this gate only rejects early.
pub struct DailyLimitChecker {
    policy: Arc<dyn DailyLimitPolicy>,
}

impl DailyLimitChecker {
    pub fn new(policy: Arc<dyn DailyLimitPolicy>) -> Self {
        Self { policy }
    }

    /// Whether the user may move `amount` more today for this kind.
    pub async fn can_move(
        &self,
        user_id: UserId,
        kind: TransactionType,
        amount: &Money,
    ) -> Result<bool, EngineError> {
        let (moved, limit) = self.read(user_id, kind).await?;
        let projected = moved.checked_add(*amount)?;
        Ok(projected.cents() <= limit.cents())
    }

    pub async fn can_deposit(&self, user_id: UserId, amount: &Money) -> Result<bool, EngineError> {
        self.can_move(user_id, TransactionType::Deposit, amount).await
    }

    pub async fn can_withdraw(&self, user_id: UserId, amount: &Money) -> Result<bool, EngineError> {
        self.can_move(user_id, TransactionType::Withdrawal, amount)
            .await
    }

    /// Rejects with `LimitExceeded` when the projected volume crosses
    /// the cap, carrying the numbers for the caller.
    pub async fn ensure_allowed(
        &self,
        user_id: UserId,
        kind: TransactionType,
        amount: &Money,
    ) -> Result<(), EngineError> {
        let (moved, limit) = self.read(user_id, kind).await?;
        let projected = moved.checked_add(*amount)?;
        if projected.cents() > limit.cents() {
            return Err(EngineError::LimitExceeded {
                moved_cents: moved.cents(),
                requested_cents: amount.cents(),
                limit_cents: limit.cents(),
            });
        }
        Ok(())
    }

    async fn read(
        &self,
        user_id: UserId,
        kind: TransactionType,
    ) -> Result<(Money, Money), EngineError> {
        let moved = self.policy.amount_moved_today(user_id, kind).await?;
        let limit = self.policy.limit_for_user(user_id, kind).await?;
        Ok((moved, limit))
    }

    /// The user's remaining cap for the kind, quoted in the policy's
    /// currency.
    pub async fn limit_for_user(
        &self,
        user_id: UserId,
        kind: TransactionType,
    ) -> Result<Money, EngineError> {
        Ok(self.policy.limit_for_user(user_id, kind).await?)
    }
}
