//! Deposit orchestration: mobile-money KES in, trading-balance USD out.

use std::sync::Arc;

use tracing::instrument;

use tuma_types::{
    Clock, Currency, DomainEvent, EngineError, EventPublisher, FxService, IdempotencyKey,
    InitiateDepositRequest, Money, RepoError, Transaction, TransactionRepository, TransactionType,
    topics,
};

use crate::command::{lock_fresh_rate, replay_existing};
use crate::factory::TransactionFactory;
use crate::limits::DailyLimitChecker;

/// Coordinates the synchronous deposit path.
///
/// The flow never reaches further than CREATED here; collection on the
/// mobile-money rail and the resulting terminal transition belong to
/// the asynchronous settlement path.
pub struct DepositOrchestrator {
    transactions: Arc<dyn TransactionRepository>,
    fx: Arc<dyn FxService>,
    limits: DailyLimitChecker,
    publisher: Arc<dyn EventPublisher>,
    factory: TransactionFactory,
    clock: Arc<dyn Clock>,
}

impl DepositOrchestrator {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        fx: Arc<dyn FxService>,
        limits: DailyLimitChecker,
        publisher: Arc<dyn EventPublisher>,
        factory: TransactionFactory,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transactions,
            fx,
            limits,
            publisher,
            factory,
            clock,
        }
    }

    /// Accepts a deposit command with exactly-once semantics.
    ///
    /// Resubmitting the same `(user, idempotency_key)` pair returns the
    /// stored transaction unchanged; it is never an error and performs
    /// no new work.
    #[instrument(skip(self, req), fields(user_id = %req.user_id))]
    pub async fn initiate_deposit(
        &self,
        req: InitiateDepositRequest,
    ) -> Result<Transaction, EngineError> {
        let key = IdempotencyKey::new(req.idempotency_key)?;
        let amount = Money::new(req.amount_kes_cents, Currency::KES)?;

        if let Some(existing) = self
            .transactions
            .find_by_idempotency_key(req.user_id, &key)
            .await?
        {
            return replay_existing(existing, TransactionType::Deposit, &key);
        }

        self.limits
            .ensure_allowed(req.user_id, TransactionType::Deposit, &amount)
            .await?;

        let rate = lock_fresh_rate(&self.fx, &self.clock, Currency::KES, Currency::USD).await?;

        let mut tx = self.factory.deposit(req.user_id, amount, key.clone(), rate)?;

        if let Err(err) = self.transactions.insert(&tx).await {
            return match err {
                // Lost the compare-and-insert race: the winner's row is
                // the result for both submitters.
                RepoError::Conflict(_) => {
                    let existing = self
                        .transactions
                        .find_by_idempotency_key(req.user_id, &key)
                        .await?
                        .ok_or_else(|| {
                            EngineError::Internal(
                                "idempotency conflict without a stored transaction".into(),
                            )
                        })?;
                    replay_existing(existing, TransactionType::Deposit, &key)
                }
                other => Err(other.into()),
            };
        }

        self.publish_initiated(&mut tx).await?;
        Ok(tx)
    }

    async fn publish_initiated(&self, tx: &mut Transaction) -> Result<(), EngineError> {
        for event in tx.drain_events() {
            if let DomainEvent::TransactionCreated { .. } = event {
                let quoted_usd = tx.rate.convert(tx.amount)?;
                let payload = serde_json::json!({
                    "transaction_id": tx.id,
                    "user_id": tx.user_id,
                    "amount_kes_cents": tx.amount.cents(),
                    "quoted_usd_cents": quoted_usd.cents(),
                    "rate": tx.rate.rate(),
                    "rate_expires_at": tx.rate.expires_at(),
                });
                self.publisher
                    .publish(topics::DEPOSIT_INITIATED, payload)
                    .await?;
            }
        }
        Ok(())
    }
}
