//! Asynchronous settlement confirmation path.

use std::sync::Arc;

use tracing::instrument;

use tuma_types::{
    Clock, DailyLimitPolicy, DomainError, DomainEvent, EngineError, EventPublisher, LedgerEntry,
    LedgerRepository, Money, SettlementOutcome, Transaction, TransactionId, TransactionRepository,
    TransactionStatus, TransactionType, topics,
};

/// Drives transactions to their terminal states once the external
/// provider reports an outcome.
///
/// The synchronous command path stops at CREATED/PENDING_EXTERNAL; this
/// service is what the confirmation worker calls afterwards.
pub struct SettlementService {
    transactions: Arc<dyn TransactionRepository>,
    ledger: Arc<dyn LedgerRepository>,
    policy: Arc<dyn DailyLimitPolicy>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
}

impl SettlementService {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        ledger: Arc<dyn LedgerRepository>,
        policy: Arc<dyn DailyLimitPolicy>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transactions,
            ledger,
            policy,
            publisher,
            clock,
        }
    }

    /// Records that the initiated event reached the settlement worker.
    ///
    /// Idempotent from the dispatcher's point of view: redelivery after
    /// the transaction moved on is absorbed, not an error.
    pub async fn mark_external_dispatched(&self, id: TransactionId) -> Result<(), EngineError> {
        let mut tx = self
            .transactions
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("transaction {id}")))?;
        if tx.status != TransactionStatus::Created {
            return Ok(());
        }
        tx.mark_pending_external()?;
        self.transactions.update(&tx).await?;
        Ok(())
    }

    /// Applies a provider outcome to the transaction.
    ///
    /// Success writes the balanced ledger pair, the terminal status and
    /// the in-transaction daily-cap re-check as ONE storage operation;
    /// failure records the provider error. Either way the terminal
    /// event is drained and published.
    #[instrument(skip(self, outcome))]
    pub async fn confirm(
        &self,
        id: TransactionId,
        outcome: SettlementOutcome,
    ) -> Result<Transaction, EngineError> {
        let mut tx = self
            .transactions
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("transaction {id}")))?;
        let now = self.clock.now();

        match outcome {
            SettlementOutcome::Success { reference, .. } => {
                tx.confirm_external(reference, now)?;

                let (amount_usd, amount_kes) = dual_amounts(&tx)?;
                let (user_entry, house_entry) =
                    LedgerEntry::balanced_pair(&tx, amount_usd, amount_kes, now);
                let daily_cap = self.policy.limit_for_user(tx.user_id, tx.kind).await?;

                self.ledger
                    .commit_settlement(&tx, user_entry, house_entry, daily_cap)
                    .await?;
            }
            SettlementOutcome::Failure { reason, .. } => {
                tx.mark_failed(reason, now)?;
                self.transactions.update(&tx).await?;
            }
        }

        self.publish_terminal(&mut tx).await?;
        Ok(tx)
    }

    async fn publish_terminal(&self, tx: &mut Transaction) -> Result<(), EngineError> {
        for event in tx.drain_events() {
            let topic = match &event {
                DomainEvent::TransactionCompleted { .. } => topics::TRANSACTIONS_COMPLETED,
                DomainEvent::TransactionFailed { .. } => topics::TRANSACTIONS_FAILED,
                // initiated events are the orchestrators' concern
                DomainEvent::TransactionCreated { .. } => continue,
            };
            let payload =
                serde_json::to_value(&event).map_err(|e| EngineError::Internal(e.to_string()))?;
            self.publisher.publish(topic, payload).await?;
        }
        Ok(())
    }
}

/// The movement in both currencies at the transaction's locked rate.
fn dual_amounts(tx: &Transaction) -> Result<(Money, Money), DomainError> {
    match tx.kind {
        TransactionType::Deposit => {
            let usd = tx.rate.convert(tx.amount)?;
            Ok((usd, tx.amount))
        }
        TransactionType::Withdrawal => {
            let kes = tx.rate.convert(tx.amount)?;
            Ok((tx.amount, kes))
        }
    }
}
