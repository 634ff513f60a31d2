//! Withdrawal orchestration: trading-balance USD out, mobile-money KES paid.

use std::sync::Arc;

use tracing::{instrument, warn};

use tuma_types::{
    Clock, ConfirmWithdrawalRequest, Currency, DomainEvent, EngineError, EventPublisher, FxService,
    IdempotencyKey, LedgerRepository, Money, OneTimeSecretStore, RepoError, Transaction,
    TransactionId, TransactionRepository, TransactionType, topics,
};

use crate::command::{lock_fresh_rate, replay_existing};
use crate::factory::TransactionFactory;
use crate::limits::DailyLimitChecker;
use crate::security;

/// How long a stored verification code stays claimable.
pub const CODE_TTL_SECONDS: u64 = 600;

/// Coordinates the synchronous withdrawal path and the one-time
/// verification handshake with the settlement worker.
pub struct WithdrawalOrchestrator {
    transactions: Arc<dyn TransactionRepository>,
    ledger: Arc<dyn LedgerRepository>,
    fx: Arc<dyn FxService>,
    limits: DailyLimitChecker,
    publisher: Arc<dyn EventPublisher>,
    secrets: Arc<dyn OneTimeSecretStore>,
    factory: TransactionFactory,
    clock: Arc<dyn Clock>,
    code_secret: String,
}

impl WithdrawalOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        ledger: Arc<dyn LedgerRepository>,
        fx: Arc<dyn FxService>,
        limits: DailyLimitChecker,
        publisher: Arc<dyn EventPublisher>,
        secrets: Arc<dyn OneTimeSecretStore>,
        factory: TransactionFactory,
        clock: Arc<dyn Clock>,
        code_secret: String,
    ) -> Self {
        Self {
            transactions,
            ledger,
            fx,
            limits,
            publisher,
            secrets,
            factory,
            clock,
            code_secret,
        }
    }

    /// Accepts a withdrawal command with exactly-once semantics.
    ///
    /// The verification code is sealed and parked in the short-TTL
    /// secret store; the published event carries only the store key,
    /// never the code.
    #[instrument(skip(self, req), fields(user_id = %req.user_id))]
    pub async fn confirm_withdrawal(
        &self,
        req: ConfirmWithdrawalRequest,
    ) -> Result<Transaction, EngineError> {
        let key = IdempotencyKey::new(req.idempotency_key)?;
        if req.verification_code.is_empty() {
            return Err(EngineError::Validation(
                "verification code cannot be empty".into(),
            ));
        }
        let amount = Money::new(req.amount_usd_cents, Currency::USD)?;

        if let Some(existing) = self
            .transactions
            .find_by_idempotency_key(req.user_id, &key)
            .await?
        {
            return replay_existing(existing, TransactionType::Withdrawal, &key);
        }

        self.limits
            .ensure_allowed(req.user_id, TransactionType::Withdrawal, &amount)
            .await?;

        // The withdrawable balance must cover the debit BEFORE anything
        // is persisted; the ledger write itself happens at settlement.
        let account = self.ledger.of_user(req.user_id).await?;
        if !account.can_cover(&amount) {
            return Err(EngineError::InsufficientFunds {
                available: account.balance_cents(Currency::USD),
                requested: amount.cents(),
            });
        }

        let rate = lock_fresh_rate(&self.fx, &self.clock, Currency::USD, Currency::KES).await?;

        let mut tx = self
            .factory
            .withdrawal(req.user_id, amount, key.clone(), rate)?;

        let secret_key = security::generate_secret_key();
        let sealed = security::seal_code(&req.verification_code, &self.code_secret);
        self.secrets
            .store(&secret_key, &sealed, CODE_TTL_SECONDS)
            .await?;

        if let Err(err) = self.transactions.insert(&tx).await {
            return match err {
                // Lost the compare-and-insert race; the orphaned secret
                // simply expires.
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
                    replay_existing(existing, TransactionType::Withdrawal, &key)
                }
                other => Err(other.into()),
            };
        }

        self.publish_initiated(&mut tx, &secret_key).await?;
        Ok(tx)
    }

    async fn publish_initiated(
        &self,
        tx: &mut Transaction,
        secret_key: &str,
    ) -> Result<(), EngineError> {
        for event in tx.drain_events() {
            if let DomainEvent::TransactionCreated { .. } = event {
                let quoted_kes = tx.rate.convert(tx.amount)?;
                let expires_at = self.clock.now() + chrono::Duration::seconds(CODE_TTL_SECONDS as i64);
                let payload = serde_json::json!({
                    "transaction_id": tx.id,
                    "user_id": tx.user_id,
                    "amount_usd_cents": tx.amount.cents(),
                    "quoted_kes_cents": quoted_kes.cents(),
                    "rate": tx.rate.rate(),
                    "secret_key": secret_key,
                    "expires_at": expires_at,
                });
                self.publisher
                    .publish(topics::WITHDRAWALS_INITIATED, payload)
                    .await?;
            }
        }
        Ok(())
    }

    /// Claims and checks the one-time verification code on behalf of a
    /// settlement worker.
    ///
    /// The claim is an atomic get-and-delete: a second worker (or a
    /// claim after expiry) observes absence, the transaction is driven
    /// to FAILED and no ledger entry is ever written for it.
    #[instrument(skip(self, secret_key, presented_code))]
    pub async fn verify_code_claim(
        &self,
        transaction_id: TransactionId,
        secret_key: &str,
        presented_code: &str,
    ) -> Result<(), EngineError> {
        let sealed = self.secrets.get_and_delete(secret_key).await?;

        let failure = match sealed {
            None => Some("verification code expired or already consumed"),
            Some(sealed) => {
                if security::verify_code(presented_code, &sealed, &self.code_secret) {
                    None
                } else {
                    Some("verification code mismatch")
                }
            }
        };

        match failure {
            None => Ok(()),
            Some(reason) => {
                warn!(%transaction_id, reason, "withdrawal verification failed");
                self.fail_verification(transaction_id, reason).await?;
                Err(EngineError::Validation(reason.into()))
            }
        }
    }

    async fn fail_verification(
        &self,
        transaction_id: TransactionId,
        reason: &str,
    ) -> Result<(), EngineError> {
        let mut tx = self
            .transactions
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("transaction {transaction_id}")))?;
        tx.mark_failed(reason.to_string(), self.clock.now())?;
        self.transactions.update(&tx).await?;

        for event in tx.drain_events() {
            if let DomainEvent::TransactionFailed { .. } = &event {
                let payload = serde_json::to_value(&event)
                    .map_err(|e| EngineError::Internal(e.to_string()))?;
                self.publisher
                    .publish(topics::TRANSACTIONS_FAILED, payload)
                    .await?;
            }
        }
        Ok(())
    }
}
