//! Transaction aggregate and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::DomainEvent;
use super::idempotency::IdempotencyKey;
use super::money::Money;
use super::rate::LockedRate;
use crate::error::DomainError;

/// Unique identifier for a user of the remittance service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random UserId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a UserId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique, time-ordered identifier for a Transaction.
///
/// UUIDv7 so that storage order roughly follows creation order. The
/// timestamp component comes from the injected clock, never from
/// ambient system time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Creates a new TransactionId stamped with the given instant.
    pub fn new_at(at: DateTime<Utc>) -> Self {
        let ts = uuid::Timestamp::from_unix(
            uuid::NoContext,
            at.timestamp().max(0) as u64,
            at.timestamp_subsec_nanos(),
        );
        Self(Uuid::new_v7(ts))
    }

    /// Creates a TransactionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The kind/direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// KES in from the mobile-money rail, USD credited to the trading balance
    Deposit,
    /// USD out of the trading balance, KES paid out on the mobile-money rail
    Withdrawal,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Deposit => write!(f, "DEPOSIT"),
            TransactionType::Withdrawal => write!(f, "WITHDRAWAL"),
        }
    }
}

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Created,
    PendingExternal,
    Completed,
    Failed,
}

impl TransactionStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Created => write!(f, "CREATED"),
            TransactionStatus::PendingExternal => write!(f, "PENDING_EXTERNAL"),
            TransactionStatus::Completed => write!(f, "COMPLETED"),
            TransactionStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// A money movement between the mobile-money rail and a trading balance.
///
/// The aggregate root of the engine. Status only ever advances through
/// the defined transitions; each transition appends one domain event to
/// a drain-once buffer that the caller publishes durably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique, time-ordered identifier
    pub id: TransactionId,
    /// Owner of the trading balance being credited or debited
    pub user_id: UserId,
    /// Direction of the movement
    pub kind: TransactionType,
    /// Source-currency amount (KES for deposits, USD for withdrawals)
    pub amount: Money,
    /// Client-supplied deduplication token
    pub idempotency_key: IdempotencyKey,
    /// Lifecycle state
    pub status: TransactionStatus,
    /// FX snapshot the movement was quoted at
    pub rate: LockedRate,
    /// Provider reference, set on completion
    pub external_reference: Option<String>,
    /// Provider error, set on failure
    pub failure_reason: Option<String>,
    /// When the transaction was created
    pub created_at: DateTime<Utc>,
    /// When settlement was confirmed
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Transaction {
    /// Creates a new transaction in the CREATED state and records the
    /// creation event.
    ///
    /// # Validation
    /// - Amount must be strictly positive
    /// - Amount currency must match the source side of the locked rate
    pub fn new(
        id: TransactionId,
        user_id: UserId,
        kind: TransactionType,
        amount: Money,
        idempotency_key: IdempotencyKey,
        rate: LockedRate,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if amount.is_zero() {
            return Err(DomainError::Validation("amount must be positive".into()));
        }
        if amount.currency() != rate.from_currency() {
            return Err(DomainError::CurrencyMismatch {
                expected: rate.from_currency(),
                got: amount.currency(),
            });
        }

        let mut tx = Self {
            id,
            user_id,
            kind,
            amount,
            idempotency_key,
            status: TransactionStatus::Created,
            rate,
            external_reference: None,
            failure_reason: None,
            created_at,
            completed_at: None,
            events: Vec::new(),
        };
        tx.events.push(DomainEvent::TransactionCreated {
            transaction_id: tx.id,
            user_id: tx.user_id,
            kind: tx.kind,
            amount_cents: tx.amount.cents(),
            currency: tx.amount.currency(),
            rate: tx.rate.rate(),
            created_at: tx.created_at,
        });
        Ok(tx)
    }

    /// Reconstructs a transaction from storage fields.
    ///
    /// Rehydration never replays events - the buffer starts empty.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransactionId,
        user_id: UserId,
        kind: TransactionType,
        amount: Money,
        idempotency_key: IdempotencyKey,
        status: TransactionStatus,
        rate: LockedRate,
        external_reference: Option<String>,
        failure_reason: Option<String>,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            user_id,
            kind,
            amount,
            idempotency_key,
            status,
            rate,
            external_reference,
            failure_reason,
            created_at,
            completed_at,
            events: Vec::new(),
        }
    }

    /// Marks the external transfer as dispatched to the provider.
    pub fn mark_pending_external(&mut self) -> Result<(), DomainError> {
        if self.status != TransactionStatus::Created {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                action: "mark_pending_external",
            });
        }
        self.status = TransactionStatus::PendingExternal;
        Ok(())
    }

    /// Confirms that the provider settled the movement.
    pub fn confirm_external(
        &mut self,
        reference: String,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                action: "confirm_external",
            });
        }
        self.status = TransactionStatus::Completed;
        self.external_reference = Some(reference.clone());
        self.completed_at = Some(at);
        self.events.push(DomainEvent::TransactionCompleted {
            transaction_id: self.id,
            user_id: self.user_id,
            external_reference: reference,
            completed_at: at,
        });
        Ok(())
    }

    /// Records a settlement failure, preserving the provider error.
    pub fn mark_failed(&mut self, reason: String, at: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status,
                action: "mark_failed",
            });
        }
        self.status = TransactionStatus::Failed;
        self.failure_reason = Some(reason.clone());
        self.events.push(DomainEvent::TransactionFailed {
            transaction_id: self.id,
            user_id: self.user_id,
            reason,
            failed_at: at,
        });
        Ok(())
    }

    /// Drains the pending domain events.
    ///
    /// The buffer is cleared on drain, so an event is handed to exactly
    /// one publisher exactly once.
    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }
}
