//! Domain events emitted by transaction transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Currency;
use super::transaction::{TransactionId, TransactionType, UserId};

/// Events appended by the [`Transaction`](super::Transaction) aggregate.
///
/// Each command call yields a finite, drain-once batch of these; the
/// caller is responsible for publishing them durably.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TransactionCreated {
        transaction_id: TransactionId,
        user_id: UserId,
        kind: TransactionType,
        amount_cents: i64,
        currency: Currency,
        rate: f64,
        created_at: DateTime<Utc>,
    },
    TransactionCompleted {
        transaction_id: TransactionId,
        user_id: UserId,
        external_reference: String,
        completed_at: DateTime<Utc>,
    },
    TransactionFailed {
        transaction_id: TransactionId,
        user_id: UserId,
        reason: String,
        failed_at: DateTime<Utc>,
    },
}
