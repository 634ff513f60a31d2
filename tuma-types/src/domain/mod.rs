//! Domain models for the transaction engine.

pub mod events;
pub mod idempotency;
pub mod ledger;
pub mod money;
pub mod outbox;
pub mod rate;
pub mod settlement;
pub mod transaction;

pub use events::DomainEvent;
pub use idempotency::IdempotencyKey;
pub use ledger::{EntrySide, LedgerAccount, LedgerEntry, LedgerOwner};
pub use money::{Currency, Money};
pub use outbox::{OutboxEvent, OutboxStatus};
pub use rate::LockedRate;
pub use settlement::SettlementOutcome;
pub use transaction::{Transaction, TransactionId, TransactionStatus, TransactionType, UserId};
