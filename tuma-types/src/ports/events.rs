//! Event publication port.

use crate::error::RepoError;

/// Topics published by the engine.
pub mod topics {
    /// A deposit was accepted and awaits collection by the worker.
    pub const DEPOSIT_INITIATED: &str = "deposit.initiated";
    /// A withdrawal was accepted and awaits payout by the worker.
    pub const WITHDRAWALS_INITIATED: &str = "withdrawals.initiated";
    /// A transaction settled successfully.
    pub const TRANSACTIONS_COMPLETED: &str = "transactions.completed";
    /// A transaction failed to settle.
    pub const TRANSACTIONS_FAILED: &str = "transactions.failed";
}

/// Port trait for durable event publication.
///
/// The engine hands each drained domain event to the publisher exactly
/// once; delivery guarantees beyond that point belong to the adapter.
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes a JSON payload under the given topic.
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), RepoError>;
}
