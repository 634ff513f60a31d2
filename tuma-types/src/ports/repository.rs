//! Transaction repository port.

use crate::domain::{IdempotencyKey, Transaction, TransactionId, UserId};
use crate::error::RepoError;

/// Persistence port for the transaction aggregate.
///
/// Exactly-once command handling hinges on the implementation enforcing
/// a uniqueness constraint on `(user_id, idempotency_key)`: concurrent
/// duplicate submissions race to insert and the loser must surface
/// [`RepoError::Conflict`] so the orchestrator can fall back to the
/// read path.
#[async_trait::async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Persists a new transaction together with its idempotency key in
    /// one atomic operation. Fails with `Conflict` if the key is taken.
    async fn insert(&self, tx: &Transaction) -> Result<(), RepoError>;

    /// Persists a state transition. Implementations must refuse to
    /// overwrite a row that already reached a terminal state.
    async fn update(&self, tx: &Transaction) -> Result<(), RepoError>;

    /// Gets a transaction by ID.
    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, RepoError>;

    /// Finds the transaction recorded for a user's idempotency key.
    async fn find_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &IdempotencyKey,
    ) -> Result<Option<Transaction>, RepoError>;

    /// Cheap existence probe for a user's idempotency key.
    async fn exists_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &IdempotencyKey,
    ) -> Result<bool, RepoError>;
}
