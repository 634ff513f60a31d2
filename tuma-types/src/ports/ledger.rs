//! Ledger repository port.

use crate::domain::{LedgerAccount, LedgerEntry, Money, Transaction, TransactionId, UserId};
use crate::error::RepoError;

/// Persistence port for the double-entry books.
#[async_trait::async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Loads a user's ledger account with all entries touching it.
    async fn of_user(&self, user_id: UserId) -> Result<LedgerAccount, RepoError>;

    /// Loads the house float account.
    async fn house(&self) -> Result<LedgerAccount, RepoError>;

    /// Commits a confirmed settlement in ONE storage transaction:
    /// appends the balanced entry pair, advances the transaction to its
    /// terminal state, and re-checks the user's cumulative daily volume
    /// against `daily_cap` (closing the check-then-act race with the
    /// synchronous policy gate).
    ///
    /// Fails with `Conflict` if the transaction already settled, and
    /// with `Domain(LimitExceeded)` if the re-check trips; in both
    /// cases nothing is written.
    async fn commit_settlement(
        &self,
        tx: &Transaction,
        user_entry: LedgerEntry,
        house_entry: LedgerEntry,
        daily_cap: Money,
    ) -> Result<(), RepoError>;

    /// Lists the entries recorded for one transaction.
    async fn entries_for_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Vec<LedgerEntry>, RepoError>;
}
