//! Daily volume policy port.

use crate::domain::{Money, TransactionType, UserId};
use crate::error::RepoError;

/// Port trait for the policy/reporting store backing the daily cap.
///
/// Amounts are quoted in the operation's source currency: KES for
/// deposits, USD for withdrawals.
#[async_trait::async_trait]
pub trait DailyLimitPolicy: Send + Sync {
    /// Volume the user has already moved today for this operation kind.
    async fn amount_moved_today(
        &self,
        user_id: UserId,
        kind: TransactionType,
    ) -> Result<Money, RepoError>;

    /// The user's daily cap for this operation kind.
    async fn limit_for_user(
        &self,
        user_id: UserId,
        kind: TransactionType,
    ) -> Result<Money, RepoError>;
}
