//! Append-only double-entry ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::{Currency, Money};
use super::transaction::{Transaction, TransactionId, TransactionType, UserId};
use crate::error::DomainError;

/// Which side of the books an entry lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntrySide {
    Debit,
    Credit,
}

impl std::fmt::Display for EntrySide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntrySide::Debit => write!(f, "DEBIT"),
            EntrySide::Credit => write!(f, "CREDIT"),
        }
    }
}

/// Owner of a ledger account: a user's trading balance or the single
/// house float account that mirrors every movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOwner {
    User(UserId),
    House,
}

impl LedgerOwner {
    /// Stable storage representation: the user's UUID, or `house`.
    pub fn storage_key(&self) -> String {
        match self {
            LedgerOwner::User(id) => id.to_string(),
            LedgerOwner::House => "house".to_string(),
        }
    }
}

impl std::fmt::Display for LedgerOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

/// One immutable row in the books.
///
/// Every entry carries the movement in both currencies at the locked
/// rate, so either side of the books can be balanced per currency.
/// Corrections are new reversing entries, never updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub transaction_id: TransactionId,
    pub owner: LedgerOwner,
    pub side: EntrySide,
    pub amount_usd: Money,
    pub amount_kes: Money,
    pub rate: f64,
    pub occurred_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Builds the balanced pair for a confirmed movement: the user-side
    /// entry and its equal, offsetting house-side entry.
    ///
    /// Deposits credit the user and debit the house float; withdrawals
    /// do the reverse. The two entries always sum to zero.
    pub fn balanced_pair(
        tx: &Transaction,
        amount_usd: Money,
        amount_kes: Money,
        occurred_at: DateTime<Utc>,
    ) -> (LedgerEntry, LedgerEntry) {
        let (user_side, house_side) = match tx.kind {
            TransactionType::Deposit => (EntrySide::Credit, EntrySide::Debit),
            TransactionType::Withdrawal => (EntrySide::Debit, EntrySide::Credit),
        };
        let user_entry = LedgerEntry {
            transaction_id: tx.id,
            owner: LedgerOwner::User(tx.user_id),
            side: user_side,
            amount_usd,
            amount_kes,
            rate: tx.rate.rate(),
            occurred_at,
        };
        let house_entry = LedgerEntry {
            transaction_id: tx.id,
            owner: LedgerOwner::House,
            side: house_side,
            amount_usd,
            amount_kes,
            rate: tx.rate.rate(),
            occurred_at,
        };
        (user_entry, house_entry)
    }

    /// Signed contribution of this entry in the given currency:
    /// credits count positive, debits negative.
    pub fn signed_cents(&self, currency: Currency) -> i64 {
        let cents = match currency {
            Currency::USD => self.amount_usd.cents(),
            Currency::KES => self.amount_kes.cents(),
        };
        match self.side {
            EntrySide::Credit => cents,
            EntrySide::Debit => -cents,
        }
    }
}

/// A ledger account: an owner plus the ordered entries touching it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAccount {
    owner: LedgerOwner,
    entries: Vec<LedgerEntry>,
}

impl LedgerAccount {
    /// Creates an empty account for the owner.
    pub fn new(owner: LedgerOwner) -> Self {
        Self {
            owner,
            entries: Vec::new(),
        }
    }

    /// Rehydrates an account from stored entries.
    pub fn from_entries(owner: LedgerOwner, entries: Vec<LedgerEntry>) -> Self {
        Self { owner, entries }
    }

    pub fn owner(&self) -> LedgerOwner {
        self.owner
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Appends an entry belonging to this account.
    pub fn append(&mut self, entry: LedgerEntry) -> Result<(), DomainError> {
        if entry.owner != self.owner {
            return Err(DomainError::Validation(format!(
                "entry for {} appended to account of {}",
                entry.owner, self.owner
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Signed balance in the given currency: sum of credits minus debits.
    ///
    /// The house float account legitimately runs negative; user accounts
    /// are guarded before any debit is committed.
    pub fn balance_cents(&self, currency: Currency) -> i64 {
        self.entries
            .iter()
            .map(|e| e.signed_cents(currency))
            .sum()
    }

    /// Whether the account balance covers a prospective debit.
    pub fn can_cover(&self, amount: &Money) -> bool {
        self.balance_cents(amount.currency()) >= amount.cents()
    }
}
