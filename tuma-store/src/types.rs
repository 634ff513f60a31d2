//! Database row structs and domain conversion.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use tuma_types::{
    Currency, EntrySide, IdempotencyKey, LedgerEntry, LedgerOwner, LockedRate, Money, OutboxEvent,
    OutboxStatus, RepoError, Transaction, TransactionId, TransactionStatus, TransactionType,
    UserId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Transaction row from the database.
#[derive(FromRow)]
pub struct DbTransaction {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount_cents: i64,
    pub currency: String,
    pub idempotency_key: String,
    pub status: String,
    pub rate: f64,
    pub rate_from: String,
    pub rate_to: String,
    pub rate_locked_at: String,
    pub rate_ttl_seconds: i64,
    pub external_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

/// Ledger entry row from the database.
#[derive(FromRow)]
pub struct DbLedgerEntry {
    pub transaction_id: String,
    pub owner: String,
    pub side: String,
    pub amount_usd_cents: i64,
    pub amount_kes_cents: i64,
    pub rate: f64,
    pub occurred_at: String,
}

/// Outbox event row from the database.
#[derive(FromRow)]
pub struct DbOutboxEvent {
    pub id: String,
    pub topic: String,
    pub payload: String,
    pub status: String,
    pub created_at: String,
    pub dispatched_at: Option<String>,
    pub attempts: i64,
    pub last_error: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    match s {
        "USD" => Ok(Currency::USD),
        "KES" => Ok(Currency::KES),
        _ => Err(RepoError::Database(format!("Unknown currency: {}", s))),
    }
}

pub fn parse_kind(s: &str) -> Result<TransactionType, RepoError> {
    match s {
        "DEPOSIT" => Ok(TransactionType::Deposit),
        "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
        _ => Err(RepoError::Database(format!(
            "Unknown transaction kind: {}",
            s
        ))),
    }
}

pub fn parse_status(s: &str) -> Result<TransactionStatus, RepoError> {
    match s {
        "CREATED" => Ok(TransactionStatus::Created),
        "PENDING_EXTERNAL" => Ok(TransactionStatus::PendingExternal),
        "COMPLETED" => Ok(TransactionStatus::Completed),
        "FAILED" => Ok(TransactionStatus::Failed),
        _ => Err(RepoError::Database(format!(
            "Unknown transaction status: {}",
            s
        ))),
    }
}

pub fn parse_side(s: &str) -> Result<EntrySide, RepoError> {
    match s {
        "DEBIT" => Ok(EntrySide::Debit),
        "CREDIT" => Ok(EntrySide::Credit),
        _ => Err(RepoError::Database(format!("Unknown entry side: {}", s))),
    }
}

pub fn parse_owner(s: &str) -> Result<LedgerOwner, RepoError> {
    if s == "house" {
        return Ok(LedgerOwner::House);
    }
    let uuid = Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))?;
    Ok(LedgerOwner::User(UserId::from_uuid(uuid)))
}

pub fn parse_outbox_status(s: &str) -> Result<OutboxStatus, RepoError> {
    match s {
        "PENDING" => Ok(OutboxStatus::Pending),
        "DISPATCHED" => Ok(OutboxStatus::Dispatched),
        "FAILED" => Ok(OutboxStatus::Failed),
        _ => Err(RepoError::Database(format!(
            "Unknown outbox status: {}",
            s
        ))),
    }
}

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl DbTransaction {
    /// Convert database row to domain Transaction.
    pub fn into_domain(self) -> Result<Transaction, RepoError> {
        let id = Uuid::parse_str(&self.id).map_err(|e| RepoError::Database(e.to_string()))?;
        let user_id =
            Uuid::parse_str(&self.user_id).map_err(|e| RepoError::Database(e.to_string()))?;
        let kind = parse_kind(&self.kind)?;
        let status = parse_status(&self.status)?;
        let currency = parse_currency(&self.currency)?;
        let amount = Money::new(self.amount_cents, currency).map_err(RepoError::Domain)?;
        let idempotency_key =
            IdempotencyKey::new(self.idempotency_key).map_err(RepoError::Domain)?;

        let rate = LockedRate::lock(
            self.rate,
            parse_currency(&self.rate_from)?,
            parse_currency(&self.rate_to)?,
            parse_datetime(&self.rate_locked_at)?,
            self.rate_ttl_seconds,
        )
        .map_err(RepoError::Domain)?;

        let created_at = parse_datetime(&self.created_at)?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(Transaction::from_parts(
            TransactionId::from_uuid(id),
            UserId::from_uuid(user_id),
            kind,
            amount,
            idempotency_key,
            status,
            rate,
            self.external_reference,
            self.failure_reason,
            created_at,
            completed_at,
        ))
    }
}

impl DbLedgerEntry {
    /// Convert database row to domain LedgerEntry.
    pub fn into_domain(self) -> Result<LedgerEntry, RepoError> {
        let transaction_id = Uuid::parse_str(&self.transaction_id)
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(LedgerEntry {
            transaction_id: TransactionId::from_uuid(transaction_id),
            owner: parse_owner(&self.owner)?,
            side: parse_side(&self.side)?,
            amount_usd: Money::new(self.amount_usd_cents, Currency::USD)
                .map_err(RepoError::Domain)?,
            amount_kes: Money::new(self.amount_kes_cents, Currency::KES)
                .map_err(RepoError::Domain)?,
            rate: self.rate,
            occurred_at: parse_datetime(&self.occurred_at)?,
        })
    }
}

impl DbOutboxEvent {
    /// Convert database row to domain OutboxEvent.
    pub fn into_domain(self) -> Result<OutboxEvent, RepoError> {
        let id = Uuid::parse_str(&self.id).map_err(|e| RepoError::Database(e.to_string()))?;
        let payload: serde_json::Value =
            serde_json::from_str(&self.payload).map_err(|e| RepoError::Database(e.to_string()))?;
        let dispatched_at = self
            .dispatched_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(OutboxEvent {
            id,
            topic: self.topic,
            payload,
            status: parse_outbox_status(&self.status)?,
            created_at: parse_datetime(&self.created_at)?,
            dispatched_at,
            attempts: self.attempts as i32,
            last_error: self.last_error,
        })
    }
}
