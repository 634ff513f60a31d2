//! SQLite storage adapter.

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use uuid::Uuid;

use tuma_types::{
    Currency, DomainError, EventPublisher, IdempotencyKey, LedgerAccount, LedgerEntry,
    LedgerOwner, LedgerRepository, Money, OutboxEvent, OutboxStatus, RepoError, Transaction,
    TransactionId, TransactionRepository, UserId,
};

use crate::types::{DbLedgerEntry, DbOutboxEvent, DbTransaction};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Store
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed implementation of the transaction and ledger
/// repositories plus the transactional event outbox.
///
/// All multi-row writes go through one database transaction; the
/// idempotency uniqueness constraint lives in the schema, not in
/// application code.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a new store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // An in-memory database exists per connection; pin the pool to a
        // single connection so every caller sees the same data.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await?
        } else {
            SqlitePool::connect_with(options).await?
        };

        let store = Self { pool };
        store.create_schema().await?;
        Ok(store)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema.
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let ddl_outbox = include_str!("../migrations/0002_create_outbox_events.sql");
        sqlx::query(ddl_outbox)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn fetch_entries(&self, owner: &LedgerOwner) -> Result<Vec<LedgerEntry>, RepoError> {
        let rows: Vec<DbLedgerEntry> = sqlx::query_as(
            r#"SELECT transaction_id, owner, side, amount_usd_cents, amount_kes_cents, rate, occurred_at
               FROM ledger_entries WHERE owner = ? ORDER BY id"#,
        )
        .bind(owner.storage_key())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbLedgerEntry::into_domain).collect()
    }
}

fn map_unique_violation(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict("idempotency key already recorded for user".into())
        }
        _ => RepoError::Database(err.to_string()),
    }
}

/// The user-side entry's volume in the cap's currency.
fn cap_currency_cents(entry: &LedgerEntry, currency: Currency) -> i64 {
    match currency {
        Currency::USD => entry.amount_usd.cents(),
        Currency::KES => entry.amount_kes.cents(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction repository
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl TransactionRepository for SqliteStore {
    async fn insert(&self, tx: &Transaction) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO transactions
               (id, user_id, kind, amount_cents, currency, idempotency_key, status,
                rate, rate_from, rate_to, rate_locked_at, rate_ttl_seconds,
                external_reference, failure_reason, created_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(tx.id.to_string())
        .bind(tx.user_id.to_string())
        .bind(tx.kind.to_string())
        .bind(tx.amount.cents())
        .bind(tx.amount.currency().to_string())
        .bind(tx.idempotency_key.as_str())
        .bind(tx.status.to_string())
        .bind(tx.rate.rate())
        .bind(tx.rate.from_currency().to_string())
        .bind(tx.rate.to_currency().to_string())
        .bind(tx.rate.locked_at().to_rfc3339())
        .bind(tx.rate.ttl_seconds())
        .bind(&tx.external_reference)
        .bind(&tx.failure_reason)
        .bind(tx.created_at.to_rfc3339())
        .bind(tx.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    async fn update(&self, tx: &Transaction) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE transactions
               SET status = ?, external_reference = ?, failure_reason = ?, completed_at = ?
               WHERE id = ? AND status IN ('CREATED', 'PENDING_EXTERNAL')"#,
        )
        .bind(tx.status.to_string())
        .bind(&tx.external_reference)
        .bind(&tx.failure_reason)
        .bind(tx.completed_at.map(|t| t.to_rfc3339()))
        .bind(tx.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return match self.find_by_id(tx.id).await? {
                None => Err(RepoError::NotFound),
                Some(_) => Err(RepoError::Conflict("transaction already settled".into())),
            };
        }
        Ok(())
    }

    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(
            r#"SELECT id, user_id, kind, amount_cents, currency, idempotency_key, status,
                      rate, rate_from, rate_to, rate_locked_at, rate_ttl_seconds,
                      external_reference, failure_reason, created_at, completed_at
               FROM transactions WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &IdempotencyKey,
    ) -> Result<Option<Transaction>, RepoError> {
        let row: Option<DbTransaction> = sqlx::query_as(
            r#"SELECT id, user_id, kind, amount_cents, currency, idempotency_key, status,
                      rate, rate_from, rate_to, rate_locked_at, rate_ttl_seconds,
                      external_reference, failure_reason, created_at, completed_at
               FROM transactions WHERE user_id = ? AND idempotency_key = ?"#,
        )
        .bind(user_id.to_string())
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbTransaction::into_domain).transpose()
    }

    async fn exists_by_idempotency_key(
        &self,
        user_id: UserId,
        key: &IdempotencyKey,
    ) -> Result<bool, RepoError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(1) FROM transactions WHERE user_id = ? AND idempotency_key = ?"#,
        )
        .bind(user_id.to_string())
        .bind(key.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(count > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger repository
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl LedgerRepository for SqliteStore {
    async fn of_user(&self, user_id: UserId) -> Result<LedgerAccount, RepoError> {
        let owner = LedgerOwner::User(user_id);
        let entries = self.fetch_entries(&owner).await?;
        Ok(LedgerAccount::from_entries(owner, entries))
    }

    async fn house(&self) -> Result<LedgerAccount, RepoError> {
        let entries = self.fetch_entries(&LedgerOwner::House).await?;
        Ok(LedgerAccount::from_entries(LedgerOwner::House, entries))
    }

    async fn commit_settlement(
        &self,
        tx: &Transaction,
        user_entry: LedgerEntry,
        house_entry: LedgerEntry,
        daily_cap: Money,
    ) -> Result<(), RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // Re-check the daily cap inside the same transaction that writes
        // the pair, so no interleaved settlement can slip past the gate.
        let cap_column = match daily_cap.currency() {
            Currency::USD => "amount_usd_cents",
            Currency::KES => "amount_kes_cents",
        };
        let moved_sql = format!(
            "SELECT COALESCE(SUM(le.{cap_column}), 0)
             FROM ledger_entries le
             JOIN transactions t ON t.id = le.transaction_id
             WHERE le.owner = ? AND t.kind = ? AND date(le.occurred_at) = date(?)"
        );
        let moved: i64 = sqlx::query_scalar(&moved_sql)
            .bind(user_entry.owner.storage_key())
            .bind(tx.kind.to_string())
            .bind(user_entry.occurred_at.to_rfc3339())
            .fetch_one(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let requested = cap_currency_cents(&user_entry, daily_cap.currency());
        if moved + requested > daily_cap.cents() {
            return Err(RepoError::Domain(DomainError::LimitExceeded {
                moved_cents: moved,
                requested_cents: requested,
                limit_cents: daily_cap.cents(),
            }));
        }

        // Advance the row to its terminal state, refusing a second
        // settlement of the same transaction.
        let updated = sqlx::query(
            r#"UPDATE transactions
               SET status = ?, external_reference = ?, failure_reason = ?, completed_at = ?
               WHERE id = ? AND status IN ('CREATED', 'PENDING_EXTERNAL')"#,
        )
        .bind(tx.status.to_string())
        .bind(&tx.external_reference)
        .bind(&tx.failure_reason)
        .bind(tx.completed_at.map(|t| t.to_rfc3339()))
        .bind(tx.id.to_string())
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(RepoError::Conflict("transaction already settled".into()));
        }

        for entry in [&user_entry, &house_entry] {
            sqlx::query(
                r#"INSERT INTO ledger_entries
                   (transaction_id, owner, side, amount_usd_cents, amount_kes_cents, rate, occurred_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(entry.transaction_id.to_string())
            .bind(entry.owner.storage_key())
            .bind(entry.side.to_string())
            .bind(entry.amount_usd.cents())
            .bind(entry.amount_kes.cents())
            .bind(entry.rate)
            .bind(entry.occurred_at.to_rfc3339())
            .execute(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        tracing::debug!(transaction_id = %tx.id, "settlement committed with balanced pair");
        Ok(())
    }

    async fn entries_for_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Vec<LedgerEntry>, RepoError> {
        let rows: Vec<DbLedgerEntry> = sqlx::query_as(
            r#"SELECT transaction_id, owner, side, amount_usd_cents, amount_kes_cents, rate, occurred_at
               FROM ledger_entries WHERE transaction_id = ? ORDER BY id"#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbLedgerEntry::into_domain).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event outbox
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl EventPublisher for SqliteStore {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), RepoError> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO outbox_events (id, topic, payload, status, created_at)
               VALUES (?, ?, ?, 'PENDING', ?)"#,
        )
        .bind(id.to_string())
        .bind(topic)
        .bind(payload.to_string())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}

impl SqliteStore {
    /// Oldest events still awaiting delivery.
    pub async fn pending_events(&self, limit: i64) -> Result<Vec<OutboxEvent>, RepoError> {
        let rows: Vec<DbOutboxEvent> = sqlx::query_as(
            r#"SELECT id, topic, payload, status, created_at, dispatched_at, attempts, last_error
               FROM outbox_events
               WHERE status = 'PENDING'
               ORDER BY created_at ASC
               LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbOutboxEvent::into_domain).collect()
    }

    /// Records a delivery attempt's result.
    pub async fn mark_event_status(
        &self,
        id: Uuid,
        status: OutboxStatus,
        last_error: Option<String>,
    ) -> Result<(), RepoError> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"UPDATE outbox_events
               SET status = ?, dispatched_at = ?, last_error = ?, attempts = attempts + 1
               WHERE id = ?"#,
        )
        .bind(status.to_string())
        .bind(now)
        .bind(last_error)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}
