//! Error types for the transaction engine.

use crate::domain::{Currency, TransactionStatus};

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    InvalidAmount,

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Exchange rate must be positive, got {0}")]
    InvalidRate(f64),

    #[error("Cannot {action} a transaction in state {from}")]
    InvalidStateTransition {
        from: TransactionStatus,
        action: &'static str,
    },

    #[error("Daily limit exceeded: moved {moved_cents}, requested {requested_cents}, limit {limit_cents}")]
    LimitExceeded {
        moved_cents: i64,
        requested_cents: i64,
        limit_cents: i64,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Errors from the FX rate provider.
#[derive(Debug, thiserror::Error)]
pub enum FxError {
    #[error("Rate not available for {0} -> {1}")]
    RateNotAvailable(Currency, Currency),

    #[error("FX service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Application-surface errors returned by the orchestrators.
///
/// This is the taxonomy callers see; benign idempotent replays and
/// stale-rate re-locks are absorbed before reaching it.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Idempotency key {key} was already used for a different operation")]
    IdempotencyKeyCollision { key: String },

    #[error("Daily limit exceeded: moved {moved_cents}, requested {requested_cents}, limit {limit_cents}")]
    LimitExceeded {
        moved_cents: i64,
        requested_cents: i64,
        limit_cents: i64,
    },

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: i64, requested: i64 },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("External service unavailable: {0}")]
    ExternalServiceUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for EngineError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidAmount => EngineError::Validation("amount cannot be negative".into()),
            DomainError::CurrencyMismatch { expected, got } => {
                EngineError::CurrencyMismatch { expected, got }
            }
            DomainError::InsufficientFunds {
                available,
                requested,
            } => EngineError::InsufficientFunds {
                available,
                requested,
            },
            DomainError::InvalidRate(rate) => {
                EngineError::Validation(format!("exchange rate must be positive, got {rate}"))
            }
            e @ DomainError::InvalidStateTransition { .. } => {
                EngineError::InvalidStateTransition(e.to_string())
            }
            DomainError::LimitExceeded {
                moved_cents,
                requested_cents,
                limit_cents,
            } => EngineError::LimitExceeded {
                moved_cents,
                requested_cents,
                limit_cents,
            },
            DomainError::Validation(msg) => EngineError::Validation(msg),
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::Database(e) => EngineError::Internal(e),
            RepoError::Transaction(e) => EngineError::Internal(e),
            RepoError::NotFound => EngineError::NotFound("resource not found".into()),
            RepoError::Conflict(e) => EngineError::Internal(e),
        }
    }
}

impl From<FxError> for EngineError {
    fn from(err: FxError) -> Self {
        EngineError::ExternalServiceUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_maps_to_engine_taxonomy() {
        let err: EngineError = DomainError::InsufficientFunds {
            available: 100,
            requested: 500,
        }
        .into();
        assert!(matches!(
            err,
            EngineError::InsufficientFunds {
                available: 100,
                requested: 500
            }
        ));
    }

    #[test]
    fn test_repo_not_found_maps_to_not_found() {
        let err: EngineError = RepoError::NotFound.into();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_fx_error_maps_to_external_unavailable() {
        let err: EngineError = FxError::ServiceUnavailable("timeout".into()).into();
        assert!(matches!(err, EngineError::ExternalServiceUnavailable(_)));
    }
}
