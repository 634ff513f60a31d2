//! # Tuma Types
//!
//! Domain types and port traits for the Tuma transaction engine.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, LockedRate, Transaction, Ledger)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for the command boundary
//! - `error/` - Domain, repository and engine error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Currency, DomainEvent, EntrySide, IdempotencyKey, LedgerAccount, LedgerEntry, LedgerOwner,
    LockedRate, Money, OutboxEvent, OutboxStatus, SettlementOutcome, Transaction, TransactionId,
    TransactionStatus, TransactionType, UserId,
};
pub use dto::*;
pub use error::{DomainError, EngineError, FxError, RepoError};
pub use ports::{
    Clock, DailyLimitPolicy, EventPublisher, FxService, LedgerRepository, OneTimeSecretStore,
    TransactionRepository, topics,
};
