//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The engine depends on these traits, not concrete implementations.

mod clock;
mod events;
mod fx;
mod ledger;
mod limits;
mod repository;
mod secrets;

pub use clock::Clock;
pub use events::{EventPublisher, topics};
pub use fx::FxService;
pub use ledger::LedgerRepository;
pub use limits::DailyLimitPolicy;
pub use repository::TransactionRepository;
pub use secrets::OneTimeSecretStore;
