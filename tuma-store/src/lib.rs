//! # Tuma Store
//!
//! Concrete adapters for the port traits in `tuma-types`:
//! - `sqlite` - sqlx-backed transaction/ledger repositories and the
//!   event outbox
//! - `secrets` - in-memory TTL secret store with atomic get-and-delete
//! - `fx` - indicative FX rate source
//! - `limits` - ledger-backed daily volume policy
//! - `clock` - system clock

pub mod clock;
pub mod fx;
pub mod limits;
pub mod secrets;
pub mod sqlite;

mod types;

#[cfg(test)]
mod sqlite_tests;

pub use clock::SystemClock;
pub use fx::{DEFAULT_RATE_TTL_SECONDS, IndicativeFxService};
pub use limits::SqliteLimitPolicy;
pub use secrets::InMemorySecretStore;
pub use sqlite::SqliteStore;
