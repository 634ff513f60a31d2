//! Clock port.

use chrono::{DateTime, Utc};

/// Injected time source.
///
/// Entities never call ambient system time; timestamps and TTL checks
/// all flow through this trait so they are deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
