//! FX rate provider port.

use crate::domain::{Currency, LockedRate};
use crate::error::FxError;

/// Port trait for the FX rate source.
///
/// Every lock returns a fresh snapshot with its own TTL; the engine
/// never holds a lock across its usage window.
#[async_trait::async_trait]
pub trait FxService: Send + Sync {
    /// Locks the current rate for converting `from` into `to`.
    async fn lock_rate(&self, from: Currency, to: Currency) -> Result<LockedRate, FxError>;
}
