//! Helpers shared by the command orchestrators.

use std::sync::Arc;

use tuma_types::{
    Clock, Currency, EngineError, FxService, IdempotencyKey, LockedRate, Transaction,
    TransactionType,
};

/// Resolves an idempotent replay: same key and same operation kind hand
/// back the stored transaction unchanged; same key with a different
/// kind is a hard collision.
pub(crate) fn replay_existing(
    existing: Transaction,
    requested: TransactionType,
    key: &IdempotencyKey,
) -> Result<Transaction, EngineError> {
    if existing.kind != requested {
        return Err(EngineError::IdempotencyKeyCollision {
            key: key.as_str().to_string(),
        });
    }
    Ok(existing)
}

/// Locks a rate for the pair, re-locking once if the snapshot is
/// already outside its usage window when it arrives.
pub(crate) async fn lock_fresh_rate(
    fx: &Arc<dyn FxService>,
    clock: &Arc<dyn Clock>,
    from: Currency,
    to: Currency,
) -> Result<LockedRate, EngineError> {
    let rate = fx.lock_rate(from, to).await?;
    if rate.is_expired(clock.now()) {
        return Ok(fx.lock_rate(from, to).await?);
    }
    Ok(rate)
}
