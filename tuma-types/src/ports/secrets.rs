//! One-time secret store port.

use crate::error::RepoError;

/// Port trait for short-lived, consume-once secrets.
///
/// `get_and_delete` must be a single atomic primitive - a separate read
/// followed by a separate delete opens a window in which two workers
/// can both observe the value.
#[async_trait::async_trait]
pub trait OneTimeSecretStore: Send + Sync {
    /// Stores a value under the key for at most `ttl_seconds`.
    async fn store(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), RepoError>;

    /// Atomically removes and returns the value; a second call (or a
    /// call after expiry) observes absence.
    async fn get_and_delete(&self, key: &str) -> Result<Option<String>, RepoError>;
}
