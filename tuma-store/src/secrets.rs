//! In-memory one-time secret store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use tuma_types::{Clock, OneTimeSecretStore, RepoError};

struct StoredSecret {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Process-local secret store with per-entry TTL.
///
/// `DashMap::remove` gives the atomic get-and-delete the consume-once
/// contract needs: two workers racing on the same key see exactly one
/// value between them. Expired entries are dropped on access; the
/// dispatcher loop calls [`purge_expired`](Self::purge_expired) to keep
/// abandoned keys from accumulating.
pub struct InMemorySecretStore {
    entries: DashMap<String, StoredSecret>,
    clock: Arc<dyn Clock>,
}

impl InMemorySecretStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, secret| secret.expires_at > now);
        before - self.entries.len()
    }
}

#[async_trait]
impl OneTimeSecretStore for InMemorySecretStore {
    async fn store(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), RepoError> {
        let expires_at = self.clock.now() + Duration::seconds(ttl_seconds as i64);
        self.entries.insert(
            key.to_string(),
            StoredSecret {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get_and_delete(&self, key: &str) -> Result<Option<String>, RepoError> {
        match self.entries.remove(key) {
            Some((_, secret)) if secret.expires_at > self.clock.now() => Ok(Some(secret.value)),
            // expired entries were already unusable; removal is fine
            _ => Ok(None),
        }
    }
}
