//! Client-supplied idempotency tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

const MAX_KEY_LENGTH: usize = 255;

/// Opaque deduplication token derived from a client-supplied header.
///
/// Compared byte-for-byte - no trimming, no case folding. Scoping to a
/// single user and operation kind is the storage layer's uniqueness
/// constraint, not a property of the token itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Creates a key from the raw header value.
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(DomainError::Validation(
                "idempotency key cannot be empty".into(),
            ));
        }
        if raw.len() > MAX_KEY_LENGTH {
            return Err(DomainError::Validation(format!(
                "idempotency key exceeds {MAX_KEY_LENGTH} bytes"
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(IdempotencyKey::new("").is_err());
    }

    #[test]
    fn test_oversized_key_rejected() {
        assert!(IdempotencyKey::new("k".repeat(256)).is_err());
        assert!(IdempotencyKey::new("k".repeat(255)).is_ok());
    }

    #[test]
    fn test_keys_are_byte_sensitive() {
        let a = IdempotencyKey::new("Retry-01").unwrap();
        let b = IdempotencyKey::new("retry-01").unwrap();
        let c = IdempotencyKey::new("Retry-01 ").unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, IdempotencyKey::new("Retry-01").unwrap());
    }
}
