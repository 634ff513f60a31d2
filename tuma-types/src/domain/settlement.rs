//! Typed settlement result from the external providers.

use serde::{Deserialize, Serialize};

/// Outcome of an external settlement attempt, parsed at the boundary.
///
/// Provider responses arrive as open JSON; adapters must map them into
/// this closed shape before anything touches the aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    Success {
        /// Provider-side reference for the confirmed movement
        reference: String,
        /// Remaining provider fields, kept for audit
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
    Failure {
        /// Provider error, preserved verbatim
        reason: String,
        /// Raw response body, kept for audit
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw: Option<serde_json::Value>,
    },
}
