//! Data Transfer Objects for the command boundary.

use serde::{Deserialize, Serialize};

use crate::domain::UserId;

/// Request to move mobile-money KES into the user's trading balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateDepositRequest {
    /// Owner of the trading balance to credit
    pub user_id: UserId,
    /// Amount to collect from the mobile-money rail, in KES cents
    pub amount_kes_cents: i64,
    /// Client-supplied idempotency key
    pub idempotency_key: String,
}

/// Request to pay out trading-balance USD to the mobile-money rail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmWithdrawalRequest {
    /// Owner of the trading balance to debit
    pub user_id: UserId,
    /// Amount to pay out, in USD cents
    pub amount_usd_cents: i64,
    /// One-time verification code entered by the user
    pub verification_code: String,
    /// Client-supplied idempotency key
    pub idempotency_key: String,
}
