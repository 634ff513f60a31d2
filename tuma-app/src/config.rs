//! Configuration loading from environment.

use std::env;

/// Application configuration.
pub struct Config {
    pub database_url: String,
    pub worker_url: String,
    pub poll_interval_secs: u64,
    pub deposit_cap_kes_cents: i64,
    pub withdrawal_cap_usd_cents: i64,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let worker_url = env::var("WORKER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:9464/settlements".to_string());

        let poll_interval_secs = env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        // KES 100,000.00 per day in, USD 5,000.00 per day out
        let deposit_cap_kes_cents = env::var("DEPOSIT_CAP_KES_CENTS")
            .unwrap_or_else(|_| "10000000".to_string())
            .parse()?;
        let withdrawal_cap_usd_cents = env::var("WITHDRAWAL_CAP_USD_CENTS")
            .unwrap_or_else(|_| "500000".to_string())
            .parse()?;

        Ok(Self {
            database_url,
            worker_url,
            poll_interval_secs,
            deposit_cap_kes_cents,
            withdrawal_cap_usd_cents,
        })
    }
}
