//! Indicative FX rate source.

use std::sync::Arc;

use async_trait::async_trait;

use tuma_types::{Clock, Currency, FxError, FxService, LockedRate};

/// Default usage window for a locked rate.
pub const DEFAULT_RATE_TTL_SECONDS: i64 = 45;

// Mid rates per direction. The spread between the two directions is the
// desk's margin on the corridor.
const KES_TO_USD_MID: f64 = 0.0076;
const USD_TO_KES_MID: f64 = 128.2;

const MAX_VARIANCE_PERCENT: f64 = 0.3;

/// Rate source quoting the KES/USD corridor from static mids with a
/// small bounded variance.
///
/// The variance is derived from the injected clock rather than ambient
/// randomness, so locked rates are reproducible under test.
pub struct IndicativeFxService {
    clock: Arc<dyn Clock>,
    ttl_seconds: i64,
}

impl IndicativeFxService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, DEFAULT_RATE_TTL_SECONDS)
    }

    pub fn with_ttl(clock: Arc<dyn Clock>, ttl_seconds: i64) -> Self {
        Self { clock, ttl_seconds }
    }

    fn mid_rate(from: Currency, to: Currency) -> Option<f64> {
        match (from, to) {
            (Currency::KES, Currency::USD) => Some(KES_TO_USD_MID),
            (Currency::USD, Currency::KES) => Some(USD_TO_KES_MID),
            _ => None,
        }
    }

    fn fluctuate(&self, base_rate: f64) -> f64 {
        let nanos = self.clock.now().timestamp_subsec_nanos();
        let random_factor = ((nanos % 2001) as f64 / 1000.0) - 1.0;
        let variance = base_rate * (MAX_VARIANCE_PERCENT / 100.0) * random_factor;
        base_rate + variance
    }
}

#[async_trait]
impl FxService for IndicativeFxService {
    async fn lock_rate(&self, from: Currency, to: Currency) -> Result<LockedRate, FxError> {
        let mid = Self::mid_rate(from, to).ok_or(FxError::RateNotAvailable(from, to))?;
        let rate = self.fluctuate(mid);
        LockedRate::lock(rate, from, to, self.clock.now(), self.ttl_seconds)
            .map_err(|e| FxError::ServiceUnavailable(e.to_string()))
    }
}
