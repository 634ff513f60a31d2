//! System clock adapter.

use chrono::{DateTime, Utc};

use tuma_types::Clock;

/// Wall-clock time source for production wiring.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
