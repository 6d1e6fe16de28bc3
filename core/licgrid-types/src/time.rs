//! Wall-clock helpers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall time as epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before Unix epoch")
        .as_millis() as i64
}
