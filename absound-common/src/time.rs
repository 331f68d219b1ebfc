//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as Unix epoch milliseconds (vote timestamps)
pub fn now_millis() -> i64 {
    now().timestamp_millis()
}
