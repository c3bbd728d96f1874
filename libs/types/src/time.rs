//! Timestamp helper
//!
//! All timestamps in the system are Unix nanoseconds as i64.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in nanoseconds
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
