//! Wall-clock helpers. All persisted timestamps are microseconds since the
//! Unix epoch, matching the `*_at_us` column convention.

use chrono::Utc;

/// Current wall-clock time in microseconds since the Unix epoch.
#[must_use]
pub fn now_us() -> i64 {
    Utc::now().timestamp_micros()
}
