//! Time and timestamp helpers.

use chrono::{DateTime, TimeDelta, Utc};

/// UTC timestamp used for `last_changed`, `last_rotated`, reading times, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Build a [`TimeDelta`] from whole minutes.
#[must_use]
pub fn minutes(value: i64) -> TimeDelta {
    TimeDelta::minutes(value)
}

/// Convert a std duration into a chrono delta, saturating on overflow.
#[must_use]
pub fn delta(duration: std::time::Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}
