//! Chart-native time identifiers and their human-readable labels.
//!
//! Anchors store time as the host chart's bar timestamp (whole seconds since
//! the Unix epoch). Labels are produced with the `time` crate; values outside
//! its supported range fall back to the raw number rather than failing.

#[cfg(test)]
#[path = "time_test.rs"]
mod time_test;

use serde::{Deserialize, Serialize};
use ::time::OffsetDateTime;
use ::time::format_description::well_known::Rfc3339;
use ::time::macros::format_description;

/// A chart timestamp identifier (seconds since the Unix epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(pub i64);

impl Time {
    #[must_use]
    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    #[must_use]
    pub fn secs(self) -> i64 {
        self.0
    }

    /// Numeric value used by regression math.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl From<i64> for Time {
    fn from(secs: i64) -> Self {
        Self(secs)
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_time(*self))
    }
}

/// Format as `YYYY-MM-DD` when the time falls on midnight UTC, otherwise
/// `YYYY-MM-DD HH:MM`.
#[must_use]
pub fn format_time(t: Time) -> String {
    let Ok(dt) = OffsetDateTime::from_unix_timestamp(t.0) else {
        return t.0.to_string();
    };
    let formatted = if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 {
        dt.format(format_description!("[year]-[month]-[day]"))
    } else {
        dt.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
    };
    match formatted {
        Ok(s) => s,
        Err(_) => t.0.to_string(),
    }
}

/// Format as an RFC 3339 UTC timestamp (`2024-01-05T13:30:00Z`), falling
/// back to the raw seconds when out of range.
#[must_use]
pub fn format_rfc3339(t: Time) -> String {
    let Ok(dt) = OffsetDateTime::from_unix_timestamp(t.0) else {
        return t.0.to_string();
    };
    match dt.format(&Rfc3339) {
        Ok(s) => s,
        Err(_) => t.0.to_string(),
    }
}

/// Format a duration in seconds as a compact span label (`"3d 4h"`, `"45m"`).
#[must_use]
pub fn format_span(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let total = seconds.unsigned_abs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let label = match (days, hours, minutes) {
        (0, 0, 0) => format!("{total}s"),
        (0, 0, m) => format!("{m}m"),
        (0, h, 0) => format!("{h}h"),
        (0, h, m) => format!("{h}h {m}m"),
        (d, 0, _) => format!("{d}d"),
        (d, h, _) => format!("{d}d {h}h"),
    };
    format!("{sign}{label}")
}
