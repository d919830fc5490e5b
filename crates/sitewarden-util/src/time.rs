//! Time utilities for sitewarden
//!
//! Provides the wall-clock `now()` used for whitelist expiry and the daily
//! blocking window.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `SITEWARDEN_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for checking the blocking window without waiting for the clock.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! SITEWARDEN_MOCK_TIME="2025-12-25 07:59:00" ./target/debug/sitewardend
//! ```

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::WardenError;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "SITEWARDEN_MOCK_TIME";

/// Milliseconds in one minute, the unit snooze durations are expressed in
pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                        let offset = mock_dt.signed_duration_since(chrono::Local::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        "Failed to convert mock time to local timezone"
                    );
                } else {
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = "%Y-%m-%d %H:%M:%S",
                        "Invalid mock time format"
                    );
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Wall-clock time of day with minute precision, written as `HH:MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
}

impl WallClock {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    /// Minutes elapsed since local midnight
    pub fn minutes_from_midnight(&self) -> u16 {
        (self.hour as u16) * 60 + self.minute as u16
    }
}

impl PartialOrd for WallClock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallClock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.minutes_from_midnight()
            .cmp(&other.minutes_from_midnight())
    }
}

impl FromStr for WallClock {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .split_once(':')
            .ok_or_else(|| WardenError::invalid_time(s, "Expected HH:MM format"))?;

        let hour: u8 = hour
            .parse()
            .map_err(|_| WardenError::invalid_time(s, "Invalid hour"))?;
        let minute: u8 = minute
            .parse()
            .map_err(|_| WardenError::invalid_time(s, "Invalid minute"))?;

        if hour >= 24 {
            return Err(WardenError::invalid_time(s, "Hour must be 0-23"));
        }
        if minute >= 60 {
            return Err(WardenError::invalid_time(s, "Minute must be 0-59"));
        }

        Ok(Self { hour, minute })
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for WallClock {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WallClock {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Daily interval during which blocking is active.
///
/// Both ends are inclusive. A window whose start is after its end is not
/// treated as wrapping past midnight, so it never contains any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    pub from: WallClock,
    pub to: WallClock,
}

impl DailyWindow {
    pub fn new(from: WallClock, to: WallClock) -> Self {
        Self { from, to }
    }

    /// Check if the given local datetime falls within this window
    pub fn contains(&self, dt: &DateTime<Local>) -> bool {
        let time = WallClock::from_naive_time(dt.time());
        self.from <= time && time <= self.to
    }
}

/// Convert a snooze length in (possibly fractional) minutes to milliseconds.
///
/// Returns `None` for zero, negative, or non-finite input.
pub fn minutes_to_millis(minutes: f64) -> Option<i64> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return None;
    }
    let millis = (minutes * MILLIS_PER_MINUTE as f64).round();
    if millis < 1.0 || millis > i64::MAX as f64 {
        return None;
    }
    Some(millis as i64)
}
