//! Clock access for deskbook
//!
//! Every operation that compares against "now" receives the instant as an
//! argument; this module is the single place where the wall clock is read.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `DESKBOOK_MOCK_TIME` environment variable overrides
//! the clock. The mock time advances at the same rate as real time.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-06-10 09:15:00`)

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "DESKBOOK_MOCK_TIME";

/// Calendar day format used by reservations (`DD-MM-YYYY`)
pub const DATE_FORMAT: &str = "%d-%m-%Y";

const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            let raw = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
            parse_mock_time(&raw).map(|mock_dt| {
                let offset = mock_dt.signed_duration_since(Local::now());
                tracing::info!(
                    mock_time = %raw,
                    offset_secs = offset.num_seconds(),
                    "Mock time enabled"
                );
                offset
            })
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Parse a mock time string into a local date-time.
///
/// Returns `None` (and logs why) when the string is malformed or falls into
/// a local-time gap.
pub fn parse_mock_time(raw: &str) -> Option<DateTime<Local>> {
    let naive = match NaiveDateTime::parse_from_str(raw, MOCK_TIME_FORMAT) {
        Ok(naive) => naive,
        Err(_) => {
            tracing::warn!(
                mock_time = %raw,
                expected_format = MOCK_TIME_FORMAT,
                "Invalid mock time format"
            );
            return None;
        }
    };

    let local = Local.from_local_datetime(&naive).single();
    if local.is_none() {
        tracing::warn!(mock_time = %raw, "Mock time is not representable in local timezone");
    }
    local
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // the one wrapper around Local::now()
pub fn now() -> DateTime<Local> {
    let real_now = Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Current local wall-clock time without timezone, the instant type the
/// reservation engine compares against.
pub fn now_naive() -> NaiveDateTime {
    now().naive_local()
}

/// Format an instant for log and CLI output.
pub fn format_instant(dt: &NaiveDateTime) -> String {
    dt.format("%d-%m-%Y %H:%M").to_string()
}
