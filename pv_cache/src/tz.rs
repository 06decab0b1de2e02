//! Plant-local calendar helpers.
//!
//! Vendor timestamps and "today" are both plant-local wall-clock values. The
//! site time zone comes from configuration; without one the host's local
//! zone is used.
//!
//! Example: at 2024-06-30T13:00:00Z it is already 2024-07-01 in
//! "Pacific/Auckland" but still 2024-06-30 in "Europe/Amsterdam".

use anyhow::Context;
use chrono::{DateTime, Local, NaiveDate, Utc};
use chrono_tz::Tz;

/// Parse an IANA time zone name (e.g. "Europe/Amsterdam").
pub fn parse_tz(name: &str) -> anyhow::Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("unknown time zone {name:?}"))
}

/// Calendar date of `now` in `tz`, or in the host zone when `tz` is `None`.
pub fn today_in(tz: Option<Tz>, now: DateTime<Utc>) -> NaiveDate {
    match tz {
        Some(tz) => now.with_timezone(&tz).date_naive(),
        None => now.with_timezone(&Local).date_naive(),
    }
}
