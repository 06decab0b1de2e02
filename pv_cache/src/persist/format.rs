//! On-disk record format.
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "year": 2020,
//!   "grid": { "start_minute": 300, "end_minute": 1320, "step_minutes": 5 },
//!   "days": {
//!     "2020-01-01": {
//!       "last_fetched": "2020-01-02T08:00:00Z",
//!       "closed": "complete",
//!       "samples": { "96": 812.5, "97": 790.0 }
//!     }
//!   }
//! }
//! ```
//!
//! Maps are ordered, so the same store always encodes to the same bytes.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    grid::DailyGrid,
    store::{Closure, DayRecord, FreshnessMarker, YearStore},
};

/// Version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Deserialize)]
struct Header {
    schema_version: u32,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct YearFile {
    schema_version: u32,
    year: i32,
    grid: DailyGrid,
    #[serde(default)]
    days: BTreeMap<NaiveDate, DayEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DayEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_fetched: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    closed: Option<Closure>,
    #[serde(default)]
    samples: BTreeMap<u16, f64>,
}

/// Why bytes could not be turned into a store.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum DecodeError {
    /// Written by a newer build; must not be overwritten.
    Unsupported(u32),
    /// Unreadable or inconsistent content.
    Corrupt(String),
}

pub(crate) fn encode(store: &YearStore) -> Result<Vec<u8>, serde_json::Error> {
    let days = store
        .days()
        .map(|(day, rec)| {
            let entry = DayEntry {
                last_fetched: rec.freshness().last_fetched,
                closed: rec.freshness().closed,
                samples: rec.samples().clone(),
            };
            (day, entry)
        })
        .collect();
    let file = YearFile {
        schema_version: SCHEMA_VERSION,
        year: store.year(),
        grid: *store.grid(),
        days,
    };
    let mut bytes = serde_json::to_vec_pretty(&file)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub(crate) fn decode(bytes: &[u8], year: i32) -> Result<YearStore, DecodeError> {
    let header: Header =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Corrupt(e.to_string()))?;
    match header.schema_version {
        SCHEMA_VERSION => {}
        v if v > SCHEMA_VERSION => return Err(DecodeError::Unsupported(v)),
        v => return Err(DecodeError::Corrupt(format!("unknown schema version {v}"))),
    }

    let file: YearFile =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Corrupt(e.to_string()))?;
    if file.year != year {
        return Err(DecodeError::Corrupt(format!(
            "file holds year {} instead of {year}",
            file.year
        )));
    }
    let grid = file
        .grid
        .validated()
        .map_err(|e| DecodeError::Corrupt(format!("bad grid: {e}")))?;

    let mut store = YearStore::new(year, grid);
    for (day, entry) in file.days {
        let freshness = FreshnessMarker {
            last_fetched: entry.last_fetched,
            closed: entry.closed,
        };
        store
            .insert_record(day, DayRecord::from_parts(entry.samples, freshness))
            .map_err(|e| DecodeError::Corrupt(e.to_string()))?;
    }
    Ok(store)
}
