//! JSON shape of one day of readings.
//!
//! Both the HTTP provider and the directory replay provider consume the same
//! document:
//!
//! ```json
//! { "data": { "2020-01-01 05:05": "123.4", "2020-01-01 05:10": 130.0 } }
//! ```
//!
//! Keys are local timestamps (`%Y-%m-%d %H:%M` with optional `:%S`), values
//! are watts given either as JSON numbers or as numeric strings. A missing or
//! `null` `data` member means the source has nothing for that day yet.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::models::reading::RawReading;

const TS_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// A power value as it appears on the wire.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum WireValue {
    /// Plain JSON number.
    Number(f64),
    /// Number encoded as a string.
    Text(String),
}

/// Deserialized day document.
#[derive(Deserialize, Debug, Default)]
pub struct DayPayload {
    /// Local timestamp → watts; `None` when the source has nothing yet.
    #[serde(default)]
    pub data: Option<BTreeMap<String, WireValue>>,
}

impl DayPayload {
    /// Parse a JSON document.
    pub fn from_json(body: &str) -> Result<Self, String> {
        serde_json::from_str(body).map_err(|e| format!("malformed day payload: {e}"))
    }

    /// Convert into readings, sorted by timestamp.
    ///
    /// Fails on the first key or value that cannot be interpreted; a payload
    /// that half-parses is treated as garbage rather than silently truncated.
    pub fn into_readings(self) -> Result<Vec<RawReading>, String> {
        let Some(data) = self.data else {
            return Ok(Vec::new());
        };

        let mut out = Vec::with_capacity(data.len());
        for (key, value) in data {
            let timestamp = parse_timestamp(&key)?;
            let power_w = match value {
                WireValue::Number(v) => v,
                WireValue::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| format!("bad power value {s:?} at {key}"))?,
            };
            out.push(RawReading { timestamp, power_w });
        }
        out.sort_by_key(|r| r.timestamp);
        Ok(out)
    }
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    TS_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .ok_or_else(|| format!("bad timestamp {s:?}"))
}
