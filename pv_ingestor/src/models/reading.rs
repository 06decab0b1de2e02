//! Canonical in-memory representation of one power reading as delivered by a
//! data source.
//!
//! This struct is the standard output of every
//! [`SampleProvider`](crate::providers::SampleProvider) implementation.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A single instantaneous power reading.
///
/// The timestamp is the plant's local wall-clock time, exactly as reported by
/// the source. No grid alignment has happened yet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    /// Local timestamp of the reading.
    pub timestamp: NaiveDateTime,

    /// Power output in watts.
    pub power_w: f64,
}

impl RawReading {
    /// Convenience constructor.
    pub fn new(timestamp: NaiveDateTime, power_w: f64) -> Self {
        Self { timestamp, power_w }
    }

    /// Calendar day the reading belongs to.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Time of day of the reading.
    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }
}
