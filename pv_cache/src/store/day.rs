//! Per-day records and their freshness bookkeeping.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One power reading aligned to the daily grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Calendar day (plant-local).
    pub day: NaiveDate,
    /// Slot index in the daily grid.
    pub interval: u16,
    /// Average power over the slot in watts. Never negative.
    pub power_w: f64,
}

impl Sample {
    /// Convenience constructor.
    pub fn new(day: NaiveDate, interval: u16, power_w: f64) -> Self {
        Self {
            day,
            interval,
            power_w,
        }
    }
}

/// Why a day was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Closure {
    /// Fetched after the day ended and it had data.
    Complete,
    /// Still empty after the configured grace period; accepted as an outage.
    AcceptedEmpty,
}

/// Decides whether a day is re-fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FreshnessMarker {
    /// When the day was last fetched successfully.
    pub last_fetched: Option<DateTime<Utc>>,
    /// Set once the day is final.
    pub closed: Option<Closure>,
}

impl FreshnessMarker {
    /// True once the day is final.
    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }
}

/// Counts from one merge into a [`DayRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Slots that had no value before.
    pub added: usize,
    /// Slots whose value was replaced by a different one.
    pub updated: usize,
    /// Slots re-sent with the same value.
    pub unchanged: usize,
}

impl MergeOutcome {
    /// True if the merge changed any stored value.
    pub fn changed(&self) -> bool {
        self.added + self.updated > 0
    }
}

/// Sparse samples of one day. A missing slot means "no data", not zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayRecord {
    samples: BTreeMap<u16, f64>,
    freshness: FreshnessMarker,
}

impl DayRecord {
    pub(crate) fn from_parts(samples: BTreeMap<u16, f64>, freshness: FreshnessMarker) -> Self {
        Self { samples, freshness }
    }

    /// Slot → watts, ordered by slot.
    pub fn samples(&self) -> &BTreeMap<u16, f64> {
        &self.samples
    }

    /// Value of one slot, if measured.
    pub fn get(&self, interval: u16) -> Option<f64> {
        self.samples.get(&interval).copied()
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no slot has data.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Freshness bookkeeping for this day.
    pub fn freshness(&self) -> &FreshnessMarker {
        &self.freshness
    }

    /// True once the day is final.
    pub fn is_closed(&self) -> bool {
        self.freshness.is_closed()
    }

    /// Produced energy in kWh, treating each sample as the mean power of its slot.
    pub fn energy_kwh(&self, step_minutes: u32) -> f64 {
        let hours = f64::from(step_minutes) / 60.0;
        self.samples.values().map(|w| w * hours).sum::<f64>() / 1000.0
    }

    pub(crate) fn merge(
        &mut self,
        samples: impl IntoIterator<Item = (u16, f64)>,
        fetched_at: DateTime<Utc>,
    ) -> MergeOutcome {
        let mut out = MergeOutcome::default();
        for (interval, power_w) in samples {
            match self.samples.insert(interval, power_w) {
                None => out.added += 1,
                Some(prev) if prev.to_bits() == power_w.to_bits() => out.unchanged += 1,
                Some(_) => out.updated += 1,
            }
        }
        self.freshness.last_fetched = Some(fetched_at);
        out
    }

    pub(crate) fn close(&mut self, why: Closure) {
        self.freshness.closed = Some(why);
    }
}
