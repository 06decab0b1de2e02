//! In-memory year store.
//!
//! A [`YearStore`] holds one calendar year of sparse per-slot samples keyed by
//! day of year. It validates everything that enters it, so a loaded or merged
//! store always satisfies:
//! - every record's day belongs to `year`;
//! - every slot index is inside `grid`;
//! - every power value is finite and non-negative.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::grid::DailyGrid;

mod day;
mod matrix;

pub use day::{Closure, DayRecord, FreshnessMarker, MergeOutcome, Sample};
pub use matrix::{Cell, YearMatrix};

/// Rejected store mutations. The store is left untouched when one is returned.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StoreError {
    /// The day does not belong to the store's year.
    #[error("{day} is outside year {year}")]
    DayOutsideYear {
        /// Store year.
        year: i32,
        /// Offending day.
        day: NaiveDate,
    },
    /// A sample was stamped with a different day than the one being merged.
    #[error("sample for {sample_day} passed while merging {day}")]
    SampleDayMismatch {
        /// Day being merged.
        day: NaiveDate,
        /// Day on the sample.
        sample_day: NaiveDate,
    },
    /// Slot index is not part of the grid.
    #[error("interval {interval} is outside the {slots}-slot grid")]
    IntervalOutOfGrid {
        /// Offending index.
        interval: u16,
        /// Slots per day.
        slots: u16,
    },
    /// Negative, NaN or infinite power.
    #[error("invalid power {power_w} W on {day} slot {interval}")]
    InvalidPower {
        /// Day of the sample.
        day: NaiveDate,
        /// Slot of the sample.
        interval: u16,
        /// Offending value.
        power_w: f64,
    },
    /// Closing a day that was never fetched.
    #[error("{0} has no record to close")]
    NoRecord(NaiveDate),
}

/// Number of days in `year` (proleptic Gregorian). Years chrono cannot
/// represent count as 365.
pub fn days_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 31).map_or(365, |d| d.ordinal())
}

/// One calendar year of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct YearStore {
    year: i32,
    grid: DailyGrid,
    days: BTreeMap<u32, DayRecord>,
}

impl YearStore {
    /// Empty store for `year` on `grid`.
    pub fn new(year: i32, grid: DailyGrid) -> Self {
        Self {
            year,
            grid,
            days: BTreeMap::new(),
        }
    }

    /// Calendar year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Slot layout of every day in the store.
    pub fn grid(&self) -> &DailyGrid {
        &self.grid
    }

    /// Record for `day`, if it was ever fetched.
    pub fn day(&self, day: NaiveDate) -> Option<&DayRecord> {
        if day.year() != self.year {
            return None;
        }
        self.days.get(&day.ordinal())
    }

    /// All records in date order.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, &DayRecord)> + '_ {
        self.days
            .iter()
            .filter_map(|(ord, rec)| NaiveDate::from_yo_opt(self.year, *ord).map(|d| (d, rec)))
    }

    /// Number of days with a record (including empty ones).
    pub fn recorded_days(&self) -> usize {
        self.days.len()
    }

    /// True when no day was ever fetched.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Merge `samples` into the record for `day`, overwriting slots that are
    /// already present and leaving the rest alone. The record is created if
    /// needed (also for an empty batch) and its fetch time is set to
    /// `fetched_at`.
    ///
    /// The whole batch is validated before anything is written.
    pub fn upsert_day(
        &mut self,
        day: NaiveDate,
        samples: &[Sample],
        fetched_at: DateTime<Utc>,
    ) -> Result<MergeOutcome, StoreError> {
        self.check_day(day)?;
        for s in samples {
            if s.day != day {
                return Err(StoreError::SampleDayMismatch {
                    day,
                    sample_day: s.day,
                });
            }
            self.check_slot(day, s.interval, s.power_w)?;
        }

        let record = self.days.entry(day.ordinal()).or_default();
        Ok(record.merge(samples.iter().map(|s| (s.interval, s.power_w)), fetched_at))
    }

    /// Mark `day` final so later runs skip it.
    pub fn close_day(&mut self, day: NaiveDate, why: Closure) -> Result<(), StoreError> {
        self.check_day(day)?;
        let record = self
            .days
            .get_mut(&day.ordinal())
            .ok_or(StoreError::NoRecord(day))?;
        record.close(why);
        Ok(())
    }

    /// Dense `[day_of_year][interval]` matrix; unmeasured cells are [`Cell::NoData`].
    pub fn matrix_for_rendering(&self) -> YearMatrix {
        let width = usize::from(self.grid.slots());
        let rows = (1..=days_in_year(self.year))
            .map(|ord| {
                let mut row = vec![Cell::NoData; width];
                if let Some(rec) = self.days.get(&ord) {
                    for (&idx, &w) in rec.samples() {
                        if let Some(cell) = row.get_mut(usize::from(idx)) {
                            *cell = Cell::Power(w);
                        }
                    }
                }
                row
            })
            .collect();
        YearMatrix {
            year: self.year,
            grid: self.grid,
            rows,
        }
    }

    /// Total produced energy of the year in kWh.
    pub fn energy_kwh(&self) -> f64 {
        let step = self.grid.step_minutes();
        self.days.values().map(|r| r.energy_kwh(step)).sum()
    }

    /// Insert a whole record, validating its day and samples. Used when
    /// restoring from disk.
    pub(crate) fn insert_record(&mut self, day: NaiveDate, record: DayRecord) -> Result<(), StoreError> {
        self.check_day(day)?;
        for (&idx, &w) in record.samples() {
            self.check_slot(day, idx, w)?;
        }
        self.days.insert(day.ordinal(), record);
        Ok(())
    }

    fn check_day(&self, day: NaiveDate) -> Result<(), StoreError> {
        if day.year() != self.year {
            return Err(StoreError::DayOutsideYear {
                year: self.year,
                day,
            });
        }
        Ok(())
    }

    fn check_slot(&self, day: NaiveDate, interval: u16, power_w: f64) -> Result<(), StoreError> {
        if !self.grid.contains(interval) {
            return Err(StoreError::IntervalOutOfGrid {
                interval,
                slots: self.grid.slots(),
            });
        }
        if !power_w.is_finite() || power_w < 0.0 {
            return Err(StoreError::InvalidPower {
                day,
                interval,
                power_w,
            });
        }
        Ok(())
    }
}
