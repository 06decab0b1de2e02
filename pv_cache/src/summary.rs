//! Coverage and energy overview of a stored year.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

use crate::store::{Closure, YearStore, days_in_year};

/// Aggregates shown by `solarview show`.
#[derive(Debug, Clone, PartialEq)]
pub struct YearSummary {
    /// Calendar year.
    pub year: i32,
    /// Days in the calendar year.
    pub days_in_year: u32,
    /// Days with a record.
    pub recorded_days: usize,
    /// Days with at least one sample.
    pub days_with_data: usize,
    /// Days closed with data.
    pub closed_complete: usize,
    /// Days closed as accepted outages.
    pub closed_empty: usize,
    /// Recorded days that are still open.
    pub open_days: usize,
    /// Populated slots over the year.
    pub samples: usize,
    /// Year energy in kWh.
    pub energy_kwh: f64,
    /// Highest-yield day and its energy.
    pub best_day: Option<(NaiveDate, f64)>,
    /// Latest fetch time of any day.
    pub last_fetched: Option<DateTime<Utc>>,
}

impl YearSummary {
    /// Summarize `store`.
    pub fn of(store: &YearStore) -> Self {
        let step = store.grid().step_minutes();
        let mut s = Self {
            year: store.year(),
            days_in_year: days_in_year(store.year()),
            recorded_days: store.recorded_days(),
            days_with_data: 0,
            closed_complete: 0,
            closed_empty: 0,
            open_days: 0,
            samples: 0,
            energy_kwh: store.energy_kwh(),
            best_day: None,
            last_fetched: None,
        };
        for (day, rec) in store.days() {
            match rec.freshness().closed {
                Some(Closure::Complete) => s.closed_complete += 1,
                Some(Closure::AcceptedEmpty) => s.closed_empty += 1,
                None => s.open_days += 1,
            }
            if !rec.is_empty() {
                s.days_with_data += 1;
                s.samples += rec.len();
                let kwh = rec.energy_kwh(step);
                if s.best_day.is_none_or(|(_, best)| kwh > best) {
                    s.best_day = Some((day, kwh));
                }
            }
            s.last_fetched = s.last_fetched.max(rec.freshness().last_fetched);
        }
        s
    }
}

impl fmt::Display for YearSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!("Year {}", self.year);
        writeln!(f, "{title}")?;
        writeln!(f, "{}", "-".repeat(title.len()))?;
        writeln!(
            f,
            "recorded   {}/{} days ({} with data)",
            self.recorded_days, self.days_in_year, self.days_with_data
        )?;
        writeln!(
            f,
            "closed     {} complete, {} accepted empty",
            self.closed_complete, self.closed_empty
        )?;
        writeln!(f, "open       {}", self.open_days)?;
        writeln!(f, "samples    {}", self.samples)?;
        writeln!(f, "energy     {:.2} kWh", self.energy_kwh)?;
        if let Some((day, kwh)) = self.best_day {
            writeln!(f, "best day   {day} ({kwh:.2} kWh)")?;
        }
        match self.last_fetched {
            Some(at) => writeln!(f, "fetched    {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => writeln!(f, "fetched    never"),
        }
    }
}
