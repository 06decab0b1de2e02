//! Turning fetched readings into grid samples and deciding day closure.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use pv_ingestor::models::reading::RawReading;

use crate::{
    grid::DailyGrid,
    store::{Closure, Sample, StoreError, YearStore},
};

/// When an empty past day may be given up on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClosePolicy {
    /// Close an empty day once it is at least this many days old.
    /// `None` keeps empty days open forever.
    pub close_empty_after_days: Option<u32>,
}

/// Grid-aligned samples of one fetched day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// One sample per populated slot, ascending.
    pub samples: Vec<Sample>,
    /// Readings that could not be used.
    pub dropped: usize,
}

/// Align `readings` for `day` onto `grid`.
///
/// Readings dated another day, outside the grid window, negative or not
/// finite are dropped. Several readings landing in one slot are averaged.
pub fn normalize(day: NaiveDate, grid: &DailyGrid, readings: &[RawReading]) -> Normalized {
    let mut slots: BTreeMap<u16, (f64, u32)> = BTreeMap::new();
    let mut dropped = 0;
    for r in readings {
        let slot = (r.date() == day && r.power_w.is_finite() && r.power_w >= 0.0)
            .then(|| grid.interval_of(r.time()))
            .flatten();
        match slot {
            Some(idx) => {
                let acc = slots.entry(idx).or_insert((0.0, 0));
                acc.0 += r.power_w;
                acc.1 += 1;
            }
            None => dropped += 1,
        }
    }
    let samples = slots
        .into_iter()
        .map(|(idx, (sum, n))| Sample::new(day, idx, sum / f64::from(n)))
        .collect();
    Normalized { samples, dropped }
}

/// State of a day after it was fetched in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    /// Final; later runs skip it.
    Closed(Closure),
    /// Fetched again next run.
    Open,
}

/// Close `day` if it is over and has data, or if it is empty and old enough
/// for `policy`. `today` and later always stay open.
pub fn settle_day(
    store: &mut YearStore,
    day: NaiveDate,
    today: NaiveDate,
    policy: &ClosePolicy,
) -> Result<DayState, StoreError> {
    if day >= today {
        return Ok(DayState::Open);
    }
    let has_data = store.day(day).is_some_and(|r| !r.is_empty());
    let why = if has_data {
        Closure::Complete
    } else {
        let age = (today - day).num_days();
        match policy.close_empty_after_days {
            Some(limit) if age >= i64::from(limit) => Closure::AcceptedEmpty,
            _ => return Ok(DayState::Open),
        }
    };
    store.close_day(day, why)?;
    Ok(DayState::Closed(why))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone, Utc};

    fn d(m: u32, dd: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, dd).unwrap()
    }

    fn r(ts: &str, w: f64) -> RawReading {
        RawReading::new(NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(), w)
    }

    #[test]
    fn normalize_aligns_and_drops() {
        let grid = DailyGrid::default();
        let readings = vec![
            r("2020-01-01 05:00:00", 10.0),
            r("2020-01-01 05:02:00", 20.0),
            r("2020-01-01 12:00:00", 0.0),
            r("2020-01-01 04:55:00", 1.0),
            r("2020-01-01 22:00:00", 1.0),
            r("2020-01-02 06:00:00", 1.0),
            r("2020-01-01 06:00:00", -3.0),
            r("2020-01-01 06:05:00", f64::INFINITY),
        ];
        let n = normalize(d(1, 1), &grid, &readings);
        assert_eq!(
            n.samples,
            vec![Sample::new(d(1, 1), 0, 15.0), Sample::new(d(1, 1), 84, 0.0)]
        );
        assert_eq!(n.dropped, 5);
    }

    fn store_with(day: NaiveDate, samples: &[Sample]) -> YearStore {
        let mut s = YearStore::new(2020, DailyGrid::default());
        let at = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        s.upsert_day(day, samples, at).unwrap();
        s
    }

    #[test]
    fn past_day_with_data_closes() {
        let day = d(1, 1);
        let mut s = store_with(day, &[Sample::new(day, 5, 1.0)]);
        let st = settle_day(&mut s, day, d(1, 2), &ClosePolicy::default()).unwrap();
        assert_eq!(st, DayState::Closed(Closure::Complete));
        assert!(s.day(day).unwrap().is_closed());
    }

    #[test]
    fn today_stays_open() {
        let day = d(1, 2);
        let mut s = store_with(day, &[Sample::new(day, 5, 1.0)]);
        let st = settle_day(&mut s, day, day, &ClosePolicy::default()).unwrap();
        assert_eq!(st, DayState::Open);
        assert!(!s.day(day).unwrap().is_closed());
    }

    #[test]
    fn empty_day_follows_policy() {
        let day = d(1, 5);
        let never = ClosePolicy::default();
        let week = ClosePolicy {
            close_empty_after_days: Some(7),
        };

        let mut s = store_with(day, &[]);
        assert_eq!(settle_day(&mut s, day, d(6, 1), &never).unwrap(), DayState::Open);
        assert_eq!(settle_day(&mut s, day, d(1, 11), &week).unwrap(), DayState::Open);
        assert_eq!(
            settle_day(&mut s, day, d(1, 12), &week).unwrap(),
            DayState::Closed(Closure::AcceptedEmpty)
        );
    }
}
