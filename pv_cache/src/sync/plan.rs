//! Which days a run has to fetch.

use chrono::NaiveDate;

use crate::store::YearStore;

/// Days of `year` that may hold data as of `today`: January 1 through
/// `min(December 31, today)`. Empty for future years.
pub fn candidate_days(year: i32, today: NaiveDate) -> Vec<NaiveDate> {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Vec::new();
    };
    let end = last.min(today);
    first.iter_days().take_while(|d| *d <= end).collect()
}

/// Outcome of planning one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchPlan {
    /// Number of candidate days.
    pub candidates: usize,
    /// Days to fetch, ascending.
    pub fetch: Vec<NaiveDate>,
    /// Closed past days that are skipped.
    pub skipped_closed: usize,
}

/// Skip closed days strictly before `today`; fetch everything else,
/// including never-fetched days and `today` itself.
pub fn plan_fetches(store: &YearStore, today: NaiveDate) -> FetchPlan {
    let candidates = candidate_days(store.year(), today);
    let mut plan = FetchPlan {
        candidates: candidates.len(),
        ..FetchPlan::default()
    };
    for day in candidates {
        let closed = store.day(day).is_some_and(|r| r.is_closed());
        if closed && day < today {
            plan.skipped_closed += 1;
        } else {
            plan.fetch.push(day);
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grid::DailyGrid,
        store::{Closure, Sample},
    };
    use chrono::{TimeZone, Utc};

    fn d(y: i32, m: u32, dd: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, dd).unwrap()
    }

    #[test]
    fn candidates_stop_at_today_or_year_end() {
        let c = candidate_days(2024, d(2024, 3, 2));
        assert_eq!(c.len(), 31 + 29 + 2);
        assert_eq!(c.first(), Some(&d(2024, 1, 1)));
        assert_eq!(c.last(), Some(&d(2024, 3, 2)));

        let past = candidate_days(2023, d(2024, 3, 2));
        assert_eq!(past.len(), 365);
        assert_eq!(past.last(), Some(&d(2023, 12, 31)));

        assert!(candidate_days(2025, d(2024, 3, 2)).is_empty());
        assert_eq!(candidate_days(2024, d(2024, 1, 1)), vec![d(2024, 1, 1)]);
    }

    #[test]
    fn closed_past_days_are_skipped() {
        let at = Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap();
        let mut s = YearStore::new(2024, DailyGrid::default());
        for day in [d(2024, 1, 1), d(2024, 1, 2)] {
            s.upsert_day(day, &[Sample::new(day, 0, 1.0)], at).unwrap();
        }
        s.close_day(d(2024, 1, 1), Closure::Complete).unwrap();
        // open record, still fetched
        s.upsert_day(d(2024, 1, 3), &[], at).unwrap();

        let plan = plan_fetches(&s, d(2024, 1, 4));
        assert_eq!(plan.candidates, 4);
        assert_eq!(plan.skipped_closed, 1);
        assert_eq!(plan.fetch, vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)]);
    }
}
