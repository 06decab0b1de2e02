use std::fmt;

use chrono::NaiveDate;

use crate::store::Closure;

/// What one reconciliation run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Target year.
    pub year: i32,
    /// No usable stored file was found (missing or corrupt).
    pub started_fresh: bool,
    /// Days in the candidate window.
    pub candidates: usize,
    /// Closed days not fetched.
    pub skipped_closed: usize,
    /// Days fetched successfully (including empty answers).
    pub fetched: usize,
    /// Days closed by this run, with the reason.
    pub newly_closed: Vec<(NaiveDate, Closure)>,
    /// Fetched days that stay open.
    pub still_open: Vec<NaiveDate>,
    /// Days whose fetch failed, with the error text.
    pub failed: Vec<(NaiveDate, String)>,
    /// Slots that received a value for the first time.
    pub samples_added: usize,
    /// Slots whose value changed.
    pub samples_updated: usize,
    /// Readings discarded during grid alignment.
    pub readings_dropped: usize,
    /// Fetching stopped early after too many consecutive failures.
    pub aborted: bool,
    /// The store was written back.
    pub saved: bool,
}

impl SyncReport {
    /// True when nothing was fetched and nothing failed.
    pub fn is_noop(&self) -> bool {
        self.fetched == 0 && self.failed.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // helper: section header with underline
        let mut wrote_any = false;
        let mut section = |title: &str,
                           body: &mut dyn FnMut(&mut fmt::Formatter<'_>) -> fmt::Result|
         -> fmt::Result {
            if wrote_any {
                writeln!(f)?;
            }
            writeln!(f, "{title}")?;
            for _ in 0..title.len() {
                write!(f, "-")?;
            }
            writeln!(f)?;
            body(f)?;
            wrote_any = true;
            Ok(())
        };

        section(&format!("Year {}", self.year), &mut |f| {
            if self.started_fresh {
                writeln!(f, "started from an empty store")?;
            }
            writeln!(
                f,
                "{} candidate days, {} closed skipped, {} fetched",
                self.candidates, self.skipped_closed, self.fetched
            )?;
            writeln!(
                f,
                "{} slots added, {} updated, {} readings dropped",
                self.samples_added, self.samples_updated, self.readings_dropped
            )
        })?;

        if !self.newly_closed.is_empty() {
            section("Closed", &mut |f| {
                for (day, why) in &self.newly_closed {
                    match why {
                        Closure::Complete => writeln!(f, "+ {day}")?,
                        Closure::AcceptedEmpty => writeln!(f, "+ {day}  (accepted empty)")?,
                    }
                }
                Ok(())
            })?;
        }
        if !self.still_open.is_empty() {
            section("Open", &mut |f| {
                for day in &self.still_open {
                    writeln!(f, "~ {day}")?;
                }
                Ok(())
            })?;
        }
        if !self.failed.is_empty() {
            section("Failed", &mut |f| {
                for (day, err) in &self.failed {
                    writeln!(f, "! {day}  {err}")?;
                }
                Ok(())
            })?;
        }

        if self.aborted {
            writeln!(f)?;
            writeln!(f, "fetching stopped after repeated failures")?;
        }
        if !self.saved {
            writeln!(f)?;
            writeln!(f, "nothing saved")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, dd: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, dd).unwrap()
    }

    #[test]
    fn display_full_run() {
        let r = SyncReport {
            year: 2020,
            started_fresh: true,
            candidates: 4,
            skipped_closed: 0,
            fetched: 3,
            newly_closed: vec![(d(1, 1), Closure::Complete), (d(1, 2), Closure::AcceptedEmpty)],
            still_open: vec![d(1, 4)],
            failed: vec![(d(1, 3), "API error (HTTP 503): maintenance".to_string())],
            samples_added: 24,
            samples_updated: 0,
            readings_dropped: 2,
            aborted: false,
            saved: true,
        };

        let expected = "\
Year 2020
---------
started from an empty store
4 candidate days, 0 closed skipped, 3 fetched
24 slots added, 0 updated, 2 readings dropped

Closed
------
+ 2020-01-01
+ 2020-01-02  (accepted empty)

Open
----
~ 2020-01-04

Failed
------
! 2020-01-03  API error (HTTP 503): maintenance
";
        assert_eq!(r.to_string(), expected);
    }

    #[test]
    fn display_noop_run() {
        let r = SyncReport {
            year: 2019,
            candidates: 365,
            skipped_closed: 365,
            ..SyncReport::default()
        };
        assert!(r.is_noop());
        insta::assert_snapshot!(r.to_string().trim_end(), @r"
        Year 2019
        ---------
        365 candidate days, 365 closed skipped, 0 fetched
        0 slots added, 0 updated, 0 readings dropped

        nothing saved
        ");
    }
}
