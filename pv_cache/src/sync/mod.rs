//! Incremental reconciliation of one year.
//!
//! ## What a run does
//! 1. Takes the year lock and loads the stored year. A missing or corrupt file
//!    means starting from an empty store; a corrupt one is quarantined first.
//! 2. Plans the fetches: every day from January 1 through
//!    `min(December 31, today)` except closed days before `today`.
//! 3. Fetches the planned days one at a time, aligns the readings to the grid,
//!    merges them and settles each day (closed or open).
//! 4. Saves the store once, after the loop.
//!
//! ## Failures
//! A failed fetch leaves that day as it was and the run moves on. With
//! `max_consecutive_failures` set, a streak of that many failures stops the
//! loop early; whatever was merged is still saved. Only lock, load and save
//! failures end a run with an error, and a failed save never touches the
//! previous file.

mod apply;
mod plan;
mod report;

use chrono::{DateTime, NaiveDate, Utc};
use pv_ingestor::providers::SampleProvider;
use tracing::{debug, info, warn};

use crate::{
    grid::DailyGrid,
    persist::{LoadOutcome, PersistError, YearRepo},
    store::YearStore,
};

pub use apply::{ClosePolicy, DayState, Normalized, normalize, settle_day};
pub use plan::{FetchPlan, candidate_days, plan_fetches};
pub use report::SyncReport;

/// Inputs of one run besides the year itself.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Current plant-local date.
    pub today: NaiveDate,
    /// Fetch timestamp written into freshness markers.
    pub now: DateTime<Utc>,
    /// Grid for a year that has no stored file yet.
    pub grid: DailyGrid,
    /// Closure rule for empty days.
    pub policy: ClosePolicy,
    /// Stop fetching after this many failures in a row.
    pub max_consecutive_failures: Option<u32>,
}

/// Failures that end a run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Could not take the year lock.
    #[error("cannot lock year {year}: {source}")]
    Lock {
        /// Target year.
        year: i32,
        /// Underlying error.
        #[source]
        source: PersistError,
    },
    /// Could not read the stored year.
    #[error("cannot load year {year}: {source}")]
    Load {
        /// Target year.
        year: i32,
        /// Underlying error.
        #[source]
        source: PersistError,
    },
    /// Could not write the year back; the previous file is intact.
    #[error("cannot save year {year}: {source}")]
    Save {
        /// Target year.
        year: i32,
        /// Underlying error.
        #[source]
        source: PersistError,
    },
}

/// Progress of the fetch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncProgress {
    /// Fetches attempted so far.
    pub done: usize,
    /// Fetches planned for this run.
    pub total: usize,
    /// Day just attempted.
    pub day: NaiveDate,
}

/// Reconcile `year` against `provider` and persist it through `repo`.
pub async fn sync_year(
    repo: &dyn YearRepo,
    provider: &(dyn SampleProvider + Send + Sync),
    year: i32,
    opt: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    sync_year_with_progress(repo, provider, year, opt, &mut |_| {}).await
}

/// [`sync_year`] with a callback after every attempted fetch.
pub async fn sync_year_with_progress(
    repo: &dyn YearRepo,
    provider: &(dyn SampleProvider + Send + Sync),
    year: i32,
    opt: &SyncOptions,
    progress: &mut (dyn FnMut(SyncProgress) + Send),
) -> Result<SyncReport, SyncError> {
    let _lock = repo
        .lock(year)
        .map_err(|source| SyncError::Lock { year, source })?;

    let (mut store, started_fresh) = load_or_fresh(repo, year, opt.grid)
        .map_err(|source| SyncError::Load { year, source })?;

    let plan = plan_fetches(&store, opt.today);
    info!(
        year,
        candidates = plan.candidates,
        to_fetch = plan.fetch.len(),
        skipped_closed = plan.skipped_closed,
        "planned sync"
    );

    let mut report = SyncReport {
        year,
        started_fresh,
        candidates: plan.candidates,
        skipped_closed: plan.skipped_closed,
        ..SyncReport::default()
    };

    let total = plan.fetch.len();
    let mut streak = 0u32;
    for (i, day) in plan.fetch.into_iter().enumerate() {
        match provider.fetch_day(day).await {
            Ok(readings) => {
                streak = 0;
                if let Err(reason) = merge_day(&mut store, day, &readings, opt, &mut report) {
                    warn!(%day, %reason, "could not merge fetched day");
                    report.failed.push((day, reason));
                }
            }
            Err(e) => {
                streak += 1;
                warn!(%day, error = %e, "fetch failed, day stays open");
                report.failed.push((day, e.to_string()));
            }
        }
        progress(SyncProgress {
            done: i + 1,
            total,
            day,
        });

        if let Some(limit) = opt.max_consecutive_failures
            && streak >= limit
        {
            warn!(year, failures = streak, "too many consecutive failures, stopping");
            report.aborted = true;
            break;
        }
    }

    if report.fetched > 0 {
        repo.save(&store)
            .map_err(|source| SyncError::Save { year, source })?;
        report.saved = true;
    }

    info!(
        year,
        fetched = report.fetched,
        closed = report.newly_closed.len(),
        open = report.still_open.len(),
        failed = report.failed.len(),
        saved = report.saved,
        "sync finished"
    );
    Ok(report)
}

fn load_or_fresh(
    repo: &dyn YearRepo,
    year: i32,
    grid: DailyGrid,
) -> Result<(YearStore, bool), PersistError> {
    match repo.load(year)? {
        LoadOutcome::Loaded(store) => {
            if store.grid() != &grid {
                warn!(
                    year,
                    stored = ?store.grid(),
                    configured = ?grid,
                    "stored grid differs from configuration, keeping the stored one"
                );
            }
            Ok((store, false))
        }
        LoadOutcome::Missing => Ok((YearStore::new(year, grid), true)),
        LoadOutcome::Corrupt(reason) => {
            warn!(year, %reason, "starting year from scratch");
            repo.quarantine(year)?;
            Ok((YearStore::new(year, grid), true))
        }
    }
}

fn merge_day(
    store: &mut YearStore,
    day: NaiveDate,
    readings: &[pv_ingestor::models::reading::RawReading],
    opt: &SyncOptions,
    report: &mut SyncReport,
) -> Result<(), String> {
    let grid = *store.grid();
    let Normalized { samples, dropped } = normalize(day, &grid, readings);
    if dropped > 0 {
        debug!(%day, dropped, "dropped readings outside the grid");
    }

    let merged = store
        .upsert_day(day, &samples, opt.now)
        .map_err(|e| e.to_string())?;
    let state = settle_day(store, day, opt.today, &opt.policy).map_err(|e| e.to_string())?;

    debug!(
        %day,
        samples = samples.len(),
        added = merged.added,
        updated = merged.updated,
        ?state,
        "merged day"
    );

    report.fetched += 1;
    report.samples_added += merged.added;
    report.samples_updated += merged.updated;
    report.readings_dropped += dropped;
    match state {
        DayState::Closed(why) => report.newly_closed.push((day, why)),
        DayState::Open => report.still_open.push(day),
    }
    Ok(())
}
