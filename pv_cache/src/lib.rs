//! Incremental per-year cache of PV production samples.
//!
//! Remote day fetches (see [`pv_ingestor`]) are reconciled into one
//! [`store::YearStore`] per calendar year, persisted as one versioned JSON
//! file per year, and exposed as a day × time-of-day matrix for heatmap
//! rendering.

#![deny(missing_docs)]

pub mod config;
pub mod export;
pub mod grid;
pub mod persist;
pub mod providers;
pub mod store;
pub mod summary;
pub mod sync;
pub mod tz;
