//! Fetch side of solarview: turns "give me the readings of day D" into calls
//! against a concrete production data source.
//!
//! The crate is deliberately ignorant of how readings are stored; it only
//! produces [`models::reading::RawReading`]s. The caching engine lives in
//! `pv_cache`.

pub mod models;
pub mod providers;
