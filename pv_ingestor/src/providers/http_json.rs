//! Provider for a vendor web service that serves one day of readings per
//! `GET` request as a [`DayPayload`](crate::models::day_payload::DayPayload).

pub mod params;
pub mod provider;

pub use params::HttpJsonSettings;
pub use provider::HttpJsonProvider;
