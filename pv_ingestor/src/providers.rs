//! Provider abstraction for PV production sources.
//!
//! This module defines the [`SampleProvider`] trait, the single seam between
//! the caching engine and whatever actually holds the readings (a vendor web
//! service, a directory of exported day files, a test double).
//!
//! The trait is designed for async usage and supports dynamic dispatch
//! (`dyn SampleProvider`) for runtime selection of providers.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use chrono::NaiveDate;
//! use pv_ingestor::models::reading::RawReading;
//! use pv_ingestor::providers::{ProviderError, SampleProvider};
//!
//! struct Dark;
//!
//! #[async_trait]
//! impl SampleProvider for Dark {
//!     async fn fetch_day(&self, _day: NaiveDate) -> Result<Vec<RawReading>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod http_json;
pub mod json_dir;
pub mod pacing;

use async_trait::async_trait;
use chrono::NaiveDate;
use snafu::{Backtrace, Snafu};

use crate::models::reading::RawReading;

/// Trait for fetching one day of power readings from a data source.
#[async_trait]
pub trait SampleProvider {
    /// Fetches all readings the source currently holds for `day`.
    ///
    /// # Returns
    ///
    /// * `Ok(vec![])` - The source has no data for that day (yet). This is not
    ///   an error: outages and not-yet-published days look like this.
    /// * `Ok(readings)` - Readings in local plant time, in any order.
    /// * `Err(ProviderError)` - The call failed; the caller may try again later.
    async fn fetch_day(&self, day: NaiveDate) -> Result<Vec<RawReading>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The endpoint is not a usable URL.
    #[snafu(display("Invalid endpoint {endpoint:?}: {reason}"))]
    InvalidEndpoint {
        endpoint: String,
        reason: String,
        backtrace: Backtrace,
    },

    /// The replay directory does not exist or is not a directory.
    #[snafu(display("Replay directory {path} is not readable"))]
    MissingDir { path: String, backtrace: Backtrace },
}

/// Errors that can occur within a `SampleProvider` implementation.
///
/// From the caller's point of view every variant is transient: the day is
/// left as it was and retried on a later run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API answered with a non-success status.
    #[snafu(display("API error (HTTP {status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// Credentials were rejected or the session expired.
    #[snafu(display("Authentication rejected: {message}"))]
    Auth {
        message: String,
        backtrace: Backtrace,
    },

    /// The source answered but the payload could not be interpreted.
    #[snafu(display("Cannot decode day payload: {message}"))]
    Decode {
        message: String,
        backtrace: Backtrace,
    },

    /// Local I/O failure (replay provider).
    #[snafu(display("I/O error: {source}"))]
    Io {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

impl ProviderError {
    /// Whether repeating the same request right away has a chance to succeed.
    ///
    /// Network hiccups, timeouts, rate limiting and server-side failures are
    /// retryable; bad credentials and malformed payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Reqwest { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Auth { .. } | ProviderError::Decode { .. } | ProviderError::Io { .. } => {
                false
            }
        }
    }
}
