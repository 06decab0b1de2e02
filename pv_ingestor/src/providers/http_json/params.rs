use std::time::Duration;

use secrecy::SecretString;

use crate::providers::pacing::RetryPolicy;

/// Everything [`HttpJsonProvider`](super::HttpJsonProvider) needs, built once
/// from the application configuration and handed to the constructor.
#[derive(Debug)]
pub struct HttpJsonSettings {
    /// Day endpoint, e.g. `https://vendor.example/api/day`.
    pub endpoint: String,
    /// Plant identifier sent as the `plantId` query parameter.
    pub plant_id: String,
    /// HTTP basic-auth user.
    pub username: String,
    /// HTTP basic-auth password.
    pub password: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry behaviour for retryable failures.
    pub retry: RetryPolicy,
    /// Request pacing, `0` disables it.
    pub requests_per_second: u32,
}

/// Query parameters for one day request.
pub(crate) fn day_query(plant_id: &str, day: chrono::NaiveDate) -> [(&'static str, String); 2] {
    [
        ("plantId", plant_id.to_string()),
        ("date", day.format("%Y-%m-%d").to_string()),
    ]
}
