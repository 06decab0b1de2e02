use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::{day_payload::DayPayload, reading::RawReading},
    providers::{
        ApiSnafu, AuthSnafu, ClientBuildSnafu, DecodeSnafu, InvalidEndpointSnafu, ProviderError,
        ProviderInitError, ReqwestSnafu, SampleProvider,
        http_json::params::{HttpJsonSettings, day_query},
        pacing::{Pacer, RetryPolicy},
    },
};

/// Fetches day payloads over HTTP with basic auth.
pub struct HttpJsonProvider {
    client: Client,
    endpoint: Url,
    plant_id: String,
    username: String,
    password: SecretString,
    retry: RetryPolicy,
    pacer: Option<Pacer>,
}

impl HttpJsonProvider {
    /// Creates a new provider from explicit settings.
    pub fn new(settings: HttpJsonSettings) -> Result<Self, ProviderInitError> {
        let endpoint = Url::parse(&settings.endpoint).map_err(|e| {
            InvalidEndpointSnafu {
                endpoint: settings.endpoint.clone(),
                reason: e.to_string(),
            }
            .build()
        })?;

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            endpoint,
            plant_id: settings.plant_id,
            username: settings.username,
            password: settings.password,
            retry: settings.retry,
            pacer: Pacer::per_second(settings.requests_per_second),
        })
    }

    async fn fetch_once(&self, day: NaiveDate) -> Result<Vec<RawReading>, ProviderError> {
        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }

        let response = self
            .client
            .get(self.endpoint.clone())
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .query(&day_query(&self.plant_id, day))
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return AuthSnafu {
                message: format!("HTTP {status}"),
            }
            .fail();
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu {
                status: status.as_u16(),
                message,
            }
            .fail();
        }

        let body = response.text().await.context(ReqwestSnafu)?;
        let readings = DayPayload::from_json(&body)
            .and_then(DayPayload::into_readings)
            .map_err(|message| DecodeSnafu { message }.build())?;

        debug!(day = %day, readings = readings.len(), "day payload received");
        Ok(readings)
    }
}

#[async_trait]
impl SampleProvider for HttpJsonProvider {
    async fn fetch_day(&self, day: NaiveDate) -> Result<Vec<RawReading>, ProviderError> {
        self.retry.run(|| self.fetch_once(day)).await
    }
}
