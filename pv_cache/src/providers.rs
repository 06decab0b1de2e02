//! Provider registry that maps validated fetcher settings to concrete providers
use pv_ingestor::providers::{
    ProviderInitError, SampleProvider, http_json::HttpJsonProvider, json_dir::JsonDirProvider,
};
use tracing::info;

use crate::config::FetcherSettings;

/// Build and return a boxed sample provider for the configured fetcher.
pub fn build_provider(
    settings: FetcherSettings,
) -> Result<Box<dyn SampleProvider + Send + Sync>, ProviderInitError> {
    match settings {
        FetcherSettings::HttpJson(s) => {
            info!(endpoint = %s.endpoint, plant_id = %s.plant_id, "using http_json provider");
            let p = HttpJsonProvider::new(s)?;
            Ok(Box::new(p))
        }
        FetcherSettings::JsonDir { dir } => {
            info!(dir = %dir.display(), "using json_dir provider");
            let p = JsonDirProvider::new(dir)?;
            Ok(Box::new(p))
        }
    }
}
