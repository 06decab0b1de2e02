//! Replay provider: reads exported day payloads from a directory.
//!
//! Layout is one file per day, `<dir>/<YYYY-MM-DD>.json`, each holding a
//! [`DayPayload`]. A missing file means "no data for that day yet", which lets
//! a partially exported directory behave like a source that is still filling
//! up.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::{day_payload::DayPayload, reading::RawReading},
    providers::{
        DecodeSnafu, IoSnafu, MissingDirSnafu, ProviderError, ProviderInitError, SampleProvider,
    },
};

/// Reads `<dir>/<day>.json` for every requested day.
#[derive(Debug, Clone)]
pub struct JsonDirProvider {
    dir: PathBuf,
}

impl JsonDirProvider {
    /// Creates a provider over an existing directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ProviderInitError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return MissingDirSnafu {
                path: dir.display().to_string(),
            }
            .fail();
        }
        Ok(Self { dir })
    }

    /// File a given day is read from.
    pub fn day_path(&self, day: NaiveDate) -> PathBuf {
        day_file(&self.dir, day)
    }
}

fn day_file(dir: &Path, day: NaiveDate) -> PathBuf {
    dir.join(format!("{}.json", day.format("%Y-%m-%d")))
}

#[async_trait]
impl SampleProvider for JsonDirProvider {
    async fn fetch_day(&self, day: NaiveDate) -> Result<Vec<RawReading>, ProviderError> {
        let path = self.day_path(day);
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(day = %day, "no replay file");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e).context(IoSnafu),
        };

        DayPayload::from_json(&body)
            .and_then(DayPayload::into_readings)
            .map_err(|message| {
                DecodeSnafu {
                    message: format!("{}: {message}", path.display()),
                }
                .build()
            })
    }
}
