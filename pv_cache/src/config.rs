//! Application configuration: TOML shape, defaults and validation.
//!
//! The file is parsed into [`AppConfig`] (raw, as written) and then checked by
//! [`AppConfig::validate`] into [`Settings`] (typed, ready to hand to
//! constructors). Any problem is a [`ConfigError`] and fatal at startup.
//!
//! Entrypoints:
//! - Parse from a TOML string: [`load_config_str`]
//! - Parse from a file path: [`load_config_path`]

use std::{path::PathBuf, time::Duration};

use chrono::NaiveTime;
use chrono_tz::Tz;
use pv_ingestor::providers::{
    http_json::HttpJsonSettings,
    pacing::{DEFAULT_REQUESTS_PER_SECOND, RetryPolicy},
};
use secrecy::SecretString;
use serde::Deserialize;
use shared_utils::config::ConfigError;

use crate::{grid::DailyGrid, persist::FilePattern, sync::ClosePolicy, tz::parse_tz};

/// Environment variable that overrides `fetcher.password`.
pub const PASSWORD_ENV: &str = "SOLARVIEW_PASSWORD";
/// Config file used when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "solarview.toml";

/// Raw configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Where year files live.
    pub storage: StorageCfg,
    /// Data source.
    pub fetcher: FetcherCfg,
    /// Daily sampling grid.
    #[serde(default)]
    pub grid: GridCfg,
    /// Closure and failure policy.
    #[serde(default)]
    pub policy: PolicyCfg,
    /// Plant location.
    #[serde(default)]
    pub site: SiteCfg,
}

/// `[storage]`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageCfg {
    /// Directory holding one file per year.
    pub dir: PathBuf,
    /// File name template with a `????` year placeholder.
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
}

/// Which provider implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetcherKind {
    /// Vendor HTTP JSON endpoint.
    HttpJson,
    /// Directory of saved day payloads.
    JsonDir,
}

/// `[fetcher]`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetcherCfg {
    /// Provider implementation.
    pub kind: FetcherKind,
    /// Day endpoint URL (`http_json`).
    pub endpoint: Option<String>,
    /// Plant identifier (`http_json`).
    pub plant_id: Option<String>,
    /// Basic-auth user (`http_json`).
    pub username: Option<String>,
    /// Basic-auth password (`http_json`); [`PASSWORD_ENV`] wins when set.
    pub password: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries after the first attempt for retryable failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, doubled each time.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Request pacing; `0` disables it.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    /// Payload directory (`json_dir`).
    pub dir: Option<PathBuf>,
}

/// `[grid]`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridCfg {
    /// First slot start, `HH:MM`.
    pub start: String,
    /// End of the last slot (exclusive), `HH:MM`.
    pub end: String,
    /// Slot width in minutes.
    pub step_minutes: u32,
}

impl Default for GridCfg {
    fn default() -> Self {
        Self {
            start: "05:00".to_string(),
            end: "22:00".to_string(),
            step_minutes: 5,
        }
    }
}

/// `[policy]`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyCfg {
    /// Accept an empty day as final once it is this many days old.
    pub close_empty_after_days: Option<u32>,
    /// Stop a run after this many failed fetches in a row.
    pub max_consecutive_failures: Option<u32>,
}

/// `[site]`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteCfg {
    /// IANA time zone of the plant.
    pub timezone: Option<String>,
}

fn default_file_pattern() -> String {
    "solarview_????.json".to_string()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_max_retries() -> u32 {
    RetryPolicy::default().max_attempts.saturating_sub(1)
}
fn default_retry_delay_ms() -> u64 {
    u64::try_from(RetryPolicy::default().base_delay.as_millis()).unwrap_or(u64::MAX)
}
fn default_requests_per_second() -> u32 {
    DEFAULT_REQUESTS_PER_SECOND.get()
}

/// Validated storage location.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Directory holding year files.
    pub dir: PathBuf,
    /// Year file naming.
    pub pattern: FilePattern,
}

/// Validated provider choice.
#[derive(Debug)]
pub enum FetcherSettings {
    /// Vendor HTTP endpoint.
    HttpJson(HttpJsonSettings),
    /// Saved payload directory.
    JsonDir {
        /// Directory with `<YYYY-MM-DD>.json` files.
        dir: PathBuf,
    },
}

/// Everything the binary needs, validated.
#[derive(Debug)]
pub struct Settings {
    /// Storage location.
    pub storage: StorageSettings,
    /// Data source.
    pub fetcher: FetcherSettings,
    /// Sampling grid for new years.
    pub grid: DailyGrid,
    /// Empty-day closure rule.
    pub policy: ClosePolicy,
    /// Failure streak that stops a run.
    pub max_consecutive_failures: Option<u32>,
    /// Plant time zone; `None` means host local time.
    pub timezone: Option<Tz>,
}

/// Parse a config from TOML text.
pub fn load_config_str(s: &str) -> Result<AppConfig, ConfigError> {
    toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Read and parse a config file.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    load_config_str(&s)
}

impl AppConfig {
    /// Check every value and build [`Settings`]. `password_override` (usually
    /// [`PASSWORD_ENV`]) replaces `fetcher.password` when present.
    pub fn validate(self, password_override: Option<String>) -> Result<Settings, ConfigError> {
        let pattern = FilePattern::parse(&self.storage.file_pattern)
            .map_err(|e| ConfigError::invalid("storage.file_pattern", e.to_string()))?;
        if self.storage.dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("storage.dir", "must not be empty"));
        }

        let grid = self.grid.validate()?;
        let fetcher = self.fetcher.validate(password_override)?;

        if self.policy.max_consecutive_failures == Some(0) {
            return Err(ConfigError::invalid(
                "policy.max_consecutive_failures",
                "must be at least 1 (omit it to never stop)",
            ));
        }

        let timezone = self
            .site
            .timezone
            .as_deref()
            .map(parse_tz)
            .transpose()
            .map_err(|e| ConfigError::invalid("site.timezone", format!("{e:#}")))?;

        Ok(Settings {
            storage: StorageSettings {
                dir: self.storage.dir,
                pattern,
            },
            fetcher,
            grid,
            policy: ClosePolicy {
                close_empty_after_days: self.policy.close_empty_after_days,
            },
            max_consecutive_failures: self.policy.max_consecutive_failures,
            timezone,
        })
    }
}

impl GridCfg {
    fn validate(&self) -> Result<DailyGrid, ConfigError> {
        let start = parse_hhmm("grid.start", &self.start)?;
        let end = parse_hhmm("grid.end", &self.end)?;
        DailyGrid::from_times(start, end, self.step_minutes)
            .map_err(|e| ConfigError::invalid("grid", e.to_string()))
    }
}

impl FetcherCfg {
    fn validate(self, password_override: Option<String>) -> Result<FetcherSettings, ConfigError> {
        match self.kind {
            FetcherKind::HttpJson => {
                let endpoint = required("fetcher.endpoint", self.endpoint)?;
                let plant_id = required("fetcher.plant_id", self.plant_id)?;
                let username = required("fetcher.username", self.username)?;
                let password = password_override
                    .or(self.password.filter(|p| !p.is_empty()))
                    .ok_or_else(|| ConfigError::MissingEnvVar(PASSWORD_ENV.to_string()))?;
                if self.timeout_secs == 0 {
                    return Err(ConfigError::invalid("fetcher.timeout_secs", "must be positive"));
                }
                Ok(FetcherSettings::HttpJson(HttpJsonSettings {
                    endpoint,
                    plant_id,
                    username,
                    password: SecretString::from(password),
                    timeout: Duration::from_secs(self.timeout_secs),
                    retry: RetryPolicy {
                        max_attempts: self.max_retries.saturating_add(1),
                        base_delay: Duration::from_millis(self.retry_delay_ms),
                    },
                    requests_per_second: self.requests_per_second,
                }))
            }
            FetcherKind::JsonDir => {
                let dir = self
                    .dir
                    .ok_or_else(|| ConfigError::invalid("fetcher.dir", "required for kind = \"json_dir\""))?;
                Ok(FetcherSettings::JsonDir { dir })
            }
        }
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::invalid(field, "required for kind = \"http_json\""))
}

fn parse_hhmm(field: &str, s: &str) -> Result<NaiveTime, ConfigError> {
    let s = s.trim();
    if s == "24:00" {
        return Err(ConfigError::invalid(field, "use a time before midnight"));
    }
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|e| ConfigError::invalid(field, format!("expected HH:MM, got {s:?} ({e})")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const FULL: &str = r#"
        [storage]
        dir = "./data"
        file_pattern = "pv_????.json"

        [fetcher]
        kind = "http_json"
        endpoint = "https://vendor.example/api/day"
        plant_id = "12345"
        username = "jan"
        password = "from-file"
        max_retries = 2
        retry_delay_ms = 100
        requests_per_second = 0

        [grid]
        start = "06:00"
        end = "21:00"
        step_minutes = 15

        [policy]
        close_empty_after_days = 30
        max_consecutive_failures = 5

        [site]
        timezone = "Europe/Amsterdam"
    "#;

    #[test]
    fn full_config_validates() {
        let s = load_config_str(FULL).unwrap().validate(None).unwrap();
        assert_eq!(s.storage.pattern.file_name(2020), "pv_2020.json");
        assert_eq!(s.grid, DailyGrid::new(360, 1260, 15).unwrap());
        assert_eq!(s.policy.close_empty_after_days, Some(30));
        assert_eq!(s.max_consecutive_failures, Some(5));
        assert_eq!(s.timezone, Some(chrono_tz::Europe::Amsterdam));
        match s.fetcher {
            FetcherSettings::HttpJson(h) => {
                assert_eq!(h.plant_id, "12345");
                assert_eq!(h.password.expose_secret(), "from-file");
                assert_eq!(h.retry.max_attempts, 3);
                assert_eq!(h.retry.base_delay, Duration::from_millis(100));
                assert_eq!(h.requests_per_second, 0);
                assert_eq!(h.timeout, Duration::from_secs(20));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let s = load_config_str(
            r#"
            [storage]
            dir = "data"
            [fetcher]
            kind = "json_dir"
            dir = "replay"
            "#,
        )
        .unwrap()
        .validate(None)
        .unwrap();
        assert_eq!(s.storage.pattern.file_name(2021), "solarview_2021.json");
        assert_eq!(s.grid, DailyGrid::default());
        assert_eq!(s.policy, ClosePolicy::default());
        assert_eq!(s.max_consecutive_failures, None);
        assert!(s.timezone.is_none());
        assert!(matches!(s.fetcher, FetcherSettings::JsonDir { .. }));
    }

    #[test]
    fn http_defaults_match_provider_defaults() {
        let text = ["max_retries = 2", "retry_delay_ms = 100", "requests_per_second = 0"]
            .iter()
            .fold(FULL.to_string(), |t, line| t.replace(line, ""));
        let s = load_config_str(&text).unwrap().validate(None).unwrap();
        let FetcherSettings::HttpJson(h) = s.fetcher else {
            panic!("expected http_json");
        };
        assert_eq!(h.retry, RetryPolicy::default());
        assert_eq!(h.requests_per_second, DEFAULT_REQUESTS_PER_SECOND.get());
    }

    #[test]
    fn env_password_wins() {
        let s = load_config_str(FULL)
            .unwrap()
            .validate(Some("from-env".to_string()))
            .unwrap();
        let FetcherSettings::HttpJson(h) = s.fetcher else {
            panic!("expected http_json");
        };
        assert_eq!(h.password.expose_secret(), "from-env");
    }

    #[test]
    fn missing_password_names_env_var() {
        let text = FULL.replace("password = \"from-file\"", "");
        let err = load_config_str(&text).unwrap().validate(None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == PASSWORD_ENV));
    }

    fn invalid_field(text: &str) -> String {
        match load_config_str(text).unwrap().validate(None).unwrap_err() {
            ConfigError::Invalid { field, .. } => field,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_values_name_their_field() {
        assert_eq!(
            invalid_field(&FULL.replace("pv_????.json", "pv_???.json")),
            "storage.file_pattern"
        );
        assert_eq!(
            invalid_field(&FULL.replace("pv_????.json", "sub/pv_????.json")),
            "storage.file_pattern"
        );
        assert_eq!(invalid_field(&FULL.replace("\"06:00\"", "\"6am\"")), "grid.start");
        assert_eq!(invalid_field(&FULL.replace("\"21:00\"", "\"05:00\"")), "grid");
        assert_eq!(invalid_field(&FULL.replace("step_minutes = 15", "step_minutes = 7")), "grid");
        assert_eq!(
            invalid_field(&FULL.replace("endpoint = \"https://vendor.example/api/day\"", "")),
            "fetcher.endpoint"
        );
        assert_eq!(
            invalid_field(&FULL.replace("max_consecutive_failures = 5", "max_consecutive_failures = 0")),
            "policy.max_consecutive_failures"
        );
        assert_eq!(
            invalid_field(&FULL.replace("Europe/Amsterdam", "Europe/Atlantis")),
            "site.timezone"
        );
        assert_eq!(
            invalid_field("[storage]\ndir = \"d\"\n[fetcher]\nkind = \"json_dir\"\n"),
            "fetcher.dir"
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = load_config_str(&format!("{FULL}\n[extra]\nx = 1\n")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = load_config_str(&FULL.replace("kind = \"http_json\"", "kind = \"ftp\"")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_config_path("/definitely/not/here/solarview.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
