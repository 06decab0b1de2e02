#![allow(dead_code)]

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use pv_cache::{
    grid::DailyGrid,
    persist::{FilePattern, JsonFileRepo},
    sync::{ClosePolicy, SyncOptions},
};
use pv_ingestor::{
    models::reading::RawReading,
    providers::{ApiSnafu, ProviderError, SampleProvider},
};
use tempfile::TempDir;

pub struct TestRepo {
    pub dir: TempDir, // keep alive for the life of the test
    pub repo: JsonFileRepo,
}

pub fn setup_repo() -> TestRepo {
    let dir = TempDir::new().expect("tempdir");
    let repo = JsonFileRepo::new(
        dir.path(),
        FilePattern::parse("solarview_????.json").expect("pattern"),
    );
    TestRepo { dir, repo }
}

pub fn d(y: i32, m: u32, dd: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, dd).expect("valid date")
}

/// Fixed clock: noon UTC on `today`.
pub fn opts(today: NaiveDate) -> SyncOptions {
    SyncOptions {
        today,
        now: noon(today),
        grid: DailyGrid::default(),
        policy: ClosePolicy::default(),
        max_consecutive_failures: None,
    }
}

pub fn noon(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).expect("noon"))
}

/// `n` readings every 5 minutes from 10:00, `base + i` watts.
pub fn readings(day: NaiveDate, n: u32, base: f64) -> Vec<RawReading> {
    (0..n)
        .map(|i| {
            let t = day.and_hms_opt(10 + i / 12, (i % 12) * 5, 0).expect("time");
            RawReading::new(t, base + f64::from(i))
        })
        .collect()
}

/// Answers from a script: scripted days return their readings, failing days
/// return a 503, everything else is an empty day. Every call is recorded.
#[derive(Default)]
pub struct ScriptedProvider {
    days: Mutex<BTreeMap<NaiveDate, Vec<RawReading>>>,
    failing: Mutex<BTreeSet<NaiveDate>>,
    calls: Mutex<Vec<NaiveDate>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_day(&self, day: NaiveDate, r: Vec<RawReading>) {
        self.days.lock().unwrap().insert(day, r);
    }

    pub fn fail_day(&self, day: NaiveDate) {
        self.failing.lock().unwrap().insert(day);
    }

    pub fn heal_day(&self, day: NaiveDate) {
        self.failing.lock().unwrap().remove(&day);
    }

    pub fn calls(&self) -> Vec<NaiveDate> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl SampleProvider for ScriptedProvider {
    async fn fetch_day(&self, day: NaiveDate) -> Result<Vec<RawReading>, ProviderError> {
        self.calls.lock().unwrap().push(day);
        if self.failing.lock().unwrap().contains(&day) {
            return ApiSnafu {
                status: 503u16,
                message: "maintenance",
            }
            .fail();
        }
        Ok(self.days.lock().unwrap().get(&day).cloned().unwrap_or_default())
    }
}
