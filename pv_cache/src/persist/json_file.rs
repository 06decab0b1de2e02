//! JSON file implementation of [`YearRepo`].

use std::{
    fs::{self, File, OpenOptions, TryLockError},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{
    LoadOutcome, PersistError, YearLock, YearRepo,
    format::{self, DecodeError, SCHEMA_VERSION},
    pattern::FilePattern,
};
use crate::store::YearStore;

/// Suffix given to quarantined files. Later quarantines of the same year
/// get `.corrupt.1`, `.corrupt.2` and so on; earlier ones are never replaced.
pub const CORRUPT_SUFFIX: &str = ".corrupt";
const LOCK_SUFFIX: &str = ".lock";

/// Stores each year as `<dir>/<pattern with year>`.
#[derive(Debug, Clone)]
pub struct JsonFileRepo {
    dir: PathBuf,
    pattern: FilePattern,
}

impl JsonFileRepo {
    /// Repo rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>, pattern: FilePattern) -> Self {
        Self {
            dir: dir.into(),
            pattern,
        }
    }

    /// Storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `year`.
    pub fn path_for(&self, year: i32) -> PathBuf {
        self.dir.join(self.pattern.file_name(year))
    }

    fn sibling(&self, year: i32, suffix: &str) -> PathBuf {
        self.dir
            .join(format!("{}{suffix}", self.pattern.file_name(year)))
    }

    /// First free quarantine path for `year`.
    fn quarantine_target(&self, year: i32) -> Result<PathBuf, PersistError> {
        let first = self.sibling(year, CORRUPT_SUFFIX);
        std::iter::once(first.clone())
            .chain((1u32..).map(|n| self.sibling(year, &format!("{CORRUPT_SUFFIX}.{n}"))))
            .find(|p| !p.exists())
            .ok_or_else(|| {
                PersistError::io(&first, io::Error::from(io::ErrorKind::AlreadyExists))
            })
    }

    fn ensure_dir(&self) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).map_err(|e| PersistError::io(&self.dir, e))
    }
}

impl YearRepo for JsonFileRepo {
    fn lock(&self, year: i32) -> Result<YearLock, PersistError> {
        self.ensure_dir()?;
        let path = self.sibling(year, LOCK_SUFFIX);
        let file: File = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| PersistError::io(&path, e))?;
        match file.try_lock() {
            Ok(()) => {
                debug!(year, path = %path.display(), "year lock taken");
                Ok(YearLock::held(file))
            }
            Err(TryLockError::WouldBlock) => Err(PersistError::Locked { path }),
            Err(TryLockError::Error(e)) => Err(PersistError::io(&path, e)),
        }
    }

    fn load(&self, year: i32) -> Result<LoadOutcome, PersistError> {
        let path = self.path_for(year);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(year, path = %path.display(), "no stored file");
                return Ok(LoadOutcome::Missing);
            }
            Err(e) => return Err(PersistError::io(&path, e)),
        };

        match format::decode(&bytes, year) {
            Ok(store) => {
                info!(
                    year,
                    path = %path.display(),
                    days = store.recorded_days(),
                    "loaded year store"
                );
                Ok(LoadOutcome::Loaded(store))
            }
            Err(DecodeError::Unsupported(found)) => Err(PersistError::UnsupportedSchema {
                path,
                found,
                supported: SCHEMA_VERSION,
            }),
            Err(DecodeError::Corrupt(reason)) => {
                warn!(year, path = %path.display(), %reason, "stored file is corrupt");
                Ok(LoadOutcome::Corrupt(reason))
            }
        }
    }

    fn save(&self, store: &YearStore) -> Result<(), PersistError> {
        self.ensure_dir()?;
        let path = self.path_for(store.year());
        let bytes = format::encode(store).map_err(|source| PersistError::Encode {
            year: store.year(),
            source,
        })?;

        // Same directory as the target so the rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| PersistError::io(&self.dir, e))?;
        tmp.write_all(&bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| PersistError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| PersistError::io(&path, e.error))?;

        info!(
            year = store.year(),
            path = %path.display(),
            days = store.recorded_days(),
            bytes = bytes.len(),
            "saved year store"
        );
        Ok(())
    }

    fn quarantine(&self, year: i32) -> Result<(), PersistError> {
        let from = self.path_for(year);
        if !from.exists() {
            return Ok(());
        }
        let to = self.quarantine_target(year)?;
        match fs::rename(&from, &to) {
            Ok(()) => {
                warn!(year, from = %from.display(), to = %to.display(), "quarantined year file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistError::io(&from, e)),
        }
    }

    fn years_available(&self) -> Result<Vec<i32>, PersistError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(it) => it,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistError::io(&self.dir, e)),
        };
        let mut years = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PersistError::io(&self.dir, e))?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if let Some(year) = entry.file_name().to_str().and_then(|n| self.pattern.year_of(n)) {
                years.push(year);
            }
        }
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid::DailyGrid, store::Sample};
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn repo(dir: &TempDir) -> JsonFileRepo {
        JsonFileRepo::new(dir.path(), FilePattern::parse("solarview_????.json").unwrap())
    }

    fn store_2020() -> YearStore {
        let mut s = YearStore::new(2020, DailyGrid::default());
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let at = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
        s.upsert_day(day, &[Sample::new(day, 3, 10.0)], at).unwrap();
        s
    }

    #[test]
    fn missing_then_saved_then_loaded() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);
        assert!(matches!(repo.load(2020).unwrap(), LoadOutcome::Missing));

        let store = store_2020();
        repo.save(&store).unwrap();
        assert!(repo.path_for(2020).ends_with("solarview_2020.json"));
        match repo.load(2020).unwrap() {
            LoadOutcome::Loaded(back) => assert_eq!(back, store),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn get_falls_back_to_empty() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);
        let s = repo.get(2021, DailyGrid::default()).unwrap();
        assert_eq!(s.year(), 2021);
        assert!(s.is_empty());
    }

    #[test]
    fn corrupt_file_is_reported_and_quarantined() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);
        fs::write(repo.path_for(2020), b"{ truncated").unwrap();

        assert!(matches!(repo.load(2020).unwrap(), LoadOutcome::Corrupt(_)));
        assert!(repo.get(2020, DailyGrid::default()).unwrap().is_empty());

        repo.quarantine(2020).unwrap();
        assert!(!repo.path_for(2020).exists());
        assert!(tmp.path().join("solarview_2020.json.corrupt").exists());
        // nothing left to move
        repo.quarantine(2020).unwrap();
    }

    #[test]
    fn quarantine_keeps_earlier_corrupt_files() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);
        fs::write(repo.path_for(2020), b"first").unwrap();
        repo.quarantine(2020).unwrap();
        fs::write(repo.path_for(2020), b"second").unwrap();
        repo.quarantine(2020).unwrap();
        fs::write(repo.path_for(2020), b"third").unwrap();
        repo.quarantine(2020).unwrap();

        let read = |name: &str| fs::read(tmp.path().join(name)).unwrap();
        assert_eq!(read("solarview_2020.json.corrupt"), b"first");
        assert_eq!(read("solarview_2020.json.corrupt.1"), b"second");
        assert_eq!(read("solarview_2020.json.corrupt.2"), b"third");
        assert!(repo.years_available().unwrap().is_empty());
    }

    #[test]
    fn failed_write_leaves_target_untouched() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);
        // a non-empty directory where the year file belongs makes the rename fail
        let target = repo.path_for(2020);
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"previous").unwrap();

        let err = repo.save(&store_2020()).unwrap_err();

        assert!(matches!(err, PersistError::Io { ref path, .. } if *path == target));
        assert_eq!(fs::read(target.join("keep")).unwrap(), b"previous");
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("solarview_2020.json")]);
    }

    #[test]
    fn newer_schema_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);
        fs::write(repo.path_for(2020), br#"{"schema_version": 99}"#).unwrap();
        assert!(matches!(
            repo.load(2020),
            Err(PersistError::UnsupportedSchema { found: 99, .. })
        ));
    }

    #[test]
    fn second_lock_fails_until_first_is_dropped() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);
        let held = repo.lock(2020).unwrap();
        assert!(matches!(repo.lock(2020), Err(PersistError::Locked { .. })));
        // other years are independent
        let _other = repo.lock(2019).unwrap();
        drop(held);
        repo.lock(2020).unwrap();
    }

    #[test]
    fn lists_years_matching_pattern() {
        let tmp = TempDir::new().unwrap();
        let repo = repo(&tmp);
        assert!(repo.years_available().unwrap().is_empty());

        repo.save(&YearStore::new(2021, DailyGrid::default())).unwrap();
        repo.save(&store_2020()).unwrap();
        fs::write(tmp.path().join("solarview_2019.json.corrupt"), b"x").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        let _lock = repo.lock(2018).unwrap();

        assert_eq!(repo.years_available().unwrap(), vec![2020, 2021]);
    }

    #[test]
    fn save_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let repo = JsonFileRepo::new(
            tmp.path().join("nested/data"),
            FilePattern::parse("????.json").unwrap(),
        );
        repo.save(&store_2020()).unwrap();
        assert!(tmp.path().join("nested/data/2020.json").exists());
    }
}
