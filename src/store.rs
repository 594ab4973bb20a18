//! Directory-backed result store.
//!
//! One artifact per sweep key, named `out_<N>.csv`. Writes go through a
//! temporary file in the same directory followed by a rename, so a crash
//! mid-write never exposes a partial artifact.

use std::fs;
use std::path::{Path, PathBuf};

use crate::table::StatsTable;
use crate::SweepError;

pub const ARTIFACT_PREFIX: &str = "out_";
pub const ARTIFACT_SUFFIX: &str = ".csv";

/// Parse a sweep key out of an artifact identity.
///
/// Non-matching names yield `None` and are ignored by discovery; they are
/// not errors.
pub fn parse_artifact_key(name: &str) -> Option<u64> {
    let digits = name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn open(dir: &Path) -> Result<Self, SweepError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, iterations: u64) -> PathBuf {
        self.dir
            .join(format!("{ARTIFACT_PREFIX}{iterations}{ARTIFACT_SUFFIX}"))
    }

    /// Persist a run result. A later `put` for the same key overwrites;
    /// at most one artifact ever exists per key.
    pub fn put(&self, iterations: u64, table: &StatsTable) -> Result<(), SweepError> {
        let bytes = table.to_csv_bytes()?;
        let path = self.artifact_path(iterations);
        let tmp = self
            .dir
            .join(format!("{ARTIFACT_PREFIX}{iterations}{ARTIFACT_SUFFIX}.tmp"));
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn get(&self, iterations: u64) -> Result<StatsTable, SweepError> {
        let path = self.artifact_path(iterations);
        if !path.is_file() {
            return Err(SweepError::NotFound { iterations });
        }
        StatsTable::read_csv(&path)
    }

    pub fn exists(&self, iterations: u64) -> bool {
        self.artifact_path(iterations).is_file()
    }

    /// Enumerate persisted keys, ascending and deduplicated. Names that do
    /// not match the artifact pattern are skipped.
    pub fn discover(&self) -> Result<Vec<u64>, SweepError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if let Some(key) = parse_artifact_key(name) {
                    keys.push(key);
                }
            }
        }
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}
