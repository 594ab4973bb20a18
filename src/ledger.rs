//! Execution-time ledger.
//!
//! One entry per attempted sweep step, in execution order. The whole
//! ledger is rewritten to durable storage after every step, through a
//! temporary file and a rename, so a crash loses at most the in-flight
//! step's timing and never corrupts prior entries.

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, Writer};

use crate::table::fmt_f64;
use crate::SweepError;

/// Well-known artifact name for the ledger inside a result directory.
pub const LEDGER_FILE: &str = "execution_times.csv";

const LEDGER_HEADER: [&str; 2] = ["Iterations", "Execution time (s)"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Completed(f64),
    Failed,
}

impl StepOutcome {
    pub fn elapsed_secs(&self) -> Option<f64> {
        match *self {
            StepOutcome::Completed(secs) => Some(secs),
            StepOutcome::Failed => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerEntry {
    pub iterations: u64,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys whose most recent entry is a failure. A later successful
    /// attempt for the same key clears the earlier failure.
    pub fn failed_keys(&self) -> Vec<u64> {
        let mut latest = std::collections::BTreeMap::new();
        for entry in &self.entries {
            latest.insert(entry.iterations, entry.outcome);
        }
        latest
            .into_iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .map(|(key, _)| key)
            .collect()
    }

    fn to_csv_bytes(&self) -> Result<Vec<u8>, SweepError> {
        let mut writer = Writer::from_writer(Vec::new());
        writer.write_record(LEDGER_HEADER)?;
        for entry in &self.entries {
            let elapsed = match entry.outcome {
                StepOutcome::Completed(secs) => fmt_f64(secs),
                StepOutcome::Failed => "NaN".to_string(),
            };
            writer.write_record([entry.iterations.to_string(), elapsed])?;
        }
        writer
            .into_inner()
            .map_err(|error| std::io::Error::other(error.to_string()).into())
    }

    /// Rewrite the ledger wholesale. Temp-file-then-rename keeps the
    /// previously durable ledger intact if this write is interrupted.
    pub fn write_atomic(&self, path: &Path) -> Result<(), SweepError> {
        let bytes = self.to_csv_bytes()?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                SweepError::InvalidConfig(format!("bad ledger path: {}", path.display()))
            })?;
        let tmp = path.with_file_name(format!("{file_name}.tmp"));
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let malformed = |message: String| SweepError::MalformedTable {
            path: path.display().to_string(),
            message,
        };

        let bytes = fs::read(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes.as_slice());

        let mut ledger = Ledger::new();
        for record in reader.records() {
            let record = record?;
            let key_field = record.get(0).unwrap_or("");
            let iterations = key_field
                .parse::<u64>()
                .map_err(|_| malformed(format!("bad iteration count '{key_field}'")))?;

            let elapsed_field = record.get(1).unwrap_or("").trim();
            let outcome = if elapsed_field.is_empty() || elapsed_field.eq_ignore_ascii_case("nan")
            {
                StepOutcome::Failed
            } else {
                let secs = elapsed_field.parse::<f64>().map_err(|_| {
                    malformed(format!("bad execution time '{elapsed_field}'"))
                })?;
                if secs.is_finite() {
                    StepOutcome::Completed(secs)
                } else {
                    StepOutcome::Failed
                }
            };

            ledger.push(LedgerEntry {
                iterations,
                outcome,
            });
        }

        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(iterations: u64, outcome: StepOutcome) -> LedgerEntry {
        LedgerEntry {
            iterations,
            outcome,
        }
    }

    #[test]
    fn write_then_load_round_trips_including_failures() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LEDGER_FILE);

        let mut ledger = Ledger::new();
        ledger.push(entry(10, StepOutcome::Completed(1.25)));
        ledger.push(entry(20, StepOutcome::Failed));
        ledger.push(entry(30, StepOutcome::Completed(3.5)));
        ledger.write_atomic(&path).unwrap();

        let loaded = Ledger::load(&path).unwrap();
        assert_eq!(loaded.entries(), ledger.entries());
    }

    #[test]
    fn failure_is_serialized_as_nan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LEDGER_FILE);

        let mut ledger = Ledger::new();
        ledger.push(entry(500, StepOutcome::Failed));
        ledger.write_atomic(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("500,NaN"));
    }

    #[test]
    fn rewrite_replaces_the_previous_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LEDGER_FILE);

        let mut ledger = Ledger::new();
        ledger.push(entry(10, StepOutcome::Completed(1.0)));
        ledger.write_atomic(&path).unwrap();
        ledger.push(entry(20, StepOutcome::Completed(2.0)));
        ledger.write_atomic(&path).unwrap();

        let loaded = Ledger::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(!path.with_file_name(format!("{LEDGER_FILE}.tmp")).exists());
    }

    #[test]
    fn failed_keys_take_the_latest_outcome() {
        let mut ledger = Ledger::new();
        ledger.push(entry(10, StepOutcome::Failed));
        ledger.push(entry(20, StepOutcome::Completed(2.0)));
        ledger.push(entry(10, StepOutcome::Completed(1.0)));
        ledger.push(entry(500, StepOutcome::Failed));

        assert_eq!(ledger.failed_keys(), vec![500]);
    }

    #[test]
    fn bad_iteration_field_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LEDGER_FILE);
        std::fs::write(&path, "Iterations,Execution time (s)\nten,1.0\n").unwrap();
        assert!(matches!(
            Ledger::load(&path),
            Err(SweepError::MalformedTable { .. })
        ));
    }
}
