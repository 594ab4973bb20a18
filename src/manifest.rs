//! Run manifest written next to the artifacts.
//!
//! Recomputable metadata only; the artifacts and the ledger stay the
//! sources of truth.

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::config::SweepConfig;
use crate::SweepError;

pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub schema_version: String,
    pub started_at: String,
    pub random_seed: u64,
    pub iterations: Vec<u64>,
    pub beam_parameters: Vec<String>,
}

impl RunManifest {
    pub fn new(config: &SweepConfig) -> Self {
        Self {
            schema_version: OUTPUT_SCHEMA_VERSION.to_string(),
            started_at: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            random_seed: config.random_seed,
            iterations: config.iterations.clone(),
            beam_parameters: config.beam.keys().cloned().collect(),
        }
    }
}

pub fn write_manifest_json(path: &Path, manifest: &RunManifest) -> Result<(), SweepError> {
    let raw = serde_json::to_string_pretty(manifest)?;
    fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn manifest_carries_the_sweep_parameters() {
        let config = SweepConfig::default();
        let manifest = RunManifest::new(&config);
        assert_eq!(manifest.schema_version, OUTPUT_SCHEMA_VERSION);
        assert_eq!(manifest.iterations, config.iterations);
        assert!(manifest.beam_parameters.contains(&"kVp".to_string()));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        write_manifest_json(&path, &manifest).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"schema_version\""));
    }
}
