use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use crate::SweepError;

/// One beam parameter: nominal value and relative uncertainty fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub nominal: f64,
    pub uncertainty: f64,
}

impl Param {
    pub fn new(nominal: f64, uncertainty: f64) -> Self {
        Self {
            nominal,
            uncertainty,
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    #[serde_as(as = "DefaultOnNull")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub iterations: Vec<u64>,
    #[serde_as(as = "DefaultOnNull")]
    pub random_seed: u64,
    #[serde(default)]
    pub beam: BTreeMap<String, Param>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output-spek"),
            iterations: default_iterations(),
            random_seed: 0x5BEC_2026_0001_u64,
            beam: reference_beam(),
        }
    }
}

/// The iteration grid of the reference convergence study, spanning six
/// orders of magnitude.
pub fn default_iterations() -> Vec<u64> {
    vec![
        10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 200, 300, 400, 500, 600, 700, 800, 900, 1000,
        2000, 3000, 4000, 5000, 6000, 7000, 8000, 9000, 10000, 50000, 100000, 500000, 1000000,
    ]
}

/// The N-60 reference beam: 5 % relative uncertainty on every active
/// parameter, unused filters at zero.
pub fn reference_beam() -> BTreeMap<String, Param> {
    let mut beam = BTreeMap::new();
    beam.insert("kVp".to_string(), Param::new(60.0, 0.05));
    beam.insert("th".to_string(), Param::new(20.0, 0.05));
    beam.insert("Al".to_string(), Param::new(4.0, 0.05));
    beam.insert("Cu".to_string(), Param::new(0.6, 0.05));
    beam.insert("Sn".to_string(), Param::new(0.0, 0.0));
    beam.insert("Pb".to_string(), Param::new(0.0, 0.0));
    beam.insert("Be".to_string(), Param::new(0.0, 0.0));
    beam.insert("Air".to_string(), Param::new(1000.0, 0.05));
    beam
}

impl SweepConfig {
    pub fn from_toml_path(path: &Path) -> Result<Self, SweepError> {
        let raw = fs::read_to_string(path)?;
        let config: SweepConfig = toml::from_str(&raw)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SweepError> {
        validate_iterations(&self.iterations)?;

        if self.beam.is_empty() {
            return Err(SweepError::InvalidConfig(
                "beam must define at least one parameter".to_string(),
            ));
        }

        for (name, param) in &self.beam {
            if !param.nominal.is_finite() {
                return Err(SweepError::InvalidConfig(format!(
                    "beam parameter '{name}' nominal must be finite"
                )));
            }
            if !param.uncertainty.is_finite() || param.uncertainty < 0.0 {
                return Err(SweepError::InvalidConfig(format!(
                    "beam parameter '{name}' uncertainty must be finite and non-negative"
                )));
            }
        }

        Ok(())
    }
}

/// Sweep keys must be positive and strictly increasing; duplicates are not
/// permitted within one sweep.
pub fn validate_iterations(iterations: &[u64]) -> Result<(), SweepError> {
    if iterations.is_empty() {
        return Err(SweepError::InvalidConfig(
            "iterations must contain at least one value".to_string(),
        ));
    }

    if iterations.iter().any(|&n| n == 0) {
        return Err(SweepError::InvalidConfig(
            "iterations must contain only values greater than zero".to_string(),
        ));
    }

    if iterations.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err(SweepError::InvalidConfig(
            "iterations must be strictly increasing".to_string(),
        ));
    }

    Ok(())
}
