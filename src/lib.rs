pub mod aggregate;
pub mod config;
pub mod ledger;
pub mod manifest;
pub mod schema;
pub mod simulate;
pub mod store;
pub mod sweep;
pub mod table;
pub mod trend;

use thiserror::Error;

pub use aggregate::{aggregate, exclude_failed, AggregateTable, AggregateTables};
pub use config::{Param, SweepConfig};
pub use ledger::{Ledger, LedgerEntry, StepOutcome, LEDGER_FILE};
pub use manifest::{write_manifest_json, RunManifest, MANIFEST_FILE, OUTPUT_SCHEMA_VERSION};
pub use simulate::{Simulator, SyntheticSimulator};
pub use store::ResultStore;
pub use sweep::{SweepDriver, SweepReport};
pub use table::StatsTable;
pub use trend::{KeyAxis, TrendFit};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{context} length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("simulation failed at {iterations} iterations: {message}")]
    Simulation { iterations: u64, message: String },
    #[error("no persisted result for {iterations} iterations")]
    NotFound { iterations: u64 },
    #[error("result for {iterations} iterations is missing '{missing}'")]
    MalformedResult { iterations: u64, missing: String },
    #[error("malformed table {path}: {message}")]
    MalformedTable { path: String, message: String },
    #[error("trend fit needs at least two timed steps, got {valid}")]
    InsufficientData { valid: usize },
}
