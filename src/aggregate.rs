//! Aggregation of per-key run results into trend tables.
//!
//! For each discovered key the engine pulls the `Mean` and
//! `Relative uncertainty` rows out of the persisted artifact (by label,
//! never by position) and stacks them into two tables indexed by key. A
//! malformed artifact aborts the aggregation loudly; a silently incomplete
//! trend table is worse than a failure during interactive analysis.

use std::path::Path;

use csv::Writer;

use crate::ledger::Ledger;
use crate::schema::{self, MEAN_LABEL, UNCERTAINTY_LABEL};
use crate::store::ResultStore;
use crate::table::{fmt_f64, StatsTable};
use crate::SweepError;

/// Rows indexed by sweep key (ascending), one column per tracked variable.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    columns: Vec<String>,
    keys: Vec<u64>,
    rows: Vec<Vec<f64>>,
}

impl AggregateTable {
    fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            keys: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn keys(&self) -> &[u64] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_for_key(&self, key: u64) -> Option<&[f64]> {
        self.keys
            .iter()
            .position(|&candidate| candidate == key)
            .map(|idx| self.rows[idx].as_slice())
    }

    fn push(&mut self, key: u64, row: Vec<f64>) {
        self.keys.push(key);
        self.rows.push(row);
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), SweepError> {
        let mut writer = Writer::from_path(path)?;

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push("Iterations".to_string());
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;

        for (key, row) in self.keys.iter().zip(&self.rows) {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(key.to_string());
            record.extend(row.iter().copied().map(fmt_f64));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTables {
    pub means: AggregateTable,
    pub uncertainties: AggregateTable,
}

/// Drop keys whose latest ledger outcome is a failure, so stale artifacts
/// from an earlier sweep never contribute rows.
pub fn exclude_failed(keys: &[u64], ledger: &Ledger) -> Vec<u64> {
    let failed = ledger.failed_keys();
    keys.iter()
        .copied()
        .filter(|key| !failed.contains(key))
        .collect()
}

pub fn aggregate(store: &ResultStore, keys: &[u64]) -> Result<AggregateTables, SweepError> {
    let mut sorted = keys.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut means = AggregateTable::new(schema::column_names());
    let mut uncertainties = AggregateTable::new(schema::column_names());

    for key in sorted {
        let table = match store.get(key) {
            Ok(table) => table,
            // An absent key is excluded, not an error.
            Err(SweepError::NotFound { .. }) => continue,
            Err(error) => return Err(error),
        };

        means.push(key, project_row(&table, key, MEAN_LABEL)?);
        uncertainties.push(key, project_row(&table, key, UNCERTAINTY_LABEL)?);
    }

    Ok(AggregateTables {
        means,
        uncertainties,
    })
}

/// Extract a labeled row projected onto the shared schema columns.
fn project_row(table: &StatsTable, key: u64, label: &str) -> Result<Vec<f64>, SweepError> {
    let row = table.row(label).ok_or_else(|| SweepError::MalformedResult {
        iterations: key,
        missing: label.to_string(),
    })?;

    let mut projected = Vec::with_capacity(schema::TRACKED_VARIABLES.len());
    for name in schema::TRACKED_VARIABLES {
        let idx = table
            .column_index(name)
            .ok_or_else(|| SweepError::MalformedResult {
                iterations: key,
                missing: name.to_string(),
            })?;
        projected.push(row[idx]);
    }
    Ok(projected)
}
