//! Row-labeled, column-labeled statistics table.
//!
//! The simulation collaborator returns one of these per run: per-iteration
//! sample rows plus summary rows such as `Mean` and `Relative uncertainty`.
//! Rows are always addressed by label, never by position, because the
//! collaborator does not guarantee row order.

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, Writer};

use crate::SweepError;

pub(crate) fn fmt_f64(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    format!("{value:.10}")
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsTable {
    columns: Vec<String>,
    labels: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl StatsTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            labels: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(
        &mut self,
        label: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), SweepError> {
        if values.len() != self.columns.len() {
            return Err(SweepError::LengthMismatch {
                context: "table row",
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        self.labels.push(label.into());
        self.rows.push(values);
        Ok(())
    }

    /// Look a row up by its label. Returns the first match.
    pub fn row(&self, label: &str) -> Option<&[f64]> {
        self.labels
            .iter()
            .position(|candidate| candidate == label)
            .map(|idx| self.rows[idx].as_slice())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|candidate| candidate == name)
    }

    /// Serialize to CSV. The first header cell is `#`, the label column.
    /// Serialization is deterministic: the same table always yields the
    /// same bytes.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, SweepError> {
        let mut writer = Writer::from_writer(Vec::new());

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push("#".to_string());
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;

        for (label, row) in self.labels.iter().zip(&self.rows) {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(label.clone());
            record.extend(row.iter().copied().map(fmt_f64));
            writer.write_record(&record)?;
        }

        writer
            .into_inner()
            .map_err(|error| std::io::Error::other(error.to_string()).into())
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), SweepError> {
        let bytes = self.to_csv_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    pub fn from_csv_bytes(bytes: &[u8], origin: &str) -> Result<Self, SweepError> {
        let malformed = |message: String| SweepError::MalformedTable {
            path: origin.to_string(),
            message,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);
        let header = reader.headers()?.clone();
        if header.is_empty() {
            return Err(malformed("missing header".to_string()));
        }

        let columns: Vec<String> = header.iter().skip(1).map(|name| name.to_string()).collect();
        let mut table = StatsTable::new(columns);

        for record in reader.records() {
            let record = record?;
            if record.len() != table.columns.len() + 1 {
                return Err(malformed(format!(
                    "row '{}' has {} fields, expected {}",
                    record.get(0).unwrap_or(""),
                    record.len(),
                    table.columns.len() + 1
                )));
            }

            let label = record.get(0).unwrap_or("").to_string();
            let mut values = Vec::with_capacity(table.columns.len());
            for field in record.iter().skip(1) {
                let value = field
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("row '{label}': bad value '{field}'")))?;
                values.push(value);
            }
            table.push_row(label, values)?;
        }

        Ok(table)
    }

    pub fn read_csv(path: &Path) -> Result<Self, SweepError> {
        let bytes = fs::read(path)?;
        Self::from_csv_bytes(&bytes, &path.display().to_string())
    }
}
