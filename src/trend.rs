//! Execution-time trend fitting.
//!
//! Ordinary least-squares degree-1 fit of execution time (in minutes)
//! against the sweep key, on a linear or log10 key axis. Failed steps are
//! excluded from the fit input, never coerced to zero.

use std::path::Path;

use csv::Writer;

use crate::ledger::Ledger;
use crate::table::fmt_f64;
use crate::SweepError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAxis {
    Linear,
    Log10,
}

impl KeyAxis {
    fn transform(self, iterations: u64) -> f64 {
        match self {
            KeyAxis::Linear => iterations as f64,
            KeyAxis::Log10 => (iterations as f64).log10(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            KeyAxis::Linear => "linear",
            KeyAxis::Log10 => "log10",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedPoint {
    pub iterations: u64,
    pub minutes: f64,
    pub fitted_minutes: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendFit {
    pub axis: KeyAxis,
    pub slope: f64,
    pub intercept: f64,
    pub points: Vec<FittedPoint>,
}

impl TrendFit {
    pub fn equation(&self) -> String {
        let n = match self.axis {
            KeyAxis::Linear => "n",
            KeyAxis::Log10 => "log10(n)",
        };
        format!(
            "t (min) = {:.4}{} + {:.4}",
            self.slope, n, self.intercept
        )
    }
}

pub fn fit(ledger: &Ledger, axis: KeyAxis) -> Result<TrendFit, SweepError> {
    let samples: Vec<(u64, f64)> = ledger
        .entries()
        .iter()
        .filter_map(|entry| {
            entry
                .outcome
                .elapsed_secs()
                .map(|secs| (entry.iterations, secs / 60.0))
        })
        .collect();

    if samples.len() < 2 {
        return Err(SweepError::InsufficientData {
            valid: samples.len(),
        });
    }

    let n = samples.len() as f64;
    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for &(key, minutes) in &samples {
        let x = axis.transform(key);
        sx += x;
        sy += minutes;
        sxx += x * x;
        sxy += x * minutes;
    }

    let denom = n * sxx - sx * sx;
    if denom.abs() < f64::EPSILON {
        // All keys collapse onto one abscissa; a line is not identifiable.
        return Err(SweepError::InsufficientData {
            valid: samples.len(),
        });
    }

    let slope = (n * sxy - sx * sy) / denom;
    let intercept = (sy - slope * sx) / n;

    let points = samples
        .into_iter()
        .map(|(iterations, minutes)| FittedPoint {
            iterations,
            minutes,
            fitted_minutes: slope * axis.transform(iterations) + intercept,
        })
        .collect();

    Ok(TrendFit {
        axis,
        slope,
        intercept,
        points,
    })
}

pub fn write_trend_csv(path: &Path, fits: &[TrendFit]) -> Result<(), SweepError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["axis", "slope", "intercept"])?;
    for fit in fits {
        writer.write_record([
            fit.axis.label().to_string(),
            fmt_f64(fit.slope),
            fmt_f64(fit.intercept),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// The fitted series handed to the plotting collaborator.
pub fn write_trend_points_csv(path: &Path, fit: &TrendFit) -> Result<(), SweepError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["Iterations", "Execution time (min)", "Fitted (min)"])?;
    for point in &fit.points {
        writer.write_record([
            point.iterations.to_string(),
            fmt_f64(point.minutes),
            fmt_f64(point.fitted_minutes),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerEntry, StepOutcome};

    fn ledger_of(entries: &[(u64, StepOutcome)]) -> Ledger {
        let mut ledger = Ledger::new();
        for &(iterations, outcome) in entries {
            ledger.push(LedgerEntry {
                iterations,
                outcome,
            });
        }
        ledger
    }

    #[test]
    fn perfectly_linear_timings_fit_exactly() {
        let ledger = ledger_of(&[
            (10, StepOutcome::Completed(60.0)),
            (20, StepOutcome::Completed(120.0)),
            (30, StepOutcome::Completed(180.0)),
        ]);

        let fit = fit(&ledger, KeyAxis::Linear).unwrap();
        assert!((fit.slope - 0.1).abs() < 1e-9);
        assert!(fit.intercept.abs() < 1e-9);
        for point in &fit.points {
            assert!((point.fitted_minutes - point.minutes).abs() < 1e-9);
        }
    }

    #[test]
    fn failed_steps_are_excluded_not_zeroed() {
        let ledger = ledger_of(&[
            (10, StepOutcome::Completed(60.0)),
            (20, StepOutcome::Failed),
            (30, StepOutcome::Completed(180.0)),
        ]);

        let fit = fit(&ledger, KeyAxis::Linear).unwrap();
        assert_eq!(fit.points.len(), 2);
        // Coercing the failure to zero would drag the slope off 0.1.
        assert!((fit.slope - 0.1).abs() < 1e-9);
    }

    #[test]
    fn fewer_than_two_samples_is_insufficient() {
        let ledger = ledger_of(&[
            (10, StepOutcome::Completed(60.0)),
            (20, StepOutcome::Failed),
        ]);

        assert!(matches!(
            fit(&ledger, KeyAxis::Linear),
            Err(SweepError::InsufficientData { valid: 1 })
        ));
    }

    #[test]
    fn log_axis_fits_logarithmic_growth() {
        // t(min) = 2*log10(n) + 1, exactly.
        let ledger = ledger_of(&[
            (10, StepOutcome::Completed(3.0 * 60.0)),
            (100, StepOutcome::Completed(5.0 * 60.0)),
            (1000, StepOutcome::Completed(7.0 * 60.0)),
        ]);

        let fit = fit(&ledger, KeyAxis::Log10).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_abscissa_cannot_be_fit() {
        let ledger = ledger_of(&[
            (10, StepOutcome::Completed(60.0)),
            (10, StepOutcome::Completed(120.0)),
        ]);

        assert!(matches!(
            fit(&ledger, KeyAxis::Linear),
            Err(SweepError::InsufficientData { valid: 2 })
        ));
    }
}
