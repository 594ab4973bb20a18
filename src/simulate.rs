//! The simulation collaborator seam.
//!
//! The sweep driver only depends on the [`Simulator`] trait. The bundled
//! [`SyntheticSimulator`] is a deterministic stand-in that produces tables
//! with the right shape (per-iteration sample rows plus `Mean` and
//! `Relative uncertainty` summary rows over the shared schema); it makes
//! no claim of physical accuracy.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::config::Param;
use crate::schema::{self, MEAN_LABEL, UNCERTAINTY_LABEL};
use crate::table::StatsTable;
use crate::SweepError;

pub trait Simulator {
    /// Run the Monte-Carlo case with the given repetition count.
    ///
    /// May block for a long time; the driver calls it synchronously and
    /// imposes no timeout.
    fn simulate(&self, iterations: u64) -> Result<StatsTable, SweepError>;
}

#[derive(Debug, Clone)]
pub struct SyntheticSimulator {
    beam: BTreeMap<String, Param>,
    seed: u64,
}

impl SyntheticSimulator {
    pub fn new(beam: BTreeMap<String, Param>, seed: u64) -> Self {
        Self { beam, seed }
    }

    fn param(&self, name: &str, iterations: u64) -> Result<Param, SweepError> {
        self.beam
            .get(name)
            .copied()
            .ok_or_else(|| SweepError::Simulation {
                iterations,
                message: format!("beam parameter '{name}' is not configured"),
            })
    }

    fn sample(
        rng: &mut StdRng,
        param: Param,
        iterations: u64,
    ) -> Result<f64, SweepError> {
        let sigma = param.nominal.abs() * param.uncertainty;
        let normal = Normal::new(param.nominal, sigma).map_err(|error| SweepError::Simulation {
            iterations,
            message: format!("bad sampling distribution: {error}"),
        })?;
        Ok(normal.sample(rng))
    }
}

impl Simulator for SyntheticSimulator {
    fn simulate(&self, iterations: u64) -> Result<StatsTable, SweepError> {
        if iterations == 0 {
            return Err(SweepError::Simulation {
                iterations,
                message: "repetition count must be greater than zero".to_string(),
            });
        }

        let kvp = self.param("kVp", iterations)?;
        let th = self.param("th", iterations)?;
        let air = self.param("Air", iterations)?;
        let al = self.param("Al", iterations)?;
        let cu = self.param("Cu", iterations)?;

        let mut rng = StdRng::seed_from_u64(self.seed ^ iterations);
        let mut table = StatsTable::new(schema::column_names());
        let width = schema::TRACKED_VARIABLES.len();
        let mut sums = vec![0.0_f64; width];
        let mut sq_sums = vec![0.0_f64; width];

        for idx in 0..iterations {
            let kvp_s = Self::sample(&mut rng, kvp, iterations)?;
            let th_s = Self::sample(&mut rng, th, iterations)?;
            let air_s = Self::sample(&mut rng, air, iterations)?;
            let al_s = Self::sample(&mut rng, al, iterations)?;
            let cu_s = Self::sample(&mut rng, cu, iterations)?;

            let row = derive_outputs(kvp_s, th_s, air_s, al_s, cu_s);
            for (column, &value) in row.iter().enumerate() {
                sums[column] += value;
                sq_sums[column] += value * value;
            }
            table.push_row(idx.to_string(), row)?;
        }

        let n = iterations as f64;
        let means: Vec<f64> = sums.iter().map(|&sum| sum / n).collect();
        let uncertainties: Vec<f64> = means
            .iter()
            .zip(&sq_sums)
            .map(|(&mean, &sq_sum)| relative_uncertainty(mean, sq_sum, n))
            .collect();

        table.push_row(MEAN_LABEL, means)?;
        table.push_row(UNCERTAINTY_LABEL, uncertainties)?;
        Ok(table)
    }
}

/// Smooth surrogate mapping from sampled beam parameters to the 12 tracked
/// variables, in schema order.
fn derive_outputs(kvp: f64, th: f64, air: f64, al: f64, cu: f64) -> Vec<f64> {
    let hvl1_al = 0.055 * kvp + 0.32 * al + 2.1 * cu;
    let hvl2_al = 1.28 * hvl1_al;
    let hvl1_cu = 0.052 * hvl1_al + 0.004 * kvp;
    let hvl2_cu = 1.31 * hvl1_cu;
    let mean_energy = 0.62 * kvp * (1.0 + 0.05 * cu) + 0.08 * al;
    let attenuation = (-(0.021 * al + 0.18 * cu)).exp();
    let air_kerma = 52.0 * (kvp / 60.0).powi(2) * attenuation * (1000.0 / air.max(1.0)).powi(2);
    let conv_coeff = 1.59 + 0.0021 * (mean_energy - 34.0) - 0.0004 * th;

    vec![
        kvp, th, air, al, cu, hvl1_al, hvl2_al, hvl1_cu, hvl2_cu, mean_energy, air_kerma,
        conv_coeff,
    ]
}

/// Relative standard uncertainty of the mean: s / (|mean| * sqrt(n)).
fn relative_uncertainty(mean: f64, sq_sum: f64, n: f64) -> f64 {
    if n < 2.0 || mean.abs() < f64::EPSILON {
        return 0.0;
    }
    let variance = ((sq_sum - n * mean * mean) / (n - 1.0)).max(0.0);
    variance.sqrt() / (mean.abs() * n.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::reference_beam;

    fn simulator() -> SyntheticSimulator {
        SyntheticSimulator::new(reference_beam(), 7)
    }

    #[test]
    fn result_has_schema_and_summary_rows() {
        let table = simulator().simulate(25).unwrap();
        assert_eq!(table.columns(), schema::column_names().as_slice());
        assert_eq!(table.len(), 27);
        assert!(table.row(MEAN_LABEL).is_some());
        assert!(table.row(UNCERTAINTY_LABEL).is_some());
    }

    #[test]
    fn same_seed_is_deterministic() {
        let first = simulator().simulate(40).unwrap();
        let second = simulator().simulate(40).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn mean_kvp_is_near_nominal() {
        let table = simulator().simulate(200).unwrap();
        let mean = table.row(MEAN_LABEL).unwrap()[0];
        assert!((mean - 60.0).abs() < 3.0, "mean kVp drifted: {mean}");
    }

    #[test]
    fn uncertainties_are_non_negative() {
        let table = simulator().simulate(50).unwrap();
        assert!(table
            .row(UNCERTAINTY_LABEL)
            .unwrap()
            .iter()
            .all(|&value| value >= 0.0));
    }

    #[test]
    fn missing_parameter_is_a_simulation_error() {
        let mut beam = reference_beam();
        beam.remove("Cu");
        let error = SyntheticSimulator::new(beam, 7).simulate(10).unwrap_err();
        assert!(matches!(
            error,
            SweepError::Simulation { iterations: 10, .. }
        ));
    }
}
