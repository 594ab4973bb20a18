//! Sweep driver.
//!
//! Runs the simulation once per sweep key in order, times each call,
//! writes successful results through the store, and rewrites the full
//! ledger after every step. A single step failure never aborts the sweep;
//! only I/O failures persisting results or the ledger do.

use std::path::PathBuf;
use std::time::Instant;

use crate::config::validate_iterations;
use crate::ledger::{Ledger, LedgerEntry, StepOutcome, LEDGER_FILE};
use crate::simulate::Simulator;
use crate::store::ResultStore;
use crate::SweepError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub completed: usize,
    pub failed: usize,
}

pub struct SweepDriver<'a, S: Simulator> {
    simulator: &'a S,
    store: &'a ResultStore,
    ledger_path: PathBuf,
    ledger: Ledger,
}

impl<'a, S: Simulator> SweepDriver<'a, S> {
    pub fn new(simulator: &'a S, store: &'a ResultStore) -> Self {
        Self {
            simulator,
            store,
            ledger_path: store.dir().join(LEDGER_FILE),
            ledger: Ledger::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn run(&mut self, iterations: &[u64]) -> Result<SweepReport, SweepError> {
        validate_iterations(iterations)?;

        let mut completed = 0_usize;
        let mut failed = 0_usize;

        for &n in iterations {
            println!("Running case with {n} iterations");
            let start = Instant::now();
            let result = self.simulator.simulate(n);
            let elapsed = start.elapsed().as_secs_f64();

            match result {
                Ok(table) => {
                    self.store.put(n, &table)?;
                    self.ledger.push(LedgerEntry {
                        iterations: n,
                        outcome: StepOutcome::Completed(elapsed),
                    });
                    println!("Execution time: {elapsed:.3} s for {n} iterations");
                    completed += 1;
                }
                Err(error) => {
                    self.ledger.push(LedgerEntry {
                        iterations: n,
                        outcome: StepOutcome::Failed,
                    });
                    eprintln!("Case with {n} iterations failed: {error}");
                    failed += 1;
                }
            }

            // Durable before the next step, whatever the outcome.
            self.ledger.write_atomic(&self.ledger_path)?;
        }

        Ok(SweepReport {
            attempted: iterations.len(),
            completed,
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::reference_beam;
    use crate::simulate::SyntheticSimulator;
    use crate::table::StatsTable;
    use tempfile::TempDir;

    /// Delegates to the synthetic simulator but fails on chosen keys.
    struct FlakySimulator {
        inner: SyntheticSimulator,
        failing: Vec<u64>,
    }

    impl Simulator for FlakySimulator {
        fn simulate(&self, iterations: u64) -> Result<StatsTable, SweepError> {
            if self.failing.contains(&iterations) {
                return Err(SweepError::Simulation {
                    iterations,
                    message: "did not converge".to_string(),
                });
            }
            self.inner.simulate(iterations)
        }
    }

    fn synthetic() -> SyntheticSimulator {
        SyntheticSimulator::new(reference_beam(), 11)
    }

    #[test]
    fn full_sweep_records_every_step_in_order() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        let simulator = synthetic();
        let mut driver = SweepDriver::new(&simulator, &store);

        let keys = [10, 20, 30];
        let report = driver.run(&keys).unwrap();
        assert_eq!(
            report,
            SweepReport {
                attempted: 3,
                completed: 3,
                failed: 0
            }
        );

        let ledger = Ledger::load(&dir.path().join(LEDGER_FILE)).unwrap();
        assert_eq!(ledger.len(), keys.len());
        for (entry, &key) in ledger.entries().iter().zip(&keys) {
            assert_eq!(entry.iterations, key);
            assert!(entry.outcome.elapsed_secs().is_some());
        }
        assert_eq!(store.discover().unwrap(), keys.to_vec());
    }

    #[test]
    fn one_failing_step_does_not_abort_the_sweep() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        let simulator = FlakySimulator {
            inner: synthetic(),
            failing: vec![20],
        };
        let mut driver = SweepDriver::new(&simulator, &store);

        let report = driver.run(&[10, 20, 30]).unwrap();
        assert_eq!(
            report,
            SweepReport {
                attempted: 3,
                completed: 2,
                failed: 1
            }
        );

        // The failed key has a ledger entry but no artifact.
        let ledger = Ledger::load(&dir.path().join(LEDGER_FILE)).unwrap();
        assert_eq!(ledger.len(), 3);
        assert!(ledger.entries()[1].outcome.is_failure());
        assert!(!store.exists(20));
        assert_eq!(store.discover().unwrap(), vec![10, 30]);
    }

    #[test]
    fn ledger_is_durable_after_each_step() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        let simulator = synthetic();

        // Two runs standing in for an interrupted sweep and its resume:
        // after the first, disk state already reflects the completed steps.
        let mut first = SweepDriver::new(&simulator, &store);
        first.run(&[10]).unwrap();
        let after_first = Ledger::load(&dir.path().join(LEDGER_FILE)).unwrap();
        assert_eq!(after_first.len(), 1);
        assert_eq!(store.discover().unwrap(), vec![10]);

        let mut second = SweepDriver::new(&simulator, &store);
        second.run(&[20, 30]).unwrap();
        assert_eq!(store.discover().unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn unordered_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ResultStore::open(dir.path()).unwrap();
        let simulator = synthetic();
        let mut driver = SweepDriver::new(&simulator, &store);

        assert!(matches!(
            driver.run(&[30, 10]),
            Err(SweepError::InvalidConfig(_))
        ));
        assert!(driver.ledger().is_empty());
    }
}
