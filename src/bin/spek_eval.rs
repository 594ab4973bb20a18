use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use spek_bench::trend::{self, write_trend_csv, write_trend_points_csv};
use spek_bench::{aggregate, exclude_failed, KeyAxis, Ledger, ResultStore, SweepError, LEDGER_FILE};

#[derive(Debug, Parser)]
#[command(name = "spek_eval")]
#[command(about = "Aggregate persisted sweep results into convergence and timing trends")]
struct Cli {
    /// Directory holding the out_<N>.csv artifacts and the ledger.
    #[arg(long, default_value = "output-spek")]
    data_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if !cli.data_dir.is_dir() {
        bail!("no such data directory: {}", cli.data_dir.display());
    }

    let store = ResultStore::open(&cli.data_dir)?;
    let discovered = store.discover()?;
    println!(
        "Retrieved {} cases with iteration numbers {:?}",
        discovered.len(),
        discovered
    );

    let ledger_path = cli.data_dir.join(LEDGER_FILE);
    let ledger = if ledger_path.is_file() {
        Some(Ledger::load(&ledger_path).context("failed to load the execution-time ledger")?)
    } else {
        None
    };

    let keys = match &ledger {
        Some(ledger) => exclude_failed(&discovered, ledger),
        None => discovered,
    };

    let tables = aggregate(&store, &keys)?;
    let means_path = cli.data_dir.join("means_by_iterations.csv");
    let uncertainties_path = cli.data_dir.join("uncertainties_by_iterations.csv");
    tables.means.write_csv(&means_path)?;
    tables.uncertainties.write_csv(&uncertainties_path)?;
    println!(
        "Wrote {} aggregate rows to {} and {}",
        tables.means.len(),
        means_path.display(),
        uncertainties_path.display()
    );

    if let Some(ledger) = &ledger {
        let mut fits = Vec::new();
        for axis in [KeyAxis::Linear, KeyAxis::Log10] {
            match trend::fit(ledger, axis) {
                Ok(fit) => {
                    println!("{} fit: {}", axis.label(), fit.equation());
                    let points_path = cli
                        .data_dir
                        .join(format!("trend_points_{}.csv", axis.label()));
                    write_trend_points_csv(&points_path, &fit)?;
                    fits.push(fit);
                }
                Err(SweepError::InsufficientData { valid }) => {
                    eprintln!(
                        "Skipping {} trend fit: only {valid} timed steps",
                        axis.label()
                    );
                }
                Err(error) => return Err(error.into()),
            }
        }

        if !fits.is_empty() {
            write_trend_csv(&cli.data_dir.join("trend_fits.csv"), &fits)?;
        }
    } else {
        eprintln!("No {LEDGER_FILE} found, skipping execution-time trends");
    }

    Ok(())
}
