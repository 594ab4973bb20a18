use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use spek_bench::{
    write_manifest_json, ResultStore, RunManifest, SweepConfig, SweepDriver, SyntheticSimulator,
    MANIFEST_FILE,
};

#[derive(Debug, Parser)]
#[command(name = "spek_sweep")]
#[command(about = "Run the iteration-count sweep over the Monte-Carlo beam simulation")]
struct Cli {
    /// Sweep configuration (TOML). Falls back to configs/sweep.toml, then
    /// to the built-in reference case.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured output directory.
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Override the configured random seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(outdir) = cli.outdir {
        config.output_dir = outdir;
    }
    if let Some(seed) = cli.seed {
        config.random_seed = seed;
    }
    config.validate().context("invalid sweep configuration")?;

    let store = ResultStore::open(&config.output_dir)
        .with_context(|| format!("failed to open {}", config.output_dir.display()))?;

    let manifest = RunManifest::new(&config);
    write_manifest_json(&store.dir().join(MANIFEST_FILE), &manifest)
        .context("failed to write run manifest")?;

    let simulator = SyntheticSimulator::new(config.beam.clone(), config.random_seed);
    let mut driver = SweepDriver::new(&simulator, &store);
    let report = driver.run(&config.iterations)?;

    println!(
        "Sweep finished: {} completed, {} failed out of {} steps",
        report.completed, report.failed, report.attempted
    );
    println!("Output directory: {}", store.dir().display());
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SweepConfig> {
    if let Some(path) = path {
        return SweepConfig::from_toml_path(path)
            .with_context(|| format!("failed to load config {}", path.display()));
    }

    let local = PathBuf::from("configs/sweep.toml");
    if local.exists() {
        return SweepConfig::from_toml_path(&local)
            .with_context(|| format!("failed to load config {}", local.display()));
    }

    Ok(SweepConfig::default())
}
