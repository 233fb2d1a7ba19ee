//! Command-line driver for terrain-weighted colonization runs.
//!
//! `run` and `compare` write an `ExperimentReport` JSON (landscape + runs)
//! that `tools/visualize` renders; `sweep` writes a `SweepReport` JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colony_core::{sweep, Experiment, Kernel, ModelKind, SimulationConfig, SweepParameter};
use serde::Serialize;
use tracing::info;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "colony-run", about = "Terrain-weighted colonization cellular automaton")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single model and write its report.
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Model to run: terrain or neutral.
        #[arg(short, long, default_value = "terrain")]
        model: ModelKind,

        /// Output report JSON file.
        #[arg(short, long, default_value = "data/run.json")]
        output: PathBuf,
    },
    /// Run the terrain model and the neutral null model from the same start.
    Compare {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output report JSON file.
        #[arg(short, long, default_value = "data/compare.json")]
        output: PathBuf,
    },
    /// Vary one parameter and record cover statistics per value.
    Sweep {
        #[command(flatten)]
        config: ConfigArgs,

        /// Parameter to vary (base_growth, death_prob, alpha_elev, alpha_slope, neighbor_threshold).
        #[arg(short, long)]
        parameter: SweepParameter,

        /// Comma-separated parameter values.
        #[arg(short, long, value_delimiter = ',', num_args = 1.., required = true)]
        values: Vec<f64>,

        /// Model to run: terrain or neutral.
        #[arg(short, long, default_value = "terrain")]
        model: ModelKind,

        /// Output sweep JSON file.
        #[arg(short, long, default_value = "data/sweep.json")]
        output: PathBuf,
    },
}

/// Config file plus per-field overrides. Flags win over the file.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// SimulationConfig JSON file; missing keys take defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    // Flags carry the JSON key names; the short forms are aliases.
    #[arg(long, visible_alias = "iterations")]
    num_iterations: Option<u32>,
    #[arg(long, visible_alias = "rows")]
    n_rows: Option<usize>,
    #[arg(long, visible_alias = "cols")]
    n_cols: Option<usize>,
    #[arg(long)]
    base_growth: Option<f64>,
    #[arg(long)]
    death_prob: Option<f64>,
    #[arg(long)]
    alpha_elev: Option<f64>,
    #[arg(long)]
    alpha_slope: Option<f64>,
    #[arg(long)]
    init_n: Option<usize>,
    #[arg(long, visible_alias = "threshold")]
    neighbor_threshold: Option<u32>,
    /// moore or von_neumann.
    #[arg(long)]
    kernel: Option<Kernel>,
    #[arg(long, visible_alias = "snapshots")]
    snapshot_count: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<SimulationConfig> {
        let mut c = match &self.config {
            Some(path) => serde_json::from_str(
                &fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
            )
            .with_context(|| format!("parsing {}", path.display()))?,
            None => SimulationConfig::default(),
        };
        if let Some(v) = self.num_iterations { c.num_iterations = v; }
        if let Some(v) = self.n_rows { c.n_rows = v; }
        if let Some(v) = self.n_cols { c.n_cols = v; }
        if let Some(v) = self.base_growth { c.base_growth = v; }
        if let Some(v) = self.death_prob { c.death_prob = v; }
        if let Some(v) = self.alpha_elev { c.alpha_elev = v; }
        if let Some(v) = self.alpha_slope { c.alpha_slope = v; }
        if let Some(v) = self.init_n { c.init_n = v; }
        if let Some(v) = self.neighbor_threshold { c.neighbor_threshold = v; }
        if let Some(v) = self.kernel { c.kernel = v; }
        if let Some(v) = self.snapshot_count { c.snapshot_count = v; }
        if self.seed.is_some() { c.seed = self.seed; }
        c.validate().context("invalid configuration")?;
        Ok(c)
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let json = serde_json::to_string(value)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "wrote report");
    Ok(())
}

// ── main ──────────────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, model, output } => {
            let exp = Experiment::new(config.resolve()?)?;
            let run = exp.run(model);
            eprintln!(
                "{model}: cover {:.3} -> {:.3} (mean {:.3}) over {} iterations, seed {}",
                run.summary.initial,
                run.summary.final_cover,
                run.summary.mean,
                exp.config().num_iterations,
                exp.seed(),
            );
            write_json(&output, &exp.report(vec![run]))?;
        }
        Command::Compare { config, output } => {
            let exp = Experiment::new(config.resolve()?)?;
            let cmp = exp.compare();
            eprintln!("{:<10} {:>8} {:>8} {:>8} {:>8}", "Model", "Initial", "Final", "Mean", "Tail");
            eprintln!("{}", "-".repeat(46));
            for r in [&cmp.terrain, &cmp.neutral] {
                eprintln!(
                    "{:<10} {:>8.3} {:>8.3} {:>8.3} {:>8.3}",
                    r.model.to_string(),
                    r.summary.initial,
                    r.summary.final_cover,
                    r.summary.mean,
                    r.summary.mean_tail,
                );
            }
            write_json(&output, &exp.report(vec![cmp.terrain, cmp.neutral]))?;
        }
        Command::Sweep { config, parameter, values, model, output } => {
            let base = config.resolve()?;
            eprintln!("Sweeping {parameter} over {} values ({model} model) ...", values.len());
            let report = sweep(&base, parameter, &values, model)?;
            eprintln!("{:>12} {:>8} {:>8} {:>8}", parameter.name(), "Final", "Mean", "Tail");
            eprintln!("{}", "-".repeat(40));
            for p in &report.points {
                eprintln!(
                    "{:>12.4} {:>8.3} {:>8.3} {:>8.3}",
                    p.value, p.summary.final_cover, p.summary.mean, p.summary.mean_tail
                );
            }
            write_json(&output, &report)?;
        }
    }

    Ok(())
}
