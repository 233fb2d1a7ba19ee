//! Pipeline orchestrator: configuration → landscape → runs.
//!
//! Pipeline order:
//!   1. Validate the configuration (nothing runs on a bad config)
//!   2. Height field (Perlin fBm, or caller-supplied and normalized)
//!   3. Slope field
//!   4. Growth-probability field
//!   5. Initial occupancy grid
//!   6. Iteration via `runner`
//!
//! Both models of a comparison start from the same initial grid and consume
//! the same random stream, so any cover difference comes from the
//! probability field alone.
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::field::Field;
use crate::grid::OccupancyGrid;
use crate::growth::{compute_growth_probability, uniform_growth_probability};
use crate::runner::{run, CoverSummary, RunOutput};
use crate::slope::compute_slope;
use crate::terrain::{generate_height_field, normalize_height};

/// Stream separators mixed into the run seed.
const TERRAIN_STREAM: u64 = 0x5EED_7E22;
const PLACEMENT_STREAM: u64 = 0x1A1D_0000_C0DE_0001;
const DYNAMICS_STREAM: u64 = 0xD1CE_0000_0000_5EED;

// ── Model selection ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Growth probability shaped by elevation and slope.
    #[default]
    Terrain,
    /// Spatially-neutral null model: `base_growth` in every cell.
    Neutral,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::Terrain => "terrain",
            ModelKind::Neutral => "neutral",
        })
    }
}

impl FromStr for ModelKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "terrain" => Ok(ModelKind::Terrain),
            "neutral" | "null" => Ok(ModelKind::Neutral),
            _ => Err(ConfigError::UnknownModel(s.to_string())),
        }
    }
}

// ── Outputs ───────────────────────────────────────────────────────────────────

/// The three static surfaces of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landscape {
    pub height: Field,
    pub slope: Field,
    pub growth: Field,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub model: ModelKind,
    pub summary: CoverSummary,
    #[serde(flatten)]
    pub output: RunOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub terrain: RunReport,
    pub neutral: RunReport,
}

/// Self-contained dump of one experiment, consumed by the visualizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub config: SimulationConfig,
    /// Seed actually used (the configured one or the entropy draw).
    pub seed: u64,
    pub landscape: Landscape,
    pub runs: Vec<RunReport>,
}

// ── Experiment ────────────────────────────────────────────────────────────────

/// A validated configuration together with its landscape and initial grid.
#[derive(Debug, Clone)]
pub struct Experiment {
    config: SimulationConfig,
    seed: u64,
    landscape: Landscape,
    initial: OccupancyGrid,
}

impl Experiment {
    /// Validate `config` and generate its terrain.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.resolve_seed();
        let terrain_seed = ((seed ^ TERRAIN_STREAM) & 0xFFFF_FFFF) as u32;
        let height = generate_height_field(config.n_rows, config.n_cols, &config.terrain, terrain_seed);
        Self::assemble(config, seed, height)
    }

    /// Validate `config` and use a caller-supplied height surface
    /// (`n_rows × n_cols`, finite). A surface outside [0, 1] is min-max
    /// normalized; one already inside is used as given.
    pub fn with_height(config: SimulationConfig, height: Field) -> Result<Self, ConfigError> {
        config.validate()?;
        if height.height != config.n_rows || height.width != config.n_cols || height.len() != config.n_rows * config.n_cols {
            return Err(ConfigError::ShapeMismatch {
                rows: config.n_rows,
                cols: config.n_cols,
                actual_rows: height.height,
                actual_cols: height.width,
            });
        }
        if let Some(&bad) = height.data.iter().find(|v| !v.is_finite()) {
            return Err(ConfigError::NotFinite { field: "height", value: bad as f64 });
        }
        let seed = config.resolve_seed();
        Self::assemble(config, seed, normalize_height(&height))
    }

    fn assemble(config: SimulationConfig, seed: u64, height: Field) -> Result<Self, ConfigError> {
        let slope = compute_slope(&height);
        let growth = compute_growth_probability(
            &height,
            &slope,
            config.base_growth,
            config.alpha_elev,
            config.alpha_slope,
        )?;
        let mut placement = StdRng::seed_from_u64(seed ^ PLACEMENT_STREAM);
        let initial = OccupancyGrid::random(config.n_cols, config.n_rows, config.init_n, &mut placement)?;
        Ok(Self {
            config,
            seed,
            landscape: Landscape { height, slope, growth },
            initial,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn landscape(&self) -> &Landscape {
        &self.landscape
    }

    pub fn initial_grid(&self) -> &OccupancyGrid {
        &self.initial
    }

    /// Probability field driving `model`.
    pub fn growth_field(&self, model: ModelKind) -> Field {
        match model {
            ModelKind::Terrain => self.landscape.growth.clone(),
            ModelKind::Neutral => {
                uniform_growth_probability(self.config.n_cols, self.config.n_rows, self.config.base_growth)
            }
        }
    }

    /// Run one model to completion. Infallible: the configuration was
    /// validated when the experiment was built.
    pub fn run(&self, model: ModelKind) -> RunReport {
        let c = &self.config;
        info!(
            %model,
            seed = self.seed,
            rows = c.n_rows,
            cols = c.n_cols,
            iterations = c.num_iterations,
            kernel = %c.kernel,
            "starting run"
        );
        let prob = self.growth_field(model);
        let rng = StdRng::seed_from_u64(self.seed ^ DYNAMICS_STREAM);
        let output = run(
            c.num_iterations,
            self.initial.clone(),
            &prob,
            c.update_rule(),
            c.snapshot_count,
            rng,
        );
        let summary = CoverSummary::from_series(&output.cover_series);
        info!(%model, final_cover = summary.final_cover, mean_cover = summary.mean, "run finished");
        RunReport { model, summary, output }
    }

    /// Run the terrain-weighted model and the neutral null model side by side.
    pub fn compare(&self) -> Comparison {
        Comparison {
            terrain: self.run(ModelKind::Terrain),
            neutral: self.run(ModelKind::Neutral),
        }
    }

    /// Bundle the landscape with finished runs for serialization.
    pub fn report(&self, runs: Vec<RunReport>) -> ExperimentReport {
        ExperimentReport {
            config: self.config.clone(),
            seed: self.seed,
            landscape: self.landscape.clone(),
            runs,
        }
    }
}

// ── Sensitivity sweep ─────────────────────────────────────────────────────────

/// Scalar parameter varied by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    BaseGrowth,
    DeathProb,
    AlphaElev,
    AlphaSlope,
    NeighborThreshold,
}

impl SweepParameter {
    pub fn name(self) -> &'static str {
        match self {
            SweepParameter::BaseGrowth => "base_growth",
            SweepParameter::DeathProb => "death_prob",
            SweepParameter::AlphaElev => "alpha_elev",
            SweepParameter::AlphaSlope => "alpha_slope",
            SweepParameter::NeighborThreshold => "neighbor_threshold",
        }
    }

    /// Write `value` into the matching config field.
    pub fn apply(self, config: &mut SimulationConfig, value: f64) -> Result<(), ConfigError> {
        match self {
            SweepParameter::BaseGrowth => config.base_growth = value,
            SweepParameter::DeathProb => config.death_prob = value,
            SweepParameter::AlphaElev => config.alpha_elev = value,
            SweepParameter::AlphaSlope => config.alpha_slope = value,
            SweepParameter::NeighborThreshold => {
                let field = "neighbor_threshold";
                if !value.is_finite() {
                    return Err(ConfigError::NotFinite { field, value });
                }
                if value < 0.0 {
                    return Err(ConfigError::Negative { field, value });
                }
                if value.fract() != 0.0 || value > u32::MAX as f64 {
                    return Err(ConfigError::NotAnInteger { field, value });
                }
                config.neighbor_threshold = value as u32;
            }
        }
        Ok(())
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SweepParameter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "base_growth" => Ok(SweepParameter::BaseGrowth),
            "death_prob" => Ok(SweepParameter::DeathProb),
            "alpha_elev" => Ok(SweepParameter::AlphaElev),
            "alpha_slope" => Ok(SweepParameter::AlphaSlope),
            "neighbor_threshold" => Ok(SweepParameter::NeighborThreshold),
            _ => Err(ConfigError::UnknownParameter(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: f64,
    pub summary: CoverSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub parameter: SweepParameter,
    pub model: ModelKind,
    pub seed: u64,
    pub points: Vec<SweepPoint>,
}

/// Run `model` once per value of `parameter`, all other settings from `base`.
///
/// Every point shares the base seed, terrain and initial grid. All point
/// configurations are validated before the first run starts.
pub fn sweep(
    base: &SimulationConfig,
    parameter: SweepParameter,
    values: &[f64],
    model: ModelKind,
) -> Result<SweepReport, ConfigError> {
    base.validate()?;
    let seed = base.resolve_seed();
    let mut configs = Vec::with_capacity(values.len());
    for &value in values {
        let mut c = SimulationConfig { seed: Some(seed), ..base.clone() };
        parameter.apply(&mut c, value)?;
        c.validate()?;
        configs.push(c);
    }

    // Terrain does not depend on the swept parameters: generate it once.
    let reference = Experiment::new(SimulationConfig { seed: Some(seed), ..base.clone() })?;
    let height = reference.landscape().height.clone();
    let experiments = configs
        .into_iter()
        .map(|c| Experiment::with_height(c, height.clone()))
        .collect::<Result<Vec<_>, _>>()?;

    let evaluate = |(exp, &value): (&Experiment, &f64)| {
        let report = exp.run(model);
        debug!(%parameter, value, final_cover = report.summary.final_cover, "sweep point");
        SweepPoint { value, summary: report.summary }
    };

    #[cfg(feature = "threading")]
    let points = {
        use rayon::prelude::*;
        experiments.par_iter().zip(values.par_iter()).map(evaluate).collect()
    };
    #[cfg(not(feature = "threading"))]
    let points = experiments.iter().zip(values.iter()).map(evaluate).collect();

    Ok(SweepReport { parameter, model, seed, points })
}
