use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::automaton::UpdateRule;
use crate::error::ConfigError;
use crate::kernel::Kernel;
use crate::terrain::TerrainParams;

/// Complete, immutable description of one run.
///
/// Missing JSON keys take the `Default` values. Call [`validate`] before
/// using a config; nothing downstream clamps out-of-range input.
///
/// [`validate`]: SimulationConfig::validate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_iterations: u32,
    pub n_rows: usize,
    pub n_cols: usize,
    /// Colonization probability of a cell at zero elevation and zero slope, in [0, 1].
    pub base_growth: f64,
    /// Per-iteration death probability of an occupied cell, in [0, 1].
    pub death_prob: f64,
    /// Elevation penalty exponent, ≥ 0.
    pub alpha_elev: f64,
    /// Slope penalty exponent, ≥ 0.
    pub alpha_slope: f64,
    /// Initially occupied cells, ≤ n_rows × n_cols.
    pub init_n: usize,
    pub neighbor_threshold: u32,
    pub kernel: Kernel,
    /// Snapshots per run, ≥ 2 (iteration 0 and the last are always taken).
    pub snapshot_count: usize,
    /// Fixed seed for a reproducible run; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub terrain: TerrainParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_iterations: 200,
            n_rows: 100,
            n_cols: 100,
            base_growth: 0.3,
            death_prob: 0.05,
            alpha_elev: 1.0,
            alpha_slope: 1.0,
            init_n: 50,
            neighbor_threshold: 1,
            kernel: Kernel::Moore,
            snapshot_count: 5,
            seed: None,
            terrain: TerrainParams::default(),
        }
    }
}

fn unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field, value });
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfUnitRange { field, value });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field, value });
    }
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

impl SimulationConfig {
    /// Check every field against its domain. The first violation is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_rows == 0 || self.n_cols == 0 {
            return Err(ConfigError::EmptyGrid { rows: self.n_rows, cols: self.n_cols });
        }
        unit("base_growth", self.base_growth)?;
        unit("death_prob", self.death_prob)?;
        non_negative("alpha_elev", self.alpha_elev)?;
        non_negative("alpha_slope", self.alpha_slope)?;
        let capacity = self.n_rows * self.n_cols;
        if self.init_n > capacity {
            return Err(ConfigError::InitExceedsCapacity { init_n: self.init_n, capacity });
        }
        if self.snapshot_count < 2 {
            return Err(ConfigError::TooFewSnapshots(self.snapshot_count));
        }
        self.terrain.validate()
    }

    pub fn update_rule(&self) -> UpdateRule {
        UpdateRule {
            kernel: self.kernel,
            neighbor_threshold: self.neighbor_threshold,
            death_prob: self.death_prob,
        }
    }

    /// Seed used by the run: the configured one, or a fresh entropy draw.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| StdRng::from_entropy().gen())
    }
}
