//! Terrain-weighted colonization cellular automaton.
//!
//! A normalized height field and its derived slope field shape a static
//! per-cell colonization probability; a binary occupancy grid then evolves
//! under neighbour-gated stochastic colonization and random mortality.
//! The terrain model can be compared against a spatially-neutral null model
//! and swept across parameters.

pub mod automaton;
pub mod config;
pub mod error;
pub mod experiment;
pub mod field;
pub mod grid;
pub mod growth;
pub mod kernel;
pub mod runner;
pub mod slope;
pub mod terrain;

pub use automaton::{step, step_into, UpdateRule};
pub use config::SimulationConfig;
pub use error::ConfigError;
pub use experiment::{
    sweep, Comparison, Experiment, ExperimentReport, Landscape, ModelKind, RunReport,
    SweepParameter, SweepPoint, SweepReport,
};
pub use field::Field;
pub use grid::{CellState, OccupancyGrid};
pub use growth::{compute_growth_probability, uniform_growth_probability};
pub use kernel::Kernel;
pub use runner::{run, snapshot_schedule, CoverSample, CoverSummary, RunOutput, Simulation, Snapshot};
pub use slope::compute_slope;
pub use terrain::{generate_height_field, normalize_height, TerrainParams};
