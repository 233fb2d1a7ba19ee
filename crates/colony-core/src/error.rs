use thiserror::Error;

/// Errors raised when a configuration or an input field falls outside its
/// documented domain. Every variant is detected before a run starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} = {value} must lie in [0, 1]")]
    OutOfUnitRange { field: &'static str, value: f64 },
    #[error("{field} = {value} must be non-negative")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f64 },
    #[error("{field} = {value} must be a whole number")]
    NotAnInteger { field: &'static str, value: f64 },
    #[error("grid must have at least one row and one column, got {rows}x{cols}")]
    EmptyGrid { rows: usize, cols: usize },
    #[error("init_n = {init_n} exceeds grid capacity {capacity}")]
    InitExceedsCapacity { init_n: usize, capacity: usize },
    #[error("snapshot_count = {0} must be at least 2")]
    TooFewSnapshots(usize),
    #[error("unknown kernel {0:?} (expected \"moore\" or \"von_neumann\")")]
    UnknownKernel(String),
    #[error("unknown model {0:?} (expected \"terrain\" or \"neutral\")")]
    UnknownModel(String),
    #[error("unknown sweep parameter {0:?}")]
    UnknownParameter(String),
    #[error("field is {actual_rows}x{actual_cols}, expected {rows}x{cols}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },
    #[error("buffer holds {actual} values, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("terrain {field} = {value} is invalid")]
    InvalidTerrain { field: &'static str, value: f64 },
}
