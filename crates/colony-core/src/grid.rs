use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Binary state of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    #[default]
    Empty,
    Occupied,
}

impl CellState {
    #[inline]
    pub fn is_occupied(self) -> bool {
        self == CellState::Occupied
    }
}

/// Row-major occupancy grid, `width` columns × `height` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    pub data: Vec<CellState>,
    pub width: usize,
    pub height: usize,
}

impl OccupancyGrid {
    /// All-empty grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![CellState::Empty; width * height],
            width,
            height,
        }
    }

    /// Grid with exactly `init_n` occupied cells, placed uniformly at random
    /// without replacement.
    pub fn random<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        init_n: usize,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let capacity = width * height;
        if init_n > capacity {
            return Err(ConfigError::InitExceedsCapacity { init_n, capacity });
        }
        let mut grid = Self::new(width, height);
        for idx in rand::seq::index::sample(rng, capacity, init_n).iter() {
            grid.data[idx] = CellState::Occupied;
        }
        Ok(grid)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> CellState {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, state: CellState) {
        self.data[row * self.width + col] = state;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn occupied_count(&self) -> usize {
        self.data.iter().filter(|s| s.is_occupied()).count()
    }

    /// Fraction of occupied cells; 0 for an empty grid.
    pub fn cover(&self) -> f64 {
        if self.data.is_empty() {
            0.0
        } else {
            self.occupied_count() as f64 / self.data.len() as f64
        }
    }
}
