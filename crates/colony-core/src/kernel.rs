use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::{CellState, OccupancyGrid};

/// Neighbour adjacency used when counting occupied cells around an empty one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    /// 8-connected.
    #[default]
    Moore,
    /// 4-connected.
    VonNeumann,
}

const MOORE_OFFSETS: [(isize, isize); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    ( 0, -1),          ( 0, 1),
    ( 1, -1), ( 1, 0), ( 1, 1),
];

const VON_NEUMANN_OFFSETS: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];

impl Kernel {
    /// `(d_row, d_col)` offsets of this kernel.
    pub fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Kernel::Moore => &MOORE_OFFSETS,
            Kernel::VonNeumann => &VON_NEUMANN_OFFSETS,
        }
    }

    /// Count occupied neighbours of `(row, col)`. Offsets that fall outside
    /// the grid are skipped, so border cells have fewer neighbours.
    pub fn count_occupied(self, grid: &OccupancyGrid, row: usize, col: usize) -> usize {
        let (h, w) = (grid.height as isize, grid.width as isize);
        self.offsets()
            .iter()
            .filter(|&&(dr, dc)| {
                let nr = row as isize + dr;
                let nc = col as isize + dc;
                nr >= 0
                    && nr < h
                    && nc >= 0
                    && nc < w
                    && grid.get(nr as usize, nc as usize) == CellState::Occupied
            })
            .count()
    }

    pub fn name(self) -> &'static str {
        match self {
            Kernel::Moore => "moore",
            Kernel::VonNeumann => "von_neumann",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kernel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "moore" => Ok(Kernel::Moore),
            "von_neumann" | "vonneumann" => Ok(Kernel::VonNeumann),
            _ => Err(ConfigError::UnknownKernel(s.to_string())),
        }
    }
}
