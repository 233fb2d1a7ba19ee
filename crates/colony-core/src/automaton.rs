//! Stochastic colonization / mortality update.
//!
//! Synchronous rule: every cell's next state is read from the previous grid
//! only, written into a separate buffer, and the buffers are swapped by the
//! caller. Per cell:
//!   empty    → occupied  if k ≥ neighbor_threshold and u < P[cell]
//!   occupied → empty     if u < death_prob
//! where k is the occupied-neighbour count under the kernel and u is one
//! fresh uniform draw in [0, 1).
//!
//! Random streams: the run RNG yields one u64 per iteration and every row
//! seeds its own `StdRng` from (iteration seed, row). Row order therefore
//! never changes which draw lands on which cell, and the `threading` feature
//! produces the same grids as the sequential path.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::grid::{CellState, OccupancyGrid};
use crate::kernel::Kernel;

/// Parameters of the per-cell rule. Fixed for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateRule {
    pub kernel: Kernel,
    /// Minimum occupied neighbours before an empty cell may colonize.
    /// 0 allows isolated cells to colonize.
    pub neighbor_threshold: u32,
    pub death_prob: f64,
}

/// Mix a row index into the iteration seed (SplitMix64 finalizer).
#[inline]
fn row_seed(iteration_seed: u64, row: usize) -> u64 {
    let mut z = iteration_seed ^ (row as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn update_row(
    grid: &OccupancyGrid,
    prob_map: &Field,
    rule: &UpdateRule,
    row: usize,
    seed: u64,
    out: &mut [CellState],
) {
    let mut rng = StdRng::seed_from_u64(seed);
    for (col, next) in out.iter_mut().enumerate() {
        let u: f64 = rng.gen();
        *next = match grid.get(row, col) {
            CellState::Occupied => {
                if u < rule.death_prob {
                    CellState::Empty
                } else {
                    CellState::Occupied
                }
            }
            CellState::Empty => {
                let k = rule.kernel.count_occupied(grid, row, col);
                if k >= rule.neighbor_threshold as usize && u < prob_map.get(row, col) as f64 {
                    CellState::Occupied
                } else {
                    CellState::Empty
                }
            }
        };
    }
}

/// Write the successor of `grid` into `next`.
///
/// Consumes exactly one u64 from `rng` regardless of grid size.
///
/// # Panics
///
/// If `prob_map` or `next` does not match `grid`'s shape.
pub fn step_into<R: Rng + ?Sized>(
    grid: &OccupancyGrid,
    prob_map: &Field,
    rule: &UpdateRule,
    rng: &mut R,
    next: &mut OccupancyGrid,
) {
    assert_eq!(
        (grid.width, grid.height, grid.data.len()),
        (prob_map.width, prob_map.height, prob_map.len()),
        "probability map shape differs from grid"
    );
    assert_eq!(
        (grid.width, grid.height, grid.data.len()),
        (next.width, next.height, next.data.len()),
        "output buffer shape differs from grid"
    );

    let iteration_seed: u64 = rng.gen();
    if grid.width == 0 {
        return;
    }
    update_rows(grid, prob_map, rule, iteration_seed, next);
}

#[cfg(feature = "threading")]
fn update_rows(
    grid: &OccupancyGrid,
    prob_map: &Field,
    rule: &UpdateRule,
    iteration_seed: u64,
    next: &mut OccupancyGrid,
) {
    use rayon::prelude::*;
    next.data
        .par_chunks_mut(grid.width)
        .enumerate()
        .for_each(|(row, out)| {
            update_row(grid, prob_map, rule, row, row_seed(iteration_seed, row), out)
        });
}

#[cfg(not(feature = "threading"))]
fn update_rows(
    grid: &OccupancyGrid,
    prob_map: &Field,
    rule: &UpdateRule,
    iteration_seed: u64,
    next: &mut OccupancyGrid,
) {
    for (row, out) in next.data.chunks_mut(grid.width).enumerate() {
        update_row(grid, prob_map, rule, row, row_seed(iteration_seed, row), out);
    }
}

/// Allocating form of [`step_into`]: returns the next grid.
pub fn step<R: Rng + ?Sized>(
    grid: &OccupancyGrid,
    prob_map: &Field,
    rule: &UpdateRule,
    rng: &mut R,
) -> OccupancyGrid {
    let mut next = OccupancyGrid::new(grid.width, grid.height);
    step_into(grid, prob_map, rule, rng, &mut next);
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(kernel: Kernel, neighbor_threshold: u32, death_prob: f64) -> UpdateRule {
        UpdateRule { kernel, neighbor_threshold, death_prob }
    }

    fn seeded(w: usize, h: usize, n: usize, seed: u64) -> OccupancyGrid {
        OccupancyGrid::random(w, h, n, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn frozen_when_no_growth_and_no_death() {
        let g = seeded(12, 9, 30, 3);
        let p = Field::zeros(12, 9);
        let mut rng = StdRng::seed_from_u64(8);
        let next = step(&g, &p, &rule(Kernel::Moore, 1, 0.0), &mut rng);
        assert_eq!(next, g);
    }

    #[test]
    fn certain_death_empties_grid() {
        let g = seeded(10, 10, 40, 2);
        let p = Field::zeros(10, 10);
        let next = step(&g, &p, &rule(Kernel::Moore, 1, 1.0), &mut StdRng::seed_from_u64(1));
        assert_eq!(next.occupied_count(), 0);
    }

    #[test]
    fn certain_growth_fills_neighbourhood() {
        // Single seed in the centre, P = 1, no death: exactly the kernel ring colonizes.
        let mut g = OccupancyGrid::new(5, 5);
        g.set(2, 2, CellState::Occupied);
        let p = Field::new(5, 5, 1.0);

        let moore = step(&g, &p, &rule(Kernel::Moore, 1, 0.0), &mut StdRng::seed_from_u64(4));
        assert_eq!(moore.occupied_count(), 9);

        let vn = step(&g, &p, &rule(Kernel::VonNeumann, 1, 0.0), &mut StdRng::seed_from_u64(4));
        assert_eq!(vn.occupied_count(), 5);
        assert_eq!(vn.get(1, 1), CellState::Empty);
        assert_eq!(vn.get(1, 2), CellState::Occupied);
    }

    #[test]
    fn update_is_synchronous() {
        // A line seed grows by one ring per step, never further, even though
        // newly colonized cells would enable their own neighbours.
        let mut g = OccupancyGrid::new(7, 1);
        g.set(0, 0, CellState::Occupied);
        let p = Field::new(7, 1, 1.0);
        let r = rule(Kernel::VonNeumann, 1, 0.0);
        let mut rng = StdRng::seed_from_u64(0);
        let g1 = step(&g, &p, &r, &mut rng);
        assert_eq!(g1.occupied_count(), 2);
        let g2 = step(&g1, &p, &r, &mut rng);
        assert_eq!(g2.occupied_count(), 3);
    }

    #[test]
    fn threshold_gates_colonization() {
        // Centre has exactly 2 occupied neighbours.
        let mut g = OccupancyGrid::new(3, 3);
        g.set(0, 1, CellState::Occupied);
        g.set(1, 0, CellState::Occupied);
        let p = Field::new(3, 3, 1.0);

        let blocked = step(&g, &p, &rule(Kernel::VonNeumann, 3, 0.0), &mut StdRng::seed_from_u64(5));
        assert_eq!(blocked.get(1, 1), CellState::Empty);

        let open = step(&g, &p, &rule(Kernel::VonNeumann, 2, 0.0), &mut StdRng::seed_from_u64(5));
        assert_eq!(open.get(1, 1), CellState::Occupied);
    }

    #[test]
    fn isolated_cells_need_zero_threshold() {
        let g = OccupancyGrid::new(4, 4);
        let p = Field::new(4, 4, 1.0);
        let gated = step(&g, &p, &rule(Kernel::Moore, 1, 0.0), &mut StdRng::seed_from_u64(6));
        assert_eq!(gated.occupied_count(), 0);
        let seeding = step(&g, &p, &rule(Kernel::Moore, 0, 0.0), &mut StdRng::seed_from_u64(6));
        assert_eq!(seeding.occupied_count(), 16);
    }

    #[test]
    fn same_seed_same_successor() {
        let g = seeded(20, 15, 60, 9);
        let p = Field::new(20, 15, 0.4);
        let r = rule(Kernel::Moore, 1, 0.2);
        let a = step(&g, &p, &r, &mut StdRng::seed_from_u64(77));
        let b = step(&g, &p, &r, &mut StdRng::seed_from_u64(77));
        assert_eq!(a, b);
    }

    #[test]
    fn step_consumes_one_draw_from_run_rng() {
        let g = seeded(6, 6, 6, 1);
        let p = Field::new(6, 6, 0.5);
        let mut a = StdRng::seed_from_u64(3);
        let _ = step(&g, &p, &rule(Kernel::Moore, 1, 0.1), &mut a);
        let mut b = StdRng::seed_from_u64(3);
        let _: u64 = b.gen();
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    #[should_panic(expected = "probability map shape differs from grid")]
    fn mismatched_probability_map_panics() {
        let g = OccupancyGrid::new(5, 4);
        let p = Field::new(4, 5, 0.5);
        let _ = step(&g, &p, &rule(Kernel::Moore, 1, 0.0), &mut StdRng::seed_from_u64(1));
    }

    #[cfg(feature = "threading")]
    #[test]
    fn parallel_rows_match_sequential_rows() {
        let (w, h) = (37, 29);
        let g = seeded(w, h, 200, 13);
        let p = Field::from_fn(w, h, |r, c| ((r * w + c) % 7) as f32 / 7.0);
        let r = rule(Kernel::Moore, 1, 0.15);
        for iteration_seed in [0u64, 1, 0xDEAD_BEEF, u64::MAX] {
            let mut parallel = OccupancyGrid::new(w, h);
            update_rows(&g, &p, &r, iteration_seed, &mut parallel);

            let mut sequential = OccupancyGrid::new(w, h);
            for (row, out) in sequential.data.chunks_mut(w).enumerate() {
                update_row(&g, &p, &r, row, row_seed(iteration_seed, row), out);
            }
            assert_eq!(parallel, sequential);
        }
    }

    #[test]
    fn row_seeds_differ() {
        let s: std::collections::HashSet<u64> = (0..256).map(|r| row_seed(42, r)).collect();
        assert_eq!(s.len(), 256);
    }
}
