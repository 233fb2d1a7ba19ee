//! Iteration driver: cover sampling every step, snapshots on a fixed schedule.
//!
//! `Simulation` owns both grid buffers for the length of a run and swaps them
//! after every step. Between two `advance` calls the state is always
//! consistent (cover series + last materialized grid), so a caller may stop
//! early and still `finish` with a valid, truncated output.
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::automaton::{step_into, UpdateRule};
use crate::field::Field;
use crate::grid::OccupancyGrid;

/// Fraction of occupied cells at one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverSample {
    pub iteration: u32,
    pub occupied: usize,
    pub fraction: f64,
}

impl CoverSample {
    fn of(iteration: u32, grid: &OccupancyGrid) -> Self {
        Self {
            iteration,
            occupied: grid.occupied_count(),
            fraction: grid.cover(),
        }
    }
}

/// Copy of the grid captured at a scheduled iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub iteration: u32,
    pub grid: OccupancyGrid,
}

/// Everything a finished (or stopped) run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub cover_series: Vec<CoverSample>,
    pub snapshots: Vec<Snapshot>,
    pub final_grid: OccupancyGrid,
}

/// Aggregate cover statistics used by comparisons and sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverSummary {
    pub initial: f64,
    pub final_cover: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Mean over the last quarter of the series (at least one sample).
    pub mean_tail: f64,
}

impl CoverSummary {
    /// Summarize a cover series. Returns all-zero for an empty series.
    pub fn from_series(series: &[CoverSample]) -> Self {
        if series.is_empty() {
            return Self { initial: 0.0, final_cover: 0.0, mean: 0.0, min: 0.0, max: 0.0, mean_tail: 0.0 };
        }
        let n = series.len();
        let mean = series.iter().map(|s| s.fraction).sum::<f64>() / n as f64;
        let tail_len = (n / 4).max(1);
        let mean_tail = series[n - tail_len..].iter().map(|s| s.fraction).sum::<f64>() / tail_len as f64;
        Self {
            initial: series[0].fraction,
            final_cover: series[n - 1].fraction,
            mean,
            min: series.iter().map(|s| s.fraction).fold(f64::INFINITY, f64::min),
            max: series.iter().map(|s| s.fraction).fold(f64::NEG_INFINITY, f64::max),
            mean_tail,
        }
    }
}

/// `snapshot_count` iterations evenly spaced over `[0, num_iterations]`,
/// rounded to the nearest integer and deduplicated. Always contains 0 and
/// `num_iterations`. Counts below 2 are treated as 2.
pub fn snapshot_schedule(num_iterations: u32, snapshot_count: usize) -> Vec<u32> {
    let count = snapshot_count.max(2);
    let span = (count - 1) as f64;
    let mut schedule: Vec<u32> = (0..count)
        .map(|k| (k as f64 * num_iterations as f64 / span).round() as u32)
        .collect();
    schedule.dedup();
    schedule
}

/// An in-progress run.
pub struct Simulation<'a, R: Rng> {
    prob_map: &'a Field,
    rule: UpdateRule,
    num_iterations: u32,
    schedule: Vec<u32>,
    next_snapshot: usize,
    iteration: u32,
    current: OccupancyGrid,
    scratch: OccupancyGrid,
    cover_series: Vec<CoverSample>,
    snapshots: Vec<Snapshot>,
    rng: R,
}

impl<'a, R: Rng> Simulation<'a, R> {
    /// Start a run: records cover and the snapshot for iteration 0.
    ///
    /// # Panics
    ///
    /// If `prob_map` does not match `initial`'s shape.
    pub fn new(
        initial: OccupancyGrid,
        prob_map: &'a Field,
        rule: UpdateRule,
        num_iterations: u32,
        snapshot_count: usize,
        rng: R,
    ) -> Self {
        assert_eq!(
            (initial.width, initial.height),
            (prob_map.width, prob_map.height),
            "probability map shape differs from grid"
        );

        let schedule = snapshot_schedule(num_iterations, snapshot_count);
        let scratch = OccupancyGrid::new(initial.width, initial.height);
        let mut cover_series = Vec::with_capacity(num_iterations as usize + 1);
        cover_series.push(CoverSample::of(0, &initial));

        let mut sim = Self {
            prob_map,
            rule,
            num_iterations,
            schedule,
            next_snapshot: 0,
            iteration: 0,
            current: initial,
            scratch,
            cover_series,
            snapshots: Vec::new(),
            rng,
        };
        sim.capture_if_scheduled();
        sim
    }

    fn capture_if_scheduled(&mut self) {
        if self.schedule.get(self.next_snapshot) == Some(&self.iteration) {
            debug!(
                iteration = self.iteration,
                cover = self.cover_series.last().map_or(0.0, |s| s.fraction),
                "snapshot"
            );
            self.snapshots.push(Snapshot {
                iteration: self.iteration,
                grid: self.current.clone(),
            });
            self.next_snapshot += 1;
        }
    }

    /// Apply one step. Returns the new cover sample, or `None` once all
    /// `num_iterations` steps have run.
    pub fn advance(&mut self) -> Option<CoverSample> {
        if self.is_finished() {
            return None;
        }
        step_into(&self.current, self.prob_map, &self.rule, &mut self.rng, &mut self.scratch);
        std::mem::swap(&mut self.current, &mut self.scratch);
        self.iteration += 1;

        let sample = CoverSample::of(self.iteration, &self.current);
        self.cover_series.push(sample);
        self.capture_if_scheduled();
        Some(sample)
    }

    pub fn is_finished(&self) -> bool {
        self.iteration >= self.num_iterations
    }

    /// Last completed iteration.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.current
    }

    pub fn cover_series(&self) -> &[CoverSample] {
        &self.cover_series
    }

    pub fn schedule(&self) -> &[u32] {
        &self.schedule
    }

    /// Consume the simulation, returning everything recorded so far.
    pub fn finish(self) -> RunOutput {
        RunOutput {
            cover_series: self.cover_series,
            snapshots: self.snapshots,
            final_grid: self.current,
        }
    }
}

/// Run `num_iterations` steps from `initial` to completion.
pub fn run<R: Rng>(
    num_iterations: u32,
    initial: OccupancyGrid,
    prob_map: &Field,
    rule: UpdateRule,
    snapshot_count: usize,
    rng: R,
) -> RunOutput {
    let mut sim = Simulation::new(initial, prob_map, rule, num_iterations, snapshot_count, rng);
    while sim.advance().is_some() {}
    sim.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellState;
    use crate::kernel::Kernel;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rule(kernel: Kernel, death_prob: f64) -> UpdateRule {
        UpdateRule { kernel, neighbor_threshold: 1, death_prob }
    }

    fn random_grid(w: usize, h: usize, n: usize, seed: u64) -> OccupancyGrid {
        OccupancyGrid::random(w, h, n, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn schedule_endpoints_and_spacing() {
        assert_eq!(snapshot_schedule(100, 5), vec![0, 25, 50, 75, 100]);
        assert_eq!(snapshot_schedule(10, 2), vec![0, 10]);
        assert_eq!(snapshot_schedule(7, 4), vec![0, 2, 5, 7]);
    }

    #[test]
    fn schedule_deduplicates_collisions() {
        let s = snapshot_schedule(3, 10);
        assert_eq!(s, vec![0, 1, 2, 3]);
        assert_eq!(snapshot_schedule(0, 5), vec![0]);
    }

    #[test]
    fn schedule_bounds_hold_for_many_inputs() {
        for n in 0..40u32 {
            for count in 2..12usize {
                let s = snapshot_schedule(n, count);
                assert_eq!(s.first(), Some(&0));
                assert_eq!(s.last(), Some(&n));
                assert!(s.len() <= count);
                assert!(s.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn frozen_scenario_keeps_cover_constant() {
        // 10×10, 10 seeds, von Neumann, no growth, no death, 5 iterations.
        let initial = random_grid(10, 10, 10, 1);
        let p = Field::zeros(10, 10);
        let out = run(5, initial.clone(), &p, rule(Kernel::VonNeumann, 0.0), 3, StdRng::seed_from_u64(1));
        assert_eq!(out.cover_series.len(), 6);
        for (t, s) in out.cover_series.iter().enumerate() {
            assert_eq!(s.iteration, t as u32);
            assert_eq!(s.occupied, 10);
            assert!((s.fraction - 0.10).abs() < 1e-12);
        }
        assert_eq!(out.final_grid, initial);
    }

    #[test]
    fn full_grid_without_death_stays_full() {
        let initial = random_grid(5, 5, 25, 2);
        let p = Field::new(5, 5, 0.7);
        let out = run(3, initial, &p, rule(Kernel::Moore, 0.0), 2, StdRng::seed_from_u64(2));
        assert!(out.cover_series.iter().all(|s| s.fraction == 1.0));
    }

    #[test]
    fn certain_death_clears_in_one_step() {
        let initial = random_grid(8, 8, 20, 3);
        let p = Field::zeros(8, 8);
        let out = run(4, initial, &p, rule(Kernel::Moore, 1.0), 2, StdRng::seed_from_u64(3));
        assert!(out.cover_series[0].fraction > 0.0);
        assert_eq!(out.cover_series[1].fraction, 0.0);
        assert_eq!(out.final_grid.occupied_count(), 0);
    }

    #[test]
    fn zero_iterations() {
        let initial = random_grid(6, 4, 5, 4);
        let p = Field::new(6, 4, 0.5);
        let out = run(0, initial.clone(), &p, rule(Kernel::Moore, 0.5), 5, StdRng::seed_from_u64(4));
        assert_eq!(out.cover_series.len(), 1);
        assert_eq!(out.snapshots.len(), 1);
        assert_eq!(out.snapshots[0].iteration, 0);
        assert_eq!(out.final_grid, initial);
    }

    #[test]
    fn snapshots_follow_schedule() {
        let initial = random_grid(12, 12, 15, 5);
        let p = Field::new(12, 12, 0.3);
        let out = run(20, initial.clone(), &p, rule(Kernel::Moore, 0.1), 5, StdRng::seed_from_u64(5));
        let iters: Vec<u32> = out.snapshots.iter().map(|s| s.iteration).collect();
        assert_eq!(iters, snapshot_schedule(20, 5));
        assert_eq!(out.snapshots[0].grid, initial);
        assert_eq!(out.snapshots.last().unwrap().grid, out.final_grid);
        for snap in &out.snapshots {
            assert_eq!(
                snap.grid.occupied_count(),
                out.cover_series[snap.iteration as usize].occupied
            );
        }
    }

    #[test]
    fn cover_stays_in_unit_interval() {
        let initial = random_grid(16, 16, 40, 6);
        let p = Field::new(16, 16, 0.6);
        let out = run(50, initial, &p, rule(Kernel::Moore, 0.3), 4, StdRng::seed_from_u64(6));
        assert_eq!(out.cover_series.len(), 51);
        for s in &out.cover_series {
            assert!((0.0..=1.0).contains(&s.fraction));
            assert!(s.occupied <= 256);
        }
    }

    #[test]
    fn seeded_runs_are_identical() {
        let p = Field::new(14, 10, 0.45);
        let a = run(30, random_grid(14, 10, 12, 7), &p, rule(Kernel::Moore, 0.15), 6, StdRng::seed_from_u64(7));
        let b = run(30, random_grid(14, 10, 12, 7), &p, rule(Kernel::Moore, 0.15), 6, StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn early_stop_leaves_consistent_state() {
        let initial = random_grid(10, 10, 10, 8);
        let p = Field::new(10, 10, 0.5);
        let mut sim = Simulation::new(initial, &p, rule(Kernel::Moore, 0.1), 100, 3, StdRng::seed_from_u64(8));
        for _ in 0..7 {
            sim.advance();
        }
        assert_eq!(sim.iteration(), 7);
        assert!(!sim.is_finished());
        let last = *sim.cover_series().last().unwrap();
        assert_eq!(last.occupied, sim.grid().occupied_count());
        let out = sim.finish();
        assert_eq!(out.cover_series.len(), 8);
        assert_eq!(out.snapshots.len(), 1);
    }

    #[test]
    fn advance_after_finish_is_none() {
        let mut g = OccupancyGrid::new(3, 3);
        g.set(1, 1, CellState::Occupied);
        let p = Field::new(3, 3, 1.0);
        let mut sim = Simulation::new(g, &p, rule(Kernel::Moore, 0.0), 1, 2, StdRng::seed_from_u64(9));
        assert_eq!(sim.advance().map(|s| s.occupied), Some(9));
        assert!(sim.advance().is_none());
        assert_eq!(sim.iteration(), 1);
    }

    #[test]
    fn summary_statistics() {
        let series: Vec<CoverSample> = [0.1, 0.2, 0.4, 0.3, 0.5, 0.6, 0.2, 0.4]
            .iter()
            .enumerate()
            .map(|(i, &f)| CoverSample { iteration: i as u32, occupied: 0, fraction: f })
            .collect();
        let s = CoverSummary::from_series(&series);
        assert_eq!(s.initial, 0.1);
        assert_eq!(s.final_cover, 0.4);
        assert_eq!(s.min, 0.1);
        assert_eq!(s.max, 0.6);
        assert!((s.mean - 2.7 / 8.0).abs() < 1e-12);
        assert!((s.mean_tail - 0.3).abs() < 1e-12);
    }
}
