//! Aggregate field/agent statistics (§4.13), sampled on demand rather
//! than every sub-step — callers (e.g. `vireo-headless`'s metrics
//! writer) decide how often they can afford the reduction pass.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::agent::AgentPool;
use super::grid::Grid;

/// One sampled snapshot of the whole simulation's aggregate state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub r_total: f64,
    pub o_avg: f64,
    pub h_avg: f64,
    pub m_total: f64,
    pub b_total: f64,
    pub p_alive: u32,
    pub p2_alive: u32,
    pub p_invalid: u32,
    pub p2_invalid: u32,
}

/// Reduce `R`/`O`/`H`/`M`/`B` to their §4.13 summary statistics and
/// count live/invalid agents in both pools.
pub fn compute_field_stats(grid: &Grid, prey: &AgentPool, predators: &AgentPool) -> FieldStats {
    let len = grid.len().max(1) as f64;

    let r_total: f64 = grid.r.current().par_iter().map(|&v| v as f64).sum();
    let o_avg: f64 = grid.o.current().par_iter().map(|&v| v as f64).sum::<f64>() / len;
    let h_avg: f64 = grid.heat.current().par_iter().map(|&v| v as f64).sum::<f64>() / len;
    let m_total: f64 = grid.m.current().par_iter().map(|&v| v as f64).sum();
    let b_total: f64 = grid.b.par_iter().map(|&v| v as f64).sum();

    FieldStats {
        r_total,
        o_avg,
        h_avg,
        m_total,
        b_total,
        p_alive: prey.active_count(),
        p2_alive: predators.active_count(),
        p_invalid: prey.invalid_count(grid.width, grid.height),
        p2_invalid: predators.invalid_count(grid.width, grid.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::agent::SPECIES_PREY;

    #[test]
    fn stats_reflect_seeded_pools_and_uniform_fields() {
        let mut grid = Grid::new(4, 4);
        grid.initialize(0.5, 0.1, 7);
        let mut prey = AgentPool::new(10);
        prey.seed(5, SPECIES_PREY, 4, 4, 1);
        let predators = AgentPool::new(10);

        let stats = compute_field_stats(&grid, &prey, &predators);
        assert!((stats.o_avg - 0.5).abs() < 1e-6);
        assert!((stats.h_avg - 0.1).abs() < 1e-6);
        assert_eq!(stats.p_alive, 5);
        assert_eq!(stats.p2_alive, 0);
        assert_eq!(stats.p_invalid, 0);
    }
}
