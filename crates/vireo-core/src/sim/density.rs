//! Density kernels: clear + atomic scatter-accumulate of active-agent
//! counts per cell (§4.9). Scatter is the one place multiple
//! concurrent writers can land on the same destination, so accumulation
//! goes through `AtomicU32` even though this implementation runs the
//! scatter on the CPU rather than as a GPU compute dispatch.

use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use super::agent::Agent;
use super::grid::Grid;

impl Grid {
    pub fn clear_dp(&mut self) {
        self.dp.fill(0);
    }

    pub fn clear_dp2(&mut self) {
        self.dp2.fill(0);
    }

    pub fn scatter_dp(&mut self, agents: &[Agent]) {
        scatter_into(&mut self.dp, agents, self.width, self.height);
    }

    pub fn scatter_dp2(&mut self, agents: &[Agent]) {
        scatter_into(&mut self.dp2, agents, self.width, self.height);
    }
}

fn scatter_into(target: &mut [u32], agents: &[Agent], width: u32, height: u32) {
    let counters: Vec<AtomicU32> = target.iter().map(|&v| AtomicU32::new(v)).collect();
    agents
        .par_iter()
        .filter(|a| a.is_active())
        .for_each(|a| {
            let xi = (a.pos[0].floor() as i64).clamp(0, width as i64 - 1) as u32;
            let yi = (a.pos[1].floor() as i64).clamp(0, height as i64 - 1) as u32;
            let idx = (yi as usize) * (width as usize) + (xi as usize);
            counters[idx].fetch_add(1, Ordering::Relaxed);
        });
    for (slot, counter) in target.iter_mut().zip(counters) {
        *slot = counter.load(Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::agent::{Agent, SPECIES_PREY};

    #[test]
    fn scatter_counts_match_active_agents_per_cell() {
        let mut grid = Grid::new(4, 4);
        let mut agents = vec![Agent::FREE; 10];
        agents[0] = Agent { pos: [1.2, 1.9], vel: [0.0; 2], energy: 1.0, kind: SPECIES_PREY, state: 1, age: 0.0 };
        agents[1] = Agent { pos: [1.0, 1.0], vel: [0.0; 2], energy: 1.0, kind: SPECIES_PREY, state: 1, age: 0.0 };
        agents[2] = Agent { pos: [3.9, 3.9], vel: [0.0; 2], energy: 1.0, kind: SPECIES_PREY, state: 1, age: 0.0 };
        // slot 3 left inactive

        grid.clear_dp();
        grid.scatter_dp(&agents);

        let total: u32 = grid.dp.iter().sum();
        assert_eq!(total, 3);
        assert_eq!(grid.dp[grid.index(1, 1)], 2);
        assert_eq!(grid.dp[grid.index(3, 3)], 1);
    }

    #[test]
    fn scatter_clamps_out_of_grid_positions() {
        let mut grid = Grid::new(4, 4);
        let mut agents = vec![Agent::FREE; 2];
        agents[0] = Agent { pos: [-5.0, 100.0], vel: [0.0; 2], energy: 1.0, kind: SPECIES_PREY, state: 1, age: 0.0 };
        grid.clear_dp();
        grid.scatter_dp(&agents);
        assert_eq!(grid.dp.iter().sum::<u32>(), 1);
        assert_eq!(grid.dp[grid.index(0, 3)], 1);
    }
}
