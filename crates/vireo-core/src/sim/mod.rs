//! The simulation engine: owns the grid and both agent pools, and runs
//! the fixed 14-phase sub-step schedule (§4.12, §5) that ties the field
//! kernels, density scatter and agent kernels together.

mod agent;
mod agent_kernels;
mod density;
mod grid;
mod harness;
mod kernels;
mod rng;
mod stats;

pub use agent::{Agent, AgentPool, SPECIES_PREDATOR, SPECIES_PREY};
pub use grid::{Grid, PingPong};
pub use harness::{run_batch, BatchOutcome, BatchReport, YIELD_BUDGET, YIELD_CHUNK_STEPS};
pub use stats::{compute_field_stats, FieldStats};

use anyhow::{bail, Result};
use vireo_params::{ParamSetOutcome, Parameters};

/// The simulation: one grid, two agent pools, one parameter bundle.
/// Construction is the only place that can fail (§7) — a degenerate
/// grid or pool capacity is rejected outright; everything past that
/// point self-heals per-cell or per-agent rather than erroring.
pub struct Sim {
    pub params: Parameters,
    pub grid: Grid,
    pub prey: AgentPool,
    pub predators: AgentPool,
}

impl Sim {
    pub fn new(params: Parameters, seed: u64) -> Result<Self> {
        if params.w == 0 || params.h == 0 {
            bail!("grid dimensions must be positive (w={}, h={})", params.w, params.h);
        }
        if params.max_particles == 0 || params.max_predators == 0 {
            bail!(
                "agent pool capacities must be positive (maxParticles={}, maxPredators={})",
                params.max_particles,
                params.max_predators
            );
        }

        let mut sim = Self {
            grid: Grid::new(params.w, params.h),
            prey: AgentPool::new(params.max_particles as usize),
            predators: AgentPool::new(params.max_predators as usize),
            params,
        };
        sim.reset(seed);
        Ok(sim)
    }

    /// Reinitialise fields to their baseline (§4.2) and reseed both
    /// agent pools at `params.p_count` / `params.p2_count`. Grid size
    /// and pool capacities are unaffected — only `Sim::new` can change
    /// those, since they're `Fixed` parameters.
    pub fn reset(&mut self, seed: u64) {
        self.grid.initialize(self.params.o0, self.params.h0, seed);
        self.prey
            .seed(self.params.p_count, SPECIES_PREY, self.params.w, self.params.h, seed ^ 0x5EED_0001);
        self.predators
            .seed(self.params.p2_count, SPECIES_PREDATOR, self.params.w, self.params.h, seed ^ 0x5EED_0002);
    }

    /// Advance one sub-step, in the exact order §4.12 specifies. Later
    /// phases in this list observe the freshly swapped output of
    /// earlier phases, not a snapshot of last step's values — this
    /// ordering is load-bearing, not an implementation detail.
    pub fn step(&mut self) {
        self.grid.step_r(&self.params);
        self.grid.step_o(&self.params);
        self.grid.step_c();
        self.grid.step_heat_update(&self.params);
        self.grid.step_heat_diffuse(&self.params);
        self.grid.step_m(&self.params);

        self.grid.clear_dp();
        self.grid.scatter_dp(self.prey.current());

        self.predators.clear_next();
        agent_kernels::step_predators(&mut self.predators, &self.grid, &self.params);
        self.predators.swap();

        self.grid.clear_dp2();
        self.grid.scatter_dp2(self.predators.current());

        agent_kernels::step_prey(&mut self.prey, &mut self.grid, &self.params);
        self.prey.swap();

        self.grid.step_terrain(&self.params);

        self.params.current_time += self.params.delta_time as f64;
    }

    /// Advance `sub_steps` sub-steps, applying `params.speed_multiplier`
    /// sub-steps per call is the caller's responsibility (§4.1) — this
    /// just runs the count it's given.
    pub fn run(&mut self, sub_steps: u32) {
        for _ in 0..sub_steps {
            self.step();
        }
    }

    /// Apply one named parameter change (§6), reinitialising whatever
    /// derived state that parameter backs when it actually takes
    /// (§4.2): `o0`/`h0` reseed their field's baseline, `pCount`/
    /// `p2Count` reseed the corresponding agent pool.
    pub fn set_param(&mut self, name: &str, value: f64) -> ParamSetOutcome {
        let outcome = self.params.set_param(name, value);
        if outcome == ParamSetOutcome::Applied {
            match name {
                "o0" => self.grid.o.reset(self.params.o0),
                "h0" => self.grid.heat.reset(self.params.h0),
                "pCount" => self.prey.seed(self.params.p_count, SPECIES_PREY, self.params.w, self.params.h, 0x5EED_0001),
                "p2Count" => self
                    .predators
                    .seed(self.params.p2_count, SPECIES_PREDATOR, self.params.w, self.params.h, 0x5EED_0002),
                _ => {}
            }
        }
        outcome
    }

    pub fn stats(&self) -> FieldStats {
        compute_field_stats(&self.grid, &self.prey, &self.predators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_degenerate_grid() {
        let mut params = Parameters::default();
        params.w = 0;
        assert!(Sim::new(params, 1).is_err());
    }

    #[test]
    fn new_rejects_zero_capacity_pools() {
        let mut params = Parameters::default();
        params.max_particles = 0;
        assert!(Sim::new(params, 1).is_err());
    }

    #[test]
    fn step_advances_the_clock_by_delta_time() {
        let mut params = Parameters::default();
        params.w = 16;
        params.h = 16;
        params.delta_time = 0.25;
        let mut sim = Sim::new(params, 1).unwrap();
        sim.step();
        assert!((sim.params.current_time - 0.25).abs() < 1e-6);
    }

    #[test]
    fn inert_field_stays_at_baseline_with_everything_zeroed() {
        let mut params = Parameters::default();
        params.w = 16;
        params.h = 16;
        params.r_max_strength = 0.0;
        params.reaction_rate = 0.0;
        params.o_relaxation_rate = 0.0;
        params.r_diffusion_rate = 0.0;
        params.o_diffusion_rate = 0.0;
        params.h_diffusion_rate = 0.0;
        params.m_grow_rate = 0.0;
        params.m_death_rate = 0.0;
        params.p_count = 0;
        params.p2_count = 0;
        let mut sim = Sim::new(params, 1).unwrap();
        let o_before = sim.grid.o.current().to_vec();
        for _ in 0..10 {
            sim.step();
        }
        assert_eq!(sim.grid.o.current(), o_before.as_slice());
        let stats = sim.stats();
        assert_eq!(stats.p_alive, 0);
        assert_eq!(stats.p2_alive, 0);
    }

    #[test]
    fn set_param_pcount_reseeds_the_prey_pool() {
        let mut params = Parameters::default();
        params.w = 16;
        params.h = 16;
        let mut sim = Sim::new(params, 1).unwrap();
        sim.set_param("pCount", 5.0);
        assert_eq!(sim.prey.active_count(), 5);
    }

    #[test]
    fn set_param_unknown_name_is_ignored() {
        let mut params = Parameters::default();
        params.w = 16;
        params.h = 16;
        let mut sim = Sim::new(params, 1).unwrap();
        assert_eq!(sim.set_param("totallyNotAParam", 1.0), ParamSetOutcome::UnknownIgnored);
    }
}
