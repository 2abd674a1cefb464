//! Black-box scenario tests exercising `Sim` end to end (no access to
//! kernel internals), covering the inert-field, relaxation, reaction
//! mass-split, predator-prey collapse and determinism behaviours.

use vireo_core::Sim;
use vireo_params::Parameters;

fn base_params(w: u32, h: u32) -> Parameters {
    let mut p = Parameters::default();
    p.w = w;
    p.h = h;
    p.p_count = 0;
    p.p2_count = 0;
    p
}

#[test]
fn inert_field_holds_its_baseline_for_a_hundred_steps() {
    let mut p = base_params(64, 64);
    p.o0 = 0.5;
    p.h0 = 0.0;
    p.r_max_strength = 0.0;
    p.reaction_rate = 0.0;
    p.o_relaxation_rate = 0.0;
    p.r_diffusion_rate = 0.0;
    p.o_diffusion_rate = 0.0;
    p.h_diffusion_rate = 0.0;
    p.r_decay_rate = 0.0;
    p.h_decay_rate = 0.0;
    p.m_grow_rate = 0.0;
    p.m_death_rate = 0.0;
    p.b_decay_rate = 0.0;
    p.terrain_enabled = 0.0;
    p.delta_time = 0.1;

    let mut sim = Sim::new(p, 1).unwrap();
    for _ in 0..100 {
        sim.step();
    }

    assert!(sim.grid.o.current().iter().all(|&v| (v - 0.5).abs() < 1e-9));
    assert!(sim.grid.r.current().iter().all(|&v| v == 0.0));
    assert!(sim.grid.heat.current().iter().all(|&v| v == 0.0));
    assert!(sim.grid.b.iter().all(|&v| v == 0.0));
    assert!(sim.grid.dp.iter().all(|&v| v == 0));
    assert!(sim.grid.dp2.iter().all(|&v| v == 0));
}

#[test]
fn pure_relaxation_climbs_toward_o0_and_never_overshoots() {
    let mut p = base_params(16, 16);
    p.o0 = 1.0;
    p.o_relaxation_rate = 1.0;
    p.restore_rate = 0.5;
    p.reaction_rate = 0.0;
    p.r_diffusion_rate = 0.0;
    p.o_diffusion_rate = 0.0;
    p.r_max_strength = 0.0;
    p.terrain_enabled = 0.0;
    p.delta_time = 0.01;

    let mut sim = Sim::new(p, 1).unwrap();
    sim.grid.o.reset(0.0);
    for _ in 0..1000 {
        sim.step();
        assert!(sim.grid.o.current().iter().all(|&v| v <= 1.0 + 1e-6));
    }
    assert!(sim.grid.o.current().iter().all(|&v| (v - 1.0).abs() < 1e-3));
}

#[test]
fn reaction_splits_mass_between_biomass_feed_and_heat() {
    let mut p = base_params(1, 1);
    p.reaction_rate = 1.0;
    p.delta_time = 0.001;
    p.o_relaxation_rate = 0.0;
    p.o_diffusion_rate = 0.0;
    p.r_diffusion_rate = 0.0;
    p.r_decay_rate = 0.0;
    p.h_decay_rate = 0.0;
    p.h_diffusion_rate = 0.0;
    p.b_decay_rate = 0.0;
    p.terrain_enabled = 0.0;

    let mut sim = Sim::new(p, 1).unwrap();
    sim.grid.r.reset(1.0);
    sim.grid.o.reset(1.0);
    sim.grid.m.reset(0.25);

    let b_before = sim.grid.b[0];
    let h_before = sim.grid.heat.current()[0];
    let o_before = sim.grid.o.current()[0];

    let params = sim.params.clone();
    sim.grid.step_r(&params);
    sim.grid.step_o(&params);
    sim.grid.step_heat_update(&params);

    let b_expected_delta = 0.25 * 1.0 * 0.001;
    let h_expected_delta = 0.75 * 1.0 * 0.001;
    assert!((sim.grid.b[0] - b_before - b_expected_delta).abs() < 1e-6);
    assert!((sim.grid.heat.current()[0] - h_before - h_expected_delta).abs() < 1e-6);
    assert!((o_before - sim.grid.o.current()[0] - 0.001).abs() < 1e-6);
}

#[test]
fn starving_prey_population_collapses_to_zero() {
    let mut p = base_params(64, 64);
    p.p_count = 1024;
    p.max_particles = 1024;
    p.p2_count = 0;
    p.p_reproduce_enabled = 0.0;
    p.p_eat_enabled = 0.0;
    p.p_energy_decay_rate = 1.0;
    p.p_min_energy = 0.1;
    p.delta_time = 0.1;
    p.r_max_strength = 0.0;

    let mut sim = Sim::new(p, 1).unwrap();
    for _ in 0..20 {
        sim.step();
    }

    assert_eq!(sim.prey.active_count(), 0);
    assert!(sim.grid.dp.iter().all(|&v| v == 0));
}

#[test]
fn reproduction_never_exceeds_pool_capacity() {
    let mut p = base_params(64, 64);
    p.max_particles = 64;
    p.p_count = 64;
    p.p2_count = 0;
    p.p_reproduce_enabled = 1.0;
    p.p_reproduce_threshold = 0.0;
    p.p_eat_enabled = 1.0;
    p.p_eat_amount = 10.0;
    p.p_energy_decay_rate = 0.0;
    p.p_max_energy = 100.0;
    p.delta_time = 0.1;

    let mut sim = Sim::new(p, 1).unwrap();
    let mut prev = sim.prey.active_count();
    for _ in 0..30 {
        sim.step();
        let now = sim.prey.active_count();
        assert!(now >= prev, "alive count should never shrink while eating freely");
        assert!(now <= 64);
        prev = now;
    }
}

#[test]
fn identical_seed_and_parameters_reproduce_bitwise_identical_runs() {
    let params = base_params(32, 32);
    let mut a = Sim::new(params.clone(), 99).unwrap();
    let mut b = Sim::new(params, 99).unwrap();

    for _ in 0..25 {
        a.step();
        b.step();
    }

    assert_eq!(a.grid.r.current(), b.grid.r.current());
    assert_eq!(a.grid.o.current(), b.grid.o.current());
    assert_eq!(a.grid.dp, b.grid.dp);
    assert_eq!(a.grid.dp2, b.grid.dp2);
    assert_eq!(a.prey.active_count(), b.prey.active_count());
    assert_eq!(a.predators.active_count(), b.predators.active_count());
}
