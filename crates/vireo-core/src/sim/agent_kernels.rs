//! Agent update kernels: velocity, motion, energy, reproduction and
//! death for prey (§4.11) and predators (§4.10). Both species share the
//! same per-slot shape (skip free slots, self-heal NaNs, steer off a
//! density/feed gradient, integrate with wall reflection, spend/gain
//! energy, maybe reproduce into a free slot of the *input* buffer,
//! maybe die) so the shared mechanics live in this module's free
//! functions and the two public entry points just wire up which field
//! drives the gradient and which pool owns reproduction.

use std::f32::consts::TAU;

use rayon::prelude::*;
use vireo_params::Parameters;

use super::agent::{Agent, AgentPool};
use super::grid::Grid;
use super::rng::{agent_draws, agent_seed};

/// Per-species knobs the shared stepping logic needs, read out of the
/// flat `Parameters` bundle once per kernel invocation.
struct AgentParams {
    bias_strength: f32,
    friction: f32,
    noise_strength: f32,
    speed: f32,
    eat_enabled: bool,
    eat_amount: f32,
    energy_decay_rate: f32,
    min_energy: f32,
    max_energy: f32,
    reproduce_enabled: bool,
    reproduce_threshold: f32,
    reproduce_spawn_radius: f32,
}

#[inline]
fn normalize2(v: [f32; 2]) -> [f32; 2] {
    let len = (v[0] * v[0] + v[1] * v[1]).sqrt();
    if len > 1e-8 {
        [v[0] / len, v[1] / len]
    } else {
        [0.0, 0.0]
    }
}

/// Integrate position by `vel * dt`, reflecting off each wall with a
/// sign flip and a 0.7x speed loss on the reflected axis (§4.10 step
/// 10 / §8 invariant 8).
#[inline]
fn integrate_and_reflect(pos: [f32; 2], vel: [f32; 2], dt: f32, width: f32, height: f32) -> ([f32; 2], [f32; 2]) {
    let mut x = pos[0] + vel[0] * dt;
    let mut y = pos[1] + vel[1] * dt;
    let mut vx = vel[0];
    let mut vy = vel[1];
    let mut reflected = false;

    if x < 0.0 {
        x = -x;
        vx = -vx;
        reflected = true;
    } else if x > width {
        x = 2.0 * width - x;
        vx = -vx;
        reflected = true;
    }
    if y < 0.0 {
        y = -y;
        vy = -vy;
        reflected = true;
    } else if y > height {
        y = 2.0 * height - y;
        vy = -vy;
        reflected = true;
    }

    if reflected {
        vx *= 0.7;
        vy *= 0.7;
    }

    (
        [x.clamp(0.0, width), y.clamp(0.0, height)],
        [vx, vy],
    )
}

/// Gradient of a scalar field sampled at a (possibly fractional) world
/// position, using the cell the position falls in.
#[inline]
fn field_gradient_at(field: &[f32], width: u32, height: u32, x: f32, y: f32) -> (f32, f32, f32) {
    let xi = (x.floor() as i64).clamp(0, width as i64 - 1) as u32;
    let yi = (y.floor() as i64).clamp(0, height as i64 - 1) as u32;
    let (gx, gy) = Grid::gradient(field, width, height, xi, yi);
    let centre = field[(yi as usize) * (width as usize) + (xi as usize)];
    (gx, gy, centre)
}

/// Try up to 8 candidate slots starting at `hash(r0) % capacity`,
/// stepping by the fixed stride 1237 (co-prime enough in practice to
/// spread probes across the pool), returning the first slot whose
/// state is free in `search_buf` (§4.10 step 12 / §4.11: searches the
/// *input* buffer per the resolved open question in §9).
fn find_free_slot(search_buf: &[Agent], capacity: usize, r0: f32) -> Option<usize> {
    let start = ((r0 * capacity as f32) as usize).min(capacity.saturating_sub(1));
    (0..8)
        .map(|k| (start + k * 1237) % capacity)
        .find(|&slot| !search_buf[slot].is_active())
}

/// One slot's worth of the shared update: steer toward `grad` (from
/// whatever density/feed field the caller samples), integrate, spend
/// energy via `extra_drain`/gain it via `energy_gain` (species-specific
/// eating amount, computed by the caller since prey and predators credit
/// energy from different formulas — see §4.10/§4.11), maybe reproduce,
/// maybe die. `explore_turn_chance`/`explore_noise_scale` parameterise
/// the persistent-heading fallback so a hungry prey agent can turn more
/// readily and explore more widely without a second, inconsistent draw
/// after the fact.
#[allow(clippy::too_many_arguments)]
fn step_one_agent(
    parent: Agent,
    slot: u32,
    current_time: f64,
    width: u32,
    height: u32,
    dt: f32,
    params: &AgentParams,
    has_signal: bool,
    has_signal_threshold: f32,
    grad: (f32, f32),
    terrain_drift: Option<(f32, f32)>,
    extra_energy_drain: f32,
    energy_gain: f32,
    explore_turn_chance: f32,
    explore_noise_scale: f32,
    search_buf: &[Agent],
    capacity: usize,
    kind: u32,
) -> (Agent, Option<(usize, Agent)>) {
    let mut agent = parent;

    if agent.pos[0].is_nan() || agent.pos[1].is_nan() {
        agent.state = 0;
        return (agent, None);
    }

    let width_f = (width.max(1) - 1) as f32;
    let height_f = (height.max(1) - 1) as f32;
    agent.pos[0] = agent.pos[0].clamp(0.0, width_f);
    agent.pos[1] = agent.pos[1].clamp(0.0, height_f);

    let seed = agent_seed(slot, current_time);
    let (r0, r1, r2) = agent_draws(seed);

    let grad_strength = (grad.0 * grad.0 + grad.1 * grad.1).sqrt();
    let has_prey_or_food = has_signal || grad_strength > has_signal_threshold;

    let noise_angle = r2 * TAU;
    let noise = [
        params.noise_strength * noise_angle.cos(),
        params.noise_strength * noise_angle.sin(),
    ];

    let mut desired = if has_prey_or_food {
        let dir_grad = normalize2([grad.0, grad.1]);
        let noise_weight = 1.0 - (grad_strength * 0.5).clamp(0.0, 1.0);
        let combined = [
            params.bias_strength * dir_grad[0] + noise[0] * noise_weight,
            params.bias_strength * dir_grad[1] + noise[1] * noise_weight,
        ];
        let dir = normalize2(combined);
        [dir[0] * params.speed, dir[1] * params.speed]
    } else {
        if r1 < explore_turn_chance {
            agent.age += (r1 * 2.0 - 1.0) * std::f32::consts::PI;
        }
        let dir = [agent.age.cos(), agent.age.sin()];
        [
            dir[0] * params.speed + explore_noise_scale * noise[0] * params.speed,
            dir[1] * params.speed + explore_noise_scale * noise[1] * params.speed,
        ]
    };

    if let Some((dz_dx, dz_dy)) = terrain_drift {
        desired[0] -= dz_dx;
        desired[1] -= dz_dy;
    }

    let damp = (1.0 - params.friction * dt).clamp(0.0, 1.0);
    let mut vel = [
        damp * agent.vel[0] + (1.0 - damp) * desired[0],
        damp * agent.vel[1] + (1.0 - damp) * desired[1],
    ];
    let speed_cap = 2.0 * params.speed;
    let vel_mag = (vel[0] * vel[0] + vel[1] * vel[1]).sqrt();
    if vel_mag > speed_cap && vel_mag > 1e-8 {
        vel[0] *= speed_cap / vel_mag;
        vel[1] *= speed_cap / vel_mag;
    }

    let (new_pos, new_vel) = integrate_and_reflect(agent.pos, vel, dt, width_f, height_f);
    agent.pos = new_pos;
    agent.vel = new_vel;
    if new_vel != vel {
        agent.age = new_vel[1].atan2(new_vel[0]);
    }

    agent.energy -= params.energy_decay_rate * dt;
    agent.energy += energy_gain;
    agent.energy -= extra_energy_drain;

    let mut child = None;
    if params.reproduce_enabled && agent.energy >= params.reproduce_threshold && agent.state != 0 {
        if let Some(free_slot) = find_free_slot(search_buf, capacity, r0) {
            agent.energy *= 0.5;

            let spawn_angle = r1 * TAU;
            let spawn_radius = params.reproduce_spawn_radius * (0.5 + r2 * 0.5);
            let child_pos = [
                (agent.pos[0] + spawn_angle.cos() * spawn_radius).clamp(0.0, width_f),
                (agent.pos[1] + spawn_angle.sin() * spawn_radius).clamp(0.0, height_f),
            ];
            let jitter = [
                (r0 * 2.0 - 1.0) * 0.3 * params.speed,
                (r1 * 2.0 - 1.0) * 0.3 * params.speed,
            ];
            let child_vel = [agent.vel[0] * 0.5 + jitter[0], agent.vel[1] * 0.5 + jitter[1]];

            child = Some((
                free_slot,
                Agent {
                    pos: child_pos,
                    vel: child_vel,
                    energy: agent.energy,
                    kind,
                    state: 1,
                    age: spawn_angle,
                },
            ));
        }
    }

    agent.energy = agent.energy.min(params.max_energy);
    if agent.energy < params.min_energy {
        agent.state = 0;
    }

    (agent, child)
}

/// Write reproduction children into `next`, skipping a slot if a
/// different child already claimed it this step (two parents probing
/// the same free run of the input buffer); that child is dropped, not
/// retried, since the pool is at a soft capacity limit either way.
fn write_children(next: &mut [Agent], children: impl Iterator<Item = (usize, Agent)>) {
    for (slot, child) in children {
        if !next[slot].is_active() {
            next[slot] = child;
        }
    }
}

/// §4.10: predator update. Steers on the prey density gradient `Dp`,
/// reproduces into the (pre-cleared) next buffer.
pub fn step_predators(pool: &mut AgentPool, grid: &Grid, params: &Parameters) {
    let ap = AgentParams {
        bias_strength: params.p2_bias_strength,
        friction: params.p2_friction,
        noise_strength: params.p2_noise_strength,
        speed: params.p2_speed,
        eat_enabled: params.p2_eat_enabled > 0.5,
        eat_amount: params.p2_eat_amount,
        energy_decay_rate: params.p2_energy_decay_rate,
        min_energy: params.p2_min_energy,
        max_energy: params.p2_max_energy,
        reproduce_enabled: params.p2_reproduce_enabled > 0.5,
        reproduce_threshold: params.p2_reproduce_threshold,
        reproduce_spawn_radius: params.p2_reproduce_spawn_radius,
    };
    let terrain_on = params.terrain_enabled > 0.5 && params.terrain_particle_drift_strength > 0.0;
    let terrain_h0 = params.terrain_h0.max(1e-6);

    let dp: Vec<f32> = grid.dp.iter().map(|&v| v as f32).collect();
    let z_cur = if terrain_on { Some(grid.z.current()) } else { None };

    let capacity = pool.capacity();
    let (current, next) = pool.read_write();

    let updates: Vec<(usize, Agent, Option<(usize, Agent)>)> = current
        .par_iter()
        .enumerate()
        .filter(|(_, a)| a.is_active())
        .map(|(slot, &agent)| {
            let (gx, gy, centre) = field_gradient_at(&dp, grid.width, grid.height, agent.pos[0], agent.pos[1]);
            let terrain_drift = z_cur.map(|z| {
                let (dz_dx, dz_dy, _) = field_gradient_at(z, grid.width, grid.height, agent.pos[0], agent.pos[1]);
                (
                    params.terrain_particle_drift_strength * dz_dx / terrain_h0,
                    params.terrain_particle_drift_strength * dz_dy / terrain_h0,
                )
            });
            let eat_gain = if ap.eat_enabled {
                params.p2_eat_amount * params.delta_time * centre.clamp(0.0, 4.0) * params.p2_energy_from_eat
            } else {
                0.0
            };
            let (updated, child) = step_one_agent(
                agent,
                slot as u32,
                params.current_time,
                grid.width,
                grid.height,
                params.delta_time,
                &ap,
                centre > 0.0,
                0.0,
                (gx, gy),
                terrain_drift,
                0.0,
                eat_gain,
                0.03,
                0.5,
                current,
                capacity,
                agent.kind,
            );
            (slot, updated, child)
        })
        .collect();

    for &(slot, updated, _) in &updates {
        next[slot] = updated;
    }
    write_children(next, updates.into_iter().filter_map(|(_, _, child)| child));
}

/// §4.11: prey update. Steers on the feed field `B`'s gradient,
/// consumes `B` directly, and loses energy to local predator density
/// (`Dp2`).
pub fn step_prey(pool: &mut AgentPool, grid: &mut Grid, params: &Parameters) {
    let ap = AgentParams {
        bias_strength: params.p_bias_strength,
        friction: params.p_friction,
        noise_strength: params.p_noise_strength,
        speed: params.p_speed,
        eat_enabled: params.p_eat_enabled > 0.5,
        eat_amount: params.p_eat_amount,
        energy_decay_rate: params.p_energy_decay_rate,
        min_energy: params.p_min_energy,
        max_energy: params.p_max_energy,
        reproduce_enabled: params.p_reproduce_enabled > 0.5,
        reproduce_threshold: params.p_reproduce_threshold,
        reproduce_spawn_radius: params.p_reproduce_spawn_radius,
    };
    let terrain_on = params.terrain_enabled > 0.5 && params.terrain_particle_drift_strength > 0.0;
    let terrain_h0 = params.terrain_h0.max(1e-6);

    let b_before = grid.b.clone();
    let dp2: Vec<f32> = grid.dp2.iter().map(|&v| v as f32).collect();
    let z_snapshot = grid.z.current().to_vec();

    let capacity = pool.capacity();
    let (current, next) = pool.read_write();

    let updates: Vec<(usize, Agent, Option<(usize, Agent)>, f32)> = current
        .par_iter()
        .enumerate()
        .filter(|(_, a)| a.is_active())
        .map(|(slot, &agent)| {
            let (gx, gy, b_centre) = field_gradient_at(&b_before, grid.width, grid.height, agent.pos[0], agent.pos[1]);
            let (_, _, predator_centre) = field_gradient_at(&dp2, grid.width, grid.height, agent.pos[0], agent.pos[1]);
            let terrain_drift = if terrain_on {
                let (dz_dx, dz_dy, _) = field_gradient_at(&z_snapshot, grid.width, grid.height, agent.pos[0], agent.pos[1]);
                Some((
                    params.terrain_particle_drift_strength * dz_dx / terrain_h0,
                    params.terrain_particle_drift_strength * dz_dy / terrain_h0,
                ))
            } else {
                None
            };

            let grad_strength = (gx * gx + gy * gy).sqrt();
            let has_food = grad_strength > 0.002;
            // Hungrier prey (low energy) turn more readily while exploring
            // and weight the exploration noise more heavily; see DESIGN.md.
            let hunger_factor = (1.0 - agent.energy / ap.max_energy.max(1e-6)).clamp(0.0, 1.0);
            let explore_turn_chance = 0.02 + hunger_factor * 0.08;
            let explore_noise_scale = 0.5 + hunger_factor * 0.5;

            let consume = if ap.eat_enabled {
                (params.p_eat_amount * params.delta_time).min(b_centre.max(0.0))
            } else {
                0.0
            };
            let eat_gain = consume * params.p_energy_from_eat;

            let (updated, child) = step_one_agent(
                agent,
                slot as u32,
                params.current_time,
                grid.width,
                grid.height,
                params.delta_time,
                &ap,
                has_food,
                0.002,
                (gx, gy),
                terrain_drift,
                params.p2_predation_strength * params.delta_time * predator_centre.clamp(0.0, 1e6),
                eat_gain,
                explore_turn_chance,
                explore_noise_scale,
                current,
                capacity,
                agent.kind,
            );

            (slot, updated, child, consume)
        })
        .collect();

    for &(slot, updated, _, consume) in &updates {
        next[slot] = updated;
        let idx = {
            let x = current[slot].pos[0].clamp(0.0, (grid.width - 1) as f32).floor() as u32;
            let y = current[slot].pos[1].clamp(0.0, (grid.height - 1) as f32).floor() as u32;
            grid.index(x, y)
        };
        grid.b[idx] = (grid.b[idx] - consume).max(0.0);
    }
    write_children(next, updates.into_iter().filter_map(|(_, _, child, _)| child));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::agent::SPECIES_PREDATOR;
    use vireo_params::Parameters;

    #[test]
    fn reflection_matches_the_specified_scenario() {
        let (pos, vel) = integrate_and_reflect([0.0, 32.0], [-1.0, 0.0], 1.0, 63.0, 63.0);
        assert!((pos[0] - 1.0).abs() < 1e-6, "pos.x was {}", pos[0]);
        assert!((pos[1] - 32.0).abs() < 1e-6);
        assert!((vel[0] - 0.7).abs() < 1e-6, "vel.x was {}", vel[0]);
    }

    #[test]
    fn nan_position_self_heals_to_inactive() {
        let mut pool = AgentPool::new(4);
        pool.seed(4, SPECIES_PREDATOR, 16, 16, 1);
        {
            let (_, next) = pool.read_write();
            next[0].pos = [f32::NAN, 3.0];
        }
        pool.swap();

        let grid = Grid::new(16, 16);
        let params = Parameters::default();
        step_predators(&mut pool, &grid, &params);
        assert!(!pool.next()[0].is_active());
    }
}
