//! Field kernels: per-cell stencil updates for R, O, C, H, M and the
//! terrain Z (§4.3-§4.8). Each kernel is a bulk-synchronous phase over
//! every cell with no ordering guarantee between cells (§5), so the
//! inner loops are expressed as independent per-cell closures and
//! parallelised with `rayon` across rows.

use rayon::prelude::*;
use vireo_params::Parameters;

use super::grid::Grid;
use super::rng::smoothstep;

/// Reaction flux shared by the O, H and Z kernels (§4.4, §4.6, §4.8):
/// `F_raw = reactionRate * R * O`, capped so the reaction never drives
/// O negative in one step, then split into a biomass-building ("fix")
/// share and a waste share by local microbe density `M`.
#[inline]
fn reaction_flux(r: f32, o: f32, m: f32, dt: f32, reaction_rate: f32) -> (f32, f32) {
    let f_raw = reaction_rate * r * o;
    let f = if dt > 0.0 { f_raw.min(o / dt) } else { 0.0 };
    let g = m.clamp(0.0, 1.0);
    (g * f, (1.0 - g) * f)
}

/// Rotate `(vx, vy)` by `angle` radians (used for the slowly rotating
/// ambient fluid advection of §4.3 step 3).
#[inline]
fn rotate(vx: f32, vy: f32, angle: f32) -> (f32, f32) {
    let (s, c) = angle.sin_cos();
    (vx * c - vy * s, vx * s + vy * c)
}

impl Grid {
    /// §4.3: R = source (radial falloff) + diffusion + optional fluid/
    /// terrain advection - decay.
    pub fn step_r(&mut self, params: &Parameters) {
        let (width, height, dt) = (self.width, self.height, params.delta_time);
        let terrain_on = params.terrain_enabled > 0.5 && params.terrain_flow_strength > 0.0;
        let z_cur = if terrain_on { Some(self.z.current().to_vec()) } else { None };

        let (cur, next) = self.r.read_write();
        next.par_iter_mut().enumerate().for_each(|(i, out)| {
            let x = (i as u32) % width;
            let y = (i as u32) / width;

            let dx = x as f32 - params.r_center_x;
            let dy = y as f32 - params.r_center_y;
            let d = dx.hypot(dy);
            let n = d / params.r_decay_radius.max(1e-6);
            let falloff = 1.0 - smoothstep(0.0, 1.0, n);
            let source = params.r_max_strength * falloff.max(0.0).powf(params.r_falloff_power);

            let lap = Grid::laplacian(cur, width, height, x, y);

            let mut advection = 0.0f32;
            if params.r_advection_enabled > 0.5 {
                let angle = params.current_time as f32 * 0.5;
                let (vx, vy) = rotate(params.r_advection_vx, params.r_advection_vy, angle);
                let (dr_dx, dr_dy) = Grid::gradient(cur, width, height, x, y);
                advection += -(vx * dr_dx + vy * dr_dy) * dt;
            }
            if let Some(z) = &z_cur {
                let (dz_dx, dz_dy) = Grid::gradient(z, width, height, x, y);
                let (vx, vy) = (-params.terrain_flow_strength * dz_dx, -params.terrain_flow_strength * dz_dy);
                let (dr_dx, dr_dy) = Grid::gradient(cur, width, height, x, y);
                advection += -(vx * dr_dx + vy * dr_dy) * dt;
            }

            let decay = cur[i] * params.r_decay_rate * dt;
            let value = cur[i] + source * dt + params.r_diffusion_rate * lap * dt + advection - decay;
            *out = value.clamp(0.0, 1.0);
        });
        self.r.swap();
    }

    /// §4.4: O relaxes toward `o0`, diffuses, is optionally advected by
    /// terrain flow, and is consumed by the R·O reaction; the "fixed"
    /// share of that reaction is written into `B` in place.
    pub fn step_o(&mut self, params: &Parameters) {
        let (width, height, dt) = (self.width, self.height, params.delta_time);
        let r_cur = self.r.current().to_vec();
        let m_cur = self.m.current().to_vec();
        let terrain_on = params.terrain_enabled > 0.5 && params.terrain_flow_strength > 0.0;
        let z_cur = if terrain_on { Some(self.z.current().to_vec()) } else { None };

        let b = &mut self.b;
        let (cur, next) = self.o.read_write();

        let results: Vec<(f32, f32)> = (0..next.len())
            .into_par_iter()
            .map(|i| {
                let x = (i as u32) % width;
                let y = (i as u32) / width;

                let lap = Grid::laplacian(cur, width, height, x, y);
                let mut advection = 0.0f32;
                if let Some(z) = &z_cur {
                    let (dz_dx, dz_dy) = Grid::gradient(z, width, height, x, y);
                    let (vx, vy) = (-params.terrain_flow_strength * dz_dx, -params.terrain_flow_strength * dz_dy);
                    let (do_dx, do_dy) = Grid::gradient(cur, width, height, x, y);
                    advection += -(vx * do_dx + vy * do_dy) * dt;
                }

                let (f_fix, f_waste) = reaction_flux(r_cur[i], cur[i], m_cur[i], dt, params.reaction_rate);
                let f = f_fix + f_waste;
                let restore = params.o_relaxation_rate * (params.o0 - cur[i]) * dt;
                let diffusion = params.o_diffusion_rate * lap * dt;
                let consumption = f * dt;

                let o_next = (cur[i] + restore + diffusion + advection - consumption).clamp(0.0, 1.0);
                (o_next, f_fix)
            })
            .collect();

        for (i, (o_next, f_fix)) in results.into_iter().enumerate() {
            next[i] = o_next;
            b[i] = (b[i] + f_fix * dt - b[i] * params.b_decay_rate * dt).clamp(0.0, 10.0);
        }

        self.o.swap();
    }

    /// §4.5: `C = R * O`, a pure derived read, recomputed each step.
    pub fn step_c(&mut self) {
        let r = self.r.current();
        let o = self.o.current();
        self.c
            .par_iter_mut()
            .zip(r.par_iter())
            .zip(o.par_iter())
            .for_each(|((c, r), o)| *c = r * o);
    }

    /// §4.6 update pass: H gains the waste share of the reaction and
    /// decays linearly.
    pub fn step_heat_update(&mut self, params: &Parameters) {
        let dt = params.delta_time;
        let r_cur = self.r.current().to_vec();
        let o_cur = self.o.current().to_vec();
        let m_cur = self.m.current().to_vec();

        let (cur, next) = self.heat.read_write();
        next.par_iter_mut().enumerate().for_each(|(i, out)| {
            let (_, f_waste) = reaction_flux(r_cur[i], o_cur[i], m_cur[i], dt, params.reaction_rate);
            let value = cur[i] + f_waste * dt - cur[i] * params.h_decay_rate * dt;
            *out = value.clamp(0.0, 10.0);
        });
        self.heat.swap();
    }

    /// §4.6 diffuse pass: a separate linear-diffusion pass over H,
    /// decoupled from the nonlinear production pass for stability
    /// tuning.
    pub fn step_heat_diffuse(&mut self, params: &Parameters) {
        let (width, height, dt) = (self.width, self.height, params.delta_time);
        let (cur, next) = self.heat.read_write();
        next.par_iter_mut().enumerate().for_each(|(i, out)| {
            let x = (i as u32) % width;
            let y = (i as u32) / width;
            let lap = Grid::laplacian(cur, width, height, x, y);
            let value = cur[i] + params.h_diffusion_rate * lap * dt;
            *out = value.clamp(0.0, 10.0);
        });
        self.heat.swap();
    }

    /// §4.7: logistic growth of M against a B-fed carrying capacity,
    /// consuming B as it grows and updating the B_long slow average.
    pub fn step_m(&mut self, params: &Parameters) {
        let dt = params.delta_time;
        let b_long_cur = self.b_long.clone();
        let b = &mut self.b;
        let b_long = &mut self.b_long;

        let (cur, next) = self.m.read_write();
        for i in 0..next.len() {
            let k = (params.k_base + params.k_alpha * b_long_cur[i]).max(0.001);
            let growth = params.m_grow_rate * b[i] * (1.0 - cur[i] / k);
            let death = params.m_death_rate * cur[i];
            let d_m = (growth - death) * dt;

            let consume = (d_m.max(0.0) * params.m_yield).min(b[i]);
            b[i] = (b[i] - consume).clamp(0.0, 10.0);
            b_long[i] = (b_long[i] + params.b_long_rate * (b[i] - b_long[i]) * dt).clamp(0.0, 10.0);
            next[i] = (cur[i] + d_m).clamp(0.0, 10.0);
        }
        self.m.swap();
    }

    /// §4.8: terrain deposition/erosion/diffusion/thermal relaxation,
    /// floored at the bedrock and capped at the upper bound. A no-op
    /// copy-through when terrain is disabled.
    pub fn step_terrain(&mut self, params: &Parameters) {
        let (width, height, dt) = (self.width, self.height, params.delta_time);

        if params.terrain_enabled <= 0.5 {
            let (cur, next) = self.z.read_write();
            next.copy_from_slice(cur);
            self.z.swap();
            return;
        }

        let r_cur = self.r.current().to_vec();
        let o_cur = self.o.current().to_vec();
        let m_cur = self.m.current().to_vec();
        let b_long = self.b_long.clone();
        let z_rock = self.z_rock.clone();

        let (cur, next) = self.z.read_write();
        next.par_iter_mut().enumerate().for_each(|(i, out)| {
            let x = (i as u32) % width;
            let y = (i as u32) / width;

            let (dz_dx, dz_dy) = Grid::gradient(cur, width, height, x, y);
            let slope = dz_dx.hypot(dz_dy);
            let lap_z = Grid::laplacian(cur, width, height, x, y);
            let (dr_dx, dr_dy) = Grid::gradient(&r_cur, width, height, x, y);
            let grad_r_mag = dr_dx.hypot(dr_dy);

            let (_, f_waste) = reaction_flux(r_cur[i], o_cur[i], m_cur[i], dt, params.reaction_rate);
            let deposit = params.terrain_deposition_rate * f_waste * dt
                + params.terrain_bio_deposition_rate * b_long[i].max(0.0) * dt;

            let terrain_h0 = params.terrain_h0.max(1e-6);
            let height_boost = 1.0 + params.terrain_height_erosion_alpha * (1.0 - (-cur[i].max(0.0) / terrain_h0).exp());
            let sediment = (cur[i] - z_rock[i]).max(0.0);
            let sediment_factor = (sediment / terrain_h0).clamp(0.0, 1.0);
            let erosion = params.terrain_erosion_rate * grad_r_mag * height_boost * sediment_factor * dt;

            let smoothing = params.terrain_diffusion_rate * lap_z * dt;

            let thermal = if params.terrain_thermal_erosion_enabled > 0.5 {
                params.terrain_thermal_rate * (slope - params.terrain_talus_slope).max(0.0) * lap_z * dt
            } else {
                0.0
            };

            let value = cur[i] + deposit - erosion + smoothing + thermal;
            *out = value.max(z_rock[i]).min(1000.0);
        });
        self.z.swap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_params::Parameters;

    fn flat_params() -> Parameters {
        let mut p = Parameters::default();
        p.w = 16;
        p.h = 16;
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
        p
    }

    #[test]
    fn o_is_unchanged_with_all_coupling_rates_zero() {
        let params = flat_params();
        let mut grid = Grid::new(16, 16);
        grid.initialize(0.5, 0.0, 1);
        grid.step_r(&params);
        grid.step_o(&params);
        assert!(grid.o.current().iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn zero_dt_leaves_fields_unchanged() {
        let mut params = Parameters::default();
        params.delta_time = 0.0;
        let mut grid = Grid::new(12, 12);
        grid.initialize(0.5, 0.1, 7);
        let before_o = grid.o.current().to_vec();
        let before_r = grid.r.current().to_vec();
        grid.step_r(&params);
        grid.step_o(&params);
        grid.step_heat_update(&params);
        grid.step_heat_diffuse(&params);
        grid.step_m(&params);
        grid.step_terrain(&params);
        assert_eq!(grid.r.current(), before_r.as_slice());
        assert_eq!(grid.o.current(), before_o.as_slice());
    }

    #[test]
    fn r_point_source_peaks_at_center() {
        let mut params = Parameters::default();
        params.w = 64;
        params.h = 64;
        params.r_center_x = 32.0;
        params.r_center_y = 32.0;
        params.r_max_strength = 1.0;
        params.r_decay_radius = 10.0;
        params.r_falloff_power = 1.0;
        params.r_diffusion_rate = 0.0;
        params.r_decay_rate = 0.0;
        params.delta_time = 1.0;
        let mut grid = Grid::new(64, 64);
        grid.initialize(0.5, 0.0, 1);
        grid.step_r(&params);
        let center = grid.r.current()[grid.index(32, 32)];
        assert!((center - 1.0).abs() < 1e-6, "center was {center}");
        let far = grid.r.current()[grid.index(42, 32)];
        assert!(far < 0.1, "far was {far}");
    }

    #[test]
    fn terrain_never_drops_below_bedrock() {
        let mut params = Parameters::default();
        params.terrain_enabled = 1.0;
        params.terrain_erosion_rate = 10.0;
        params.terrain_deposition_rate = 0.0;
        params.delta_time = 1.0;
        let mut grid = Grid::new(8, 8);
        grid.initialize(0.5, 0.0, 1);
        for v in grid.z_rock.iter_mut() {
            *v = 0.2;
        }
        grid.r.reset(1.0);
        for _ in 0..50 {
            grid.step_terrain(&params);
        }
        assert!(grid.z.current().iter().zip(&grid.z_rock).all(|(z, zr)| *z >= *zr - 1e-6));
    }
}
