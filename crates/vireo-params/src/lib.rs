//! Shared parameter bundle for the Vireo ecosystem kernel.
//!
//! `Parameters` is the immutable-per-step bundle every kernel in
//! `vireo-core` reads. Every field has a declared `[min, max]` range;
//! `set_param` clamps into that range rather than rejecting out-of-range
//! input, and unknown parameter names are logged and ignored rather than
//! treated as an error (an unrecognised name is not a failure, see
//! `ParamSetOutcome`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a single `Parameters::set_param` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSetOutcome {
    /// The value was clamped into range and stored.
    Applied,
    /// The name isn't a known parameter; the bundle is unchanged.
    UnknownIgnored,
    /// The name is a fixed, construction-time quantity (grid size,
    /// pool capacity); changing it at runtime isn't supported.
    Fixed,
}

/// The full tunable parameter bundle (§4.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    // Grid (fixed for the lifetime of a `Sim`; see `Fixed` in `set_param`).
    pub w: u32,
    pub h: u32,

    // R source: radial injection + diffusion + advection + decay.
    pub r_center_x: f32,
    pub r_center_y: f32,
    pub r_max_strength: f32,
    pub r_decay_radius: f32,
    pub r_falloff_power: f32,
    pub r_diffusion_rate: f32,
    pub r_decay_rate: f32,
    pub r_advection_enabled: f32,
    pub r_advection_vx: f32,
    pub r_advection_vy: f32,

    // O: relaxation toward background + diffusion + reaction consumption.
    pub o0: f32,
    pub o_relaxation_rate: f32,
    pub o_diffusion_rate: f32,
    pub restore_rate: f32,

    // Reaction.
    pub reaction_rate: f32,

    // H: waste/heat trace.
    pub h0: f32,
    pub h_decay_rate: f32,
    pub h_diffusion_rate: f32,

    // M/B: logistic microbe growth on the immediate feed pool.
    pub m_grow_rate: f32,
    pub m_death_rate: f32,
    pub b_decay_rate: f32,
    pub k_base: f32,
    pub k_alpha: f32,
    pub b_long_rate: f32,
    pub m_yield: f32,

    // Simulation clock.
    pub delta_time: f32,
    pub current_time: f64,
    pub speed_multiplier: u32,

    // Terrain geomorphology.
    pub terrain_enabled: f32,
    pub terrain_h0: f32,
    pub terrain_deposition_rate: f32,
    pub terrain_bio_deposition_rate: f32,
    pub terrain_erosion_rate: f32,
    pub terrain_height_erosion_alpha: f32,
    pub terrain_diffusion_rate: f32,
    pub terrain_thermal_erosion_enabled: f32,
    pub terrain_talus_slope: f32,
    pub terrain_thermal_rate: f32,
    pub terrain_flow_strength: f32,
    pub terrain_particle_drift_strength: f32,

    // Prey (P) pool.
    pub max_particles: u32,
    pub p_count: u32,
    pub p_bias_strength: f32,
    pub p_friction: f32,
    pub p_noise_strength: f32,
    pub p_speed: f32,
    pub p_eat_enabled: f32,
    pub p_eat_amount: f32,
    pub p_energy_decay_rate: f32,
    pub p_energy_from_eat: f32,
    pub p_min_energy: f32,
    pub p_max_energy: f32,
    pub p_reproduce_enabled: f32,
    pub p_reproduce_threshold: f32,
    pub p_reproduce_spawn_radius: f32,

    // Predator (P2) pool.
    pub max_predators: u32,
    pub p2_count: u32,
    pub p2_bias_strength: f32,
    pub p2_friction: f32,
    pub p2_noise_strength: f32,
    pub p2_speed: f32,
    pub p2_eat_enabled: f32,
    pub p2_eat_amount: f32,
    pub p2_energy_decay_rate: f32,
    pub p2_energy_from_eat: f32,
    pub p2_min_energy: f32,
    pub p2_max_energy: f32,
    pub p2_reproduce_enabled: f32,
    pub p2_reproduce_threshold: f32,
    pub p2_reproduce_spawn_radius: f32,
    pub p2_predation_strength: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            w: 128,
            h: 128,

            r_center_x: 64.0,
            r_center_y: 64.0,
            r_max_strength: 1.0,
            r_decay_radius: 20.0,
            r_falloff_power: 2.0,
            r_diffusion_rate: 0.2,
            r_decay_rate: 0.05,
            r_advection_enabled: 0.0,
            r_advection_vx: 0.0,
            r_advection_vy: 0.0,

            o0: 0.5,
            o_relaxation_rate: 0.1,
            o_diffusion_rate: 0.1,
            restore_rate: 0.1,

            reaction_rate: 1.0,

            h0: 0.0,
            h_decay_rate: 0.1,
            h_diffusion_rate: 0.1,

            m_grow_rate: 0.5,
            m_death_rate: 0.1,
            b_decay_rate: 0.05,
            k_base: 1.0,
            k_alpha: 0.5,
            b_long_rate: 0.01,
            m_yield: 0.5,

            delta_time: 0.1,
            current_time: 0.0,
            speed_multiplier: 1,

            terrain_enabled: 0.0,
            terrain_h0: 1.0,
            terrain_deposition_rate: 0.1,
            terrain_bio_deposition_rate: 0.05,
            terrain_erosion_rate: 0.05,
            terrain_height_erosion_alpha: 1.0,
            terrain_diffusion_rate: 0.05,
            terrain_thermal_erosion_enabled: 0.0,
            terrain_talus_slope: 0.3,
            terrain_thermal_rate: 0.1,
            terrain_flow_strength: 0.0,
            terrain_particle_drift_strength: 0.0,

            max_particles: 4096,
            p_count: 256,
            p_bias_strength: 1.0,
            p_friction: 1.0,
            p_noise_strength: 0.3,
            p_speed: 1.0,
            p_eat_enabled: 1.0,
            p_eat_amount: 0.1,
            p_energy_decay_rate: 0.02,
            p_energy_from_eat: 1.0,
            p_min_energy: 0.0,
            p_max_energy: 2.0,
            p_reproduce_enabled: 1.0,
            p_reproduce_threshold: 1.5,
            p_reproduce_spawn_radius: 2.0,

            max_predators: 1024,
            p2_count: 32,
            p2_bias_strength: 1.0,
            p2_friction: 1.0,
            p2_noise_strength: 0.3,
            p2_speed: 0.8,
            p2_eat_enabled: 1.0,
            p2_eat_amount: 0.1,
            p2_energy_decay_rate: 0.015,
            p2_energy_from_eat: 1.0,
            p2_min_energy: 0.0,
            p2_max_energy: 2.0,
            p2_reproduce_enabled: 1.0,
            p2_reproduce_threshold: 1.5,
            p2_reproduce_spawn_radius: 2.0,
            p2_predation_strength: 0.1,
        }
    }
}

impl Parameters {
    /// Names treated as fixed at construction time: resizing the grid or
    /// a pool's capacity at runtime isn't supported (see DESIGN.md).
    const FIXED_NAMES: &'static [&'static str] =
        &["w", "h", "maxParticles", "maxPredators"];

    /// Clamp `value` into `name`'s declared range and store it.
    ///
    /// Unknown names are logged and ignored (§7 `UnknownParam`); this is
    /// permissive by design, not a failure.
    pub fn set_param(&mut self, name: &str, value: f64) -> ParamSetOutcome {
        if Self::FIXED_NAMES.contains(&name) {
            log::debug!("set_param: '{name}' is fixed at construction time, ignoring");
            return ParamSetOutcome::Fixed;
        }
        macro_rules! set {
            ($field:ident, $min:expr, $max:expr) => {{
                self.$field = value.clamp($min as f64, $max as f64) as _;
                return ParamSetOutcome::Applied;
            }};
        }
        match name {
            "rCenterX" => set!(r_center_x, -100_000.0, 100_000.0),
            "rCenterY" => set!(r_center_y, -100_000.0, 100_000.0),
            "rMaxStrength" => set!(r_max_strength, 0.0, 10.0),
            "rDecayRadius" => set!(r_decay_radius, 1e-3, 100_000.0),
            "rFalloffPower" => set!(r_falloff_power, 0.1, 10.0),
            "rDiffusionRate" => set!(r_diffusion_rate, 0.0, 10.0),
            "rDecayRate" => set!(r_decay_rate, 0.0, 10.0),
            "rAdvectionEnabled" => set!(r_advection_enabled, 0.0, 1.0),
            "rAdvectionVX" => set!(r_advection_vx, -10.0, 10.0),
            "rAdvectionVY" => set!(r_advection_vy, -10.0, 10.0),

            "o0" => set!(o0, 0.0, 1.0),
            "oRelaxationRate" => set!(o_relaxation_rate, 0.0, 10.0),
            "oDiffusionRate" => set!(o_diffusion_rate, 0.0, 10.0),
            "restoreRate" => set!(restore_rate, 0.0, 10.0),

            "reactionRate" => set!(reaction_rate, 0.0, 100.0),

            "h0" => set!(h0, 0.0, 10.0),
            "hDecayRate" => set!(h_decay_rate, 0.0, 10.0),
            "hDiffusionRate" => set!(h_diffusion_rate, 0.0, 10.0),

            "mGrowRate" => set!(m_grow_rate, 0.0, 10.0),
            "mDeathRate" => set!(m_death_rate, 0.0, 10.0),
            "bDecayRate" => set!(b_decay_rate, 0.0, 10.0),
            "kBase" => set!(k_base, 0.0, 10.0),
            "kAlpha" => set!(k_alpha, 0.0, 10.0),
            "bLongRate" => set!(b_long_rate, 0.0, 10.0),
            "mYield" => set!(m_yield, 0.0, 10.0),

            "deltaTime" => set!(delta_time, 0.0, 1.0),
            "currentTime" => set!(current_time, 0.0, 1e12),
            "speedMultiplier" => set!(speed_multiplier, 1.0, 256.0),

            "terrainEnabled" => set!(terrain_enabled, 0.0, 1.0),
            "terrainH0" => set!(terrain_h0, 1e-6, 1000.0),
            "terrainDepositionRate" => set!(terrain_deposition_rate, 0.0, 10.0),
            "terrainBioDepositionRate" => set!(terrain_bio_deposition_rate, 0.0, 10.0),
            "terrainErosionRate" => set!(terrain_erosion_rate, 0.0, 10.0),
            "terrainHeightErosionAlpha" => set!(terrain_height_erosion_alpha, 0.0, 10.0),
            "terrainDiffusionRate" => set!(terrain_diffusion_rate, 0.0, 10.0),
            "terrainThermalErosionEnabled" => set!(terrain_thermal_erosion_enabled, 0.0, 1.0),
            "terrainTalusSlope" => set!(terrain_talus_slope, 0.0, 10.0),
            "terrainThermalRate" => set!(terrain_thermal_rate, 0.0, 10.0),
            "terrainFlowStrength" => set!(terrain_flow_strength, 0.0, 10.0),
            "terrainParticleDriftStrength" => set!(terrain_particle_drift_strength, 0.0, 10.0),

            "pCount" => set!(p_count, 0.0, self.max_particles as f64),
            "pBiasStrength" => set!(p_bias_strength, 0.0, 10.0),
            "pFriction" => set!(p_friction, 0.0, 10.0),
            "pNoiseStrength" => set!(p_noise_strength, 0.0, 10.0),
            "pSpeed" => set!(p_speed, 0.0, 50.0),
            "pEatEnabled" => set!(p_eat_enabled, 0.0, 1.0),
            "pEatAmount" => set!(p_eat_amount, 0.0, 10.0),
            "pEnergyDecayRate" => set!(p_energy_decay_rate, 0.0, 10.0),
            "pEnergyFromEat" => set!(p_energy_from_eat, 0.0, 10.0),
            "pMinEnergy" => set!(p_min_energy, 0.0, 10.0),
            "pMaxEnergy" => set!(p_max_energy, 0.0, 10.0),
            "pReproduceEnabled" => set!(p_reproduce_enabled, 0.0, 1.0),
            "pReproduceThreshold" => set!(p_reproduce_threshold, 0.0, 10.0),
            "pReproduceSpawnRadius" => set!(p_reproduce_spawn_radius, 0.0, 50.0),

            "p2Count" => set!(p2_count, 0.0, self.max_predators as f64),
            "p2BiasStrength" => set!(p2_bias_strength, 0.0, 10.0),
            "p2Friction" => set!(p2_friction, 0.0, 10.0),
            "p2NoiseStrength" => set!(p2_noise_strength, 0.0, 10.0),
            "p2Speed" => set!(p2_speed, 0.0, 50.0),
            "p2EatEnabled" => set!(p2_eat_enabled, 0.0, 1.0),
            "p2EatAmount" => set!(p2_eat_amount, 0.0, 10.0),
            "p2EnergyDecayRate" => set!(p2_energy_decay_rate, 0.0, 10.0),
            "p2EnergyFromEat" => set!(p2_energy_from_eat, 0.0, 10.0),
            "p2MinEnergy" => set!(p2_min_energy, 0.0, 10.0),
            "p2MaxEnergy" => set!(p2_max_energy, 0.0, 10.0),
            "p2ReproduceEnabled" => set!(p2_reproduce_enabled, 0.0, 1.0),
            "p2ReproduceThreshold" => set!(p2_reproduce_threshold, 0.0, 10.0),
            "p2ReproduceSpawnRadius" => set!(p2_reproduce_spawn_radius, 0.0, 50.0),
            "p2PredationStrength" => set!(p2_predation_strength, 0.0, 10.0),

            _ => {
                log::warn!("set_param: unknown parameter '{name}' ignored");
                ParamSetOutcome::UnknownIgnored
            }
        }
    }

    /// Read back a parameter by name, including fixed ones. `None` for
    /// unknown names.
    pub fn get_param(&self, name: &str) -> Option<f64> {
        Some(match name {
            "w" => self.w as f64,
            "h" => self.h as f64,
            "rCenterX" => self.r_center_x as f64,
            "rCenterY" => self.r_center_y as f64,
            "rMaxStrength" => self.r_max_strength as f64,
            "rDecayRadius" => self.r_decay_radius as f64,
            "rFalloffPower" => self.r_falloff_power as f64,
            "rDiffusionRate" => self.r_diffusion_rate as f64,
            "rDecayRate" => self.r_decay_rate as f64,
            "rAdvectionEnabled" => self.r_advection_enabled as f64,
            "rAdvectionVX" => self.r_advection_vx as f64,
            "rAdvectionVY" => self.r_advection_vy as f64,
            "o0" => self.o0 as f64,
            "oRelaxationRate" => self.o_relaxation_rate as f64,
            "oDiffusionRate" => self.o_diffusion_rate as f64,
            "restoreRate" => self.restore_rate as f64,
            "reactionRate" => self.reaction_rate as f64,
            "h0" => self.h0 as f64,
            "hDecayRate" => self.h_decay_rate as f64,
            "hDiffusionRate" => self.h_diffusion_rate as f64,
            "mGrowRate" => self.m_grow_rate as f64,
            "mDeathRate" => self.m_death_rate as f64,
            "bDecayRate" => self.b_decay_rate as f64,
            "kBase" => self.k_base as f64,
            "kAlpha" => self.k_alpha as f64,
            "bLongRate" => self.b_long_rate as f64,
            "mYield" => self.m_yield as f64,
            "deltaTime" => self.delta_time as f64,
            "currentTime" => self.current_time,
            "speedMultiplier" => self.speed_multiplier as f64,
            "terrainEnabled" => self.terrain_enabled as f64,
            "terrainH0" => self.terrain_h0 as f64,
            "terrainDepositionRate" => self.terrain_deposition_rate as f64,
            "terrainBioDepositionRate" => self.terrain_bio_deposition_rate as f64,
            "terrainErosionRate" => self.terrain_erosion_rate as f64,
            "terrainHeightErosionAlpha" => self.terrain_height_erosion_alpha as f64,
            "terrainDiffusionRate" => self.terrain_diffusion_rate as f64,
            "terrainThermalErosionEnabled" => self.terrain_thermal_erosion_enabled as f64,
            "terrainTalusSlope" => self.terrain_talus_slope as f64,
            "terrainThermalRate" => self.terrain_thermal_rate as f64,
            "terrainFlowStrength" => self.terrain_flow_strength as f64,
            "terrainParticleDriftStrength" => self.terrain_particle_drift_strength as f64,
            "maxParticles" => self.max_particles as f64,
            "pCount" => self.p_count as f64,
            "pBiasStrength" => self.p_bias_strength as f64,
            "pFriction" => self.p_friction as f64,
            "pNoiseStrength" => self.p_noise_strength as f64,
            "pSpeed" => self.p_speed as f64,
            "pEatEnabled" => self.p_eat_enabled as f64,
            "pEatAmount" => self.p_eat_amount as f64,
            "pEnergyDecayRate" => self.p_energy_decay_rate as f64,
            "pEnergyFromEat" => self.p_energy_from_eat as f64,
            "pMinEnergy" => self.p_min_energy as f64,
            "pMaxEnergy" => self.p_max_energy as f64,
            "pReproduceEnabled" => self.p_reproduce_enabled as f64,
            "pReproduceThreshold" => self.p_reproduce_threshold as f64,
            "pReproduceSpawnRadius" => self.p_reproduce_spawn_radius as f64,
            "maxPredators" => self.max_predators as f64,
            "p2Count" => self.p2_count as f64,
            "p2BiasStrength" => self.p2_bias_strength as f64,
            "p2Friction" => self.p2_friction as f64,
            "p2NoiseStrength" => self.p2_noise_strength as f64,
            "p2Speed" => self.p2_speed as f64,
            "p2EatEnabled" => self.p2_eat_enabled as f64,
            "p2EatAmount" => self.p2_eat_amount as f64,
            "p2EnergyDecayRate" => self.p2_energy_decay_rate as f64,
            "p2EnergyFromEat" => self.p2_energy_from_eat as f64,
            "p2MinEnergy" => self.p2_min_energy as f64,
            "p2MaxEnergy" => self.p2_max_energy as f64,
            "p2ReproduceEnabled" => self.p2_reproduce_enabled as f64,
            "p2ReproduceThreshold" => self.p2_reproduce_threshold as f64,
            "p2ReproduceSpawnRadius" => self.p2_reproduce_spawn_radius as f64,
            "p2PredationStrength" => self.p2_predation_strength as f64,
            _ => return None,
        })
    }

    /// Serialize into the flat `{name: f64}` persistence bundle (§6).
    pub fn to_bundle(&self) -> BTreeMap<String, f64> {
        let mut bundle = BTreeMap::new();
        for name in ALL_NAMES {
            if let Some(value) = self.get_param(name) {
                bundle.insert(name.to_string(), value);
            }
        }
        bundle
    }

    /// Apply a flat `{name: f64}` bundle on top of `self`. Unknown keys
    /// are ignored; every value is clamped on import, per §6/§7.
    pub fn apply_bundle(&mut self, bundle: &BTreeMap<String, f64>) {
        for (name, value) in bundle {
            if Self::FIXED_NAMES.contains(&name.as_str()) {
                continue;
            }
            self.set_param(name, *value);
        }
    }
}

/// Every parameter name known to `get_param`/`set_param`, including the
/// fixed (construction-time) ones.
pub const ALL_NAMES: &[&str] = &[
    "w", "h",
    "rCenterX", "rCenterY", "rMaxStrength", "rDecayRadius", "rFalloffPower",
    "rDiffusionRate", "rDecayRate", "rAdvectionEnabled", "rAdvectionVX", "rAdvectionVY",
    "o0", "oRelaxationRate", "oDiffusionRate", "restoreRate",
    "reactionRate",
    "h0", "hDecayRate", "hDiffusionRate",
    "mGrowRate", "mDeathRate", "bDecayRate", "kBase", "kAlpha", "bLongRate", "mYield",
    "deltaTime", "currentTime", "speedMultiplier",
    "terrainEnabled", "terrainH0", "terrainDepositionRate", "terrainBioDepositionRate",
    "terrainErosionRate", "terrainHeightErosionAlpha", "terrainDiffusionRate",
    "terrainThermalErosionEnabled", "terrainTalusSlope", "terrainThermalRate",
    "terrainFlowStrength", "terrainParticleDriftStrength",
    "maxParticles", "pCount", "pBiasStrength", "pFriction", "pNoiseStrength", "pSpeed",
    "pEatEnabled", "pEatAmount", "pEnergyDecayRate", "pEnergyFromEat", "pMinEnergy",
    "pMaxEnergy", "pReproduceEnabled", "pReproduceThreshold", "pReproduceSpawnRadius",
    "maxPredators", "p2Count", "p2BiasStrength", "p2Friction", "p2NoiseStrength", "p2Speed",
    "p2EatEnabled", "p2EatAmount", "p2EnergyDecayRate", "p2EnergyFromEat", "p2MinEnergy",
    "p2MaxEnergy", "p2ReproduceEnabled", "p2ReproduceThreshold", "p2ReproduceSpawnRadius",
    "p2PredationStrength",
];

/// Grouped, human-editable mirror of [`Parameters`] for YAML config files.
/// `vireo-headless` loads this shape and converts it; `vireo-core` only
/// ever sees the flat [`Parameters`] bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub r_source: RSourceConfig,
    pub oxidant: OxidantConfig,
    pub reaction: ReactionConfig,
    pub heat: HeatConfig,
    pub biomass: BiomassConfig,
    pub terrain: TerrainConfig,
    pub prey: AgentConfig,
    pub predators: PredatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    pub w: u32,
    pub h: u32,
    pub steps: u32,
    pub dt: f32,
    pub speed_multiplier: u32,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RSourceConfig {
    pub center_x: f32,
    pub center_y: f32,
    pub max_strength: f32,
    pub decay_radius: f32,
    pub falloff_power: f32,
    pub diffusion_rate: f32,
    pub decay_rate: f32,
    pub advection_enabled: bool,
    pub advection_vx: f32,
    pub advection_vy: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OxidantConfig {
    pub o0: f32,
    pub relaxation_rate: f32,
    pub diffusion_rate: f32,
    pub restore_rate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionConfig {
    pub rate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatConfig {
    pub h0: f32,
    pub decay_rate: f32,
    pub diffusion_rate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiomassConfig {
    pub grow_rate: f32,
    pub death_rate: f32,
    pub b_decay_rate: f32,
    pub k_base: f32,
    pub k_alpha: f32,
    pub b_long_rate: f32,
    pub yield_: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainConfig {
    pub enabled: bool,
    pub h0: f32,
    pub deposition_rate: f32,
    pub bio_deposition_rate: f32,
    pub erosion_rate: f32,
    pub height_erosion_alpha: f32,
    pub diffusion_rate: f32,
    pub thermal_erosion_enabled: bool,
    pub talus_slope: f32,
    pub thermal_rate: f32,
    pub flow_strength: f32,
    pub particle_drift_strength: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub max_count: u32,
    pub count: u32,
    pub bias_strength: f32,
    pub friction: f32,
    pub noise_strength: f32,
    pub speed: f32,
    pub eat_enabled: bool,
    pub eat_amount: f32,
    pub energy_decay_rate: f32,
    pub energy_from_eat: f32,
    pub min_energy: f32,
    pub max_energy: f32,
    pub reproduce_enabled: bool,
    pub reproduce_threshold: f32,
    pub reproduce_spawn_radius: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredatorConfig {
    #[serde(flatten)]
    pub base: AgentConfig,
    pub predation_strength: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let p = Parameters::default();
        SimulationConfig {
            world: WorldConfig {
                w: p.w,
                h: p.h,
                steps: 2000,
                dt: p.delta_time,
                speed_multiplier: p.speed_multiplier,
                seed: 1337,
            },
            r_source: RSourceConfig {
                center_x: p.r_center_x,
                center_y: p.r_center_y,
                max_strength: p.r_max_strength,
                decay_radius: p.r_decay_radius,
                falloff_power: p.r_falloff_power,
                diffusion_rate: p.r_diffusion_rate,
                decay_rate: p.r_decay_rate,
                advection_enabled: p.r_advection_enabled > 0.5,
                advection_vx: p.r_advection_vx,
                advection_vy: p.r_advection_vy,
            },
            oxidant: OxidantConfig {
                o0: p.o0,
                relaxation_rate: p.o_relaxation_rate,
                diffusion_rate: p.o_diffusion_rate,
                restore_rate: p.restore_rate,
            },
            reaction: ReactionConfig { rate: p.reaction_rate },
            heat: HeatConfig {
                h0: p.h0,
                decay_rate: p.h_decay_rate,
                diffusion_rate: p.h_diffusion_rate,
            },
            biomass: BiomassConfig {
                grow_rate: p.m_grow_rate,
                death_rate: p.m_death_rate,
                b_decay_rate: p.b_decay_rate,
                k_base: p.k_base,
                k_alpha: p.k_alpha,
                b_long_rate: p.b_long_rate,
                yield_: p.m_yield,
            },
            terrain: TerrainConfig {
                enabled: p.terrain_enabled > 0.5,
                h0: p.terrain_h0,
                deposition_rate: p.terrain_deposition_rate,
                bio_deposition_rate: p.terrain_bio_deposition_rate,
                erosion_rate: p.terrain_erosion_rate,
                height_erosion_alpha: p.terrain_height_erosion_alpha,
                diffusion_rate: p.terrain_diffusion_rate,
                thermal_erosion_enabled: p.terrain_thermal_erosion_enabled > 0.5,
                talus_slope: p.terrain_talus_slope,
                thermal_rate: p.terrain_thermal_rate,
                flow_strength: p.terrain_flow_strength,
                particle_drift_strength: p.terrain_particle_drift_strength,
            },
            prey: AgentConfig {
                max_count: p.max_particles,
                count: p.p_count,
                bias_strength: p.p_bias_strength,
                friction: p.p_friction,
                noise_strength: p.p_noise_strength,
                speed: p.p_speed,
                eat_enabled: p.p_eat_enabled > 0.5,
                eat_amount: p.p_eat_amount,
                energy_decay_rate: p.p_energy_decay_rate,
                energy_from_eat: p.p_energy_from_eat,
                min_energy: p.p_min_energy,
                max_energy: p.p_max_energy,
                reproduce_enabled: p.p_reproduce_enabled > 0.5,
                reproduce_threshold: p.p_reproduce_threshold,
                reproduce_spawn_radius: p.p_reproduce_spawn_radius,
            },
            predators: PredatorConfig {
                base: AgentConfig {
                    max_count: p.max_predators,
                    count: p.p2_count,
                    bias_strength: p.p2_bias_strength,
                    friction: p.p2_friction,
                    noise_strength: p.p2_noise_strength,
                    speed: p.p2_speed,
                    eat_enabled: p.p2_eat_enabled > 0.5,
                    eat_amount: p.p2_eat_amount,
                    energy_decay_rate: p.p2_energy_decay_rate,
                    energy_from_eat: p.p2_energy_from_eat,
                    min_energy: p.p2_min_energy,
                    max_energy: p.p2_max_energy,
                    reproduce_enabled: p.p2_reproduce_enabled > 0.5,
                    reproduce_threshold: p.p2_reproduce_threshold,
                    reproduce_spawn_radius: p.p2_reproduce_spawn_radius,
                },
                predation_strength: p.p2_predation_strength,
            },
        }
    }
}

impl From<&SimulationConfig> for Parameters {
    fn from(c: &SimulationConfig) -> Self {
        let mut p = Parameters {
            w: c.world.w,
            h: c.world.h,
            delta_time: c.world.dt,
            speed_multiplier: c.world.speed_multiplier,
            current_time: 0.0,

            r_center_x: c.r_source.center_x,
            r_center_y: c.r_source.center_y,
            r_max_strength: c.r_source.max_strength,
            r_decay_radius: c.r_source.decay_radius,
            r_falloff_power: c.r_source.falloff_power,
            r_diffusion_rate: c.r_source.diffusion_rate,
            r_decay_rate: c.r_source.decay_rate,
            r_advection_enabled: if c.r_source.advection_enabled { 1.0 } else { 0.0 },
            r_advection_vx: c.r_source.advection_vx,
            r_advection_vy: c.r_source.advection_vy,

            o0: c.oxidant.o0,
            o_relaxation_rate: c.oxidant.relaxation_rate,
            o_diffusion_rate: c.oxidant.diffusion_rate,
            restore_rate: c.oxidant.restore_rate,

            reaction_rate: c.reaction.rate,

            h0: c.heat.h0,
            h_decay_rate: c.heat.decay_rate,
            h_diffusion_rate: c.heat.diffusion_rate,

            m_grow_rate: c.biomass.grow_rate,
            m_death_rate: c.biomass.death_rate,
            b_decay_rate: c.biomass.b_decay_rate,
            k_base: c.biomass.k_base,
            k_alpha: c.biomass.k_alpha,
            b_long_rate: c.biomass.b_long_rate,
            m_yield: c.biomass.yield_,

            terrain_enabled: if c.terrain.enabled { 1.0 } else { 0.0 },
            terrain_h0: c.terrain.h0,
            terrain_deposition_rate: c.terrain.deposition_rate,
            terrain_bio_deposition_rate: c.terrain.bio_deposition_rate,
            terrain_erosion_rate: c.terrain.erosion_rate,
            terrain_height_erosion_alpha: c.terrain.height_erosion_alpha,
            terrain_diffusion_rate: c.terrain.diffusion_rate,
            terrain_thermal_erosion_enabled: if c.terrain.thermal_erosion_enabled { 1.0 } else { 0.0 },
            terrain_talus_slope: c.terrain.talus_slope,
            terrain_thermal_rate: c.terrain.thermal_rate,
            terrain_flow_strength: c.terrain.flow_strength,
            terrain_particle_drift_strength: c.terrain.particle_drift_strength,

            max_particles: c.prey.max_count,
            p_count: c.prey.count,
            p_bias_strength: c.prey.bias_strength,
            p_friction: c.prey.friction,
            p_noise_strength: c.prey.noise_strength,
            p_speed: c.prey.speed,
            p_eat_enabled: if c.prey.eat_enabled { 1.0 } else { 0.0 },
            p_eat_amount: c.prey.eat_amount,
            p_energy_decay_rate: c.prey.energy_decay_rate,
            p_energy_from_eat: c.prey.energy_from_eat,
            p_min_energy: c.prey.min_energy,
            p_max_energy: c.prey.max_energy,
            p_reproduce_enabled: if c.prey.reproduce_enabled { 1.0 } else { 0.0 },
            p_reproduce_threshold: c.prey.reproduce_threshold,
            p_reproduce_spawn_radius: c.prey.reproduce_spawn_radius,

            max_predators: c.predators.base.max_count,
            p2_count: c.predators.base.count,
            p2_bias_strength: c.predators.base.bias_strength,
            p2_friction: c.predators.base.friction,
            p2_noise_strength: c.predators.base.noise_strength,
            p2_speed: c.predators.base.speed,
            p2_eat_enabled: if c.predators.base.eat_enabled { 1.0 } else { 0.0 },
            p2_eat_amount: c.predators.base.eat_amount,
            p2_energy_decay_rate: c.predators.base.energy_decay_rate,
            p2_energy_from_eat: c.predators.base.energy_from_eat,
            p2_min_energy: c.predators.base.min_energy,
            p2_max_energy: c.predators.base.max_energy,
            p2_reproduce_enabled: if c.predators.base.reproduce_enabled { 1.0 } else { 0.0 },
            p2_reproduce_threshold: c.predators.base.reproduce_threshold,
            p2_reproduce_spawn_radius: c.predators.base.reproduce_spawn_radius,
            p2_predation_strength: c.predators.predation_strength,

            ..Parameters::default()
        };
        // Re-clamp everything that came from a hand-edited YAML file.
        let bundle = p.to_bundle();
        p.apply_bundle(&bundle);
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_param_clamps_into_range() {
        let mut p = Parameters::default();
        p.set_param("o0", 5.0);
        assert_eq!(p.o0, 1.0);
        p.set_param("o0", -5.0);
        assert_eq!(p.o0, 0.0);
    }

    #[test]
    fn set_param_ignores_unknown_names() {
        let mut p = Parameters::default();
        let before = p.clone();
        let outcome = p.set_param("totallyUnknown", 42.0);
        assert_eq!(outcome, ParamSetOutcome::UnknownIgnored);
        assert_eq!(p, before);
    }

    #[test]
    fn fixed_names_are_rejected_without_panicking() {
        let mut p = Parameters::default();
        let outcome = p.set_param("w", 999.0);
        assert_eq!(outcome, ParamSetOutcome::Fixed);
        assert_eq!(p.w, 128);
    }

    #[test]
    fn bundle_round_trips() {
        let mut p = Parameters::default();
        p.set_param("rMaxStrength", 3.5);
        p.set_param("pCount", 10.0);
        let bundle = p.to_bundle();

        let mut q = Parameters::default();
        q.apply_bundle(&bundle);
        assert_eq!(q.r_max_strength, 3.5);
        assert_eq!(q.p_count, 10);
    }

    #[test]
    fn bundle_ignores_unknown_keys_and_clamps_on_import() {
        let mut bundle = BTreeMap::new();
        bundle.insert("reactionRate".to_string(), 1000.0);
        bundle.insert("notAParam".to_string(), 1.0);

        let mut p = Parameters::default();
        p.apply_bundle(&bundle);
        assert_eq!(p.reaction_rate, 100.0);
    }

    #[test]
    fn p_count_is_clamped_to_max_particles() {
        let mut p = Parameters::default();
        p.max_particles = 10;
        p.set_param("pCount", 1000.0);
        assert_eq!(p.p_count, 10);
    }
}
