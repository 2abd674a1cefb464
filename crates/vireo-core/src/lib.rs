//! Vireo core engine
//!
//! A deterministic-per-seed, 2D stochastic reaction-transport simulator
//! modelling a hydrothermal-vent-like ecosystem: scalar fields (reducing
//! substance, oxidant, heat, microbe density, terrain) co-evolve on a
//! fixed grid alongside two mobile agent populations (prey and
//! predators) driven by local field gradients.
//!
//! This crate holds no file or network I/O; callers (e.g. `vireo-headless`)
//! own configuration loading and result persistence. The only fallible
//! path is construction/reset (`Sim::new`, `Sim::reset`), which rejects
//! degenerate grid/capacity configuration; everything else self-heals
//! per-cell / per-agent and is total.

pub mod sim;

pub use sim::*;
pub use vireo_params::*;
