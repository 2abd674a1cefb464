mod metrics;
mod snapshots;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};

use vireo_core::{run_batch, BatchOutcome, Sim};
use vireo_params::SimulationConfig;

use metrics::MetricsWriter;
use snapshots::SnapshotWriter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "demos/best-demo.yaml")]
    config: PathBuf,

    /// Output directory for results
    #[arg(short, long, default_value = "results")]
    out: PathBuf,

    /// Enable strict validation
    #[arg(long)]
    strict: bool,

    /// Enable debug scenarios for testing individual components
    #[arg(long)]
    debug_scenario: bool,

    /// Test one isolated scenario: reaction-only, diffusion-only, uptake-only, damping-only
    #[arg(long, value_enum)]
    scenario: Option<Scenario>,

    /// Sample and log aggregate stats every N sub-steps
    #[arg(long, default_value_t = 50)]
    sample_every: u32,
}

#[derive(ValueEnum, Clone, Copy)]
enum Scenario {
    ReactionOnly,
    DiffusionOnly,
    UptakeOnly,
    DampingOnly,
}

/// Disable every coupling except the one named, so each scenario
/// isolates a single kernel's behaviour for inspection.
fn apply_scenario(config: &mut SimulationConfig, scenario: Scenario) {
    match scenario {
        Scenario::ReactionOnly => {
            info!("scenario: reaction-only (transport and uptake disabled)");
            config.r_source.diffusion_rate = 0.0;
            config.r_source.decay_rate = 0.0;
            config.oxidant.diffusion_rate = 0.0;
            config.oxidant.relaxation_rate = 0.0;
            config.heat.diffusion_rate = 0.0;
            config.reaction.rate = config.reaction.rate.max(1.0);
        }
        Scenario::DiffusionOnly => {
            info!("scenario: diffusion-only (reaction disabled)");
            config.reaction.rate = 0.0;
            config.r_source.max_strength = 0.0;
            config.r_source.diffusion_rate = config.r_source.diffusion_rate.max(0.5);
        }
        Scenario::UptakeOnly => {
            info!("scenario: uptake-only (no replenishment, reaction active)");
            config.r_source.max_strength = 0.0;
            config.reaction.rate = config.reaction.rate.max(1.0);
        }
        Scenario::DampingOnly => {
            info!("scenario: damping-only (agent steering bias and noise disabled)");
            config.prey.bias_strength = 0.0;
            config.prey.noise_strength = 0.0;
            config.predators.base.bias_strength = 0.0;
            config.predators.base.noise_strength = 0.0;
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    info!("loading configuration from {}", cli.config.display());
    let mut config: SimulationConfig = serde_yaml::from_str(
        &std::fs::read_to_string(&cli.config)
            .with_context(|| format!("reading config file {}", cli.config.display()))?,
    )
    .with_context(|| format!("parsing config file {}", cli.config.display()))?;

    if cli.strict {
        if config.world.w < 32 || config.world.h < 32 {
            anyhow::bail!(
                "world size too small ({}x{}); minimum supported under --strict is 32x32",
                config.world.w,
                config.world.h
            );
        }
        if config.world.steps == 0 {
            anyhow::bail!("step count must be greater than 0 under --strict");
        }
        if config.world.dt <= 0.0 {
            anyhow::bail!("time step (dt) must be positive under --strict");
        }
    }

    if let Some(scenario) = cli.scenario {
        apply_scenario(&mut config, scenario);
    } else if cli.debug_scenario {
        info!("debug scenario: isolating reaction and damping together (no --scenario given)");
        apply_scenario(&mut config, Scenario::ReactionOnly);
        apply_scenario(&mut config, Scenario::DampingOnly);
    }

    std::fs::create_dir_all(&cli.out).with_context(|| format!("creating output directory {}", cli.out.display()))?;

    let params = vireo_params::Parameters::from(&config);
    let mut sim = Sim::new(params, config.world.seed).context("constructing simulation")?;

    let mut metrics_writer = MetricsWriter::new(&cli.out)?;
    let snapshot_writer = SnapshotWriter::new(&cli.out);

    snapshot_writer.write_field_snapshot(0, &sim.grid)?;
    snapshot_writer.write_agents_snapshot(0, "prey", sim.prey.current())?;
    snapshot_writer.write_agents_snapshot(0, "predators", sim.predators.current())?;

    info!("running {} sub-steps (sampling every {})", config.world.steps, cli.sample_every.max(1));
    let start = Instant::now();
    let cancel = AtomicBool::new(false);

    // Drive the core batch harness (§4.13) one sample window at a time so
    // this CLI can notice total extinction between windows and stop the
    // run early without the harness itself needing to know about agents.
    let sample_every = cli.sample_every.max(1);
    let mut completed_steps = 0u32;
    let mut outcome = BatchOutcome::Completed;
    let mut remaining = config.world.steps;

    while remaining > 0 {
        let window = remaining.min(sample_every);
        let steps_before_window = completed_steps;
        let report = run_batch(&mut sim, window, window, &cancel);
        completed_steps += report.completed_steps;
        remaining -= report.completed_steps;

        for (step, stats) in &report.samples {
            let absolute_step = steps_before_window + step;
            metrics_writer.write_step(absolute_step, stats, report.elapsed)?;
            info!(
                "step {absolute_step}: R_total={:.3} O_avg={:.3} M_total={:.3} prey={} predators={}",
                stats.r_total, stats.o_avg, stats.m_total, stats.p_alive, stats.p2_alive
            );
        }

        if sim.prey.active_count() == 0 && sim.predators.active_count() == 0 {
            warn!("both populations extinct at step {completed_steps}, stopping early");
            outcome = BatchOutcome::Cancelled;
            break;
        }
        if report.completed_steps < window {
            // The harness itself reported a cancellation (cooperative
            // flag tripped mid-window); nothing set it here, so this
            // only happens if a future caller starts flipping `cancel`.
            outcome = BatchOutcome::Cancelled;
            break;
        }
    }

    snapshot_writer.write_field_snapshot(completed_steps, &sim.grid)?;
    snapshot_writer.write_agents_snapshot(completed_steps, "prey", sim.prey.current())?;
    snapshot_writer.write_agents_snapshot(completed_steps, "predators", sim.predators.current())?;

    let elapsed = start.elapsed();
    let final_stats = sim.stats();
    match outcome {
        BatchOutcome::Completed => info!("completed {completed_steps} steps in {elapsed:?}"),
        BatchOutcome::Cancelled => warn!("cancelled after {completed_steps} steps ({elapsed:?})"),
    }
    info!(
        "final stats: R_total={:.3} O_avg={:.3} H_avg={:.3} M_total={:.3} prey={} predators={} metrics_rows={}",
        final_stats.r_total,
        final_stats.o_avg,
        final_stats.h_avg,
        final_stats.m_total,
        final_stats.p_alive,
        final_stats.p2_alive,
        metrics_writer.rows_written(),
    );

    Ok(())
}
