//! Batch driver (§4.13): advances a [`Sim`] for a fixed sub-step budget,
//! sampling aggregate stats periodically and checking a cooperative
//! cancellation flag so an embedding host (a UI thread, a job queue)
//! stays responsive even across a long run. Every sub-step still commits
//! atomically (§5), so cancelling between sub-steps always leaves `sim`
//! in a fully valid state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::stats::{compute_field_stats, FieldStats};
use super::Sim;

/// Sub-steps per cooperative-yield check, the chunk size named in §4.13
/// ("every ≤8 ms or after each chunk of 512 sub-steps").
pub const YIELD_CHUNK_STEPS: u32 = 512;

/// Wall-clock budget per chunk before yielding early, the other half of
/// the same §4.13 rule.
pub const YIELD_BUDGET: Duration = Duration::from_millis(8);

/// Whether a batch run used its full step budget or stopped early on a
/// cooperative cancellation request (§7: neither is an error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed,
    Cancelled,
}

/// The `(completed, elapsed, final_stats)` report §4.13 asks the batch
/// driver to return, plus the periodic samples collected along the way.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    pub completed_steps: u32,
    pub elapsed: Duration,
    pub final_stats: FieldStats,
    pub samples: Vec<(u32, FieldStats)>,
}

/// Run up to `total_steps` sub-steps, sampling stats every `sample_every`
/// steps (and always on the last completed step) and checking `cancel`
/// between sub-steps. Every `YIELD_CHUNK_STEPS` sub-steps, or sooner if
/// `YIELD_BUDGET` has elapsed since the last check, the calling thread
/// cooperatively yields so a host driving many runs (or a UI event loop)
/// stays responsive.
pub fn run_batch(sim: &mut Sim, total_steps: u32, sample_every: u32, cancel: &AtomicBool) -> BatchReport {
    let sample_every = sample_every.max(1);
    let start = Instant::now();

    let mut samples = Vec::new();
    let mut completed = 0u32;
    let mut outcome = BatchOutcome::Completed;
    let mut chunk_started = Instant::now();
    let mut steps_since_yield = 0u32;

    for step in 0..total_steps {
        if cancel.load(Ordering::Relaxed) {
            outcome = BatchOutcome::Cancelled;
            break;
        }

        sim.step();
        completed = step + 1;
        steps_since_yield += 1;

        if completed % sample_every == 0 || completed == total_steps {
            samples.push((completed, compute_field_stats(&sim.grid, &sim.prey, &sim.predators)));
        }

        if steps_since_yield >= YIELD_CHUNK_STEPS || chunk_started.elapsed() >= YIELD_BUDGET {
            std::thread::yield_now();
            steps_since_yield = 0;
            chunk_started = Instant::now();
        }
    }

    BatchReport {
        outcome,
        completed_steps: completed,
        elapsed: start.elapsed(),
        final_stats: sim.stats(),
        samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_params::Parameters;

    fn small_params() -> Parameters {
        let mut p = Parameters::default();
        p.w = 8;
        p.h = 8;
        p.p_count = 0;
        p.p2_count = 0;
        p
    }

    #[test]
    fn completes_full_budget_when_never_cancelled() {
        let mut sim = Sim::new(small_params(), 1).unwrap();
        let cancel = AtomicBool::new(false);
        let report = run_batch(&mut sim, 100, 10, &cancel);
        assert_eq!(report.outcome, BatchOutcome::Completed);
        assert_eq!(report.completed_steps, 100);
        assert_eq!(report.samples.len(), 10);
        assert_eq!(report.samples.last().unwrap().0, 100);
    }

    #[test]
    fn stops_early_and_reports_cancelled_when_flag_is_set() {
        let mut sim = Sim::new(small_params(), 1).unwrap();
        let cancel = AtomicBool::new(true);
        let report = run_batch(&mut sim, 100, 10, &cancel);
        assert_eq!(report.outcome, BatchOutcome::Cancelled);
        assert_eq!(report.completed_steps, 0);
    }

    #[test]
    fn last_sample_always_taken_even_off_the_sample_every_grid() {
        let mut sim = Sim::new(small_params(), 1).unwrap();
        let cancel = AtomicBool::new(false);
        let report = run_batch(&mut sim, 17, 5, &cancel);
        assert_eq!(report.completed_steps, 17);
        assert_eq!(report.samples.last().unwrap().0, 17);
    }

    #[test]
    fn sampling_every_one_step_yields_one_sample_per_step() {
        let mut sim = Sim::new(small_params(), 1).unwrap();
        let cancel = AtomicBool::new(false);
        let report = run_batch(&mut sim, 5, 1, &cancel);
        assert_eq!(report.samples.len(), 5);
    }
}
