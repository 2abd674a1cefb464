//! CSV metrics writer: one row per sampled sub-step, covering §4.13's
//! required aggregate fields plus simple per-sample wall-clock timing.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use csv::Writer;

use vireo_core::FieldStats;

pub struct MetricsWriter {
    csv_writer: Writer<File>,
    rows_written: u32,
}

impl MetricsWriter {
    pub fn new(output_dir: &Path) -> Result<Self> {
        let csv_path = output_dir.join("metrics.csv");
        let file = File::create(&csv_path).with_context(|| format!("creating {}", csv_path.display()))?;
        let mut csv_writer = Writer::from_writer(file);

        csv_writer.write_record([
            "step",
            "r_total",
            "o_avg",
            "h_avg",
            "m_total",
            "b_total",
            "p_alive",
            "p2_alive",
            "p_invalid",
            "p2_invalid",
            "wall_time_ms",
        ])?;

        Ok(Self { csv_writer, rows_written: 0 })
    }

    pub fn write_step(&mut self, step: u32, stats: &FieldStats, step_time: Duration) -> Result<()> {
        self.csv_writer.write_record(&[
            step.to_string(),
            stats.r_total.to_string(),
            stats.o_avg.to_string(),
            stats.h_avg.to_string(),
            stats.m_total.to_string(),
            stats.b_total.to_string(),
            stats.p_alive.to_string(),
            stats.p2_alive.to_string(),
            stats.p_invalid.to_string(),
            stats.p2_invalid.to_string(),
            step_time.as_secs_f64().mul_add(1000.0, 0.0).to_string(),
        ])?;
        self.csv_writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> u32 {
        self.rows_written
    }
}
