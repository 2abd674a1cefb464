//! Raw snapshot export: field state and agent pools dumped as plain
//! CSV grids, one writer per output step. No image encoding — §3 asks
//! for arrays a downstream tool can load directly, not a rendered view.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::Writer;

use vireo_core::{Agent, Grid};

pub struct SnapshotWriter {
    output_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self { output_dir: output_dir.to_path_buf() }
    }

    /// One CSV row per cell: x, y, then R/O/H/M/C/B/B_long/Z/Z_rock/Dp/Dp2.
    pub fn write_field_snapshot(&self, step: u32, grid: &Grid) -> Result<()> {
        let path = self.output_dir.join(format!("fields_{step:08}.csv"));
        let file = std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        writer.write_record(["x", "y", "r", "o", "h", "m", "c", "b", "b_long", "z", "z_rock", "dp", "dp2"])?;

        let r = grid.r.current();
        let o = grid.o.current();
        let h = grid.heat.current();
        let m = grid.m.current();
        let z = grid.z.current();

        for y in 0..grid.height {
            for x in 0..grid.width {
                let idx = grid.index(x, y);
                writer.write_record(&[
                    x.to_string(),
                    y.to_string(),
                    r[idx].to_string(),
                    o[idx].to_string(),
                    h[idx].to_string(),
                    m[idx].to_string(),
                    grid.c[idx].to_string(),
                    grid.b[idx].to_string(),
                    grid.b_long[idx].to_string(),
                    z[idx].to_string(),
                    grid.z_rock[idx].to_string(),
                    grid.dp[idx].to_string(),
                    grid.dp2[idx].to_string(),
                ])?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// One CSV row per agent slot, active or not — `state` tells readers
    /// which rows are live.
    pub fn write_agents_snapshot(&self, step: u32, label: &str, agents: &[Agent]) -> Result<()> {
        let path = self.output_dir.join(format!("agents_{label}_{step:08}.csv"));
        let file = std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        writer.write_record(["slot", "x", "y", "vx", "vy", "energy", "kind", "state", "age"])?;
        for (slot, agent) in agents.iter().enumerate() {
            writer.write_record(&[
                slot.to_string(),
                agent.pos[0].to_string(),
                agent.pos[1].to_string(),
                agent.vel[0].to_string(),
                agent.vel[1].to_string(),
                agent.energy.to_string(),
                agent.kind.to_string(),
                agent.state.to_string(),
                agent.age.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
