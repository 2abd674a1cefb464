//! Agent record and fixed-capacity, double-buffered agent pools (§3,
//! §4.10, §4.11).

use bytemuck::{Pod, Zeroable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;

/// Species tag. Stored as `u32` in the wire layout (§6) rather than an
/// enum so the 32-byte record stays a `Pod` type with a fixed binary
/// shape external tools can parse directly.
pub const SPECIES_PREY: u32 = 0;
pub const SPECIES_PREDATOR: u32 = 1;

/// One agent slot, 32 bytes, little-endian, identical layout for both
/// pools (§3). `age` is overloaded to carry the agent's persistent
/// exploration heading in radians, not a literal age — see DESIGN.md.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Agent {
    pub pos: [f32; 2],
    pub vel: [f32; 2],
    pub energy: f32,
    pub kind: u32,
    pub state: u32,
    pub age: f32,
}

impl Agent {
    pub const FREE: Self = Agent {
        pos: [0.0, 0.0],
        vel: [0.0, 0.0],
        energy: 0.0,
        kind: 0,
        state: 0,
        age: 0.0,
    };

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state != 0
    }
}

/// A fixed-capacity, ping-ponged pool of one species' agents. The
/// owning kernel is the only writer of `next`; reproduction targets
/// land in `next`, so the scheduler clears `next` before kernels that
/// rely on "state == 0" meaning "free slot" for a write-in-progress
/// step (§4.9 design notes, the predator/next-buffer asymmetry).
pub struct AgentPool {
    capacity: usize,
    buf: [Vec<Agent>; 2],
    cur: usize,
}

impl AgentPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buf: [vec![Agent::FREE; capacity], vec![Agent::FREE; capacity]],
            cur: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current(&self) -> &[Agent] {
        &self.buf[self.cur]
    }

    pub fn next(&self) -> &[Agent] {
        &self.buf[1 - self.cur]
    }

    pub fn next_mut(&mut self) -> &mut [Agent] {
        &mut self.buf[1 - self.cur]
    }

    pub fn read_write(&mut self) -> (&[Agent], &mut [Agent]) {
        let cur = self.cur;
        let (lo, hi) = self.buf.split_at_mut(1);
        if cur == 0 {
            (&lo[0], &mut hi[0])
        } else {
            (&hi[0], &mut lo[0])
        }
    }

    pub fn swap(&mut self) {
        self.cur = 1 - self.cur;
    }

    /// Zero the entire next buffer (all `capacity` slots, 32B each).
    /// Required before the predator update kernel runs so stale
    /// children from a previous step can't masquerade as free slots
    /// (§5, §4.9 design notes).
    pub fn clear_next(&mut self) {
        self.next_mut().fill(Agent::FREE);
    }

    pub fn active_count(&self) -> u32 {
        self.current().iter().filter(|a| a.is_active()).count() as u32
    }

    /// *Created* lifecycle (§3): reset to `count` active agents at
    /// random uniform positions, zero velocity, energy 1.0, random
    /// heading. Both buffers are reseeded so a fresh pool never shows
    /// stale children in `next` after the first swap.
    pub fn seed(&mut self, count: u32, kind: u32, width: u32, height: u32, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let count = (count as usize).min(self.capacity);
        let mut fresh = vec![Agent::FREE; self.capacity];
        for slot in fresh.iter_mut().take(count) {
            let x = rng.gen_range(0.0..width as f32);
            let y = rng.gen_range(0.0..height as f32);
            let heading = rng.gen_range(0.0..TAU);
            *slot = Agent {
                pos: [x, y],
                vel: [0.0, 0.0],
                energy: 1.0,
                kind,
                state: 1,
                age: heading,
            };
        }
        self.buf[0].copy_from_slice(&fresh);
        self.buf[1].copy_from_slice(&fresh);
        self.cur = 0;
    }

    /// Count of active slots whose position is NaN or outside the
    /// grid; used by the statistics harness (§4.13) for observability,
    /// not as a failure — invalid agents self-heal to `state = 0` at
    /// their next update (§7 `InvalidAgent`).
    pub fn invalid_count(&self, width: u32, height: u32) -> u32 {
        self.current()
            .iter()
            .filter(|a| a.is_active())
            .filter(|a| {
                let (x, y) = (a.pos[0], a.pos[1]);
                x.is_nan() || y.is_nan() || x < 0.0 || y < 0.0 || x >= width as f32 || y >= height as f32
            })
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_fills_exactly_count_active_slots() {
        let mut pool = AgentPool::new(100);
        pool.seed(37, SPECIES_PREY, 64, 64, 1);
        assert_eq!(pool.active_count(), 37);
        assert_eq!(pool.current().len(), 100);
    }

    #[test]
    fn seed_clamps_count_to_capacity() {
        let mut pool = AgentPool::new(10);
        pool.seed(1000, SPECIES_PREY, 64, 64, 1);
        assert_eq!(pool.active_count(), 10);
    }

    #[test]
    fn clear_next_zeroes_all_slots_including_state() {
        let mut pool = AgentPool::new(8);
        pool.seed(8, SPECIES_PREDATOR, 16, 16, 2);
        pool.swap(); // make the seeded buffer "next" so clear_next touches it
        pool.clear_next();
        assert!(pool.next().iter().all(|a| !a.is_active()));
    }

    #[test]
    fn invalid_count_flags_out_of_grid_and_nan_positions() {
        let mut pool = AgentPool::new(4);
        pool.seed(4, SPECIES_PREY, 16, 16, 3);
        {
            let (_, next) = pool.read_write();
            next[0].pos = [f32::NAN, 0.0];
            next[1].pos = [-1.0, 0.0];
            next[1].state = 1;
            next[2].pos = [100.0, 0.0];
            next[2].state = 1;
        }
        pool.swap();
        assert_eq!(pool.invalid_count(16, 16), 3);
    }
}
