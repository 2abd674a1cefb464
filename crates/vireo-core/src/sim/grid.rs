//! Grid buffers: the double-buffered scalar fields and the density
//! grids scattered from the agent pools each step (§3, §4.2).

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A double-buffered scalar field. `current()` is read by the field's
/// update kernel; `next_mut()` is written by it; `swap()` flips which
/// buffer is "current" once the kernel has finished. A kernel that
/// writes `next` may assume `current` is left untouched for the
/// duration of its own execution (§4.2 guarantee).
#[derive(Debug, Clone)]
pub struct PingPong {
    buf: [Vec<f32>; 2],
    cur: usize,
}

impl PingPong {
    pub fn filled(len: usize, value: f32) -> Self {
        Self {
            buf: [vec![value; len], vec![value; len]],
            cur: 0,
        }
    }

    pub fn current(&self) -> &[f32] {
        &self.buf[self.cur]
    }

    pub fn next(&self) -> &[f32] {
        &self.buf[1 - self.cur]
    }

    pub fn next_mut(&mut self) -> &mut [f32] {
        &mut self.buf[1 - self.cur]
    }

    /// Borrow the current (read-only) and next (write-only) buffers at
    /// once, without aliasing: they're genuinely disjoint `Vec`s.
    pub fn read_write(&mut self) -> (&[f32], &mut [f32]) {
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

    /// Reinitialise both copies to the same value (reset semantics, §5).
    pub fn reset(&mut self, value: f32) {
        self.buf[0].fill(value);
        self.buf[1].fill(value);
        self.cur = 0;
    }
}

/// All grid-resident state for one `Sim`: the five ping-ponged fields
/// (R, O, H, M, Z), the derived/in-place fields (C, B, B_long, Z_rock),
/// and the two integer density grids (Dp, Dp2).
pub struct Grid {
    pub width: u32,
    pub height: u32,

    pub r: PingPong,
    pub o: PingPong,
    pub heat: PingPong,
    pub m: PingPong,
    pub z: PingPong,

    pub c: Vec<f32>,
    pub b: Vec<f32>,
    pub b_long: Vec<f32>,
    pub z_rock: Vec<f32>,

    pub dp: Vec<u32>,
    pub dp2: Vec<u32>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            r: PingPong::filled(len, 0.0),
            o: PingPong::filled(len, 0.0),
            heat: PingPong::filled(len, 0.0),
            m: PingPong::filled(len, 0.0),
            z: PingPong::filled(len, 0.0),
            c: vec![0.0; len],
            b: vec![0.0; len],
            b_long: vec![0.0; len],
            z_rock: vec![0.0; len],
            dp: vec![0; len],
            dp2: vec![0; len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// `initialize(o0, h0)` (§4.2): fill O with `o0`, H with `h0`, M with
    /// a small random baseline, everything else with zero; clone to both
    /// ping-pong copies for every double-buffered field.
    pub fn initialize(&mut self, o0: f32, h0: f32, seed: u64) {
        self.r.reset(0.0);
        self.o.reset(o0);
        self.heat.reset(h0);
        self.z.reset(0.0);

        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0xA11C_E5EE);
        let len = self.len();
        let mut m0 = vec![0.0f32; len];
        for v in m0.iter_mut() {
            let jitter: f32 = rng.gen_range(-0.00025..0.00025);
            *v = (0.05 + jitter).max(0.0);
        }
        self.m.buf_reset_from(&m0);

        self.c.fill(0.0);
        self.b.fill(0.0);
        self.b_long.fill(0.0);
        self.z_rock.fill(0.0);
        self.dp.fill(0);
        self.dp2.fill(0);
    }

    /// Bounds-safe 4-neighbour sample with zero-flux (clamped) boundary:
    /// missing neighbours read back the centre value.
    #[inline]
    pub fn neighbours4(field: &[f32], width: u32, height: u32, x: u32, y: u32) -> (f32, f32, f32, f32, f32) {
        let idx = |x: u32, y: u32| (y as usize) * (width as usize) + (x as usize);
        let centre = field[idx(x, y)];
        let left = if x > 0 { field[idx(x - 1, y)] } else { centre };
        let right = if x + 1 < width { field[idx(x + 1, y)] } else { centre };
        let up = if y > 0 { field[idx(x, y - 1)] } else { centre };
        let down = if y + 1 < height { field[idx(x, y + 1)] } else { centre };
        (left, right, up, down, centre)
    }

    /// 4-neighbour Laplacian with clamped (Neumann, zero-flux) boundary.
    #[inline]
    pub fn laplacian(field: &[f32], width: u32, height: u32, x: u32, y: u32) -> f32 {
        let (l, r, u, d, c) = Self::neighbours4(field, width, height, x, y);
        l + r + u + d - 4.0 * c
    }

    /// Central-difference gradient; edges fall back to the centre value
    /// in place of the missing neighbour (the same zero-flux policy as
    /// the Laplacian), per §4.3's boundary policy.
    #[inline]
    pub fn gradient(field: &[f32], width: u32, height: u32, x: u32, y: u32) -> (f32, f32) {
        let (l, r, u, d, _c) = Self::neighbours4(field, width, height, x, y);
        ((r - l) * 0.5, (d - u) * 0.5)
    }
}

impl PingPong {
    /// Overwrite both copies from a freshly computed buffer (used by
    /// `initialize` for M's randomised baseline).
    fn buf_reset_from(&mut self, values: &[f32]) {
        self.buf[0].copy_from_slice(values);
        self.buf[1].copy_from_slice(values);
        self.cur = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_pong_swap_flips_current_and_next() {
        let mut pp = PingPong::filled(4, 1.0);
        pp.next_mut().copy_from_slice(&[2.0; 4]);
        assert_eq!(pp.current(), &[1.0; 4]);
        pp.swap();
        assert_eq!(pp.current(), &[2.0; 4]);
    }

    #[test]
    fn initialize_seeds_o_and_h_uniformly() {
        let mut grid = Grid::new(8, 8);
        grid.initialize(0.5, 0.25, 1);
        assert!(grid.o.current().iter().all(|&v| v == 0.5));
        assert!(grid.heat.current().iter().all(|&v| v == 0.25));
        assert!(grid.m.current().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn laplacian_is_zero_on_flat_field() {
        let field = vec![3.0f32; 25];
        assert_eq!(Grid::laplacian(&field, 5, 5, 2, 2), 0.0);
        assert_eq!(Grid::laplacian(&field, 5, 5, 0, 0), 0.0);
    }

    #[test]
    fn gradient_uses_centre_value_at_edges() {
        let mut field = vec![0.0f32; 9];
        field[4] = 1.0; // centre of 3x3
        let (gx, gy) = Grid::gradient(&field, 3, 3, 0, 0);
        // top-left corner: right neighbour is column 1 (still 0), left falls back to centre (0)
        assert_eq!(gx, 0.0);
        assert_eq!(gy, 0.0);
    }
}
