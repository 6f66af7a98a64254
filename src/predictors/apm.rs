//! Adaptive probability map: remaps a prediction through a per-context
//! table of interpolation buckets in the logistic (stretched) domain, then
//! adapts the bucket that was used toward the observed bit.
//!
//! The stretch/squash tables are computed once, on first use, behind a
//! `OnceLock` — the static-initializer pattern this crate uses for every
//! read-only table shared across threads (see the design notes on static
//! initializers).

use std::sync::OnceLock;

const BUCKETS: usize = 33;
const STRETCH_RANGE: i32 = 2047;

fn squash_table() -> &'static [i16; 4096] {
    static TABLE: OnceLock<[i16; 4096]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [0i16; 4096];
        for (i, slot) in t.iter_mut().enumerate() {
            let x = (i as i32 - 2048) as f64 / 256.0;
            let p = 1.0 / (1.0 + (-x).exp());
            *slot = (p * 4095.0).round().clamp(0.0, 4095.0) as i16;
        }
        t
    })
}

/// Maps a 12-bit probability to its logistic "stretch" in `-2047..=2047`.
pub fn stretch(p: u16) -> i32 {
    let p = p.clamp(1, 4094) as f64 / 4096.0;
    let x = (p / (1.0 - p)).ln() * 256.0;
    (x.round() as i32).clamp(-STRETCH_RANGE, STRETCH_RANGE)
}

/// Maps a stretched value back to a 12-bit probability.
pub fn squash(x: i32) -> u16 {
    let clamped = x.clamp(-2048, 2047);
    squash_table()[(clamped + 2048) as usize] as u16
}

/// A logistic adaptive probability map over `contexts` independent tables
/// of `BUCKETS` interpolation points spanning the stretched domain.
pub struct Apm {
    table: Vec<u16>,
    rate: u8,
    last_idx: usize,
}

impl Apm {
    pub fn new(contexts: usize, rate: u8) -> Self {
        let mut table = vec![0u16; contexts * BUCKETS];
        for ctx in 0..contexts {
            for b in 0..BUCKETS {
                let x = (b as i32 - (BUCKETS as i32 / 2)) * (STRETCH_RANGE / (BUCKETS as i32 / 2));
                table[ctx * BUCKETS + b] = squash(x);
            }
        }
        Self {
            table,
            rate,
            last_idx: 0,
        }
    }

    /// Refines `p` using context `ctx`, remembering the bucket touched so
    /// the following `update` call can adapt it.
    pub fn refine(&mut self, p: u16, ctx: usize) -> u16 {
        let s = stretch(p) + STRETCH_RANGE;
        let step = (2 * STRETCH_RANGE) / (BUCKETS as i32 - 1);
        let bucket = (s / step).clamp(0, BUCKETS as i32 - 2) as usize;
        let idx = ctx * BUCKETS + bucket;
        self.last_idx = idx;
        self.table[idx]
    }

    pub fn update(&mut self, bit: bool) {
        let target: i32 = if bit { 4095 } else { 0 };
        let cur = self.table[self.last_idx] as i32;
        let delta = (target - cur) >> self.rate;
        self.table[self.last_idx] = (cur + delta).clamp(0, 4095) as u16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stretch_and_squash_are_approximate_inverses() {
        for p in [1u16, 100, 2048, 3000, 4094] {
            let back = squash(stretch(p));
            assert!((back as i32 - p as i32).abs() < 40, "p={p} back={back}");
        }
    }

    #[test]
    fn apm_adapts_toward_observed_bit() {
        let mut apm = Apm::new(1, 6);
        let mut p = 2048u16;
        for _ in 0..500 {
            p = apm.refine(p, 0);
            apm.update(true);
        }
        assert!(p > 3000, "got {p}");
    }
}
