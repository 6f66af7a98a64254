//! Order-0/1/2 context-mixing predictor ("PAQ-lite").
//!
//! Tracks the running bit-tree position within the current byte plus the
//! previous two decoded bytes, blends three order-context probabilities at
//! independent adaptation rates, and rescales the blend to 12 bits.

use super::Predictor;

const RATE_SELF: u8 = 2;
const RATE_C1: u8 = 4;
const RATE_C2: u8 = 6;

/// Bit-tree node count per byte context: nodes `1..=255` cover every
/// partial prefix of a byte; node wraps back to 1 once 8 bits are coded.
const NODES: usize = 256;

pub struct CmPredictor {
    t_self: Vec<u16>,
    t_c1: Vec<u16>,
    t_c2: Vec<u16>,
    node: u16,
    c1: u8,
    c2: u8,
}

impl CmPredictor {
    pub fn new() -> Self {
        Self {
            t_self: vec![0x8000; NODES],
            t_c1: vec![0x8000; NODES * 256],
            t_c2: vec![0x8000; NODES * 256],
            node: 1,
            c1: 0,
            c2: 0,
        }
    }

    fn c1_idx(&self) -> usize {
        self.c1 as usize * NODES + self.node as usize
    }

    fn c2_idx(&self) -> usize {
        self.c2 as usize * NODES + self.node as usize
    }

    fn adapt(p: &mut u16, bit: bool, rate: u8) {
        let target: i32 = if bit { 0xFFFF } else { 0 };
        let cur = *p as i32;
        let delta = (cur - target) >> rate;
        *p = (cur - delta).clamp(0, 0xFFFF) as u16;
    }
}

impl Default for CmPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl Predictor for CmPredictor {
    fn get(&self) -> u16 {
        let p_self = self.t_self[self.node as usize] as u32;
        let p_c1 = self.t_c1[self.c1_idx()] as u32;
        let p_c2 = self.t_c2[self.c2_idx()] as u32;
        let blended = (13 * p_self + 14 * p_c1 + 5 * p_c2) / 32;
        ((blended >> 4).min(4095)) as u16
    }

    fn update(&mut self, bit: bool) {
        let node = self.node as usize;
        Self::adapt(&mut self.t_self[node], bit, RATE_SELF);
        let c1_idx = self.c1_idx();
        Self::adapt(&mut self.t_c1[c1_idx], bit, RATE_C1);
        let c2_idx = self.c2_idx();
        Self::adapt(&mut self.t_c2[c2_idx], bit, RATE_C2);

        self.node = self.node * 2 + bit as u16;
        if self.node >= NODES as u16 {
            let byte = (self.node & 0xFF) as u8;
            self.c2 = self.c1;
            self.c1 = byte;
            self.node = 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learns_a_biased_source() {
        let mut p = CmPredictor::new();
        for _ in 0..50 {
            for _ in 0..8 {
                p.update(true);
            }
        }
        // After repeatedly coding 0xFF bytes, the bit-1 probability should
        // have moved well above the neutral midpoint.
        assert!(p.get() > 2500, "got {}", p.get());
    }
}
