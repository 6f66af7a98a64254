//! Binary probability predictors.
//!
//! Every predictor is a plain, concrete struct — never a trait object —
//! since predictors sit in the entropy coder's per-bit hot loop and are
//! owned exclusively by a single block's coder instance (never shared
//! across threads, per the ownership model). [`Predictor`] is a narrow
//! trait so the entropy coder can stay generic over `P: Predictor` and
//! monomorphize, rather than paying for dynamic dispatch per bit.

pub mod apm;
pub mod cm;
pub mod fpaq;
pub mod rolz;
pub mod tpaq;

/// Maps a running context to `P(next bit == 1)`, scaled to 12 bits
/// (`0..=4095`), and adapts online after the true bit is observed.
pub trait Predictor {
    fn get(&self) -> u16;
    fn update(&mut self, bit: bool);
}

pub use apm::Apm;
pub use cm::CmPredictor;
pub use fpaq::FpaqPredictor;
pub use rolz::RolzPredictor;
pub use tpaq::TpaqPredictor;
