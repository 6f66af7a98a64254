//! Byte-to-byte transforms (§4.5): the stage that runs before entropy
//! coding, turning redundancy into a form the entropy coder can exploit
//! more cheaply (matches, run-lengths, rank locality, permutations).
//!
//! Every transform is reversible and operates on one block (or, for BWT,
//! one block's worth of independently-framed chunks) at a time. A
//! transform that would expand its input reports [`TransformError::Space`]
//! rather than writing past the output budget — this is a purely local,
//! non-fatal condition: [`crate::transforms::sequence`] catches it and
//! skips the offending stage, storing that chunk raw instead. It never
//! becomes a [`crate::error::KanziError`].

pub mod bwt;
pub mod bwts;
pub mod lz4;
pub mod mtft;
pub mod none;
pub mod rlt;
pub mod rolz;
pub mod sbrt;
pub mod sequence;
pub mod snappy;
pub mod text;
pub mod x86;
pub mod zrlt;

use std::fmt;

/// A purely local, non-fatal signal that a transform's output would not
/// fit in the space available. Distinct from [`crate::error::KanziError`]
/// so it can never accidentally propagate past the transform sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceError;

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transform output exceeds available space")
    }
}

impl std::error::Error for SpaceError {}

pub type TransformResult<T> = std::result::Result<T, SpaceError>;

/// A single reversible byte transform.
pub trait Transform {
    fn name(&self) -> &'static str;
    fn id(&self) -> u8;

    /// Transforms `input`, returning the transformed bytes, or
    /// `Err(SpaceError)` if the result would not be useful/representable.
    fn forward(&mut self, input: &[u8]) -> TransformResult<Vec<u8>>;

    /// Inverts a previous `forward` call. `original_len` is the exact
    /// length of the pre-transform data, known from the block frame.
    fn inverse(&mut self, input: &[u8], original_len: usize) -> TransformResult<Vec<u8>>;
}
