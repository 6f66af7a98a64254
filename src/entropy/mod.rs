//! Entropy codecs (§4.4): the final stage of the per-block pipeline,
//! turning the (possibly) byte-transformed block into its coded payload.
//!
//! Every codec implements [`EntropyCodec`] over a full in-memory block —
//! the block pipeline always knows the transformed size up front, so
//! streaming isn't needed at this layer. `NONE` is a passthrough; the
//! others build on either the shared [`alphabet`] header codec or the
//! predictor-driven [`binary_range`] engine.

pub mod alphabet;
pub mod binary_range;
pub mod bitwise;
pub mod huffman;
pub mod null;
pub mod rans;
pub mod range;

use crate::error::Result;

/// A block-level entropy codec: compresses/decompresses one block's worth
/// of bytes at a time, with the decoded length always known ahead of time
/// from the block frame.
pub trait EntropyCodec {
    fn name(&self) -> &'static str;
    fn id(&self) -> u8;
    fn encode(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn decode(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>>;
}

pub use bitwise::{CmCodec, FpaqCodec, TpaqCodec};
pub use huffman::HuffmanCodec;
pub use null::NullCodec;
pub use rans::AnsCodec;
pub use range::RangeCodec;
