//! The Burrows-Wheeler suffix-sort primitive (§1: "treated as a black
//! box exposed via `forward(in,out)` / `inverse(in,out)` /
//! `primaryIndex(chunk)` / `chunks(blockSize)`"). Its *framing* —
//! chunking a block and bit-packing each chunk's primary index — lives
//! in [`crate::transforms::bwt`]; this module only does the sort.
//!
//! No suffix-sort crate is available in this corpus (§9, Design Notes:
//! "suffix-sort backend for BWT framing"), so [`sais`] supplies a
//! straightforward prefix-doubling cyclic suffix sort behind the same
//! four-method interface the spec treats as swappable.

pub mod sais;

/// Bytes per BWT chunk (§4.5, "encoded in chunks of 2^26" for ROLZ;
/// reused here as the BWT chunk size so `chunks(n)` matches the
/// primary-index-per-chunk framing of §4.5/§8).
pub const BWT_CHUNK: usize = 1 << 20;

/// The suffix-sort black box, per §1/§9. A single instance handles one
/// block, possibly split into multiple chunks; `forward`/`inverse`
/// transform one chunk at a time and `primary_index` recalls the index
/// recorded for a chunk already transformed by `forward`.
pub trait BwtSort {
    /// Runs the forward transform over `input`, writing the same number
    /// of bytes into `output`. Records the chunk's primary index for a
    /// later `primary_index` call.
    fn forward(&mut self, input: &[u8], output: &mut [u8], chunk: usize);

    /// Inverts a previous `forward` call for the given primary index.
    fn inverse(&mut self, input: &[u8], output: &mut [u8], primary_index: u32);

    /// The primary index recorded for `chunk` by the last `forward` call.
    fn primary_index(&self, chunk: usize) -> u32;

    /// Number of `BWT_CHUNK`-sized chunks a block of `block_size` bytes
    /// splits into.
    fn chunks(&self, block_size: usize) -> usize {
        block_size.div_ceil(BWT_CHUNK).max(1)
    }
}

pub use sais::SaisBwt;
