//! 56-bit binary range coder, parameterized over any [`Predictor`].
//!
//! This is the shared bit-coding engine behind the FPAQ, CM and TPAQ
//! entropy codecs (§4.3's predictors plug into it). It follows the same
//! owned-writer `finish(self) -> Result<W>` / panic-on-unfinished-drop
//! shape as the teacher's arithmetic coder, since both need to guarantee
//! the trailing bytes are flushed exactly once.

use crate::error::Result;
use crate::predictors::Predictor;
use std::io::{Read, Write};

const MASK56: u64 = (1u64 << 56) - 1;
const TOP_BYTE_SHIFT: u32 = 48;

pub struct BinaryRangeEncoder<W: Write> {
    low: u64,
    high: u64,
    sink: Option<W>,
}

impl<W: Write> BinaryRangeEncoder<W> {
    pub fn new(sink: W) -> Self {
        Self {
            low: 0,
            high: MASK56,
            sink: Some(sink),
        }
    }

    pub fn encode_bit<P: Predictor>(&mut self, bit: bool, predictor: &mut P) -> Result<()> {
        let p = predictor.get().clamp(1, 4094) as u64;
        let split = (((self.high - self.low) >> 4) * p) >> 8;
        if bit {
            self.high = self.low + split;
        } else {
            self.low = self.low + split + 1;
        }
        predictor.update(bit);
        self.normalize()
    }

    fn normalize(&mut self) -> Result<()> {
        while (self.low >> TOP_BYTE_SHIFT) == (self.high >> TOP_BYTE_SHIFT) {
            let word = (self.high >> TOP_BYTE_SHIFT) as u32;
            self.sink.as_mut().unwrap().write_all(&word.to_be_bytes())?;
            self.low = (self.low << 32) & MASK56;
            self.high = ((self.high << 32) | 0xFFFF_FFFF) & MASK56;
        }
        Ok(())
    }

    /// Flushes the final register state (7 bytes, big-endian) and returns
    /// the underlying writer. Any point in `[low, high]` disambiguates the
    /// stream correctly; `low` itself is simplest.
    pub fn finish(mut self) -> Result<W> {
        let bytes = self.low.to_be_bytes();
        let mut sink = self.sink.take().unwrap();
        sink.write_all(&bytes[1..])?;
        sink.flush()?;
        Ok(sink)
    }
}

impl<W: Write> Drop for BinaryRangeEncoder<W> {
    fn drop(&mut self) {
        if self.sink.is_some() {
            panic!("BinaryRangeEncoder dropped without calling finish()");
        }
    }
}

pub struct BinaryRangeDecoder<R: Read> {
    low: u64,
    high: u64,
    current: u64,
    source: R,
}

impl<R: Read> BinaryRangeDecoder<R> {
    pub fn new(mut source: R) -> Result<Self> {
        let mut buf = [0u8; 7];
        read_padded(&mut source, &mut buf)?;
        let mut current = 0u64;
        for b in buf {
            current = (current << 8) | b as u64;
        }
        Ok(Self {
            low: 0,
            high: MASK56,
            current,
            source,
        })
    }

    pub fn decode_bit<P: Predictor>(&mut self, predictor: &mut P) -> Result<bool> {
        let p = predictor.get().clamp(1, 4094) as u64;
        let split = (((self.high - self.low) >> 4) * p) >> 8;
        let mid = self.low + split;
        let bit = self.current <= mid;
        if bit {
            self.high = mid;
        } else {
            self.low = mid + 1;
        }
        predictor.update(bit);
        self.normalize()?;
        Ok(bit)
    }

    fn normalize(&mut self) -> Result<()> {
        while (self.low >> TOP_BYTE_SHIFT) == (self.high >> TOP_BYTE_SHIFT) {
            self.low = (self.low << 32) & MASK56;
            self.high = ((self.high << 32) | 0xFFFF_FFFF) & MASK56;
            let mut buf = [0u8; 4];
            read_padded(&mut self.source, &mut buf)?;
            let mut word = 0u64;
            for b in buf {
                word = (word << 8) | b as u64;
            }
            self.current = ((self.current << 32) | word) & MASK56;
        }
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

/// Reads up to `buf.len()` bytes, padding any shortfall with zero bytes.
/// The block pipeline always knows the exact decoded length in advance and
/// stops calling `decode_bit` once it has enough bits, so trailing padding
/// past the true end of the coded payload is never actually consumed.
fn read_padded<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..])?;
        if n == 0 {
            for b in &mut buf[filled..] {
                *b = 0;
            }
            break;
        }
        filled += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictors::FpaqPredictor;
    use std::io::Cursor;

    #[test]
    fn roundtrips_a_biased_bit_sequence() {
        let bits: Vec<bool> = (0..2000).map(|i| i % 7 != 0).collect();

        let mut enc = BinaryRangeEncoder::new(Vec::new());
        let mut pred = FpaqPredictor::default();
        for &b in &bits {
            enc.encode_bit(b, &mut pred).unwrap();
        }
        let coded = enc.finish().unwrap();

        let mut dec = BinaryRangeDecoder::new(Cursor::new(coded)).unwrap();
        let mut pred = FpaqPredictor::default();
        for &expected in &bits {
            assert_eq!(dec.decode_bit(&mut pred).unwrap(), expected);
        }
    }

    #[test]
    fn compresses_a_skewed_source_below_one_bit_per_symbol() {
        let bits: Vec<bool> = (0..10_000).map(|i| i % 32 != 0).collect();
        let mut enc = BinaryRangeEncoder::new(Vec::new());
        let mut pred = FpaqPredictor::default();
        for &b in &bits {
            enc.encode_bit(b, &mut pred).unwrap();
        }
        let coded = enc.finish().unwrap();
        assert!(coded.len() < bits.len() / 8);
    }
}
