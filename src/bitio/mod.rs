//! Big-endian, bit-level I/O over a byte stream.
//!
//! [`BitWriter`] and [`BitReader`] cache pending bits in a register and
//! drain/refill it in whole bytes against an internal buffer, following the
//! same owned-writer / `finish(self) -> Result<W>` / panic-on-unfinished-drop
//! shape as this crate's arithmetic coder (see [`crate::entropy::range`]).
//!
//! The register is conceptually 64 bits wide, as specified by the
//! container format; internally it is tracked in a `u128` scratch value so
//! that an arbitrary `1..=64`-bit write or read never has to special-case a
//! shift-by-64, which is undefined for a `u64`.

use crate::error::{KanziError, Result};
use std::io::{Read, Write};

const DRAIN_THRESHOLD: usize = 1024;

/// Big-endian bit sink. `write_bits` accepts right-aligned values of up to
/// 64 bits; the high bit of the value is emitted first.
pub struct BitWriter<W: Write> {
    sink: W,
    acc: u128,
    nbits: u32,
    buf: Vec<u8>,
    total_bits: u64,
}

impl<W: Write> BitWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            acc: 0,
            nbits: 0,
            buf: Vec::with_capacity(DRAIN_THRESHOLD * 2),
            total_bits: 0,
        }
    }

    /// Writes the low `n` bits of `value`, high bit first. `1 <= n <= 64`.
    pub fn write_bits(&mut self, value: u64, n: u32) -> Result<()> {
        debug_assert!((1..=64).contains(&n), "write_bits: n must be in 1..=64");
        let masked = if n == 64 {
            value
        } else {
            value & ((1u64 << n) - 1)
        };
        self.acc = (self.acc << n) | masked as u128;
        self.nbits += n;
        self.total_bits += n as u64;

        while self.nbits >= 64 {
            let shift = self.nbits - 64;
            let word = (self.acc >> shift) as u64;
            self.buf.extend_from_slice(&word.to_be_bytes());
            self.acc &= (1u128 << shift) - 1;
            self.nbits = shift;
        }
        if self.buf.len() >= DRAIN_THRESHOLD {
            self.drain()?;
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            self.sink.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    /// Total number of bits written so far.
    pub fn written(&self) -> u64 {
        self.total_bits
    }

    /// Pads the final partial register to a byte boundary, writes only the
    /// occupied bytes, flushes the sink, and returns it.
    pub fn close(mut self) -> Result<W> {
        if self.nbits > 0 {
            let pad = (8 - (self.nbits % 8)) % 8;
            if pad > 0 {
                self.acc <<= pad;
                self.nbits += pad;
            }
            let nbytes = (self.nbits / 8) as usize;
            let bytes = self.acc.to_be_bytes();
            // `acc` is stored in a u128; the occupied bits are right-aligned
            // in its low `nbits` bits, so the occupied bytes are the last
            // `nbytes` of the big-endian representation.
            self.buf.extend_from_slice(&bytes[bytes.len() - nbytes..]);
            self.nbits = 0;
            self.acc = 0;
        }
        self.drain()?;
        self.sink.flush()?;
        Ok(self.sink)
    }
}

/// Big-endian bit source, symmetric with [`BitWriter`].
pub struct BitReader<R: Read> {
    source: R,
    acc: u128,
    nbits: u32,
    total_bits: u64,
    eof: bool,
}

impl<R: Read> BitReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            acc: 0,
            nbits: 0,
            total_bits: 0,
            eof: false,
        }
    }

    fn refill_one_byte(&mut self) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }
        let mut byte = [0u8; 1];
        match self.source.read(&mut byte) {
            Ok(0) => {
                self.eof = true;
                Ok(false)
            }
            Ok(_) => {
                self.acc = (self.acc << 8) | byte[0] as u128;
                self.nbits += 8;
                Ok(true)
            }
            Err(e) => Err(KanziError::Io(e)),
        }
    }

    /// Reads `n` right-aligned bits, high bit first. `1 <= n <= 64`.
    pub fn read_bits(&mut self, n: u32) -> Result<u64> {
        debug_assert!((1..=64).contains(&n), "read_bits: n must be in 1..=64");
        while self.nbits < n {
            if !self.refill_one_byte()? {
                return Err(KanziError::EndOfStream);
            }
        }
        let shift = self.nbits - n;
        let mask = if n == 64 { u128::MAX } else { (1u128 << n) - 1 };
        let value = ((self.acc >> shift) & mask) as u64;
        self.acc &= if shift == 0 { 0 } else { (1u128 << shift) - 1 };
        self.nbits = shift;
        self.total_bits += n as u64;
        Ok(value)
    }

    /// Total number of bits consumed so far.
    pub fn read(&self) -> u64 {
        self.total_bits
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_various_widths() {
        let mut w = BitWriter::new(Vec::new());
        let values: &[(u64, u32)] = &[
            (1, 1),
            (0, 1),
            (0b101, 3),
            (0xABCD, 16),
            (0x1234_5678, 32),
            (0xFFFF_FFFF_FFFF_FFFF, 64),
            (0, 7),
            (1, 7),
        ];
        for &(v, n) in values {
            w.write_bits(v, n).unwrap();
        }
        let bytes = w.close().unwrap();

        let mut r = BitReader::new(Cursor::new(bytes));
        for &(v, n) in values {
            let masked = if n == 64 { v } else { v & ((1u64 << n) - 1) };
            assert_eq!(r.read_bits(n).unwrap(), masked);
        }
    }

    #[test]
    fn written_and_read_counts_match() {
        let mut w = BitWriter::new(Vec::new());
        w.write_bits(0x3, 2).unwrap();
        w.write_bits(0x7F, 7).unwrap();
        assert_eq!(w.written(), 9);
        let bytes = w.close().unwrap();

        let mut r = BitReader::new(Cursor::new(bytes));
        r.read_bits(2).unwrap();
        r.read_bits(7).unwrap();
        assert_eq!(r.read(), 9);
    }

    #[test]
    fn underflow_reports_end_of_stream() {
        let bytes = vec![0xFFu8];
        let mut r = BitReader::new(Cursor::new(bytes));
        r.read_bits(8).unwrap();
        assert!(matches!(r.read_bits(1), Err(KanziError::EndOfStream)));
    }

    #[test]
    fn close_pads_to_byte_boundary() {
        let mut w = BitWriter::new(Vec::new());
        w.write_bits(0b101, 3).unwrap();
        let bytes = w.close().unwrap();
        assert_eq!(bytes.len(), 1);
        assert_eq!(bytes[0], 0b1010_0000);
    }
}
