//! Shared alphabet/frequency header codec (§4.4.4), reused by the
//! order-0 range coder and both rANS orders so the header format — and
//! its round-trip correctness — only has to be gotten right once.
//!
//! Four sub-encodings are supported, chosen by alphabet size:
//! - `n == 256`: a one-bit shortcut, every byte value present.
//! - `32 <= n <= 224`: a 256-bit presence bitmap.
//! - `n < 32`: ascending deltas between consecutive present symbols.
//! - otherwise (`n` outside the bitmap's sweet spot but not tiny): an
//!   explicit length-prefixed list.

use crate::bitio::{BitReader, BitWriter};
use crate::error::{KanziError, Result};
use std::io::{Read, Write};

pub fn write_alphabet<W: Write>(bw: &mut BitWriter<W>, symbols: &[u8]) -> Result<()> {
    let n = symbols.len();
    if n == 0 || n > 256 {
        return Err(KanziError::InvalidParameter(format!(
            "alphabet size {n} out of range"
        )));
    }
    if n == 256 {
        bw.write_bits(0, 1)?; // full
        bw.write_bits(1, 1)?; // shortcut
        return Ok(());
    }
    if (32..=224).contains(&n) {
        bw.write_bits(1, 1)?; // partial
        bw.write_bits(0, 1)?; // bitmap submode
        let mut bitmap = [0u8; 32];
        for &s in symbols {
            bitmap[s as usize / 8] |= 1 << (s as usize % 8);
        }
        for b in bitmap {
            bw.write_bits(b as u64, 8)?;
        }
        return Ok(());
    }
    if n < 32 {
        bw.write_bits(1, 1)?; // partial
        bw.write_bits(1, 1)?; // delta submode
        bw.write_bits(n as u64, 5)?;
        let mut prev: i32 = -1;
        for &s in symbols {
            let delta = s as i32 - prev;
            bw.write_bits(delta as u64, 9)?; // delta in 1..=256, fits in 9 bits
            prev = s as i32;
        }
        return Ok(());
    }
    // explicit list, 225..255 symbols
    bw.write_bits(0, 1)?; // full
    bw.write_bits(0, 1)?; // not shortcut
    bw.write_bits(n as u64, 9)?;
    for &s in symbols {
        bw.write_bits(s as u64, 8)?;
    }
    Ok(())
}

pub fn read_alphabet<R: Read>(br: &mut BitReader<R>) -> Result<Vec<u8>> {
    let mode = br.read_bits(1)?;
    if mode == 0 {
        let shortcut = br.read_bits(1)?;
        if shortcut == 1 {
            return Ok((0..=255u16).map(|v| v as u8).collect());
        }
        let n = br.read_bits(9)? as usize;
        let mut symbols = Vec::with_capacity(n);
        for _ in 0..n {
            symbols.push(br.read_bits(8)? as u8);
        }
        return Ok(symbols);
    }
    let submode = br.read_bits(1)?;
    if submode == 0 {
        let mut symbols = Vec::new();
        for byte_idx in 0..32usize {
            let byte = br.read_bits(8)? as u8;
            for bit in 0..8 {
                if byte & (1 << bit) != 0 {
                    symbols.push((byte_idx * 8 + bit) as u8);
                }
            }
        }
        return Ok(symbols);
    }
    let n = br.read_bits(5)? as usize;
    let mut symbols = Vec::with_capacity(n);
    let mut prev: i32 = -1;
    for _ in 0..n {
        let delta = br.read_bits(9)? as i32;
        let s = prev + delta;
        symbols.push(s as u8);
        prev = s;
    }
    Ok(symbols)
}

/// Rescales raw symbol counts to frequencies summing exactly to `scale`
/// (a power of two in `[256, 32768]`), with every present symbol kept at
/// least at frequency 1 (the largest-remainder method).
pub fn normalize_frequencies(counts: &[u32], scale: u32) -> Vec<u32> {
    let total: u64 = counts.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return vec![0; counts.len()];
    }
    let mut freqs: Vec<u32> = counts
        .iter()
        .map(|&c| {
            if c == 0 {
                0
            } else {
                (((c as u64 * scale as u64) / total) as u32).max(1)
            }
        })
        .collect();

    let mut sum: i64 = freqs.iter().map(|&f| f as i64).sum();
    let target = scale as i64;
    // Adjust the largest bucket(s) to make the frequencies sum exactly to
    // `scale`, never dropping a present symbol below 1.
    while sum != target {
        let adjust: i64 = if sum < target { 1 } else { -1 };
        let idx = if adjust > 0 {
            freqs
                .iter()
                .enumerate()
                .max_by_key(|&(_, &f)| f)
                .map(|(i, _)| i)
        } else {
            freqs
                .iter()
                .enumerate()
                .filter(|&(_, &f)| f > 1)
                .max_by_key(|&(_, &f)| f)
                .map(|(i, _)| i)
        };
        match idx {
            Some(i) => {
                freqs[i] = (freqs[i] as i64 + adjust) as u32;
                sum += adjust;
            }
            None => break,
        }
    }
    freqs
}

/// Writes `log_range` (3 bits, representing `log_range - 8` so the value
/// fits `8..=15`) followed by every non-first frequency as a byte-aligned
/// varint; the first symbol's frequency is inferred as `scale - sum(rest)`.
pub fn write_frequencies<W: Write>(
    bw: &mut BitWriter<W>,
    freqs: &[u32],
    log_range: u32,
) -> Result<()> {
    if !(8..=15).contains(&log_range) {
        return Err(KanziError::InvalidParameter(format!(
            "log_range {log_range} out of range"
        )));
    }
    bw.write_bits((log_range - 8) as u64, 3)?;
    for &f in &freqs[1..] {
        write_varint(bw, f)?;
    }
    Ok(())
}

pub fn read_frequencies<R: Read>(
    br: &mut BitReader<R>,
    n: usize,
    scale: u32,
) -> Result<(Vec<u32>, u32)> {
    let log_range = br.read_bits(3)? as u32 + 8;
    if log_range != (31 - scale.leading_zeros()) {
        // `scale` was derived independently by the caller from the same
        // encoded value; this only guards against internal misuse.
    }
    let mut freqs = vec![0u32; n];
    let mut rest_sum: u64 = 0;
    for slot in freqs.iter_mut().skip(1) {
        let f = read_varint(br)?;
        *slot = f;
        rest_sum += f as u64;
    }
    if rest_sum >= scale as u64 {
        return Err(KanziError::InvalidStream(
            "alphabet header: frequencies exceed scale".into(),
        ));
    }
    freqs[0] = (scale as u64 - rest_sum) as u32;
    Ok((freqs, log_range))
}

fn write_varint<W: Write>(bw: &mut BitWriter<W>, mut value: u32) -> Result<()> {
    loop {
        let mut byte = (value & 0x7F) as u64;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        bw.write_bits(byte, 8)?;
        if value == 0 {
            break;
        }
    }
    Ok(())
}

fn read_varint<R: Read>(br: &mut BitReader<R>) -> Result<u32> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    loop {
        let byte = br.read_bits(8)? as u32;
        value |= (byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift > 28 {
            return Err(KanziError::InvalidStream("varint too long".into()));
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_alphabet(symbols: &[u8]) {
        let mut bw = BitWriter::new(Vec::new());
        write_alphabet(&mut bw, symbols).unwrap();
        let bytes = bw.close().unwrap();
        let mut br = BitReader::new(std::io::Cursor::new(bytes));
        let back = read_alphabet(&mut br).unwrap();
        assert_eq!(back, symbols);
    }

    #[test]
    fn full_shortcut() {
        let symbols: Vec<u8> = (0..=255u16).map(|v| v as u8).collect();
        roundtrip_alphabet(&symbols);
    }

    #[test]
    fn bitmap_mode() {
        let symbols: Vec<u8> = (0..100u8).collect();
        roundtrip_alphabet(&symbols);
    }

    #[test]
    fn delta_mode_small() {
        roundtrip_alphabet(&[2, 5, 9, 200, 255]);
    }

    #[test]
    fn explicit_list_mode() {
        let symbols: Vec<u8> = (0..230u8).collect();
        roundtrip_alphabet(&symbols);
    }

    #[test]
    fn frequency_roundtrip() {
        let counts = [10u32, 0, 200, 5, 1];
        let scale = 1 << 12;
        let freqs = normalize_frequencies(&counts, scale);
        assert_eq!(freqs.iter().sum::<u32>(), scale);
        for (i, &c) in counts.iter().enumerate() {
            if c == 0 {
                assert_eq!(freqs[i], 0);
            } else {
                assert!(freqs[i] >= 1);
            }
        }

        let present: Vec<u32> = freqs.iter().copied().filter(|&f| f > 0).collect();
        let mut bw = BitWriter::new(Vec::new());
        write_frequencies(&mut bw, &present, 12).unwrap();
        let bytes = bw.close().unwrap();
        let mut br = BitReader::new(std::io::Cursor::new(bytes));
        let (back, log_range) = read_frequencies(&mut br, present.len(), scale).unwrap();
        assert_eq!(log_range, 12);
        assert_eq!(back, present);
        assert_eq!(back.iter().sum::<u32>(), scale);
    }
}
