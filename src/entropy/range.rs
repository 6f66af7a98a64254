//! `RANGE`: an order-0, multi-symbol range coder (§4.4.2) with a header
//! built from the shared [`alphabet`](super::alphabet) codec.
//!
//! The coding core is the classic carry-propagating byte-oriented range
//! coder (cache + cache_size scheme), same shape LZMA-family coders use.
//! The header records which symbols occur in the block and their
//! normalized frequencies out of a fixed `1 << LOG_RANGE` total; decoding
//! walks the resulting cumulative table to recover each symbol.

use super::alphabet::{normalize_frequencies, read_alphabet, read_frequencies, write_alphabet, write_frequencies};
use super::EntropyCodec;
use crate::bitio::{BitReader, BitWriter};
use crate::error::{KanziError, Result};
use std::io::{Cursor, Read, Write};

const LOG_RANGE: u32 = 12;
const SCALE: u32 = 1 << LOG_RANGE;
const TOP: u32 = 1 << 24;

struct RawRangeEncoder<W: Write> {
    low: u64,
    range: u32,
    cache: u8,
    cache_size: u64,
    sink: Option<W>,
}

impl<W: Write> RawRangeEncoder<W> {
    fn new(sink: W) -> Self {
        Self {
            low: 0,
            range: 0xFFFF_FFFF,
            cache: 0xFF,
            cache_size: 1,
            sink: Some(sink),
        }
    }

    fn shift_low(&mut self) -> Result<()> {
        if (self.low as u32) < 0xFF00_0000 || (self.low >> 32) != 0 {
            let carry = (self.low >> 32) as u8;
            let mut temp = self.cache;
            loop {
                self.sink
                    .as_mut()
                    .unwrap()
                    .write_all(&[temp.wrapping_add(carry)])?;
                temp = 0xFF;
                self.cache_size -= 1;
                if self.cache_size == 0 {
                    break;
                }
            }
            self.cache = (self.low >> 24) as u8;
        }
        self.cache_size += 1;
        self.low = (self.low << 8) & 0xFFFF_FFFF;
        Ok(())
    }

    fn encode(&mut self, cum_freq: u32, freq: u32, tot_freq: u32) -> Result<()> {
        let r = self.range / tot_freq;
        self.low += (r * cum_freq) as u64;
        self.range = r * freq;
        while self.range < TOP {
            self.range <<= 8;
            self.shift_low()?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<W> {
        for _ in 0..5 {
            self.shift_low()?;
        }
        Ok(self.sink.take().unwrap())
    }
}

impl<W: Write> Drop for RawRangeEncoder<W> {
    fn drop(&mut self) {
        if self.sink.is_some() {
            panic!("RawRangeEncoder dropped without calling finish()");
        }
    }
}

struct RawRangeDecoder<R: Read> {
    range: u32,
    code: u32,
    source: R,
}

impl<R: Read> RawRangeDecoder<R> {
    fn new(mut source: R) -> Result<Self> {
        let mut first = [0u8; 1];
        source.read_exact(&mut first)?;
        let mut code = 0u32;
        for _ in 0..4 {
            let mut b = [0u8; 1];
            source.read_exact(&mut b)?;
            code = (code << 8) | b[0] as u32;
        }
        Ok(Self {
            range: 0xFFFF_FFFF,
            code,
            source,
        })
    }

    fn get_freq(&mut self, tot_freq: u32) -> u32 {
        self.range /= tot_freq;
        (self.code / self.range).min(tot_freq - 1)
    }

    fn decode(&mut self, cum_freq: u32, freq: u32) -> Result<()> {
        self.code -= cum_freq * self.range;
        self.range *= freq;
        while self.range < TOP {
            let mut b = [0u8; 1];
            let n = self.source.read(&mut b)?;
            let byte = if n == 1 { b[0] } else { 0 };
            self.code = (self.code << 8) | byte as u32;
            self.range <<= 8;
        }
        Ok(())
    }
}

fn build_cumulative(freqs: &[u32]) -> Vec<u32> {
    let mut cum = Vec::with_capacity(freqs.len() + 1);
    let mut acc = 0u32;
    cum.push(0);
    for &f in freqs {
        acc += f;
        cum.push(acc);
    }
    cum
}

#[derive(Default)]
pub struct RangeCodec;

impl EntropyCodec for RangeCodec {
    fn name(&self) -> &'static str {
        "RANGE"
    }

    fn id(&self) -> u8 {
        2
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut counts = [0u32; 256];
        for &b in data {
            counts[b as usize] += 1;
        }
        let symbols: Vec<u8> = (0..256u16)
            .filter(|&v| counts[v as usize] > 0)
            .map(|v| v as u8)
            .collect();

        let mut bw = BitWriter::new(Vec::new());
        bw.write_bits(data.len() as u64, 32)?;
        if symbols.is_empty() {
            bw.write_bits(0, 1)?; // empty-alphabet marker
            return bw.close();
        }
        bw.write_bits(1, 1)?;
        write_alphabet(&mut bw, &symbols)?;

        let raw_counts: Vec<u32> = symbols.iter().map(|&s| counts[s as usize]).collect();
        let freqs = normalize_frequencies(&raw_counts, SCALE);
        write_frequencies(&mut bw, &freqs, LOG_RANGE)?;
        let header = bw.close()?;

        let mut rank_of = [0u16; 256];
        for (rank, &s) in symbols.iter().enumerate() {
            rank_of[s as usize] = rank as u16;
        }
        let cum = build_cumulative(&freqs);

        let mut enc = RawRangeEncoder::new(Vec::with_capacity(data.len()));
        for &b in data {
            let rank = rank_of[b as usize] as usize;
            enc.encode(cum[rank], freqs[rank], SCALE)?;
        }
        let body = enc.finish()?;

        let mut out = header;
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn decode(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>> {
        let mut br = BitReader::new(Cursor::new(data));
        let declared_len = br.read_bits(32)? as usize;
        if declared_len != decoded_len {
            return Err(KanziError::InvalidStream(format!(
                "RANGE codec: declared length {declared_len} != expected {decoded_len}"
            )));
        }
        let has_symbols = br.read_bits(1)?;
        if has_symbols == 0 {
            return Ok(Vec::new());
        }
        let symbols = read_alphabet(&mut br)?;
        let (freqs, _log_range) = read_frequencies(&mut br, symbols.len(), SCALE)?;
        let cum = build_cumulative(&freqs);

        // The bit reader consumes whole bytes only at refill time; recover
        // the exact header length in bytes from the bits consumed so far.
        let header_bits = br.read();
        let header_bytes = ((header_bits + 7) / 8) as usize;
        let body = &data[header_bytes..];

        let mut dec = RawRangeDecoder::new(Cursor::new(body))?;
        let mut out = Vec::with_capacity(decoded_len);
        for _ in 0..decoded_len {
            let freq_val = dec.get_freq(SCALE);
            // Locate the rank whose cumulative interval contains freq_val.
            let rank = match cum.binary_search(&freq_val) {
                Ok(i) => i,
                Err(i) => i - 1,
            };
            dec.decode(cum[rank], freqs[rank])?;
            out.push(symbols[rank]);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let codec = RangeCodec;
        let coded = codec.encode(data).unwrap();
        let decoded = codec.decode(&coded, data.len()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn roundtrips_empty_input() {
        roundtrip(&[]);
    }

    #[test]
    fn roundtrips_single_symbol_run() {
        roundtrip(&[42u8; 500]);
    }

    #[test]
    fn roundtrips_skewed_alphabet() {
        let mut data = Vec::new();
        for i in 0..3000u32 {
            data.push(if i % 10 == 0 { b'x' } else { b'a' });
        }
        roundtrip(&data);
    }

    #[test]
    fn compresses_skewed_data() {
        let data: Vec<u8> = (0..5000u32).map(|i| if i % 20 == 0 { 1 } else { 0 }).collect();
        let codec = RangeCodec;
        let coded = codec.encode(&data).unwrap();
        assert!(coded.len() < data.len());
    }

    #[test]
    fn roundtrips_full_alphabet() {
        let data: Vec<u8> = (0..=255u16).cycle().take(4000).map(|v| v as u8).collect();
        roundtrip(&data);
    }
}
