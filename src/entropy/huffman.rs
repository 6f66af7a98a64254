//! `HUFFMAN`: canonical Huffman coding with a maximum code length of 24
//! bits (§4.4.1). Code lengths come from the package-merge algorithm
//! (the standard reduction of length-limited Huffman coding to the coin
//! collector's problem), which is the textbook approach whenever an
//! unrestricted Huffman tree would exceed the length cap — 256-symbol
//! blocks essentially never need it, but skewed small alphabets can.

use super::alphabet::{normalize_frequencies, read_alphabet, write_alphabet};
use super::EntropyCodec;
use crate::bitio::{BitReader, BitWriter};
use crate::error::{KanziError, Result};
use std::io::Cursor;

const MAX_LENGTH: u32 = 24;
const LENGTH_BITS: u32 = 5; // ceil(log2(MAX_LENGTH + 1))

/// Length-limited Huffman code lengths via package-merge.
fn package_merge(weights: &[u64], limit: u32) -> Vec<u32> {
    let n = weights.len();
    if n == 1 {
        return vec![1];
    }

    let mut leaves: Vec<(u64, Vec<u16>)> = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| (w.max(1), vec![i as u16]))
        .collect();
    leaves.sort_by_key(|&(w, _)| w);

    let mut cur = leaves.clone();
    for _ in 1..limit {
        let mut packaged = Vec::with_capacity(cur.len() / 2);
        let mut i = 0;
        while i + 1 < cur.len() {
            let w = cur[i].0 + cur[i + 1].0;
            let mut syms = cur[i].1.clone();
            syms.extend(cur[i + 1].1.iter().copied());
            packaged.push((w, syms));
            i += 2;
        }
        let mut merged = Vec::with_capacity(packaged.len() + leaves.len());
        merged.extend(packaged);
        merged.extend(leaves.clone());
        merged.sort_by_key(|&(w, _)| w);
        cur = merged;
    }

    let take = 2 * n - 2;
    let mut lengths = vec![0u32; n];
    for (_, syms) in cur.into_iter().take(take) {
        for s in syms {
            lengths[s as usize] += 1;
        }
    }
    lengths
}

/// Canonical codes assigned in (length, symbol) order: the standard
/// DEFLATE-style construction.
fn canonical_codes(lengths: &[u32]) -> Vec<u32> {
    let max_len = lengths.iter().copied().max().unwrap_or(0) as usize;
    let mut bl_count = vec![0u32; max_len + 1];
    for &l in lengths {
        bl_count[l as usize] += 1;
    }
    bl_count[0] = 0;

    let mut next_code = vec![0u32; max_len + 2];
    let mut code = 0u32;
    for len in 1..=max_len {
        code = (code + bl_count[len - 1]) << 1;
        next_code[len] = code;
    }

    let mut codes = vec![0u32; lengths.len()];
    let mut assign = next_code.clone();
    for (i, &l) in lengths.iter().enumerate() {
        if l > 0 {
            codes[i] = assign[l as usize];
            assign[l as usize] += 1;
        }
    }
    codes
}

#[derive(Default)]
pub struct HuffmanCodec;

impl EntropyCodec for HuffmanCodec {
    fn name(&self) -> &'static str {
        "HUFFMAN"
    }

    fn id(&self) -> u8 {
        1
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut counts = [0u64; 256];
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
            bw.write_bits(0, 1)?;
            return bw.close();
        }
        bw.write_bits(1, 1)?;
        write_alphabet(&mut bw, &symbols)?;

        let weights: Vec<u64> = symbols.iter().map(|&s| counts[s as usize]).collect();
        let lengths = package_merge(&weights, MAX_LENGTH);
        for &l in &lengths {
            bw.write_bits(l as u64, LENGTH_BITS)?;
        }
        let codes = canonical_codes(&lengths);

        let mut code_of = [(0u32, 0u32); 256]; // (code, length) by byte value
        for (i, &s) in symbols.iter().enumerate() {
            code_of[s as usize] = (codes[i], lengths[i]);
        }
        for &b in data {
            let (code, len) = code_of[b as usize];
            bw.write_bits(code as u64, len)?;
        }
        bw.close()
    }

    fn decode(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>> {
        let mut br = BitReader::new(Cursor::new(data));
        let declared_len = br.read_bits(32)? as usize;
        if declared_len != decoded_len {
            return Err(KanziError::InvalidStream(format!(
                "HUFFMAN codec: declared length {declared_len} != expected {decoded_len}"
            )));
        }
        let has_symbols = br.read_bits(1)?;
        if has_symbols == 0 {
            return Ok(Vec::new());
        }
        let symbols = read_alphabet(&mut br)?;
        let mut lengths = Vec::with_capacity(symbols.len());
        for _ in 0..symbols.len() {
            lengths.push(br.read_bits(LENGTH_BITS)? as u32);
        }
        let codes = canonical_codes(&lengths);

        // Canonical-decode tables: symbols sorted by (length, code) order
        // for each length, plus the first code value issued at that length.
        let max_len = lengths.iter().copied().max().unwrap_or(0) as usize;
        let mut bl_count = vec![0u32; max_len + 1];
        for &l in &lengths {
            bl_count[l as usize] += 1;
        }
        let mut first_code = vec![0u32; max_len + 2];
        let mut first_index = vec![0usize; max_len + 2];
        let mut code = 0u32;
        let mut index = 0usize;
        for len in 1..=max_len {
            first_code[len] = code;
            first_index[len] = index;
            code = (code + bl_count[len]) << 1;
            index += bl_count[len] as usize;
        }

        let mut sorted_symbols = symbols.clone();
        sorted_symbols.sort_by_key(|&s| {
            let pos = symbols.iter().position(|&x| x == s).unwrap();
            (lengths[pos], codes[pos])
        });

        let mut out = Vec::with_capacity(decoded_len);
        for _ in 0..decoded_len {
            let mut acc = 0u32;
            let mut found = false;
            for len in 1..=max_len {
                acc = (acc << 1) | br.read_bits(1)? as u32;
                if bl_count[len] == 0 {
                    continue;
                }
                if acc >= first_code[len] && (acc - first_code[len]) < bl_count[len] {
                    let sym_idx = first_index[len] + (acc - first_code[len]) as usize;
                    out.push(sorted_symbols[sym_idx]);
                    found = true;
                    break;
                }
            }
            if !found {
                return Err(KanziError::InvalidStream(
                    "HUFFMAN codec: no matching code found".into(),
                ));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let codec = HuffmanCodec;
        let coded = codec.encode(data).unwrap();
        let decoded = codec.decode(&coded, data.len()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn roundtrips_empty_input() {
        roundtrip(&[]);
    }

    #[test]
    fn roundtrips_single_symbol() {
        roundtrip(&[7u8; 100]);
    }

    #[test]
    fn roundtrips_two_symbols() {
        let data: Vec<u8> = (0..200u32).map(|i| if i % 2 == 0 { 1 } else { 2 }).collect();
        roundtrip(&data);
    }

    #[test]
    fn roundtrips_skewed_text() {
        let data = b"aaaaaaaaaaaaaaaaaaaabbbbbbbbbccccccddddee".to_vec();
        roundtrip(&data);
    }

    #[test]
    fn roundtrips_full_alphabet_uniform() {
        let data: Vec<u8> = (0..=255u16).cycle().take(2560).map(|v| v as u8).collect();
        roundtrip(&data);
    }

    #[test]
    fn compresses_skewed_data() {
        let data: Vec<u8> = (0..5000u32).map(|i| if i % 50 == 0 { 1 } else { 0 }).collect();
        let codec = HuffmanCodec;
        let coded = codec.encode(&data).unwrap();
        assert!(coded.len() < data.len());
    }

    #[test]
    fn length_limited_code_handles_fibonacci_weights() {
        // Fibonacci-weighted frequencies are the classic case that drives
        // unrestricted Huffman tree depth past any small limit.
        let mut weights = vec![1u64, 1];
        while weights.len() < 40 {
            let n = weights.len();
            weights.push(weights[n - 1] + weights[n - 2]);
        }
        let lengths = package_merge(&weights, MAX_LENGTH);
        assert!(lengths.iter().all(|&l| l >= 1 && l <= MAX_LENGTH));
    }
}
