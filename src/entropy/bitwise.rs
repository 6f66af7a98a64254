//! Predictor-driven entropy codecs: `FPAQ`, `CM` and `TPAQ` (§4.3, §4.4).
//! Each wraps the [`binary_range`](super::binary_range) coder around one of
//! this crate's [`Predictor`] implementations, coding every byte MSB-first.

use super::binary_range::{BinaryRangeDecoder, BinaryRangeEncoder};
use super::EntropyCodec;
use crate::error::Result;
use crate::predictors::{CmPredictor, FpaqPredictor, Predictor, TpaqPredictor};
use std::io::Cursor;

fn encode_bytes<P: Predictor>(data: &[u8], mut predictor: P) -> Result<Vec<u8>> {
    let mut enc = BinaryRangeEncoder::new(Vec::with_capacity(data.len()));
    for &byte in data {
        for i in (0..8).rev() {
            let bit = (byte >> i) & 1 != 0;
            enc.encode_bit(bit, &mut predictor)?;
        }
    }
    enc.finish()
}

fn decode_bytes<P: Predictor>(data: &[u8], decoded_len: usize, mut predictor: P) -> Result<Vec<u8>> {
    let mut dec = BinaryRangeDecoder::new(Cursor::new(data))?;
    let mut out = Vec::with_capacity(decoded_len);
    for _ in 0..decoded_len {
        let mut byte = 0u8;
        for _ in 0..8 {
            let bit = dec.decode_bit(&mut predictor)?;
            byte = (byte << 1) | bit as u8;
        }
        out.push(byte);
    }
    Ok(out)
}

#[derive(Default)]
pub struct FpaqCodec;

impl EntropyCodec for FpaqCodec {
    fn name(&self) -> &'static str {
        "FPAQ"
    }

    fn id(&self) -> u8 {
        4
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        encode_bytes(data, FpaqPredictor::default())
    }

    fn decode(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>> {
        decode_bytes(data, decoded_len, FpaqPredictor::default())
    }
}

#[derive(Default)]
pub struct CmCodec;

impl EntropyCodec for CmCodec {
    fn name(&self) -> &'static str {
        "CM"
    }

    fn id(&self) -> u8 {
        5
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        encode_bytes(data, CmPredictor::new())
    }

    fn decode(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>> {
        decode_bytes(data, decoded_len, CmPredictor::new())
    }
}

#[derive(Default)]
pub struct TpaqCodec;

impl EntropyCodec for TpaqCodec {
    fn name(&self) -> &'static str {
        "TPAQ"
    }

    fn id(&self) -> u8 {
        6
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        encode_bytes(data, TpaqPredictor::new())
    }

    fn decode(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>> {
        decode_bytes(data, decoded_len, TpaqPredictor::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(codec: &dyn EntropyCodec, data: &[u8]) {
        let coded = codec.encode(data).unwrap();
        let decoded = codec.decode(&coded, data.len()).unwrap();
        assert_eq!(decoded, data, "codec {} failed to roundtrip", codec.name());
    }

    #[test]
    fn fpaq_roundtrips_and_compresses_skewed_data() {
        let data: Vec<u8> = (0..5000u32).map(|i| if i % 11 == 0 { 0xFF } else { 0 }).collect();
        roundtrip(&FpaqCodec, &data);
        let coded = FpaqCodec.encode(&data).unwrap();
        assert!(coded.len() < data.len());
    }

    #[test]
    fn cm_roundtrips_repetitive_text() {
        let data = b"abcabcabcabcabcabcabcabcabcabcabcabcabcabcabc".repeat(20);
        roundtrip(&CmCodec, &data);
        let coded = CmCodec.encode(&data).unwrap();
        assert!(coded.len() < data.len());
    }

    #[test]
    fn tpaq_roundtrips_mixed_data() {
        let mut data = Vec::new();
        for i in 0..3000u32 {
            data.push((i % 5) as u8);
        }
        roundtrip(&TpaqCodec, &data);
    }

    #[test]
    fn roundtrips_empty_input() {
        roundtrip(&FpaqCodec, &[]);
        roundtrip(&CmCodec, &[]);
        roundtrip(&TpaqCodec, &[]);
    }
}
