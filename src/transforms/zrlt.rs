//! `ZRLT`: run-length coding specialized for runs of the zero byte
//! (§4.5). Every non-zero byte is incremented by one before being
//! emitted, freeing up value `0` to exclusively mean "a run follows".
//! Values `0xFE`/`0xFF` would overflow that increment, so they are
//! escaped as `(0xFF, v - 0xFE)` instead.
//!
//! Run lengths are written as a unary/binary prefix: every bit of the
//! length except the implicit leading one is emitted as its own literal
//! byte (`0` or `1`), most-significant bit first, so the decoder can tell
//! where the run-length prefix ends by the first `0` literal it is *not*
//! expecting — in practice it reads bits until it has consumed
//! `bit_length(len) - 1` of them, mirroring the encoder exactly.

use super::{SpaceError, Transform, TransformResult};

const ESCAPE: u8 = 0xFF;
const ESCAPE_BASE: u8 = 0xFE;

fn write_run_length(len: u64, out: &mut Vec<u8>) {
    // `len >= 1`; strip the leading 1 bit, emit the rest MSB-first as
    // literal 0/1 bytes terminated implicitly by the escape byte 0 below.
    let nbits = 64 - len.leading_zeros();
    for i in (0..nbits - 1).rev() {
        out.push(((len >> i) & 1) as u8);
    }
    out.push(ESCAPE); // terminator: distinguishes the run-length bits from data
}

struct RunBitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RunBitReader<'a> {
    fn read_run_length(&mut self) -> Option<u64> {
        let mut len: u64 = 1;
        loop {
            let b = *self.data.get(self.pos)?;
            self.pos += 1;
            if b == ESCAPE {
                return Some(len);
            }
            len = (len << 1) | (b as u64 & 1);
        }
    }
}

#[derive(Default)]
pub struct ZrltTransform;

impl Transform for ZrltTransform {
    fn name(&self) -> &'static str {
        "ZRLT"
    }

    fn id(&self) -> u8 {
        6
    }

    fn forward(&mut self, input: &[u8]) -> TransformResult<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        let mut i = 0;
        while i < input.len() {
            if input[i] == 0 {
                let mut run = 0u64;
                while i < input.len() && input[i] == 0 {
                    run += 1;
                    i += 1;
                }
                out.push(0);
                write_run_length(run, &mut out);
            } else {
                let v = input[i];
                if v >= ESCAPE_BASE {
                    out.push(ESCAPE);
                    out.push(v - ESCAPE_BASE);
                } else {
                    out.push(v + 1);
                }
                i += 1;
            }
            if out.len() > input.len() {
                return Err(SpaceError);
            }
        }
        if out.len() >= input.len() && !input.is_empty() {
            return Err(SpaceError);
        }
        Ok(out)
    }

    fn inverse(&mut self, input: &[u8], original_len: usize) -> TransformResult<Vec<u8>> {
        let mut out = Vec::with_capacity(original_len);
        let mut reader = RunBitReader { data: input, pos: 0 };
        while out.len() < original_len {
            let b = *reader.data.get(reader.pos).ok_or(SpaceError)?;
            reader.pos += 1;
            if b == 0 {
                let run = reader.read_run_length().ok_or(SpaceError)?;
                for _ in 0..run {
                    out.push(0);
                }
            } else if b == ESCAPE {
                let extra = *reader.data.get(reader.pos).ok_or(SpaceError)?;
                reader.pos += 1;
                out.push(ESCAPE_BASE + extra);
            } else {
                out.push(b - 1);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let mut t = ZrltTransform;
        let fwd = match t.forward(data) {
            Ok(v) => v,
            Err(SpaceError) => return,
        };
        let inv = t.inverse(&fwd, data.len()).unwrap();
        assert_eq!(inv, data);
    }

    #[test]
    fn roundtrips_run_of_seventeen_zeros() {
        roundtrip(&[0u8; 17]);
    }

    #[test]
    fn roundtrips_mixed_zero_and_nonzero() {
        roundtrip(b"a\0\0\0\0\0b\0\0c");
    }

    #[test]
    fn roundtrips_escape_values() {
        roundtrip(&[0xFEu8, 0xFF, 0x01, 0xFE, 0x00]);
    }

    #[test]
    fn roundtrips_no_zeros() {
        roundtrip(b"hello world, no zero bytes here");
    }

    #[test]
    fn run_length_seventeen_matches_spec_prefix() {
        // len=17=0b10001; strip leading 1 -> "0001"; emitted MSB-first as
        // four literal bytes [0,0,0,1] then the 0xFF terminator.
        let mut out = Vec::new();
        write_run_length(17, &mut out);
        assert_eq!(out, vec![0, 0, 0, 1, ESCAPE]);
    }

    #[test]
    fn empty_input_roundtrips() {
        let mut t = ZrltTransform;
        let fwd = t.forward(&[]).unwrap();
        let inv = t.inverse(&fwd, 0).unwrap();
        assert_eq!(inv, Vec::<u8>::new());
    }
}
