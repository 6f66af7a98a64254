//! `NONE`: the entropy passthrough, used when a block's data is already
//! incompressible or compression is disabled outright.

use super::EntropyCodec;
use crate::error::{KanziError, Result};

#[derive(Default)]
pub struct NullCodec;

impl EntropyCodec for NullCodec {
    fn name(&self) -> &'static str {
        "NONE"
    }

    fn id(&self) -> u8 {
        0
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decode(&self, data: &[u8], decoded_len: usize) -> Result<Vec<u8>> {
        if data.len() != decoded_len {
            return Err(KanziError::InvalidStream(format!(
                "NONE codec: expected {decoded_len} bytes, got {}",
                data.len()
            )));
        }
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_data_through_unchanged() {
        let codec = NullCodec;
        let data = b"the quick brown fox".to_vec();
        let coded = codec.encode(&data).unwrap();
        assert_eq!(coded, data);
        let decoded = codec.decode(&coded, data.len()).unwrap();
        assert_eq!(decoded, data);
    }
}
