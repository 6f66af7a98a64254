//! `NONE`: identity transform, filtered out of a multi-stage sequence
//! except when it is the sole configured stage.

use super::{Transform, TransformResult};

#[derive(Default)]
pub struct NoneTransform;

impl Transform for NoneTransform {
    fn name(&self) -> &'static str {
        "NONE"
    }

    fn id(&self) -> u8 {
        0
    }

    fn forward(&mut self, input: &[u8]) -> TransformResult<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn inverse(&mut self, input: &[u8], _original_len: usize) -> TransformResult<Vec<u8>> {
        Ok(input.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_unchanged() {
        let mut t = NoneTransform;
        let data = b"anything at all".to_vec();
        let fwd = t.forward(&data).unwrap();
        assert_eq!(fwd, data);
        let inv = t.inverse(&fwd, data.len()).unwrap();
        assert_eq!(inv, data);
    }
}
