//! Crate-wide error type.
//!
//! Mirrors the closed error-kind set of the container format: I/O errors
//! from the underlying reader/writer, malformed headers or frames, bit
//! reader underflow, checksum mismatches and unsupported codec ids.
//! `transforms::SpaceError` is a distinct, local type that never reaches
//! `KanziError` — it is fully consumed by the transform sequence or the
//! block pipeline.

use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum KanziError {
    InvalidParameter(String),
    InvalidStream(String),
    EndOfStream,
    StreamClosed,
    Io(io::Error),
    IncorrectChecksum {
        block: u64,
        expected: u32,
        actual: u32,
    },
    UnsupportedCodec(u32),
    BlockTooLarge(usize),
}

impl fmt::Display for KanziError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KanziError::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            KanziError::InvalidStream(msg) => write!(f, "invalid stream: {msg}"),
            KanziError::EndOfStream => write!(f, "unexpected end of stream"),
            KanziError::StreamClosed => write!(f, "stream already closed"),
            KanziError::Io(err) => write!(f, "I/O error: {err}"),
            KanziError::IncorrectChecksum {
                block,
                expected,
                actual,
            } => write!(
                f,
                "checksum mismatch for block {block}: expected {expected:08x}, got {actual:08x}"
            ),
            KanziError::UnsupportedCodec(id) => write!(f, "unsupported codec id {id}"),
            KanziError::BlockTooLarge(n) => write!(f, "block too large: {n} bytes"),
        }
    }
}

impl Error for KanziError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            KanziError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for KanziError {
    fn from(err: io::Error) -> Self {
        KanziError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, KanziError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            KanziError::InvalidParameter("bad block size".into()).to_string(),
            "invalid parameter: bad block size"
        );
        assert_eq!(
            KanziError::IncorrectChecksum {
                block: 3,
                expected: 0xDEADBEEF,
                actual: 0x0
            }
            .to_string(),
            "checksum mismatch for block 3: expected deadbeef, got 00000000"
        );
    }

    #[test]
    fn from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        let err: KanziError = io_err.into();
        assert!(matches!(err, KanziError::Io(_)));
    }
}
