// src/jb2/mod.rs

pub mod context;
pub mod djvu_jb2_encoder;
pub mod encoder;
pub mod error;
pub mod num_coder;
pub mod record;
pub mod relative;
pub mod symbol_dict;
pub mod types;

pub use types::{Jb2Blit, Jb2Dict, Jb2Image, Jb2Shape};
pub use djvu_jb2_encoder::DjvuJb2Encoder;
