/// Error types for asset decoding and viewer state
use thiserror::Error;

use crate::animation::CardPhase;

#[derive(Debug, Error, PartialEq)]
pub enum StlError {
    #[error("file too small to be a valid STL")]
    TooSmall,
    #[error("unexpected end of file after {parsed} of {expected} triangles")]
    Truncated { parsed: usize, expected: usize },
    #[error("failed to parse ASCII STL: {0}")]
    Ascii(String),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unrecognized asset format")]
    UnknownFormat,
    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("glTF buffer {index} is not embedded (uri: {uri})")]
    ExternalBuffer { index: usize, uri: String },
    #[error("glTF buffer {0} is missing its binary chunk")]
    MissingBinary(usize),
    #[error(transparent)]
    Stl(#[from] StlError),
    #[error("asset contains no triangles")]
    Empty,
}

#[derive(Debug, Error, PartialEq)]
pub enum HdrError {
    #[error("not a Radiance HDR file")]
    BadMagic,
    #[error("unsupported pixel format {0:?}")]
    UnsupportedFormat(String),
    #[error("malformed header: {0}")]
    Header(String),
    #[error("image data ends early at scanline {0}")]
    Truncated(usize),
    #[error("corrupt run-length data in scanline {0}")]
    BadScanline(usize),
}

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("object has no geometry")]
    Empty,
    #[error("object has no extent (largest dimension {0})")]
    Degenerate(f32),
    #[error("target size must be positive, got {0}")]
    InvalidTarget(f32),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("card cannot go from {from:?} to {to:?}")]
pub struct PhaseError {
    pub from: CardPhase,
    pub to: CardPhase,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid viewer configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("target size must be positive, got {0}")]
    TargetSize(f32),
    #[error("gallery has no entries")]
    NoEntries,
}
