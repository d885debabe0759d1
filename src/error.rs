use std::time::Duration;

use thiserror::Error;

/// Failures raised inside the scanning pipeline.
///
/// None of these escape the public entry points of [`crate::Detector`]; they
/// are logged and turned into an absent result there.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    InvalidBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("image has zero width or height")]
    EmptyImage,

    #[error("invalid scale factor {0}")]
    InvalidScale(f32),

    #[error("quadrilateral is degenerate")]
    DegenerateQuad,

    #[error("no projective transform maps the quadrilateral onto the output square")]
    ProjectionUnavailable,

    #[error("vision runtime failed to initialize: {0}")]
    RuntimeInit(String),

    #[error("vision runtime not ready after {0:?}")]
    RuntimeTimeout(Duration),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
