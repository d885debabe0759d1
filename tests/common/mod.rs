#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from qrsift for tests
pub use qrsift::detection::strategy::{Strategy, DEFAULT_STRATEGIES};
pub use qrsift::{DetectionResult, Detector, Point2D, QuadCorners, ScanConfig};
