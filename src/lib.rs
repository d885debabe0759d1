pub mod config;
pub mod decode;
pub mod detection;
pub mod error;
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod rectify;
pub mod region;
pub mod runtime;
pub mod validation;

pub use config::ScanConfig;
pub use decode::{DecodeStage, DecodeWaterfall, SweepPlan};
pub use detection::Detector;
pub use error::{ScanError, ScanResult};
pub use models::{BoundingBox, DetectionCandidate, DetectionResult, Point2D, QuadCorners};
pub use pipeline::DebugConfig;
pub use region::{compose_for_decode, extract_region, ComposeOptions};
pub use runtime::{RuntimeLoader, VisionRuntime};
