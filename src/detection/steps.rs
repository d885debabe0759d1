use image::GrayImage;

use crate::detection::preprocessing;
use crate::error::{ScanError, ScanResult};

/// One preprocessing operation and its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperationKind {
    /// Gaussian blur
    Blur { sigma: f32 },
    /// Global histogram equalization
    Equalize,
    /// Tile-based contrast-limited equalization
    Contrast { clip_limit: f32, tile_grid: u32 },
    Sharpen,
    SharpenStrong,
    OtsuThreshold,
    AdaptiveThresholdGaussian { block_size: u32, bias: i16 },
    AdaptiveThresholdMean { block_size: u32, bias: i16 },
    MorphClose { radius: u8 },
    MorphOpen { radius: u8 },
    /// Uniform resize; the only operation that changes coordinate scale.
    ScaleBy(f32),
}

impl OperationKind {
    pub const BLUR: Self = Self::Blur { sigma: 1.1 };
    pub const CONTRAST: Self = Self::Contrast { clip_limit: 2.0, tile_grid: 8 };
    pub const ADAPTIVE_GAUSSIAN: Self = Self::AdaptiveThresholdGaussian { block_size: 11, bias: 2 };
    pub const ADAPTIVE_MEAN: Self = Self::AdaptiveThresholdMean { block_size: 11, bias: 2 };
    pub const MORPH_CLOSE: Self = Self::MorphClose { radius: 1 };
    pub const MORPH_OPEN: Self = Self::MorphOpen { radius: 1 };

    /// Short label used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blur { .. } => "blur",
            Self::Equalize => "equalize",
            Self::Contrast { .. } => "contrast",
            Self::Sharpen => "sharpen",
            Self::SharpenStrong => "sharpen-strong",
            Self::OtsuThreshold => "otsu",
            Self::AdaptiveThresholdGaussian { .. } => "adaptive-gaussian",
            Self::AdaptiveThresholdMean { .. } => "adaptive-mean",
            Self::MorphClose { .. } => "morph-close",
            Self::MorphOpen { .. } => "morph-open",
            Self::ScaleBy(_) => "scale",
        }
    }

    /// Scale factor this operation contributes to the coordinate mapping.
    pub fn scale_factor(&self) -> Option<f32> {
        match self {
            Self::ScaleBy(factor) => Some(*factor),
            _ => None,
        }
    }

    /// Apply the operation, producing a new image. The input is never modified.
    pub fn apply(&self, img: &GrayImage) -> ScanResult<GrayImage> {
        if img.width() == 0 || img.height() == 0 {
            return Err(ScanError::EmptyImage);
        }

        let out = match *self {
            Self::Blur { sigma } => {
                if !(sigma.is_finite() && sigma > 0.0) {
                    return Err(ScanError::InvalidConfig(format!("blur sigma {sigma}")));
                }
                preprocessing::apply_blur(img, sigma)
            }
            Self::Equalize => preprocessing::equalize(img),
            Self::Contrast { clip_limit, tile_grid } => {
                preprocessing::enhance_contrast(img, clip_limit, tile_grid)
            }
            Self::Sharpen => preprocessing::sharpen(img),
            Self::SharpenStrong => preprocessing::sharpen_strong(img),
            Self::OtsuThreshold => preprocessing::otsu_threshold(img),
            Self::AdaptiveThresholdGaussian { block_size, bias } => {
                preprocessing::adaptive_threshold_gaussian(img, block_size, bias)
            }
            Self::AdaptiveThresholdMean { block_size, bias } => {
                preprocessing::adaptive_threshold_mean(img, block_size, bias)
            }
            Self::MorphClose { radius } => preprocessing::morph_close(img, radius),
            Self::MorphOpen { radius } => preprocessing::morph_open(img, radius),
            Self::ScaleBy(factor) => preprocessing::scale_by(img, factor)?,
        };

        Ok(out)
    }
}
