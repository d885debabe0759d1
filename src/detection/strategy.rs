use std::borrow::Cow;

use crate::detection::steps::OperationKind;
use crate::detection::steps::OperationKind::{Equalize, OtsuThreshold, ScaleBy, Sharpen, SharpenStrong};

/// A named preprocessing chain tried before one localization attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: Cow<'static, str>,
    pub operations: Cow<'static, [OperationKind]>,
}

impl Strategy {
    pub const fn new(name: &'static str, operations: &'static [OperationKind]) -> Self {
        Self {
            name: Cow::Borrowed(name),
            operations: Cow::Borrowed(operations),
        }
    }

    pub fn owned(name: impl Into<String>, operations: Vec<OperationKind>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            operations: Cow::Owned(operations),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_identity(&self) -> bool {
        self.operations.is_empty()
    }
}

const BLUR: OperationKind = OperationKind::BLUR;
const CONTRAST: OperationKind = OperationKind::CONTRAST;
const ADAPTIVE: OperationKind = OperationKind::ADAPTIVE_GAUSSIAN;
const ADAPTIVE_MEAN: OperationKind = OperationKind::ADAPTIVE_MEAN;
const CLOSE: OperationKind = OperationKind::MORPH_CLOSE;
const OPEN: OperationKind = OperationKind::MORPH_OPEN;

/// Built-in catalog, cheapest and most likely first. Upscaling is the most
/// expensive operation and only helps tiny codes, so it comes last.
pub const DEFAULT_STRATEGIES: &[Strategy] = &[
    // Original and single filters
    Strategy::new("original", &[]),
    Strategy::new("blur", &[BLUR]),
    Strategy::new("equalize", &[Equalize]),
    Strategy::new("contrast", &[CONTRAST]),
    // Sharpening
    Strategy::new("sharpen", &[Sharpen]),
    Strategy::new("sharpen-strong", &[SharpenStrong]),
    Strategy::new("blur+sharpen", &[BLUR, Sharpen]),
    Strategy::new("contrast+sharpen", &[CONTRAST, Sharpen]),
    // Binarization
    Strategy::new("otsu", &[OtsuThreshold]),
    Strategy::new("adaptive-gaussian", &[ADAPTIVE]),
    Strategy::new("adaptive-mean", &[ADAPTIVE_MEAN]),
    Strategy::new("contrast+otsu", &[CONTRAST, OtsuThreshold]),
    Strategy::new("blur+adaptive", &[BLUR, ADAPTIVE]),
    // Morphology
    Strategy::new("morph-close", &[CLOSE]),
    Strategy::new("morph-open", &[OPEN]),
    Strategy::new("otsu+close", &[OtsuThreshold, CLOSE]),
    Strategy::new("adaptive+open", &[ADAPTIVE, OPEN]),
    // 2x
    Strategy::new("scale-2x", &[ScaleBy(2.0)]),
    Strategy::new("scale-2x+sharpen", &[ScaleBy(2.0), Sharpen]),
    Strategy::new("scale-2x+contrast", &[ScaleBy(2.0), CONTRAST]),
    Strategy::new("scale-2x+otsu", &[ScaleBy(2.0), OtsuThreshold]),
    Strategy::new("scale-2x+contrast+sharpen", &[ScaleBy(2.0), CONTRAST, Sharpen]),
    Strategy::new("scale-2x+blur+adaptive", &[ScaleBy(2.0), BLUR, ADAPTIVE]),
    // 3x
    Strategy::new("scale-3x", &[ScaleBy(3.0)]),
    Strategy::new("scale-3x+sharpen", &[ScaleBy(3.0), Sharpen]),
    Strategy::new("scale-3x+contrast", &[ScaleBy(3.0), CONTRAST]),
    Strategy::new("scale-3x+otsu", &[ScaleBy(3.0), OtsuThreshold]),
    Strategy::new("scale-3x+contrast+sharpen-strong", &[ScaleBy(3.0), CONTRAST, SharpenStrong]),
    // 4x, last resort
    Strategy::new("scale-4x", &[ScaleBy(4.0)]),
    Strategy::new("scale-4x+contrast", &[ScaleBy(4.0), CONTRAST]),
    Strategy::new("scale-4x+blur+sharpen", &[ScaleBy(4.0), BLUR, Sharpen]),
    Strategy::new("scale-4x+contrast+otsu", &[ScaleBy(4.0), CONTRAST, OtsuThreshold]),
];

pub fn default_catalog() -> Vec<Strategy> {
    DEFAULT_STRATEGIES.to_vec()
}
