use image::RgbaImage;
use tracing::debug;

use crate::config::ScanConfig;
use crate::decode::DecodeWaterfall;
use crate::memory::ImageLedger;
use crate::models::{BoundingBox, DetectionCandidate};
use crate::rectify::rectify;
use crate::region::{padded_roi, upscaled_crop};

/// Accepts a geometric candidate only if its region actually decodes.
///
/// Two attempts are made against the full-resolution surface: a padded,
/// upscaled crop of the candidate's bounding box, then the perspective
/// corrected quad.
pub struct ValidationOracle<'a> {
    pub waterfall: &'a DecodeWaterfall,
    pub config: &'a ScanConfig,
    pub ledger: &'a ImageLedger,
    pub runtime_ready: bool,
}

impl ValidationOracle<'_> {
    /// Decode the padded, upscaled crop around `bbox`.
    pub fn decode_box(&self, surface: &RgbaImage, bbox: &BoundingBox) -> Option<String> {
        let rect = padded_roi(
            bbox,
            self.config.validation_padding_ratio,
            surface.width(),
            surface.height(),
        )?;
        let crop = self.ledger.track(upscaled_crop(surface, rect, self.config.validation_target_size));
        self.waterfall.decode(&crop, self.runtime_ready, self.ledger)
    }

    /// Validate `candidate`, handing the rectified crop to `inspect` if one is
    /// produced.
    pub fn validate(
        &self,
        surface: &RgbaImage,
        candidate: &DetectionCandidate,
        mut inspect: impl FnMut(&RgbaImage),
    ) -> Option<String> {
        if let Some(text) = self.decode_box(surface, &candidate.bounding_box()) {
            return Some(text);
        }

        let rectified = match rectify(
            surface,
            &candidate.corners,
            self.config.rectify_target_size,
            self.config.rectify_padding_ratio,
            self.config.min_side_length,
        ) {
            Ok(image) => self.ledger.track(image),
            Err(e) => {
                debug!("Rectification skipped for {}: {}", candidate.strategy, e);
                return None;
            }
        };
        inspect(&rectified);
        self.waterfall.decode(&rectified, self.runtime_ready, self.ledger)
    }
}
