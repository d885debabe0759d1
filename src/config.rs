use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ScanError, ScanResult};

/// Largest validation or rectification canvas side, in pixels.
pub const MAX_TARGET_SIZE: u32 = 4096;

/// Every geometric tolerance and padding ratio the pipeline uses.
///
/// Region extraction, validation and rectification each have their own
/// padding because they serve different purposes: extraction keeps a thin
/// quiet zone, validation re-crops generously around an imprecise box, and
/// rectification insets the warped code inside its canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Margin used by [`crate::region::extract_region`], relative to box size.
    pub region_margin_ratio: f32,
    /// Padding around a candidate's box before the direct decode attempt.
    pub validation_padding_ratio: f32,
    /// Longest side the validation crop is upscaled towards. Never downscales.
    pub validation_target_size: u32,
    /// Inset of the rectified code inside its square canvas. Clamped to 0.5.
    pub rectify_padding_ratio: f32,
    /// Fixed rectified canvas size; the longest quad side when absent.
    pub rectify_target_size: Option<u32>,
    /// Sides shorter than this (in pixels) make a quad degenerate.
    pub min_side_length: f32,
    /// Upper bound on the one-time vision runtime initialization.
    pub runtime_timeout_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            region_margin_ratio: 0.1,
            validation_padding_ratio: 0.3,
            validation_target_size: 960,
            rectify_padding_ratio: 0.15,
            rectify_target_size: None,
            min_side_length: 1.0,
            runtime_timeout_ms: 30_000,
        }
    }
}

impl ScanConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: ScanConfig = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.as_ref().display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn runtime_timeout(&self) -> Duration {
        Duration::from_millis(self.runtime_timeout_ms)
    }

    pub fn validate(&self) -> ScanResult<()> {
        let ratios = [
            ("region_margin_ratio", self.region_margin_ratio),
            ("validation_padding_ratio", self.validation_padding_ratio),
            ("rectify_padding_ratio", self.rectify_padding_ratio),
        ];
        for (name, value) in ratios {
            if !value.is_finite() || value < 0.0 {
                return Err(ScanError::InvalidConfig(format!("{name} must be a non-negative number")));
            }
        }
        let sizes = [
            ("validation_target_size", Some(self.validation_target_size)),
            ("rectify_target_size", self.rectify_target_size),
        ];
        for (name, size) in sizes {
            if let Some(size) = size.filter(|s| !(1..=MAX_TARGET_SIZE).contains(s)) {
                return Err(ScanError::InvalidConfig(format!(
                    "{name} must be between 1 and {MAX_TARGET_SIZE}, got {size}"
                )));
            }
        }
        if !self.min_side_length.is_finite() || self.min_side_length <= 0.0 {
            return Err(ScanError::InvalidConfig("min_side_length must be positive".into()));
        }
        if self.runtime_timeout_ms == 0 {
            return Err(ScanError::InvalidConfig("runtime_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ScanConfig = serde_json::from_str(r#"{ "validation_target_size": 480 }"#).unwrap();
        assert_eq!(config.validation_target_size, 480);
        assert_eq!(config.validation_padding_ratio, 0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn oversized_canvases_are_rejected() {
        let config = ScanConfig { validation_target_size: 960_000, ..ScanConfig::default() };
        assert!(matches!(config.validate(), Err(ScanError::InvalidConfig(_))));

        let config = ScanConfig { rectify_target_size: Some(MAX_TARGET_SIZE + 1), ..ScanConfig::default() };
        assert!(matches!(config.validate(), Err(ScanError::InvalidConfig(_))));

        let config = ScanConfig { rectify_target_size: Some(MAX_TARGET_SIZE), ..ScanConfig::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_ratios_are_rejected() {
        let config = ScanConfig { rectify_padding_ratio: -0.1, ..ScanConfig::default() };
        assert!(matches!(config.validate(), Err(ScanError::InvalidConfig(_))));
    }
}
