use std::ops::Deref;
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::{GrayImage, RgbaImage};
use tracing::trace;

use crate::detection::mapping::ScaleAccumulator;
use crate::detection::strategy::Strategy;
use crate::error::ScanResult;
use crate::memory::{ImageLedger, Scratch};

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// Prepare a debug directory.
    /// The directory must be empty or non-existent
    pub fn prepare(output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        Ok(Self { output_dir })
    }

    /// Path for the final working image of strategy number `index`
    /// (e.g. "03_blur_sharpen.png")
    pub fn strategy_path(&self, index: usize, strategy: &str) -> PathBuf {
        self.output_dir.join(format!("{:02}_{}.png", index, slug(strategy)))
    }

    /// Path for the rectified crop of strategy number `index`
    pub fn rectified_path(&self, index: usize, strategy: &str) -> PathBuf {
        self.output_dir
            .join(format!("{:02}_{}_rectified.png", index, slug(strategy)))
    }

    pub fn save_gray(&self, path: &Path, image: &GrayImage) -> Result<()> {
        image
            .save(path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))
    }

    pub fn save_rgba(&self, path: &Path, image: &RgbaImage) -> Result<()> {
        image
            .save(path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))
    }
}

fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// The image a strategy hands to the localizer.
///
/// The identity strategy borrows the base image; any other strategy owns the
/// output of its last step.
pub enum WorkingImage<'a> {
    Base(&'a GrayImage),
    Owned(Scratch<GrayImage>),
}

impl Deref for WorkingImage<'_> {
    type Target = GrayImage;

    fn deref(&self) -> &GrayImage {
        match self {
            WorkingImage::Base(image) => image,
            WorkingImage::Owned(image) => image,
        }
    }
}

/// Run one strategy's chain over `base`.
///
/// Each step's output replaces the previous working image, which is released
/// right away. The accumulator starts at 1 and collects every resize.
pub fn run_chain<'a>(
    base: &'a GrayImage,
    strategy: &Strategy,
    ledger: &ImageLedger,
) -> ScanResult<(WorkingImage<'a>, ScaleAccumulator)> {
    let mut scale = ScaleAccumulator::default();
    let mut working = WorkingImage::Base(base);

    for op in strategy.operations.iter() {
        trace!("Strategy '{}': {}", strategy.name(), op.name());
        let next = ledger.track(op.apply(&working)?);
        if let Some(factor) = op.scale_factor() {
            scale.apply(factor);
        }
        working = WorkingImage::Owned(next);
    }

    Ok((working, scale))
}
