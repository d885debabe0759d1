pub mod localize;
pub mod mapping;
pub mod preprocessing;
pub mod steps;
pub mod strategy;

use std::path::PathBuf;
use std::sync::Arc;

use image::{GrayImage, RgbaImage};
use tracing::{debug, info, trace, warn};

use crate::config::ScanConfig;
use crate::decode::DecodeWaterfall;
use crate::error::{ScanError, ScanResult};
use crate::memory::ImageLedger;
use crate::models::{BoundingBox, DetectionCandidate, DetectionResult, QuadCorners};
use crate::pipeline::{run_chain, DebugConfig};
use crate::runtime::VisionRuntime;
use crate::validation::ValidationOracle;
use localize::{Localizer, RqrrLocalizer};
use mapping::to_source_space;
use strategy::Strategy;

/// Main detection engine: search the strategy catalog until a candidate
/// decodes.
pub struct Detector {
    config: ScanConfig,
    catalog: Vec<Strategy>,
    localizer: Arc<dyn Localizer>,
    waterfall: DecodeWaterfall,
    runtime: Arc<VisionRuntime>,
    debug: Option<DebugConfig>,
    ledger: ImageLedger,
}

impl Detector {
    pub fn new() -> Self {
        Self {
            config: ScanConfig::default(),
            catalog: strategy::default_catalog(),
            localizer: Arc::new(RqrrLocalizer),
            waterfall: DecodeWaterfall::default(),
            runtime: VisionRuntime::global(),
            debug: None,
            ledger: ImageLedger::new(),
        }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: Vec<Strategy>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = localizer;
        self
    }

    pub fn with_waterfall(mut self, waterfall: DecodeWaterfall) -> Self {
        self.waterfall = waterfall;
        self
    }

    pub fn with_runtime(mut self, runtime: Arc<VisionRuntime>) -> Self {
        self.runtime = runtime;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        self.debug = Some(DebugConfig::prepare(output_dir)?);
        Ok(self)
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn catalog(&self) -> &[Strategy] {
        &self.catalog
    }

    /// Created/released accounting for every intermediate image this detector
    /// has produced.
    pub fn ledger(&self) -> &ImageLedger {
        &self.ledger
    }

    /// Locate and decode a QR code in an RGBA8 frame.
    ///
    /// `source` is the full-resolution surface used for validation crops and
    /// rectification; the frame itself is used when it is absent. Returns
    /// `None` when no strategy produced a candidate that decodes, and on any
    /// internal failure.
    pub async fn detect(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        source: Option<&RgbaImage>,
    ) -> Option<DetectionResult> {
        if let Err(e) = self.runtime.ensure_ready().await {
            warn!("Detection aborted: {}", e);
            return None;
        }

        let frame = match frame_from_pixels(pixels, width, height) {
            Ok(frame) => self.ledger.track(frame),
            Err(e) => {
                warn!("Detection aborted: {}", e);
                return None;
            }
        };
        let surface = source.unwrap_or(&*frame);
        let gray = self.ledger.track(preprocessing::to_grayscale(&frame));

        info!(
            "Scanning {}x{} frame with {} strategies ({} localizer)",
            width,
            height,
            self.catalog.len(),
            self.localizer.name()
        );

        for (index, strategy) in self.catalog.iter().enumerate() {
            if index > 0 {
                tokio::task::yield_now().await;
            }
            if let Some(result) = self.try_strategy(index + 1, strategy, &gray, surface) {
                info!("QR code found by strategy '{}'", strategy.name());
                return Some(result);
            }
        }

        info!("No QR code found after {} strategies", self.catalog.len());
        None
    }

    /// Run the decode waterfall alone on an already cropped region.
    pub async fn decode(&self, region: &RgbaImage) -> Option<String> {
        let runtime_ready = self.runtime_ready().await;
        let text = self.waterfall.decode(region, runtime_ready, &self.ledger);
        match &text {
            Some(_) => info!("Region decoded"),
            None => info!("Region did not decode"),
        }
        text
    }

    /// Decode a known box of `surface` the way validation does: pad, crop,
    /// upscale, then run the waterfall.
    pub async fn decode_region(&self, surface: &RgbaImage, bbox: &BoundingBox) -> Option<String> {
        let runtime_ready = self.runtime_ready().await;
        self.oracle(runtime_ready).decode_box(surface, bbox)
    }

    async fn runtime_ready(&self) -> bool {
        match self.runtime.ensure_ready().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Decoding without vision runtime: {}", e);
                false
            }
        }
    }

    fn oracle(&self, runtime_ready: bool) -> ValidationOracle<'_> {
        ValidationOracle {
            waterfall: &self.waterfall,
            config: &self.config,
            ledger: &self.ledger,
            runtime_ready,
        }
    }

    fn try_strategy(
        &self,
        index: usize,
        strategy: &Strategy,
        gray: &GrayImage,
        surface: &RgbaImage,
    ) -> Option<DetectionResult> {
        let (working, scale) = match run_chain(gray, strategy, &self.ledger) {
            Ok(chain) => chain,
            Err(e) => {
                debug!("Strategy '{}' failed during preprocessing: {}", strategy.name(), e);
                return None;
            }
        };

        if let Some(debug) = &self.debug {
            let path = debug.strategy_path(index, strategy.name());
            if let Err(e) = debug.save_gray(&path, &working) {
                warn!("{e:#}");
            }
        }

        let points = match self.localizer.locate(&working) {
            Ok(Some(points)) => points,
            Ok(None) => {
                trace!("Strategy '{}': nothing localized", strategy.name());
                return None;
            }
            Err(e) => {
                debug!("Strategy '{}' failed during localization: {e:#}", strategy.name());
                return None;
            }
        };
        drop(working);

        let Some(corners) = QuadCorners::from_points(&points) else {
            debug!(
                "Strategy '{}': localizer reported {} corners",
                strategy.name(),
                points.len()
            );
            return None;
        };

        let candidate = DetectionCandidate::new(
            to_source_space(&corners, scale.factor()),
            strategy.name(),
        );
        debug!(
            "Strategy '{}': candidate at {:?} (scale {:.2})",
            strategy.name(),
            candidate.bounding_box(),
            scale.factor()
        );

        let text = self.oracle(true).validate(surface, &candidate, |rectified| {
            if let Some(debug) = &self.debug {
                let path = debug.rectified_path(index, strategy.name());
                if let Err(e) = debug.save_rgba(&path, rectified) {
                    warn!("{e:#}");
                }
            }
        });

        match text {
            Some(text) => DetectionResult::promote(candidate, text),
            None => {
                debug!("Strategy '{}': candidate did not decode", strategy.name());
                None
            }
        }
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}

fn frame_from_pixels(pixels: &[u8], width: u32, height: u32) -> ScanResult<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(ScanError::EmptyImage);
    }
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(ScanError::InvalidBuffer {
            width,
            height,
            expected,
            actual: pixels.len(),
        });
    }
    RgbaImage::from_raw(width, height, pixels.to_vec()).ok_or(ScanError::InvalidBuffer {
        width,
        height,
        expected,
        actual: pixels.len(),
    })
}
