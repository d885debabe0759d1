//! Ordered fallback over decode backends.
//!
//! Each stage pairs one decoder with a sweep of scales and color variants.
//! Stages run in order and the first non-empty payload ends the search.

pub mod binarize;
pub mod providers;

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::{debug, trace};

use crate::memory::ImageLedger;
use binarize::{Channel, Variant};
use providers::{QrDecoder, QuircsDecoder, RqrrDecoder, RxingDecoder};

/// Scales (outer loop) and variants (inner loop) tried by one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    pub scales: Vec<u32>,
    pub variants: Vec<Variant>,
}

impl SweepPlan {
    pub fn new(scales: Vec<u32>, variants: Vec<Variant>) -> Self {
        Self { scales, variants }
    }

    /// Sweep used by the localize-and-decode backend.
    pub fn vendor() -> Self {
        Self::new(
            vec![1, 2],
            vec![
                Variant::Gray,
                Variant::GrayOtsu,
                Variant::GrayOtsuInverted,
                Variant::Channel(Channel::Red),
                Variant::Saturation,
                Variant::SaturationOtsu,
                Variant::SaturationOtsuInverted,
            ],
        )
    }

    /// Sweep shared by the pure-Rust decoders.
    pub fn standard() -> Self {
        let mut variants = vec![Variant::Gray, Variant::GrayOtsu];
        for channel in [Channel::Red, Channel::Green, Channel::Blue] {
            variants.push(Variant::ChannelOtsu { channel, inverted: false });
            variants.push(Variant::ChannelOtsu { channel, inverted: true });
        }
        Self::new(vec![1, 2, 3, 4], variants)
    }

    pub fn attempts(&self) -> usize {
        self.scales.len() * self.variants.len()
    }
}

#[derive(Clone)]
pub struct DecodeStage {
    pub name: String,
    pub decoder: Arc<dyn QrDecoder>,
    pub plan: SweepPlan,
    /// Skip this stage while the vision runtime is unavailable.
    pub requires_runtime: bool,
}

impl std::fmt::Debug for DecodeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeStage")
            .field("name", &self.name)
            .field("decoder", &self.decoder.name())
            .field("plan", &self.plan)
            .field("requires_runtime", &self.requires_runtime)
            .finish()
    }
}

impl DecodeStage {
    pub fn new(name: impl Into<String>, decoder: Arc<dyn QrDecoder>, plan: SweepPlan) -> Self {
        Self {
            name: name.into(),
            decoder,
            plan,
            requires_runtime: false,
        }
    }

    pub fn requiring_runtime(mut self) -> Self {
        self.requires_runtime = true;
        self
    }

    fn run(&self, region: &RgbaImage, ledger: &ImageLedger) -> Option<String> {
        for &scale in &self.plan.scales {
            if scale == 0 {
                continue;
            }
            let scaled = (scale != 1).then(|| {
                ledger.track(imageops::resize(
                    region,
                    region.width() * scale,
                    region.height() * scale,
                    FilterType::Nearest,
                ))
            });
            let scaled: &RgbaImage = scaled.as_deref().unwrap_or(region);

            for variant in &self.plan.variants {
                let input = ledger.track(variant.render(scaled));
                match self.decoder.decode(&input) {
                    Ok(Some(text)) if !text.is_empty() => {
                        debug!(
                            "{} decoded at {}x/{}",
                            self.name,
                            scale,
                            variant.label()
                        );
                        return Some(text);
                    }
                    Ok(_) => trace!("{} {}x/{}: no code", self.name, scale, variant.label()),
                    Err(e) => trace!("{} {}x/{}: {e:#}", self.name, scale, variant.label()),
                }
            }
        }
        None
    }
}

/// The full fallback chain.
#[derive(Debug, Clone)]
pub struct DecodeWaterfall {
    stages: Vec<DecodeStage>,
}

impl Default for DecodeWaterfall {
    fn default() -> Self {
        Self::new(vec![
            DecodeStage::new("vendor", Arc::new(RqrrDecoder), SweepPlan::vendor()).requiring_runtime(),
            DecodeStage::new("primary", Arc::new(QuircsDecoder), SweepPlan::standard()),
            DecodeStage::new("secondary", Arc::new(RxingDecoder), SweepPlan::standard()),
        ])
    }
}

impl DecodeWaterfall {
    pub fn new(stages: Vec<DecodeStage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[DecodeStage] {
        &self.stages
    }

    /// Decode `region`, returning the first non-empty payload any stage finds.
    pub fn decode(&self, region: &RgbaImage, runtime_ready: bool, ledger: &ImageLedger) -> Option<String> {
        if region.width() == 0 || region.height() == 0 {
            return None;
        }

        for stage in &self.stages {
            if stage.requires_runtime && !runtime_ready {
                trace!("{} skipped: runtime unavailable", stage.name);
                continue;
            }
            if let Some(text) = stage.run(region, ledger) {
                return Some(text);
            }
        }
        None
    }
}
