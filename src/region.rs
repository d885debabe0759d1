//! Cropping and recomposition of code regions.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::models::BoundingBox;

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Integer pixel rectangle inside a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Grow `bbox` by `ratio` of its size on every side and clamp it to a
/// `surface_width` x `surface_height` surface.
///
/// The origin is floored and the extent ceiled, so the padded box never loses
/// a partially covered pixel. Returns `None` when nothing is left after
/// clamping.
pub fn padded_roi(bbox: &BoundingBox, ratio: f32, surface_width: u32, surface_height: u32) -> Option<PixelRect> {
    let values = [bbox.x, bbox.y, bbox.width, bbox.height, ratio];
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let pad_x = bbox.width * ratio;
    let pad_y = bbox.height * ratio;

    let x = (bbox.x - pad_x).floor().max(0.0) as i64;
    let y = (bbox.y - pad_y).floor().max(0.0) as i64;
    let width = (surface_width as i64 - x).min((bbox.width + pad_x * 2.0).ceil() as i64);
    let height = (surface_height as i64 - y).min((bbox.height + pad_y * 2.0).ceil() as i64);

    if width <= 0 || height <= 0 {
        return None;
    }

    Some(PixelRect {
        x: x as u32,
        y: y as u32,
        width: width as u32,
        height: height as u32,
    })
}

fn crop(surface: &RgbaImage, rect: PixelRect) -> RgbaImage {
    imageops::crop_imm(surface, rect.x, rect.y, rect.width, rect.height).to_image()
}

/// Cut a candidate's box, plus a thin quiet-zone margin, out of the surface.
pub fn extract_region(surface: &RgbaImage, bbox: &BoundingBox, margin_ratio: f32) -> Option<RgbaImage> {
    let rect = padded_roi(bbox, margin_ratio, surface.width(), surface.height())?;
    Some(crop(surface, rect))
}

/// Crop `rect` and enlarge it so its longest side reaches `target_size`.
///
/// Never shrinks. Sampling is nearest-neighbour so module edges stay hard, and
/// the result sits on an opaque white background.
pub fn upscaled_crop(surface: &RgbaImage, rect: PixelRect, target_size: u32) -> RgbaImage {
    let max_side = rect.width.max(rect.height) as f32;
    let scale = (target_size as f32 / max_side).max(1.0);
    let width = ((rect.width as f32 * scale).round() as u32).max(1);
    let height = ((rect.height as f32 * scale).round() as u32).max(1);

    compose_for_decode(
        &crop(surface, rect),
        &ComposeOptions {
            target_width: Some(width),
            target_height: Some(height),
            smoothing: false,
            ..ComposeOptions::default()
        },
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOptions {
    /// Border added around the drawn image, in pixels.
    pub padding: u32,
    pub background: Rgba<u8>,
    pub target_width: Option<u32>,
    pub target_height: Option<u32>,
    /// Bicubic resampling when set, nearest-neighbour otherwise.
    pub smoothing: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            padding: 0,
            background: WHITE,
            target_width: None,
            target_height: None,
            smoothing: true,
        }
    }
}

/// Redraw `image` at the requested size on a padded background canvas.
pub fn compose_for_decode(image: &RgbaImage, options: &ComposeOptions) -> RgbaImage {
    let width = options.target_width.unwrap_or(image.width()).max(1);
    let height = options.target_height.unwrap_or(image.height()).max(1);
    let pad = options.padding;

    let mut canvas = RgbaImage::from_pixel(width + pad * 2, height + pad * 2, options.background);
    if image.width() == 0 || image.height() == 0 {
        return canvas;
    }

    let filter = if options.smoothing { FilterType::CatmullRom } else { FilterType::Nearest };
    let drawn = if (width, height) == image.dimensions() {
        image.clone()
    } else {
        imageops::resize(image, width, height, filter)
    };
    imageops::overlay(&mut canvas, &drawn, pad as i64, pad as i64);
    canvas
}
