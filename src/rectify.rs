use image::RgbaImage;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use crate::error::{ScanError, ScanResult};
use crate::models::QuadCorners;
use crate::region::WHITE;

/// Largest inset allowed on each side of the rectified canvas.
const MAX_PADDING_RATIO: f32 = 0.5;

/// Warp the quadrilateral `quad` of `surface` onto an axis-aligned square.
///
/// The canvas is `target_size` pixels wide, or the longest quad side when no
/// size is given. The code is inset by `padding_ratio` of the canvas on every
/// side and everything outside the quad is white.
pub fn rectify(
    surface: &RgbaImage,
    quad: &QuadCorners,
    target_size: Option<u32>,
    padding_ratio: f32,
    min_side: f32,
) -> ScanResult<RgbaImage> {
    if surface.width() == 0 || surface.height() == 0 {
        return Err(ScanError::EmptyImage);
    }
    if quad.is_degenerate(min_side) {
        return Err(ScanError::DegenerateQuad);
    }

    let longest = quad.side_lengths().into_iter().fold(0.0f32, f32::max);
    let size = target_size.unwrap_or(longest.round() as u32).max(1);
    let ratio = if padding_ratio.is_finite() { padding_ratio.clamp(0.0, MAX_PADDING_RATIO) } else { 0.0 };
    let pad = (size as f32 * ratio).round();
    let far = size as f32 - pad;

    let from = quad.points().map(|p| (p.x, p.y));
    let to = [(pad, pad), (far, pad), (far, far), (pad, far)];
    let projection = Projection::from_control_points(from, to).ok_or(ScanError::ProjectionUnavailable)?;

    let mut out = RgbaImage::from_pixel(size, size, WHITE);
    warp_into(surface, &projection, Interpolation::Bilinear, WHITE, &mut out);

    // Only the quad itself is carried over; the inset margin stays blank.
    let (lo, hi) = (pad as u32, far as u32);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        if x < lo || y < lo || x >= hi || y >= hi {
            *pixel = WHITE;
        }
    }
    Ok(out)
}
