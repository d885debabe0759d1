use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::filter::{box_filter, gaussian_blur_f32};
use imageproc::map::map_colors;

use crate::decode::binarize::{histogram, otsu_level};
use crate::error::{ScanError, ScanResult};

pub const SHARPEN_KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];
pub const SHARPEN_STRONG_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Convert image to grayscale
pub fn to_grayscale(img: &RgbaImage) -> GrayImage {
    imageops::grayscale(img)
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Global histogram equalization
pub fn equalize(img: &GrayImage) -> GrayImage {
    imageproc::contrast::equalize_histogram(img)
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `tile_grid` x `tile_grid` mesh; each tile gets a
/// clipped-histogram lookup table and pixels blend the four nearest tables
/// bilinearly so tile seams do not show.
pub fn enhance_contrast(img: &GrayImage, clip_limit: f32, tile_grid: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let tiles_x = tile_grid.clamp(1, width);
    let tiles_y = tile_grid.clamp(1, height);
    let x_bounds: Vec<u32> = (0..=tiles_x).map(|i| i * width / tiles_x).collect();
    let y_bounds: Vec<u32> = (0..=tiles_y).map(|i| i * height / tiles_y).collect();

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y as usize {
        for tx in 0..tiles_x as usize {
            let mut hist = [0u32; 256];
            for y in y_bounds[ty]..y_bounds[ty + 1] {
                for x in x_bounds[tx]..x_bounds[tx + 1] {
                    hist[img.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = (x_bounds[tx + 1] - x_bounds[tx]) * (y_bounds[ty + 1] - y_bounds[ty]);
            luts.push(clipped_lut(hist, area, clip_limit));
        }
    }

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;
    let lut = |tx: u32, ty: u32, v: usize| luts[(ty * tiles_x + tx) as usize][v] as f32;

    GrayImage::from_fn(width, height, |x, y| {
        let gx = (x as f32 + 0.5) / tile_w - 0.5;
        let gy = (y as f32 + 0.5) / tile_h - 0.5;
        let x0 = gx.floor().clamp(0.0, (tiles_x - 1) as f32) as u32;
        let y0 = gy.floor().clamp(0.0, (tiles_y - 1) as f32) as u32;
        let x1 = (x0 + 1).min(tiles_x - 1);
        let y1 = (y0 + 1).min(tiles_y - 1);
        let fx = (gx - x0 as f32).clamp(0.0, 1.0);
        let fy = (gy - y0 as f32).clamp(0.0, 1.0);

        let v = img.get_pixel(x, y)[0] as usize;
        let top = lut(x0, y0, v) * (1.0 - fx) + lut(x1, y0, v) * fx;
        let bottom = lut(x0, y1, v) * (1.0 - fx) + lut(x1, y1, v) * fx;
        Luma([(top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8])
    })
}

fn clipped_lut(mut hist: [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for count in hist.iter_mut() {
            if *count > limit {
                excess += *count - limit;
                *count = limit;
            }
        }

        // Spread the clipped mass evenly, leftovers on a regular stride.
        let bonus = excess / 256;
        let residual = (excess % 256) as usize;
        for count in hist.iter_mut() {
            *count += bonus;
        }
        if residual > 0 {
            let stride = (256 / residual).max(1);
            for i in (0..256).step_by(stride).take(residual) {
                hist[i] += 1;
            }
        }
    }

    let scale = 255.0 / area as f32;
    let mut cumulative = 0u32;
    for (value, count) in hist.iter().enumerate() {
        cumulative += count;
        lut[value] = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Convolve with a 3x3 kernel, replicating border pixels.
pub fn convolve3x3(img: &GrayImage, kernel: &[f32; 9]) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut out = GrayImage::new(width, height);
    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;

    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for ky in 0..3i64 {
                for kx in 0..3i64 {
                    let sx = (x as i64 + kx - 1).clamp(0, max_x) as u32;
                    let sy = (y as i64 + ky - 1).clamp(0, max_y) as u32;
                    acc += kernel[(ky * 3 + kx) as usize] * img.get_pixel(sx, sy)[0] as f32;
                }
            }
            out.put_pixel(x, y, Luma([acc.round().clamp(0.0, 255.0) as u8]));
        }
    }

    out
}

pub fn sharpen(img: &GrayImage) -> GrayImage {
    convolve3x3(img, &SHARPEN_KERNEL)
}

pub fn sharpen_strong(img: &GrayImage) -> GrayImage {
    convolve3x3(img, &SHARPEN_STRONG_KERNEL)
}

/// Global binarization at the Otsu level.
pub fn otsu_threshold(img: &GrayImage) -> GrayImage {
    let (hist, total) = histogram(img.pixels().map(|p| p[0]));
    let level = otsu_level(&hist, total);
    map_colors(img, |p| Luma([if p[0] > level { 255 } else { 0 }]))
}

/// Gaussian sigma matching a `block_size` square kernel.
pub fn gaussian_sigma_for_block(block_size: u32) -> f32 {
    0.3 * ((block_size.max(3) as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

pub fn adaptive_threshold_gaussian(img: &GrayImage, block_size: u32, bias: i16) -> GrayImage {
    let local = gaussian_blur_f32(img, gaussian_sigma_for_block(block_size));
    threshold_against(img, &local, bias)
}

pub fn adaptive_threshold_mean(img: &GrayImage, block_size: u32, bias: i16) -> GrayImage {
    let radius = block_size / 2;
    let local = box_filter(img, radius, radius);
    threshold_against(img, &local, bias)
}

fn threshold_against(img: &GrayImage, local: &GrayImage, bias: i16) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let value = img.get_pixel(x, y)[0] as i16;
        let cutoff = local.get_pixel(x, y)[0] as i16 - bias;
        Luma([if value > cutoff { 255 } else { 0 }])
    })
}

/// Morphological closing (fills small holes)
pub fn morph_close(img: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::close(img, Norm::LInf, radius)
}

/// Morphological opening (removes speckles)
pub fn morph_open(img: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::open(img, Norm::LInf, radius)
}

/// Uniform resize: bicubic when enlarging, area averaging when shrinking.
pub fn scale_by(img: &GrayImage, factor: f32) -> ScanResult<GrayImage> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(ScanError::InvalidScale(factor));
    }

    let (width, height) = img.dimensions();
    let scaled_w = ((width as f32 * factor).round() as u32).max(1);
    let scaled_h = ((height as f32 * factor).round() as u32).max(1);

    if factor >= 1.0 {
        Ok(imageops::resize(img, scaled_w, scaled_h, FilterType::CatmullRom))
    } else {
        Ok(imageops::thumbnail(img, scaled_w, scaled_h))
    }
}
