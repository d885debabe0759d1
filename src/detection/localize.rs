use image::GrayImage;

use crate::models::Point2D;

/// External capability that finds a code in a single-channel image.
///
/// Returns the reported corner points (normally four, clockwise from the
/// top-left) or `None` when nothing was found. The caller decides whether the
/// reported points form a usable quadrilateral.
pub trait Localizer: Send + Sync {
    fn name(&self) -> &str;

    fn locate(&self, image: &GrayImage) -> anyhow::Result<Option<Vec<Point2D>>>;
}

/// Localization through rqrr's capstone/grid detector.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrLocalizer;

impl Localizer for RqrrLocalizer {
    fn name(&self) -> &str {
        "rqrr"
    }

    fn locate(&self, image: &GrayImage) -> anyhow::Result<Option<Vec<Point2D>>> {
        let (width, height) = image.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            width as usize,
            height as usize,
            |x, y| image.get_pixel(x as u32, y as u32)[0],
        );
        let grids = prepared.detect_grids();

        Ok(grids.first().map(|grid| {
            grid.bounds
                .iter()
                .map(|p| Point2D::new(p.x as f32, p.y as f32))
                .collect()
        }))
    }
}
