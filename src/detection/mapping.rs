use crate::models::{Point2D, QuadCorners};

const MIN_SCALE: f64 = 1e-6;

/// Cumulative resize factor of the current strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleAccumulator {
    factor: f64,
}

impl Default for ScaleAccumulator {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

impl ScaleAccumulator {
    pub fn reset(&mut self) {
        self.factor = 1.0;
    }

    pub fn apply(&mut self, factor: f32) {
        self.factor *= factor as f64;
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

/// Express corners found in a strategy's processed space in source coordinates.
pub fn to_source_space(corners: &QuadCorners, scale: f64) -> QuadCorners {
    let divisor = if scale.is_finite() && scale.abs() >= MIN_SCALE { scale } else { 1.0 };
    corners.map(|p| Point2D::new((p.x as f64 / divisor) as f32, (p.y as f64 / divisor) as f32))
}
