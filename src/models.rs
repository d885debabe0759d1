use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// A point in some image coordinate space (processed or source).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn scaled(&self, factor: f32) -> Point2D {
        Point2D::new(self.x * factor, self.y * factor)
    }
}

/// Axis-aligned envelope of a quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn from_points(points: &[Point2D]) -> Self {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        if points.is_empty() {
            return Self { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };
        }

        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }
}

/// Four corners of a detected code, clockwise from top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuadCorners {
    pub top_left: Point2D,
    pub top_right: Point2D,
    pub bottom_right: Point2D,
    pub bottom_left: Point2D,
}

impl QuadCorners {
    pub const CORNER_COUNT: usize = 4;

    pub const fn new(
        top_left: Point2D,
        top_right: Point2D,
        bottom_right: Point2D,
        bottom_left: Point2D,
    ) -> Self {
        Self { top_left, top_right, bottom_right, bottom_left }
    }

    /// Build from a localizer's point list. Anything other than exactly four
    /// points is rejected.
    pub fn from_points(points: &[Point2D]) -> Option<Self> {
        match points {
            [tl, tr, br, bl] => Some(Self::new(*tl, *tr, *br, *bl)),
            _ => None,
        }
    }

    /// Build from a flat `[x0, y0, x1, y1, ...]` list of exactly eight floats.
    pub fn from_flat(coords: &[f32]) -> Option<Self> {
        if coords.len() != Self::CORNER_COUNT * 2 {
            return None;
        }
        let points: Vec<Point2D> = coords
            .chunks_exact(2)
            .map(|c| Point2D::new(c[0], c[1]))
            .collect();
        Self::from_points(&points)
    }

    pub fn points(&self) -> [Point2D; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    pub fn map(&self, f: impl Fn(Point2D) -> Point2D) -> Self {
        Self::new(
            f(self.top_left),
            f(self.top_right),
            f(self.bottom_right),
            f(self.bottom_left),
        )
    }

    /// Top, right, bottom and left edge lengths.
    pub fn side_lengths(&self) -> [f32; 4] {
        [
            self.top_left.distance(&self.top_right),
            self.top_right.distance(&self.bottom_right),
            self.bottom_right.distance(&self.bottom_left),
            self.bottom_left.distance(&self.top_left),
        ]
    }

    /// Signed shoelace area; positive for clockwise order in image coordinates.
    pub fn signed_area(&self) -> f32 {
        let p = self.points();
        let mut sum = 0.0;
        for i in 0..4 {
            let a = p[i];
            let b = p[(i + 1) % 4];
            sum += a.x * b.y - b.x * a.y;
        }
        sum / 2.0
    }

    pub fn is_degenerate(&self, min_side: f32) -> bool {
        let finite = self.points().iter().all(|p| p.x.is_finite() && p.y.is_finite());
        !finite
            || self.side_lengths().iter().any(|&s| s < min_side)
            || self.signed_area().abs() < min_side * min_side
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.points())
    }

    pub fn center(&self) -> Point2D {
        let p = self.points();
        Point2D::new(
            (p[0].x + p[1].x + p[2].x + p[3].x) / 4.0,
            (p[0].y + p[1].y + p[2].y + p[3].y) / 4.0,
        )
    }
}

/// A geometric detection that has not been validated yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCandidate {
    /// Corners in source-image coordinates.
    pub corners: QuadCorners,
    /// Name of the strategy whose preprocessing chain produced the detection.
    pub strategy: String,
}

impl DetectionCandidate {
    pub fn new(corners: QuadCorners, strategy: impl Into<String>) -> Self {
        Self { corners, strategy: strategy.into() }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.corners.bounding_box()
    }

    pub fn center(&self) -> Point2D {
        self.corners.center()
    }
}

impl Serialize for DetectionCandidate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DetectionCandidate", 4)?;
        state.serialize_field("corners", &self.corners)?;
        state.serialize_field("bounding_box", &self.bounding_box())?;
        state.serialize_field("center", &self.center())?;
        state.serialize_field("strategy", &self.strategy)?;
        state.end()
    }
}

/// A candidate whose region decoded to non-empty text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    #[serde(flatten)]
    pub candidate: DetectionCandidate,
    pub text: String,
}

impl DetectionResult {
    /// Promote a candidate; empty text never produces a result.
    pub fn promote(candidate: DetectionCandidate, text: String) -> Option<Self> {
        if text.is_empty() {
            None
        } else {
            Some(Self { candidate, text })
        }
    }

    pub fn corners(&self) -> &QuadCorners {
        &self.candidate.corners
    }

    pub fn strategy(&self) -> &str {
        &self.candidate.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(origin: f32, side: f32) -> QuadCorners {
        QuadCorners::new(
            Point2D::new(origin, origin),
            Point2D::new(origin + side, origin),
            Point2D::new(origin + side, origin + side),
            Point2D::new(origin, origin + side),
        )
    }

    #[test]
    fn corner_count_must_be_exactly_four() {
        let p = Point2D::new(1.0, 1.0);
        assert!(QuadCorners::from_points(&[p, p, p]).is_none());
        assert!(QuadCorners::from_points(&[p, p, p, p, p]).is_none());
        assert!(QuadCorners::from_flat(&[0.0; 7]).is_none());
        assert!(QuadCorners::from_flat(&[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]).is_some());
    }

    #[test]
    fn bounding_box_and_center_follow_corners() {
        let quad = square(10.0, 20.0);
        let bbox = quad.bounding_box();
        assert_eq!(bbox, BoundingBox { x: 10.0, y: 10.0, width: 20.0, height: 20.0 });
        assert_eq!(quad.center(), Point2D::new(20.0, 20.0));
    }

    #[test]
    fn collapsed_quads_are_degenerate() {
        assert!(!square(0.0, 10.0).is_degenerate(1.0));
        assert!(square(0.0, 0.5).is_degenerate(1.0));

        let line = QuadCorners::new(
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(20.0, 0.0),
            Point2D::new(30.0, 0.0),
        );
        assert!(line.is_degenerate(1.0));
    }

    #[test]
    fn empty_text_is_never_promoted() {
        let candidate = DetectionCandidate::new(square(0.0, 10.0), "identity");
        assert!(DetectionResult::promote(candidate.clone(), String::new()).is_none());
        let result = DetectionResult::promote(candidate, "HELLO".into()).unwrap();
        assert_eq!(result.text, "HELLO");
        assert_eq!(result.strategy(), "identity");
    }
}
