//! Detection boxes in image pixel coordinates.

/// Axis-aligned face box with a confidence score.
///
/// Coordinates are inclusive pixel corners, so area and overlap use the
/// `+1` pixel-grid convention the reference network was tuned against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
    /// Face probability in `[0, 1]`.
    pub score: f32,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    /// Returns the corners as `[x1, y1, x2, y2]`.
    pub fn corners(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Area as `(x2 - x1 + 1) * (y2 - y1 + 1)`.
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1 + 1.0) * (self.y2 - self.y1 + 1.0)
    }

    /// Intersection area with the `+1` convention, zero when disjoint.
    pub fn intersection(&self, other: &Detection) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1) + 1.0).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1) + 1.0).max(0.0);
        w * h
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &Detection) -> f32 {
        iou_with_areas(self, other, self.area(), other.area())
    }

    /// True when every field is finite and the corners are ordered.
    pub fn is_well_formed(&self) -> bool {
        self.corners().iter().all(|v| v.is_finite())
            && self.score.is_finite()
            && self.x1 <= self.x2
            && self.y1 <= self.y2
    }
}

/// IoU with precomputed areas, used by NMS to avoid recomputing them.
pub(crate) fn iou_with_areas(a: &Detection, b: &Detection, area_a: f32, area_b: f32) -> f32 {
    let inter = a.intersection(b);
    inter / (area_a + area_b - inter)
}
