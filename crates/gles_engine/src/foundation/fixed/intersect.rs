//! 2D segment intersection in fixed point
//!
//! The test is parametric: with `a = p + t·r` and `b = q + u·s`, the segments meet
//! when `0 <= t <= 1` and `0 <= u <= 1`. Cross products are taken on the raw
//! Q16.16 values in 128-bit integers, so the bounds check is exact and the
//! result never depends on a rounded slope.

use super::{Fp, FpVec2};

/// Line segment between two points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// First endpoint
    pub start: FpVec2,
    /// Second endpoint
    pub end: FpVec2,
}

impl Segment {
    /// Create a segment from its endpoints
    #[must_use]
    pub const fn new(start: FpVec2, end: FpVec2) -> Self {
        Self { start, end }
    }

    /// Whether the segment is parallel to the Y axis
    #[must_use]
    pub fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }

    /// Whether the segment is parallel to the X axis
    #[must_use]
    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    /// Whether the two segments share a point
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        intersect_segments(self, other).is_some()
    }
}

/// Intersection point of two segments, if they cross within both bounds.
///
/// Parallel segments (including collinear overlaps and zero-length segments)
/// report no intersection. When either segment is vertical or horizontal the
/// matching coordinate of the result is taken from it exactly.
#[must_use]
pub fn intersect_segments(a: &Segment, b: &Segment) -> Option<FpVec2> {
    let (px, py) = raw(a.start);
    let (qx, qy) = raw(b.start);
    let (rx, ry) = (i128::from(a.end.x.raw()) - px, i128::from(a.end.y.raw()) - py);
    let (sx, sy) = (i128::from(b.end.x.raw()) - qx, i128::from(b.end.y.raw()) - qy);

    let mut denom = rx * sy - ry * sx;
    if denom == 0 {
        return None;
    }

    let (wx, wy) = (qx - px, qy - py);
    let mut t = wx * sy - wy * sx;
    let mut u = wx * ry - wy * rx;
    if denom < 0 {
        denom = -denom;
        t = -t;
        u = -u;
    }
    if t < 0 || t > denom || u < 0 || u > denom {
        return None;
    }

    let x = if a.is_vertical() {
        a.start.x
    } else if b.is_vertical() {
        b.start.x
    } else {
        Fp::from_raw((px + rx * t / denom) as i32)
    };
    let y = if a.is_horizontal() {
        a.start.y
    } else if b.is_horizontal() {
        b.start.y
    } else {
        Fp::from_raw((py + ry * t / denom) as i32)
    };
    Some(FpVec2::new(x, y))
}

fn raw(p: FpVec2) -> (i128, i128) {
    (i128::from(p.x.raw()), i128::from(p.y.raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn seg(x1: f32, y1: f32, x2: f32, y2: f32) -> Segment {
        Segment::new(FpVec2::from_f32(x1, y1), FpVec2::from_f32(x2, y2))
    }

    #[test]
    fn test_crossing_segments() {
        let hit = intersect_segments(&seg(0.0, 0.0, 4.0, 4.0), &seg(0.0, 4.0, 4.0, 0.0));
        assert_eq!(hit, Some(FpVec2::from_f32(2.0, 2.0)));
    }

    #[test]
    fn test_disjoint_segments() {
        // The lines cross at (5, 5), beyond both segments
        assert!(!seg(0.0, 0.0, 1.0, 1.0).intersects(&seg(10.0, 0.0, 9.0, 1.0)));
    }

    #[test]
    fn test_parallel_and_collinear() {
        assert_eq!(intersect_segments(&seg(0.0, 0.0, 2.0, 0.0), &seg(0.0, 1.0, 2.0, 1.0)), None);
        assert_eq!(intersect_segments(&seg(0.0, 0.0, 2.0, 2.0), &seg(1.0, 1.0, 3.0, 3.0)), None);
        assert_eq!(intersect_segments(&seg(1.0, 1.0, 1.0, 1.0), &seg(0.0, 0.0, 2.0, 2.0)), None);
    }

    #[test]
    fn test_vertical_segment() {
        let vertical = seg(1.5, -3.0, 1.5, 3.0);
        let sloped = seg(0.0, 0.0, 3.0, 1.0);
        let hit = intersect_segments(&vertical, &sloped).map(|p| (p.x, p.y.to_float()));
        let (x, y) = hit.unwrap_or_default();
        assert_eq!(x, Fp::from_float(1.5));
        assert_abs_diff_eq!(y, 0.5, epsilon = 1e-4);
        assert!(sloped.intersects(&vertical));
    }

    #[test]
    fn test_touching_endpoints() {
        let hit = intersect_segments(&seg(0.0, 0.0, 1.0, 0.0), &seg(1.0, 0.0, 1.0, 5.0));
        assert_eq!(hit, Some(FpVec2::from_f32(1.0, 0.0)));
    }

    #[test]
    fn test_vertical_and_horizontal_are_exact() {
        let hit = intersect_segments(&seg(0.3, -1.0, 0.3, 1.0), &seg(-1.0, 0.7, 1.0, 0.7));
        assert_eq!(hit, Some(FpVec2::from_f32(0.3, 0.7)));
    }
}
