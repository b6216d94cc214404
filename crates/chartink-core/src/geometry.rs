//! Geometry kernel: pure numeric helpers shared by snapping, hit-testing and painting.
//!
//! All functions work in pixel space on kurbo primitives.

use kurbo::{Point, Rect, Vec2};

/// Clamp `n` into `[lo, hi]`.
///
/// Unlike `f64::clamp` this never panics; when `lo == hi` the single bound is returned.
pub fn clamp(n: f64, lo: f64, hi: f64) -> f64 {
    if n < lo {
        lo
    } else if n > hi {
        hi
    } else {
        n
    }
}

/// Distance from `p` to the point on the line through `a`/`b` whose projection
/// parameter is clamped to `[t_min, t_max]`.
fn projected_distance(p: Point, a: Point, b: Point, t_min: f64, t_max: f64) -> f64 {
    let seg = b - a;
    let pv = p - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = clamp(pv.dot(seg) / len_sq, t_min, t_max);
    (p - (a + seg * t)).hypot()
}

/// Distance from a point to the segment `a`-`b`.
///
/// Outside the segment the result degrades to the distance to the nearest endpoint.
/// A zero-length segment yields the distance to `a`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    projected_distance(p, a, b, 0.0, 1.0)
}

/// Distance from a point to the ray starting at `a` and passing through `b`.
pub fn distance_to_ray(p: Point, a: Point, b: Point) -> f64 {
    projected_distance(p, a, b, 0.0, f64::INFINITY)
}

/// Distance from a point to the infinite line through `a` and `b`.
pub fn distance_to_line(p: Point, a: Point, b: Point) -> f64 {
    projected_distance(p, a, b, f64::NEG_INFINITY, f64::INFINITY)
}

/// Axis-aligned rectangle spanning two points, independent of their order.
pub fn rect_from_points(a: Point, b: Point) -> Rect {
    Rect::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
}

/// Inclusive containment test: points on the boundary are inside.
pub fn within_rect(p: Point, r: Rect) -> bool {
    let r = r.abs();
    p.x >= r.x0 && p.x <= r.x1 && p.y >= r.y0 && p.y <= r.y1
}

/// Unit vector in the direction of `v`. The zero vector maps to itself.
pub fn normalize(v: Vec2) -> Vec2 {
    let len = v.hypot();
    if len < f64::EPSILON {
        return Vec2::ZERO;
    }
    v / len
}

/// Rotate a vector 90 degrees counter-clockwise, preserving its magnitude.
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Distance from a point to the border of a rectangle, whether inside or outside.
pub fn rect_border_distance(p: Point, r: Rect) -> f64 {
    let r = r.abs();
    if within_rect(p, r) {
        let dx = (p.x - r.x0).min(r.x1 - p.x);
        let dy = (p.y - r.y0).min(r.y1 - p.y);
        return dx.min(dy);
    }
    let dx = (r.x0 - p.x).max(0.0).max(p.x - r.x1);
    let dy = (r.y0 - p.y).max(0.0).max(p.y - r.y1);
    dx.hypot(dy)
}

/// Approximate distance from a point to the outline of the ellipse inscribed in `r`.
///
/// Uses the radial projection onto the outline, exact for circles and close
/// enough for hit-testing elsewhere.
pub fn ellipse_border_distance(p: Point, r: Rect) -> f64 {
    let r = r.abs();
    let center = r.center();
    let rx = r.width() / 2.0;
    let ry = r.height() / 2.0;
    if rx < f64::EPSILON || ry < f64::EPSILON {
        // Degenerate ellipse collapses to its major axis.
        return distance_to_segment(p, Point::new(r.x0, r.y0), Point::new(r.x1, r.y1));
    }
    let d = p - center;
    let k = ((d.x / rx).powi(2) + (d.y / ry).powi(2)).sqrt();
    if k < f64::EPSILON {
        return rx.min(ry);
    }
    let on_border = center + d / k;
    (p - on_border).hypot()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_segment_distance_on_segment() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 10.0);
        assert!(distance_to_segment(Point::new(5.0, 5.0), a, b) < EPS);
        assert!(distance_to_segment(a, a, b) < EPS);
        assert!(distance_to_segment(b, a, b) < EPS);
    }

    #[test]
    fn test_segment_distance_beyond_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        // Collinear but past the end: distance to the endpoint, not zero.
        assert!((distance_to_segment(Point::new(13.0, 0.0), a, b) - 3.0).abs() < EPS);
        assert!((distance_to_segment(Point::new(-3.0, 4.0), a, b) - 5.0).abs() < EPS);
        assert!((distance_to_segment(Point::new(5.0, 2.0), a, b) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_segment_distance_zero_length() {
        let a = Point::new(2.0, 2.0);
        let d = distance_to_segment(Point::new(5.0, 6.0), a, a);
        assert!((d - 5.0).abs() < EPS);
        assert!(d.is_finite());
    }

    #[test]
    fn test_ray_and_line_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!(distance_to_ray(Point::new(100.0, 0.0), a, b) < EPS);
        assert!((distance_to_ray(Point::new(-4.0, 3.0), a, b) - 5.0).abs() < EPS);
        assert!((distance_to_line(Point::new(-4.0, 3.0), a, b) - 3.0).abs() < EPS);
    }

    #[test]
    fn test_rect_from_points_order_independent() {
        let a = Point::new(30.0, 5.0);
        let b = Point::new(10.0, 25.0);
        let r1 = rect_from_points(a, b);
        let r2 = rect_from_points(b, a);
        assert_eq!(r1, r2);
        assert_eq!(r1.x0, 10.0);
        assert_eq!(r1.y0, 5.0);
        assert_eq!(r1.width(), 20.0);
        assert_eq!(r1.height(), 20.0);
    }

    #[test]
    fn test_within_rect_inclusive() {
        let r = rect_from_points(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        assert!(within_rect(Point::new(0.0, 0.0), r));
        assert!(within_rect(Point::new(10.0, 10.0), r));
        assert!(within_rect(Point::new(10.0, 5.0), r));
        assert!(!within_rect(Point::new(10.000_001, 5.0), r));
    }

    #[test]
    fn test_normalize() {
        let n = normalize(Vec2::new(3.0, 4.0));
        assert!((n.hypot() - 1.0).abs() < EPS);
        assert!((n.x - 0.6).abs() < EPS);
        assert_eq!(normalize(Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn test_perpendicular() {
        let v = Vec2::new(3.0, -7.5);
        let p = perpendicular(v);
        assert!(v.dot(p).abs() < EPS);
        assert!((p.hypot() - v.hypot()).abs() < EPS);
        let twice = perpendicular(p);
        assert!((twice.x + v.x).abs() < EPS);
        assert!((twice.y + v.y).abs() < EPS);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5, 0.0, 1.0), 0.5);
        assert_eq!(clamp(42.0, 3.0, 3.0), 3.0);
        assert_eq!(clamp(-42.0, 3.0, 3.0), 3.0);
    }

    #[test]
    fn test_rect_border_distance() {
        let r = rect_from_points(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        assert!((rect_border_distance(Point::new(5.0, 1.0), r) - 1.0).abs() < EPS);
        assert!((rect_border_distance(Point::new(13.0, 14.0), r) - 5.0).abs() < EPS);
        assert!(rect_border_distance(Point::new(10.0, 3.0), r) < EPS);
    }

    #[test]
    fn test_ellipse_border_distance_circle() {
        let r = rect_from_points(Point::new(-10.0, -10.0), Point::new(10.0, 10.0));
        assert!(ellipse_border_distance(Point::new(10.0, 0.0), r) < EPS);
        assert!((ellipse_border_distance(Point::new(0.0, 15.0), r) - 5.0).abs() < EPS);
        assert!((ellipse_border_distance(Point::new(0.0, 0.0), r) - 10.0).abs() < EPS);
    }
}
