//! Selection handles of drawings.

use chartink_core::chart::CoordinateMapper;
use chartink_core::drawing::{Drawing, Geometry};
use chartink_core::geometry::rect_from_points;
use kurbo::Point;

use crate::paint::{channel_lines, resolve_points};

/// Handle size in screen pixels.
pub const HANDLE_SIZE: f64 = 8.0;
/// Handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 10.0;

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// An anchor of the drawing, by index.
    Anchor(usize),
    /// Corner of a rectangle or ellipse bounding box.
    Corner(Corner),
    /// Edge midpoint of a rectangle or ellipse bounding box.
    Edge(Edge),
    /// Midpoint of a two-anchor line, for moving it as a whole.
    Midpoint,
    /// Middle of a 2-point channel's parallel rail, for changing its width.
    ChannelWidth,
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// A selection handle with its pixel position and type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a pixel position hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }

    /// Anchor handles are drawn round, the rest square.
    pub fn is_round(&self) -> bool {
        matches!(self.kind, HandleKind::Anchor(_))
    }
}

fn anchor_handles(points: &[Point]) -> Vec<Handle> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| Handle::new(*p, HandleKind::Anchor(i)))
        .collect()
}

/// Handles of a drawing in pixel space. Empty when it cannot be placed.
pub fn get_handles(drawing: &Drawing, chart: &dyn CoordinateMapper) -> Vec<Handle> {
    let Some(pts) = resolve_points(&drawing.geometry, chart) else {
        return Vec::new();
    };
    match &drawing.geometry {
        Geometry::Trendline { .. }
        | Geometry::Ray { .. }
        | Geometry::Fib { .. }
        | Geometry::Measure { .. } => {
            let mut handles = anchor_handles(&pts);
            handles.push(Handle::new(pts[0].midpoint(pts[1]), HandleKind::Midpoint));
            handles
        }
        Geometry::Hline { .. }
        | Geometry::Vline { .. }
        | Geometry::Text { .. }
        | Geometry::ParallelChannel3pt { .. }
        | Geometry::Pitchfork { .. } => anchor_handles(&pts),
        Geometry::Rect { .. } | Geometry::Ellipse { .. } => {
            let r = rect_from_points(pts[0], pts[1]);
            let c = r.center();
            vec![
                Handle::new(Point::new(r.x0, r.y0), HandleKind::Corner(Corner::TopLeft)),
                Handle::new(Point::new(r.x1, r.y0), HandleKind::Corner(Corner::TopRight)),
                Handle::new(Point::new(r.x0, r.y1), HandleKind::Corner(Corner::BottomLeft)),
                Handle::new(Point::new(r.x1, r.y1), HandleKind::Corner(Corner::BottomRight)),
                Handle::new(Point::new(c.x, r.y0), HandleKind::Edge(Edge::Top)),
                Handle::new(Point::new(r.x1, c.y), HandleKind::Edge(Edge::Right)),
                Handle::new(Point::new(c.x, r.y1), HandleKind::Edge(Edge::Bottom)),
                Handle::new(Point::new(r.x0, c.y), HandleKind::Edge(Edge::Left)),
            ]
        }
        Geometry::ParallelChannel { .. } => {
            let mut handles = anchor_handles(&pts);
            if let Some(lines) = channel_lines(&drawing.geometry, chart) {
                handles.push(Handle::new(lines.parallel.p0.midpoint(lines.parallel.p1), HandleKind::ChannelWidth));
            }
            handles
        }
    }
}

/// The handle of `drawing` closest to `point`, within `tolerance` pixels.
pub fn hit_test_handles(
    drawing: &Drawing,
    chart: &dyn CoordinateMapper,
    point: Point,
    tolerance: f64,
) -> Option<HandleKind> {
    get_handles(drawing, chart)
        .into_iter()
        .filter(|h| h.hit_test(point, tolerance))
        .min_by(|a, b| {
            let da = (a.position - point).hypot2();
            let db = (b.position - point).hypot2();
            da.total_cmp(&db)
        })
        .map(|h| h.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartink_core::chart::IdentityMapper;
    use chartink_core::drawing::Anchor;

    #[test]
    fn test_line_handles() {
        let line = Drawing::new(Geometry::Trendline {
            points: [Anchor::new(0.0, 0.0), Anchor::new(10.0, 20.0)],
        });
        let handles = get_handles(&line, &IdentityMapper);
        assert_eq!(handles.len(), 3);
        assert_eq!(handles[1], Handle::new(Point::new(10.0, 20.0), HandleKind::Anchor(1)));
        assert_eq!(handles[2].position, Point::new(5.0, 10.0));
        assert!(handles[0].is_round());
        assert!(!handles[2].is_round());
    }

    #[test]
    fn test_rect_handles_normalized() {
        let rect = Drawing::new(Geometry::Rect {
            points: [Anchor::new(10.0, 10.0), Anchor::new(0.0, 0.0)],
        });
        let handles = get_handles(&rect, &IdentityMapper);
        assert_eq!(handles.len(), 8);
        assert_eq!(handles[0].position, Point::new(0.0, 0.0));
        assert_eq!(handles[0].kind, HandleKind::Corner(Corner::TopLeft));
        assert_eq!(handles[5].position, Point::new(10.0, 5.0));
    }

    #[test]
    fn test_channel_width_handle() {
        let channel = Drawing::new(Geometry::ParallelChannel {
            points: [Anchor::new(0.0, 0.0), Anchor::new(20.0, 0.0)],
            width: 4.0,
        });
        let handles = get_handles(&channel, &IdentityMapper);
        assert_eq!(handles.len(), 3);
        assert_eq!(handles[2], Handle::new(Point::new(10.0, 4.0), HandleKind::ChannelWidth));
    }

    #[test]
    fn test_hit_test_handles_closest() {
        let pitchfork = Drawing::new(Geometry::Pitchfork {
            points: [Anchor::new(0.0, 0.0), Anchor::new(4.0, 0.0), Anchor::new(40.0, 0.0)],
        });
        assert_eq!(
            hit_test_handles(&pitchfork, &IdentityMapper, Point::new(3.0, 0.0), HANDLE_HIT_TOLERANCE),
            Some(HandleKind::Anchor(1))
        );
        assert_eq!(
            hit_test_handles(&pitchfork, &IdentityMapper, Point::new(20.0, 0.0), HANDLE_HIT_TOLERANCE),
            None
        );
    }
}
