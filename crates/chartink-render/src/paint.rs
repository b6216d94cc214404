//! Per-kind paint routines and the pixel layout they share with hit-testing.

use chartink_core::chart::CoordinateMapper;
use chartink_core::drawing::{Anchor, Drawing, DrawingStyle, Geometry, StrokeStyle};
use chartink_core::geometry::{normalize, perpendicular, rect_from_points};
use kurbo::{BezPath, Ellipse, Line, Point, Rect, Shape, Size, Stroke, Vec2};
use peniko::Color;

use crate::renderer::RenderResult;
use crate::surface::Surface;

/// Font size of fib and ruler labels.
pub const LABEL_SIZE: f64 = 11.0;

/// Width of one character relative to the font size.
const CHAR_WIDTH: f64 = 0.6;

/// Resolve every anchor of `geometry` to pixels.
pub fn resolve_points(geometry: &Geometry, chart: &dyn CoordinateMapper) -> Option<Vec<Point>> {
    geometry
        .points()
        .iter()
        .map(|a| chart.anchor_to_point(*a))
        .collect()
}

/// A point beyond the viewport on the ray from `a` through `b`.
///
/// Returns `b` when the ray has no direction.
pub fn extend_ray(a: Point, b: Point, viewport: Size) -> Point {
    let dir = normalize(b - a);
    if dir == Vec2::ZERO {
        return b;
    }
    let reach = viewport.width.hypot(viewport.height) + a.to_vec2().hypot();
    a + dir * reach
}

/// One horizontal level of a fib drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibRow {
    pub level: f64,
    pub price: f64,
    pub y: f64,
}

/// Levels are measured from `b` back towards `a`: level 0 sits at `b`.
pub fn fib_rows(points: &[Anchor; 2], levels: &[f64], chart: &dyn CoordinateMapper) -> Vec<FibRow> {
    let [a, b] = points;
    levels
        .iter()
        .filter_map(|&level| {
            let price = b.price - (b.price - a.price) * level;
            Some(FibRow {
                level,
                price,
                y: chart.price_to_y(price)?,
            })
        })
        .collect()
}

/// Horizontal extent of a fib drawing in pixels.
pub fn fib_span(points: &[Anchor; 2], chart: &dyn CoordinateMapper) -> Option<(f64, f64)> {
    let x0 = chart.time_to_x(points[0].time)?;
    let x1 = chart.time_to_x(points[1].time)?;
    Some((x0.min(x1), x0.max(x1)))
}

/// The two rails of a channel and the line halfway between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelLines {
    pub base: Line,
    pub parallel: Line,
    pub median: Line,
}

impl ChannelLines {
    fn from_offset(base: Line, offset: Vec2) -> Self {
        Self {
            base,
            parallel: Line::new(base.p0 + offset, base.p1 + offset),
            median: Line::new(base.p0 + offset / 2.0, base.p1 + offset / 2.0),
        }
    }

    fn from_rails(base: Line, parallel: Line) -> Self {
        Self {
            base,
            parallel,
            median: Line::new(base.p0.midpoint(parallel.p0), base.p1.midpoint(parallel.p1)),
        }
    }
}

/// Rails of a 2-point or 3-point channel. `None` for other kinds.
pub fn channel_lines(geometry: &Geometry, chart: &dyn CoordinateMapper) -> Option<ChannelLines> {
    match geometry {
        Geometry::ParallelChannel { points: [a, b], width } => {
            let base = Line::new(chart.anchor_to_point(*a)?, chart.anchor_to_point(*b)?);
            let a2 = Anchor::new(a.time, a.price + width);
            let b2 = Anchor::new(b.time, b.price + width);
            let parallel = Line::new(chart.anchor_to_point(a2)?, chart.anchor_to_point(b2)?);
            Some(ChannelLines::from_rails(base, parallel))
        }
        Geometry::ParallelChannel3pt { points: [a, b, c] } => {
            let (a, b, c) = (
                chart.anchor_to_point(*a)?,
                chart.anchor_to_point(*b)?,
                chart.anchor_to_point(*c)?,
            );
            let normal = normalize(perpendicular(b - a));
            let offset = normal * (c - a).dot(normal);
            Some(ChannelLines::from_offset(Line::new(a, b), offset))
        }
        _ => None,
    }
}

/// Median and tines of a pitchfork, as rays `(origin, through)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchforkLines {
    pub median: (Point, Point),
    pub upper: (Point, Point),
    pub lower: (Point, Point),
    /// Segment joining the two tine anchors.
    pub handle: Line,
}

pub fn pitchfork_lines(pivot: Point, b: Point, c: Point) -> PitchforkLines {
    let mid = b.midpoint(c);
    let dir = mid - pivot;
    PitchforkLines {
        median: (pivot, mid),
        upper: (b, b + dir),
        lower: (c, c + dir),
        handle: Line::new(b, c),
    }
}

/// Box covered by a text drawing anchored at its top-left corner.
pub fn text_box(origin: Point, content: &str, font_size: f64) -> Rect {
    let chars = content.chars().count().max(1) as f64;
    Rect::from_origin_size(origin, (chars * font_size * CHAR_WIDTH, font_size))
}

/// Label of a ruler: price change, percent change and time span.
pub fn measure_label(a: Anchor, b: Anchor) -> String {
    let delta = b.price - a.price;
    let percent = if a.price == 0.0 {
        0.0
    } else {
        delta / a.price.abs() * 100.0
    };
    format!("{:+.2} ({:+.2}%) over {:.0}", delta, percent, (b.time - a.time).abs())
}

pub fn fib_label(row: &FibRow) -> String {
    format!("{:.3} ({:.2})", row.level, row.price)
}

pub(crate) fn line_path(a: Point, b: Point) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(a);
    path.line_to(b);
    path
}

fn polygon_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((first, rest)) = points.split_first() {
        path.move_to(*first);
        for p in rest {
            path.line_to(*p);
        }
        path.close_path();
    }
    path
}

/// Colors and strokes of one drawing at a given alpha.
struct Pen {
    stroke: Stroke,
    dashed: Stroke,
    color: Color,
    fill: Option<Color>,
}

impl Pen {
    fn new(style: &DrawingStyle, alpha: f32) -> Self {
        let width = style.stroke_width;
        Self {
            stroke: Stroke::new(width).with_dashes(0.0, style.dash.dash_pattern(width)),
            dashed: Stroke::new(width).with_dashes(0.0, StrokeStyle::Dashed.dash_pattern(width)),
            color: style.stroke_with_opacity().multiply_alpha(alpha),
            fill: style.fill_with_opacity().map(|c| c.multiply_alpha(alpha)),
        }
    }

    fn line(&self, surface: &mut dyn Surface, a: Point, b: Point) -> RenderResult<()> {
        surface.stroke(&line_path(a, b), &self.stroke, self.color)
    }

    fn shape(&self, surface: &mut dyn Surface, path: &BezPath) -> RenderResult<()> {
        if let Some(fill) = self.fill {
            surface.fill(path, fill)?;
        }
        surface.stroke(path, &self.stroke, self.color)
    }
}

/// Paint one drawing.
///
/// Returns `Ok(false)` without painting when an anchor cannot be mapped.
pub fn paint_drawing(
    surface: &mut dyn Surface,
    drawing: &Drawing,
    chart: &dyn CoordinateMapper,
    viewport: Size,
    alpha: f32,
) -> RenderResult<bool> {
    let Some(pts) = resolve_points(&drawing.geometry, chart) else {
        log::debug!("Skipping {} {}: anchor off chart", drawing.kind(), drawing.id());
        return Ok(false);
    };
    let pen = Pen::new(&drawing.style, alpha);

    match &drawing.geometry {
        Geometry::Trendline { .. } => pen.line(surface, pts[0], pts[1])?,
        Geometry::Ray { .. } => pen.line(surface, pts[0], extend_ray(pts[0], pts[1], viewport))?,
        Geometry::Hline { .. } => {
            pen.line(surface, Point::new(0.0, pts[0].y), Point::new(viewport.width, pts[0].y))?
        }
        Geometry::Vline { .. } => {
            pen.line(surface, Point::new(pts[0].x, 0.0), Point::new(pts[0].x, viewport.height))?
        }
        Geometry::Rect { .. } => {
            pen.shape(surface, &rect_from_points(pts[0], pts[1]).to_path(0.1))?
        }
        Geometry::Ellipse { .. } => {
            let ellipse = Ellipse::from_rect(rect_from_points(pts[0], pts[1]));
            pen.shape(surface, &ellipse.to_path(0.1))?
        }
        Geometry::Fib { points, levels } => {
            let Some((x0, x1)) = fib_span(points, chart) else {
                return Ok(false);
            };
            for row in fib_rows(points, levels, chart) {
                pen.line(surface, Point::new(x0, row.y), Point::new(x1, row.y))?;
                let origin = Point::new(x0 + 2.0, row.y - LABEL_SIZE - 2.0);
                surface.text(origin, &fib_label(&row), LABEL_SIZE, pen.color)?;
            }
        }
        Geometry::ParallelChannel { .. } | Geometry::ParallelChannel3pt { .. } => {
            let Some(lines) = channel_lines(&drawing.geometry, chart) else {
                return Ok(false);
            };
            if let Some(fill) = pen.fill {
                let body = polygon_path(&[
                    lines.base.p0,
                    lines.base.p1,
                    lines.parallel.p1,
                    lines.parallel.p0,
                ]);
                surface.fill(&body, fill)?;
            }
            pen.line(surface, lines.base.p0, lines.base.p1)?;
            pen.line(surface, lines.parallel.p0, lines.parallel.p1)?;
            let median = line_path(lines.median.p0, lines.median.p1);
            surface.stroke(&median, &pen.dashed, pen.color)?;
        }
        Geometry::Pitchfork { .. } => {
            let fork = pitchfork_lines(pts[0], pts[1], pts[2]);
            for (origin, through) in [fork.median, fork.upper, fork.lower] {
                pen.line(surface, origin, extend_ray(origin, through, viewport))?;
            }
            pen.line(surface, fork.handle.p0, fork.handle.p1)?;
        }
        Geometry::Text {
            content, font_size, ..
        } => {
            if let Some(fill) = pen.fill {
                surface.fill(&text_box(pts[0], content, *font_size).to_path(0.1), fill)?;
            }
            surface.text(pts[0], content, *font_size, pen.color)?;
        }
        Geometry::Measure { points: [a, b] } => {
            pen.line(surface, pts[0], pts[1])?;
            let origin = pts[1] + Vec2::new(6.0, -LABEL_SIZE - 4.0);
            surface.text(origin, &measure_label(*a, *b), LABEL_SIZE, pen.color)?;
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DisplayList, DrawCommand};
    use chartink_core::chart::{IdentityMapper, LinearViewport};
    use chartink_core::drawing::{GeometryParams, SerializableColor};

    const VIEW: Size = Size::new(200.0, 100.0);

    fn paint(geometry: Geometry) -> DisplayList {
        let mut list = DisplayList::new();
        let painted =
            paint_drawing(&mut list, &Drawing::new(geometry), &IdentityMapper, VIEW, 1.0).unwrap();
        assert!(painted);
        list
    }

    fn stroke_bounds(list: &DisplayList) -> Vec<Rect> {
        list.commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Stroke { path, .. } => Some(path.bounding_box()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_every_kind_paints() {
        let params = GeometryParams::default();
        let anchors = [Anchor::new(10.0, 10.0), Anchor::new(50.0, 40.0), Anchor::new(60.0, 10.0)];
        for kind in chartink_core::drawing::DrawingKind::ALL {
            let geometry =
                Geometry::from_anchors(kind, &anchors[..kind.point_count()], &params).unwrap();
            let list = paint(geometry);
            assert!(!list.is_empty(), "{kind} painted nothing");
        }
    }

    #[test]
    fn test_hline_spans_viewport() {
        let list = paint(Geometry::Hline {
            points: [Anchor::new(30.0, 25.0)],
        });
        assert_eq!(stroke_bounds(&list), vec![Rect::new(0.0, 25.0, 200.0, 25.0)]);
    }

    #[test]
    fn test_ray_leaves_viewport() {
        let list = paint(Geometry::Ray {
            points: [Anchor::new(0.0, 0.0), Anchor::new(10.0, 0.0)],
        });
        let bounds = stroke_bounds(&list)[0];
        assert!(bounds.x1 > VIEW.width);
        assert_eq!(bounds.y1, 0.0);
    }

    #[test]
    fn test_extend_ray_degenerate() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(extend_ray(p, p, VIEW), p);
    }

    #[test]
    fn test_fib_rows() {
        let points = [Anchor::new(0.0, 100.0), Anchor::new(10.0, 200.0)];
        let rows = fib_rows(&points, &[0.0, 0.5, 1.0], &IdentityMapper);
        let prices: Vec<f64> = rows.iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![200.0, 150.0, 100.0]);
        assert_eq!(fib_label(&rows[1]), "0.500 (150.00)");

        let list = paint(Geometry::Fib {
            points,
            levels: vec![0.0, 1.0],
        });
        assert_eq!(list.stroke_count(), 2);
        assert_eq!(list.texts().count(), 2);
    }

    #[test]
    fn test_two_point_channel_rails() {
        let geometry = Geometry::ParallelChannel {
            points: [Anchor::new(0.0, 10.0), Anchor::new(20.0, 10.0)],
            width: 5.0,
        };
        let lines = channel_lines(&geometry, &IdentityMapper).unwrap();
        assert_eq!(lines.parallel, Line::new((0.0, 15.0), (20.0, 15.0)));
        assert_eq!(lines.median, Line::new((0.0, 12.5), (20.0, 12.5)));

        let list = paint(geometry);
        assert_eq!(list.stroke_count(), 3);
        assert_eq!(list.dashed_stroke_count(), 1);
    }

    #[test]
    fn test_pixel_rails_follow_price_axis() {
        let vp = LinearViewport::fit((0.0, 100.0), (0.0, 100.0), Size::new(100.0, 100.0));
        let geometry = Geometry::ParallelChannel {
            points: [Anchor::new(0.0, 50.0), Anchor::new(100.0, 50.0)],
            width: 10.0,
        };
        let lines = channel_lines(&geometry, &vp).unwrap();
        // Higher prices are higher on screen.
        assert!(lines.parallel.p0.y < lines.base.p0.y);
        assert!(((lines.base.p0.y - lines.parallel.p0.y) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_point_channel_through_c() {
        let geometry = Geometry::ParallelChannel3pt {
            points: [Anchor::new(0.0, 0.0), Anchor::new(10.0, 0.0), Anchor::new(4.0, 6.0)],
        };
        let lines = channel_lines(&geometry, &IdentityMapper).unwrap();
        assert_eq!(lines.parallel, Line::new((0.0, 6.0), (10.0, 6.0)));
        assert_eq!(lines.median.p0, Point::new(0.0, 3.0));
        assert!(channel_lines(&Geometry::Rect { points: [Anchor::default(); 2] }, &IdentityMapper).is_none());
    }

    #[test]
    fn test_pitchfork_tines_parallel_to_median() {
        let fork = pitchfork_lines(Point::new(0.0, 0.0), Point::new(10.0, 5.0), Point::new(10.0, -5.0));
        assert_eq!(fork.median, (Point::new(0.0, 0.0), Point::new(10.0, 0.0)));
        assert_eq!(fork.upper.1 - fork.upper.0, Vec2::new(10.0, 0.0));
        assert_eq!(fork.lower.0, Point::new(10.0, -5.0));
    }

    #[test]
    fn test_text_box_and_fill() {
        assert_eq!(text_box(Point::new(0.0, 0.0), "ab", 10.0), Rect::new(0.0, 0.0, 12.0, 10.0));
        assert_eq!(text_box(Point::new(0.0, 0.0), "", 10.0).width(), 6.0);

        let mut drawing = Drawing::new(Geometry::Text {
            points: [Anchor::new(5.0, 5.0)],
            content: "Hi".into(),
            font_size: 10.0,
        });
        drawing.style.fill_color = Some(SerializableColor::new(255, 255, 0, 255));
        let mut list = DisplayList::new();
        paint_drawing(&mut list, &drawing, &IdentityMapper, VIEW, 1.0).unwrap();
        assert!(matches!(list.commands()[0], DrawCommand::Fill { .. }));
        assert_eq!(list.texts().collect::<Vec<_>>(), vec!["Hi"]);
    }

    #[test]
    fn test_measure_label() {
        let label = measure_label(Anchor::new(0.0, 100.0), Anchor::new(10.0, 110.0));
        assert_eq!(label, "+10.00 (+10.00%) over 10");
        assert_eq!(measure_label(Anchor::new(0.0, 0.0), Anchor::new(10.0, 0.0)), "+0.00 (+0.00%) over 10");
    }

    #[test]
    fn test_unmappable_anchor_skips() {
        struct NoPrices;
        impl CoordinateMapper for NoPrices {
            fn x_to_time(&self, x: f64) -> Option<f64> {
                Some(x)
            }
            fn time_to_x(&self, t: f64) -> Option<f64> {
                Some(t)
            }
            fn y_to_price(&self, _: f64) -> Option<f64> {
                None
            }
            fn price_to_y(&self, _: f64) -> Option<f64> {
                None
            }
        }
        let drawing = Drawing::new(Geometry::Vline {
            points: [Anchor::new(1.0, 1.0)],
        });
        let mut list = DisplayList::new();
        assert!(!paint_drawing(&mut list, &drawing, &NoPrices, VIEW, 1.0).unwrap());
        assert!(list.is_empty());
    }

    #[test]
    fn test_alpha_scales_color() {
        let drawing = Drawing::new(Geometry::Trendline {
            points: [Anchor::new(0.0, 0.0), Anchor::new(1.0, 1.0)],
        });
        let mut list = DisplayList::new();
        paint_drawing(&mut list, &drawing, &IdentityMapper, VIEW, 0.5).unwrap();
        match &list.commands()[0] {
            DrawCommand::Stroke { color, .. } => assert!((color.components[3] - 0.5).abs() < 0.01),
            other => panic!("unexpected {other:?}"),
        }
    }
}
