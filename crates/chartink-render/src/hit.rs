//! Hit-testing and marquee selection in pixel space.

use chartink_core::chart::CoordinateMapper;
use chartink_core::drawing::{Drawing, DrawingId, Geometry, LayerSet};
use chartink_core::geometry::{
    distance_to_ray, distance_to_segment, ellipse_border_distance, rect_border_distance,
    rect_from_points, within_rect,
};
use kurbo::{Point, Rect};

use crate::paint::{channel_lines, fib_rows, fib_span, pitchfork_lines, resolve_points, text_box};

/// Pixel distance from `p` to the visible outline of `drawing`.
///
/// `None` when the drawing cannot be placed on the chart.
pub fn drawing_distance(drawing: &Drawing, chart: &dyn CoordinateMapper, p: Point) -> Option<f64> {
    let pts = resolve_points(&drawing.geometry, chart)?;
    let filled = drawing.style.fill_color.is_some();

    let distance = match &drawing.geometry {
        Geometry::Trendline { .. } | Geometry::Measure { .. } => distance_to_segment(p, pts[0], pts[1]),
        Geometry::Ray { .. } => distance_to_ray(p, pts[0], pts[1]),
        Geometry::Hline { .. } => (p.y - pts[0].y).abs(),
        Geometry::Vline { .. } => (p.x - pts[0].x).abs(),
        Geometry::Rect { .. } => {
            let rect = rect_from_points(pts[0], pts[1]);
            if filled && within_rect(p, rect) {
                0.0
            } else {
                rect_border_distance(p, rect)
            }
        }
        Geometry::Ellipse { .. } => {
            let rect = rect_from_points(pts[0], pts[1]);
            if filled && inside_ellipse(p, rect) {
                0.0
            } else {
                ellipse_border_distance(p, rect)
            }
        }
        Geometry::Fib { points, levels } => {
            let (x0, x1) = fib_span(points, chart)?;
            fib_rows(points, levels, chart)
                .iter()
                .map(|row| distance_to_segment(p, Point::new(x0, row.y), Point::new(x1, row.y)))
                .fold(f64::INFINITY, f64::min)
        }
        Geometry::ParallelChannel { .. } | Geometry::ParallelChannel3pt { .. } => {
            let lines = channel_lines(&drawing.geometry, chart)?;
            distance_to_segment(p, lines.base.p0, lines.base.p1)
                .min(distance_to_segment(p, lines.parallel.p0, lines.parallel.p1))
        }
        Geometry::Pitchfork { .. } => {
            let fork = pitchfork_lines(pts[0], pts[1], pts[2]);
            [fork.median, fork.upper, fork.lower]
                .into_iter()
                .map(|(origin, through)| distance_to_ray(p, origin, through))
                .fold(f64::INFINITY, f64::min)
        }
        Geometry::Text {
            content, font_size, ..
        } => {
            let rect = text_box(pts[0], content, *font_size);
            if within_rect(p, rect) {
                0.0
            } else {
                rect_border_distance(p, rect)
            }
        }
    };
    Some(distance)
}

fn inside_ellipse(p: Point, rect: Rect) -> bool {
    let rx = rect.width() / 2.0;
    let ry = rect.height() / 2.0;
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let d = p - rect.center();
    (d.x / rx).powi(2) + (d.y / ry).powi(2) <= 1.0
}

/// Whether pointer interaction may pick `drawing`.
pub fn is_pickable(drawing: &Drawing, layers: &LayerSet) -> bool {
    !drawing.locked && !drawing.hidden && layers.is_visible(&drawing.layer_id)
}

/// The drawing under `p`, if any lies within `padding` pixels.
///
/// Later drawings sit on top and win ties. Locked, hidden and
/// layer-hidden drawings are ignored.
pub fn hit_test(
    drawings: &[Drawing],
    layers: &LayerSet,
    chart: &dyn CoordinateMapper,
    p: Point,
    padding: f64,
) -> Option<DrawingId> {
    let mut best: Option<(&Drawing, f64)> = None;
    for drawing in drawings.iter().rev().filter(|d| is_pickable(d, layers)) {
        let Some(distance) = drawing_distance(drawing, chart, p) else {
            continue;
        };
        let limit = best.map_or(padding, |(_, d)| d);
        if distance < limit {
            best = Some((drawing, distance));
        }
    }
    best.map(|(drawing, _)| drawing.id().to_string())
}

/// Drawings with at least one anchor inside `rect`, in store order.
///
/// Locked drawings are included; hidden and layer-hidden ones are not.
pub fn marquee_select(
    drawings: &[Drawing],
    layers: &LayerSet,
    chart: &dyn CoordinateMapper,
    rect: Rect,
) -> Vec<DrawingId> {
    drawings
        .iter()
        .filter(|d| !d.hidden && layers.is_visible(&d.layer_id))
        .filter(|d| {
            d.points()
                .iter()
                .filter_map(|a| chart.anchor_to_point(*a))
                .any(|p| within_rect(p, rect))
        })
        .map(|d| d.id().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartink_core::chart::IdentityMapper;
    use chartink_core::drawing::{Anchor, Layer, SerializableColor};

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Drawing {
        Drawing::new(Geometry::Trendline {
            points: [Anchor::new(x0, y0), Anchor::new(x1, y1)],
        })
    }

    fn distance(drawing: &Drawing, x: f64, y: f64) -> f64 {
        drawing_distance(drawing, &IdentityMapper, Point::new(x, y)).unwrap()
    }

    #[test]
    fn test_line_metrics() {
        assert_eq!(distance(&line(0.0, 0.0, 10.0, 0.0), 5.0, 3.0), 3.0);
        let ray = Drawing::new(Geometry::Ray {
            points: [Anchor::new(0.0, 0.0), Anchor::new(10.0, 0.0)],
        });
        assert_eq!(distance(&ray, 500.0, 2.0), 2.0);
        assert_eq!(distance(&ray, -3.0, 4.0), 5.0);
        let hline = Drawing::new(Geometry::Hline {
            points: [Anchor::new(0.0, 20.0)],
        });
        assert_eq!(distance(&hline, 1000.0, 23.0), 3.0);
        let vline = Drawing::new(Geometry::Vline {
            points: [Anchor::new(7.0, 0.0)],
        });
        assert_eq!(distance(&vline, 5.0, -99.0), 2.0);
    }

    #[test]
    fn test_rect_border_unless_filled() {
        let mut rect = Drawing::new(Geometry::Rect {
            points: [Anchor::new(0.0, 0.0), Anchor::new(100.0, 100.0)],
        });
        assert_eq!(distance(&rect, 50.0, 50.0), 50.0);
        assert_eq!(distance(&rect, 50.0, 102.0), 2.0);
        rect.style.fill_color = Some(SerializableColor::black());
        assert_eq!(distance(&rect, 50.0, 50.0), 0.0);
    }

    #[test]
    fn test_ellipse_metric() {
        let mut ellipse = Drawing::new(Geometry::Ellipse {
            points: [Anchor::new(0.0, 0.0), Anchor::new(20.0, 20.0)],
        });
        assert!((distance(&ellipse, 10.0, 22.0) - 2.0).abs() < 1e-9);
        assert!(distance(&ellipse, 10.0, 10.0) > 6.0);
        ellipse.style.fill_color = Some(SerializableColor::black());
        assert_eq!(distance(&ellipse, 10.0, 10.0), 0.0);
    }

    #[test]
    fn test_fib_rows_and_channel_rails() {
        let fib = Drawing::new(Geometry::Fib {
            points: [Anchor::new(0.0, 0.0), Anchor::new(100.0, 100.0)],
            levels: vec![0.0, 0.5, 1.0],
        });
        assert_eq!(distance(&fib, 50.0, 52.0), 2.0);
        assert_eq!(distance(&fib, 50.0, 25.0), 25.0);

        let channel = Drawing::new(Geometry::ParallelChannel {
            points: [Anchor::new(0.0, 0.0), Anchor::new(100.0, 0.0)],
            width: 20.0,
        });
        assert_eq!(distance(&channel, 50.0, 19.0), 1.0);
        assert_eq!(distance(&channel, 50.0, 10.0), 10.0);
    }

    #[test]
    fn test_pitchfork_and_text() {
        let fork = Drawing::new(Geometry::Pitchfork {
            points: [Anchor::new(0.0, 0.0), Anchor::new(10.0, 10.0), Anchor::new(10.0, -10.0)],
        });
        assert_eq!(distance(&fork, 300.0, 11.0), 1.0);
        assert_eq!(distance(&fork, 300.0, 1.0), 1.0);

        let text = Drawing::new(Geometry::Text {
            points: [Anchor::new(0.0, 0.0)],
            content: "Note".into(),
            font_size: 10.0,
        });
        assert_eq!(distance(&text, 5.0, 5.0), 0.0);
        assert_eq!(distance(&text, 5.0, 13.0), 3.0);
    }

    #[test]
    fn test_hit_test_picks_closest_within_padding() {
        let far = line(0.0, 4.0, 100.0, 4.0);
        let near = line(0.0, 1.0, 100.0, 1.0);
        let drawings = vec![near.clone(), far];
        let layers = LayerSet::new();
        let hit = hit_test(&drawings, &layers, &IdentityMapper, Point::new(50.0, 0.0), 6.0);
        assert_eq!(hit.as_deref(), Some(near.id()));
        assert_eq!(
            hit_test(&drawings, &layers, &IdentityMapper, Point::new(50.0, 30.0), 6.0),
            None
        );
        // Exactly at the padding is a miss.
        assert_eq!(
            hit_test(&drawings, &layers, &IdentityMapper, Point::new(50.0, 10.0), 6.0),
            None
        );
    }

    #[test]
    fn test_hit_test_topmost_wins_ties() {
        let below = line(0.0, 0.0, 100.0, 0.0);
        let above = line(0.0, 0.0, 100.0, 0.0);
        let drawings = vec![below, above.clone()];
        let hit = hit_test(&drawings, &LayerSet::new(), &IdentityMapper, Point::new(5.0, 1.0), 6.0);
        assert_eq!(hit.as_deref(), Some(above.id()));
    }

    #[test]
    fn test_hit_test_skips_locked_hidden_and_layer_hidden() {
        let mut locked = line(0.0, 0.0, 10.0, 0.0);
        locked.locked = true;
        let mut hidden = line(0.0, 0.0, 10.0, 0.0);
        hidden.hidden = true;
        let muted = line(0.0, 0.0, 10.0, 0.0).with_layer("muted");
        let mut layers = LayerSet::new();
        let mut layer = Layer::new("muted", "Muted");
        layer.visible = Some(false);
        layers.upsert(layer);

        let drawings = vec![locked, hidden, muted];
        assert_eq!(hit_test(&drawings, &layers, &IdentityMapper, Point::new(5.0, 0.0), 6.0), None);
    }

    #[test]
    fn test_marquee_select() {
        let inside = line(5.0, 5.0, 500.0, 500.0);
        let outside = line(50.0, 50.0, 60.0, 60.0);
        let mut locked = line(1.0, 1.0, 2.0, 2.0);
        locked.locked = true;
        let mut hidden = line(1.0, 1.0, 2.0, 2.0);
        hidden.hidden = true;
        let drawings = vec![inside.clone(), outside, locked.clone(), hidden];

        // Corners given in any order.
        let rect = rect_from_points(Point::new(20.0, 20.0), Point::new(0.0, 0.0));
        let ids = marquee_select(&drawings, &LayerSet::new(), &IdentityMapper, rect);
        assert_eq!(ids, vec![inside.id().to_string(), locked.id().to_string()]);
    }

    #[test]
    fn test_marquee_boundary_inclusive() {
        let edge = Drawing::new(Geometry::Hline {
            points: [Anchor::new(10.0, 10.0)],
        });
        let ids = marquee_select(
            std::slice::from_ref(&edge),
            &LayerSet::new(),
            &IdentityMapper,
            Rect::new(0.0, 0.0, 10.0, 10.0),
        );
        assert_eq!(ids.len(), 1);
    }
}
