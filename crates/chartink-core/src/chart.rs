//! Chart collaborators: coordinate mapping, the primary price series and the redraw handle.
//!
//! The drawing engine never owns the candle chart. It talks to it through these
//! traits, and ships a linear viewport plus an in-memory series for hosts that
//! have nothing better.

use std::cell::Cell;

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::drawing::Anchor;

/// Converts between pixel space and chart (time, price) space.
///
/// Every conversion may fail, e.g. when the chart has no data loaded yet.
pub trait CoordinateMapper {
    fn x_to_time(&self, x: f64) -> Option<f64>;
    fn time_to_x(&self, time: f64) -> Option<f64>;
    fn y_to_price(&self, y: f64) -> Option<f64>;
    fn price_to_y(&self, price: f64) -> Option<f64>;

    /// Resolve an anchor to its pixel position.
    fn anchor_to_point(&self, anchor: Anchor) -> Option<Point> {
        Some(Point::new(self.time_to_x(anchor.time)?, self.price_to_y(anchor.price)?))
    }

    /// Resolve a pixel position to an anchor.
    fn point_to_anchor(&self, point: Point) -> Option<Anchor> {
        Some(Anchor::new(self.x_to_time(point.x)?, self.y_to_price(point.y)?))
    }
}

/// Price distance covered by `pixels` vertical screen pixels at `price`.
pub fn price_span(chart: &dyn CoordinateMapper, price: f64, pixels: f64) -> Option<f64> {
    let y = chart.price_to_y(price)?;
    let shifted = chart.y_to_price(y - pixels)?;
    Some((shifted - price).abs())
}

/// One OHLC bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn ohlc(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }
}

/// The primary price series of a chart.
pub trait PriceSeries {
    fn symbol(&self) -> &str;
    fn timeframe(&self) -> &str;
    /// The bar covering `time`, if any.
    fn bar_at(&self, time: f64) -> Option<Bar>;
}

/// Something that can be asked to repaint on the next frame.
pub trait RedrawHandle {
    fn invalidate(&self);
}

/// Redraw handle that only counts requests. Handy for hosts without a frame loop.
#[derive(Debug, Default)]
pub struct RedrawCounter {
    count: Cell<u64>,
}

impl RedrawCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count.get()
    }
}

impl RedrawHandle for RedrawCounter {
    fn invalidate(&self) {
        self.count.set(self.count.get() + 1);
    }
}

/// Linear chart viewport mapping (time, price) to pixels.
///
/// Time grows to the right, price grows upward, so the y axis is flipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearViewport {
    /// Time at the left edge.
    pub time_origin: f64,
    /// Price at the bottom edge.
    pub price_origin: f64,
    /// Horizontal pixels per time unit.
    pub px_per_time: f64,
    /// Vertical pixels per price unit.
    pub px_per_price: f64,
    /// Size of the plot area in pixels.
    pub size: Size,
}

impl LinearViewport {
    /// Fit the given time and price ranges into a plot area.
    pub fn fit(time_range: (f64, f64), price_range: (f64, f64), size: Size) -> Self {
        let span_t = (time_range.1 - time_range.0).abs().max(f64::EPSILON);
        let span_p = (price_range.1 - price_range.0).abs().max(f64::EPSILON);
        Self {
            time_origin: time_range.0.min(time_range.1),
            price_origin: price_range.0.min(price_range.1),
            px_per_time: size.width / span_t,
            px_per_price: size.height / span_p,
            size,
        }
    }

    /// World (time, price) to screen transform.
    pub fn transform(&self) -> Affine {
        Affine::new([
            self.px_per_time,
            0.0,
            0.0,
            -self.px_per_price,
            -self.time_origin * self.px_per_time,
            self.size.height + self.price_origin * self.px_per_price,
        ])
    }

    /// Screen to world (time, price) transform.
    pub fn inverse_transform(&self) -> Affine {
        self.transform().inverse()
    }

    /// Pan by a delta in screen pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.time_origin -= delta.x / self.px_per_time;
        self.price_origin += delta.y / self.px_per_price;
    }

    /// Zoom the time axis, keeping the given screen x fixed.
    pub fn zoom_time_at(&mut self, screen_x: f64, factor: f64) {
        if factor <= 0.0 || !factor.is_finite() {
            return;
        }
        let anchor_time = self.time_origin + screen_x / self.px_per_time;
        self.px_per_time *= factor;
        self.time_origin = anchor_time - screen_x / self.px_per_time;
    }

    fn usable(&self) -> bool {
        self.px_per_time.abs() > f64::EPSILON && self.px_per_price.abs() > f64::EPSILON
    }
}

impl CoordinateMapper for LinearViewport {
    fn x_to_time(&self, x: f64) -> Option<f64> {
        self.usable()
            .then(|| (self.inverse_transform() * Point::new(x, 0.0)).x)
    }

    fn time_to_x(&self, time: f64) -> Option<f64> {
        self.usable().then(|| (self.transform() * Point::new(time, 0.0)).x)
    }

    fn y_to_price(&self, y: f64) -> Option<f64> {
        self.usable()
            .then(|| (self.inverse_transform() * Point::new(0.0, y)).y)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        self.usable().then(|| (self.transform() * Point::new(0.0, price)).y)
    }
}

/// Mapping where time and price are the pixel coordinates themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl CoordinateMapper for IdentityMapper {
    fn x_to_time(&self, x: f64) -> Option<f64> {
        Some(x)
    }

    fn time_to_x(&self, time: f64) -> Option<f64> {
        Some(time)
    }

    fn y_to_price(&self, y: f64) -> Option<f64> {
        Some(y)
    }

    fn price_to_y(&self, price: f64) -> Option<f64> {
        Some(price)
    }
}

/// In-memory series of bars sorted by time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BarSeries {
    pub symbol: String,
    pub timeframe: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        bars.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            bars,
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }
}

impl PriceSeries for BarSeries {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn timeframe(&self) -> &str {
        &self.timeframe
    }

    /// Nearest bar by time.
    fn bar_at(&self, time: f64) -> Option<Bar> {
        let idx = self.bars.partition_point(|b| b.time < time);
        let after = self.bars.get(idx);
        let before = idx.checked_sub(1).and_then(|i| self.bars.get(i));
        match (before, after) {
            (Some(b), Some(a)) => {
                if (time - b.time).abs() <= (a.time - time).abs() {
                    Some(*b)
                } else {
                    Some(*a)
                }
            }
            (Some(b), None) => Some(*b),
            (None, Some(a)) => Some(*a),
            (None, None) => None,
        }
    }
}
