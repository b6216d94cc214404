//! Snap functionality for aligning pointer positions to the grid, price levels and bars.
//!
//! The pipeline runs in a fixed order: grid, price levels, OHLC magnet. Every
//! stage is a pure function of its input and is idempotent.

use std::collections::BTreeMap;
use std::rc::Rc;

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::chart::{CoordinateMapper, PriceSeries};

/// Default grid step in pixels.
pub const GRID_SIZE: f64 = 10.0;

/// Default magnet reach in pixels.
pub const MAGNET_TOLERANCE: f64 = 8.0;

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether the X coordinate was moved.
    pub snapped_x: bool,
    /// Whether the Y coordinate was moved.
    pub snapped_y: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }

    /// Feed the output of this stage into the next one, accumulating flags.
    fn then(self, stage: impl FnOnce(Point) -> SnapResult) -> SnapResult {
        let next = stage(self.point);
        SnapResult {
            point: next.point,
            snapped_x: self.snapped_x || next.snapped_x,
            snapped_y: self.snapped_y || next.snapped_y,
        }
    }
}

/// Snap a point to the nearest grid intersection.
pub fn snap_to_grid(point: Point, grid_size: f64) -> SnapResult {
    if grid_size <= 0.0 || !grid_size.is_finite() {
        return SnapResult::none(point);
    }
    let x = (point.x / grid_size).round() * grid_size;
    let y = (point.y / grid_size).round() * grid_size;
    SnapResult {
        point: Point::new(x, y),
        snapped_x: x != point.x,
        snapped_y: y != point.y,
    }
}

/// The finite row closest to `y`.
fn nearest_row(y: f64, rows: &[f64]) -> Option<f64> {
    rows.iter()
        .copied()
        .filter(|r| r.is_finite())
        .min_by(|a, b| (a - y).abs().total_cmp(&(b - y).abs()))
}

/// Snap Y to the closest of a fixed set of pixel rows.
///
/// With `tolerance` set, rows further away than it are ignored.
pub fn snap_to_levels(point: Point, level_ys: &[f64], tolerance: Option<f64>) -> SnapResult {
    let Some(row) = nearest_row(point.y, level_ys) else {
        return SnapResult::none(point);
    };
    if tolerance.is_some_and(|tol| (row - point.y).abs() > tol) {
        return SnapResult::none(point);
    }
    SnapResult {
        point: Point::new(point.x, row),
        snapped_x: false,
        snapped_y: row != point.y,
    }
}

/// Pull Y onto the nearest OHLC row of the bar under the cursor, within `tolerance` pixels.
pub fn magnet_to_ohlc(point: Point, ohlc_ys: &[f64], tolerance: f64) -> SnapResult {
    snap_to_levels(point, ohlc_ys, Some(tolerance))
}

/// Which pipeline stages a tool uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    pub grid: bool,
    pub levels: bool,
    pub magnet: bool,
}

impl SnapConfig {
    pub const OFF: SnapConfig = SnapConfig {
        grid: false,
        levels: false,
        magnet: false,
    };

    pub fn is_enabled(&self) -> bool {
        self.grid || self.levels || self.magnet
    }
}

/// Pipeline settings shared by every tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SnapSettings {
    /// Grid step in pixels.
    pub grid_step: f64,
    /// Horizontal price levels for the level stage.
    pub price_levels: Vec<f64>,
    /// Reach of the level stage in pixels. `None` always snaps to the nearest level.
    pub level_tolerance: Option<f64>,
    /// Reach of the magnet stage in pixels.
    pub magnet_tolerance: f64,
    /// Stages used by tools without their own entry.
    pub default_config: SnapConfig,
    /// Per-tool stage overrides, keyed by tool id.
    pub per_tool: BTreeMap<String, SnapConfig>,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            grid_step: GRID_SIZE,
            price_levels: Vec::new(),
            level_tolerance: None,
            magnet_tolerance: MAGNET_TOLERANCE,
            default_config: SnapConfig::OFF,
            per_tool: BTreeMap::new(),
        }
    }
}

impl SnapSettings {
    /// Stages for a tool, falling back to the default config.
    pub fn config_for(&self, tool_id: Option<&str>) -> SnapConfig {
        tool_id
            .and_then(|id| self.per_tool.get(id))
            .copied()
            .unwrap_or(self.default_config)
    }
}

/// Run the pipeline over already-resolved pixel rows.
pub fn snap_point(
    point: Point,
    config: SnapConfig,
    settings: &SnapSettings,
    level_ys: &[f64],
    ohlc_ys: &[f64],
) -> SnapResult {
    let mut result = SnapResult::none(point);
    if config.grid {
        result = result.then(|p| snap_to_grid(p, settings.grid_step));
    }
    if config.levels {
        result = result.then(|p| snap_to_levels(p, level_ys, settings.level_tolerance));
    }
    if config.magnet {
        result = result.then(|p| magnet_to_ohlc(p, ohlc_ys, settings.magnet_tolerance));
    }
    result
}

/// Snap function handed to tools through the plugin environment.
pub trait Snapper {
    fn snap(&self, tool_id: Option<&str>, point: Point) -> SnapResult;
}

impl<F> Snapper for F
where
    F: Fn(Option<&str>, Point) -> SnapResult,
{
    fn snap(&self, tool_id: Option<&str>, point: Point) -> SnapResult {
        self(tool_id, point)
    }
}

/// Snapper that never moves the point.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSnap;

impl Snapper for NoSnap {
    fn snap(&self, _tool_id: Option<&str>, point: Point) -> SnapResult {
        SnapResult::none(point)
    }
}

/// Snapper that resolves price levels and bars through the chart.
pub struct ChartSnapper {
    pub settings: SnapSettings,
    chart: Rc<dyn CoordinateMapper>,
    series: Rc<dyn PriceSeries>,
}

impl ChartSnapper {
    pub fn new(
        settings: SnapSettings,
        chart: Rc<dyn CoordinateMapper>,
        series: Rc<dyn PriceSeries>,
    ) -> Self {
        Self {
            settings,
            chart,
            series,
        }
    }

    fn level_rows(&self) -> Vec<f64> {
        self.settings
            .price_levels
            .iter()
            .filter_map(|p| self.chart.price_to_y(*p))
            .collect()
    }

    fn ohlc_rows(&self, x: f64) -> Vec<f64> {
        let Some(bar) = self
            .chart
            .x_to_time(x)
            .and_then(|t| self.series.bar_at(t))
        else {
            return Vec::new();
        };
        bar.ohlc()
            .iter()
            .filter_map(|p| self.chart.price_to_y(*p))
            .collect()
    }
}

impl Snapper for ChartSnapper {
    fn snap(&self, tool_id: Option<&str>, point: Point) -> SnapResult {
        let config = self.settings.config_for(tool_id);
        if !config.is_enabled() {
            return SnapResult::none(point);
        }
        let levels = if config.levels { self.level_rows() } else { Vec::new() };
        // The magnet looks at the bar under the grid-snapped x.
        let probe_x = if config.grid {
            snap_to_grid(point, self.settings.grid_step).point.x
        } else {
            point.x
        };
        let ohlc = if config.magnet { self.ohlc_rows(probe_x) } else { Vec::new() };
        snap_point(point, config, &self.settings, &levels, &ohlc)
    }
}
