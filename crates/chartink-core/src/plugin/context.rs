//! Per-call context handed to plugin callbacks.

use kurbo::Point;

use super::PluginEnv;
use super::draft::{DraftState, DraftStore, Ghost};
use crate::chart::{self, CoordinateMapper, RedrawHandle};
use crate::config::ToolSettings;
use crate::drawing::{Anchor, Drawing, DrawingId, DrawingPatch};
use crate::input::PointerEvent;
use crate::store::{ShapeStore, SharedStore, StoreResult};

/// A pointer position resolved to pixels and chart coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPoint {
    pub x: f64,
    pub y: f64,
    pub time: f64,
    pub price: f64,
    /// Whether the snap pipeline moved the point.
    pub snapped: bool,
}

impl ResolvedPoint {
    pub fn anchor(&self) -> Anchor {
        Anchor::new(self.time, self.price)
    }

    pub fn pixel(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Fault-isolated access to the shape store.
///
/// Every operation logs its failure and reports it through the return value
/// instead of propagating.
pub struct DrawOps<'a> {
    store: &'a SharedStore,
    canvas: &'a dyn RedrawHandle,
}

impl<'a> DrawOps<'a> {
    fn mutate<R>(&self, op: &str, f: impl FnOnce(&mut dyn ShapeStore) -> StoreResult<R>) -> Option<R> {
        let mut store = match self.store.try_borrow_mut() {
            Ok(store) => store,
            Err(_) => {
                log::warn!("Shape store busy, dropped {}", op);
                return None;
            }
        };
        match f(&mut *store) {
            Ok(value) => {
                drop(store);
                self.canvas.invalidate();
                Some(value)
            }
            Err(e) => {
                log::warn!("Shape store {} failed: {}", op, e);
                None
            }
        }
    }

    pub fn add(&self, drawing: Drawing) -> Option<DrawingId> {
        self.mutate("add", |s| s.add(drawing))
    }

    pub fn update(&self, id: &str, patch: DrawingPatch) -> bool {
        self.mutate("update", |s| s.update(id, patch)).is_some()
    }

    pub fn select(&self, ids: &[DrawingId]) -> bool {
        self.mutate("select", |s| s.select(ids)).is_some()
    }

    pub fn clear_selection(&self) -> bool {
        self.mutate("clear_selection", |s| {
            s.clear_selection();
            Ok(())
        })
        .is_some()
    }

    /// Read the store. `None` when it is mutably borrowed elsewhere.
    pub fn read<R>(&self, f: impl FnOnce(&dyn ShapeStore) -> R) -> Option<R> {
        match self.store.try_borrow() {
            Ok(store) => Some(f(&*store)),
            Err(_) => {
                log::warn!("Shape store busy, read skipped");
                None
            }
        }
    }
}

/// What a plugin sees during one callback.
pub struct ToolContext<'a> {
    tool_id: &'a str,
    env: &'a PluginEnv,
    drafts: &'a mut DraftStore,
    store: &'a SharedStore,
    settings: &'a ToolSettings,
}

impl<'a> ToolContext<'a> {
    pub(crate) fn new(
        tool_id: &'a str,
        env: &'a PluginEnv,
        drafts: &'a mut DraftStore,
        store: &'a SharedStore,
        settings: &'a ToolSettings,
    ) -> Self {
        Self {
            tool_id,
            env,
            drafts,
            store,
            settings,
        }
    }

    pub fn tool_id(&self) -> &'a str {
        self.tool_id
    }

    /// Snap the pointer and map it to chart coordinates.
    ///
    /// When the chart cannot map the point, time and price fall back to zero.
    pub fn xy(&self, event: &PointerEvent) -> ResolvedPoint {
        let snapped = self.env.snap.snap(Some(self.tool_id), event.position);
        self.resolve(snapped.point, snapped.is_snapped())
    }

    /// Map the pointer without snapping.
    pub fn xy_raw(&self, event: &PointerEvent) -> ResolvedPoint {
        self.resolve(event.position, false)
    }

    fn resolve(&self, p: Point, snapped: bool) -> ResolvedPoint {
        let time = self.env.chart.x_to_time(p.x).unwrap_or_else(|| {
            log::warn!("{}: no time at x={}", self.tool_id, p.x);
            0.0
        });
        let price = self.env.chart.y_to_price(p.y).unwrap_or_else(|| {
            log::warn!("{}: no price at y={}", self.tool_id, p.y);
            0.0
        });
        ResolvedPoint {
            x: p.x,
            y: p.y,
            time,
            price,
            snapped,
        }
    }

    pub fn symbol(&self) -> &'a str {
        let env: &'a PluginEnv = self.env;
        env.series.symbol()
    }

    pub fn timeframe(&self) -> &'a str {
        let env: &'a PluginEnv = self.env;
        env.series.timeframe()
    }

    pub fn chart(&self) -> &'a dyn CoordinateMapper {
        let env: &'a PluginEnv = self.env;
        env.chart.as_ref()
    }

    pub fn settings(&self) -> &'a ToolSettings {
        self.settings
    }

    pub fn draw(&self) -> DrawOps<'a> {
        let env: &'a PluginEnv = self.env;
        DrawOps {
            store: self.store,
            canvas: env.canvas.as_ref(),
        }
    }

    pub fn invalidate(&self) {
        self.env.canvas.invalidate();
    }

    /// Price distance covered by `pixels` vertical screen pixels at `price`.
    pub fn price_span(&self, price: f64, pixels: f64) -> Option<f64> {
        chart::price_span(self.chart(), price, pixels)
    }

    pub fn draft(&self) -> &DraftState {
        self.drafts.state(self.tool_id)
    }

    pub fn draft_mut(&mut self) -> &mut DraftState {
        self.drafts.state_mut(self.tool_id)
    }

    pub fn anchors(&self) -> &[Anchor] {
        self.draft().anchors()
    }

    /// Record the next anchor. Returns how many are collected now.
    pub fn push_anchor(&mut self, anchor: Anchor) -> usize {
        let state = self.draft_mut();
        if let DraftState::Collecting { anchors, .. } = state {
            anchors.push(anchor);
            return anchors.len();
        }
        *state = DraftState::Collecting {
            anchors: vec![anchor],
            ghost: None,
        };
        1
    }

    /// Take the collected anchors and return the tool to idle.
    pub fn take_anchors(&mut self) -> Vec<Anchor> {
        let state = std::mem::take(self.draft_mut());
        self.invalidate();
        match state {
            DraftState::Collecting { anchors, .. } => anchors,
            _ => Vec::new(),
        }
    }

    /// Show a preview drawing owned by this tool.
    pub fn set_ghost(&mut self, drawing: Drawing) {
        let owner = self.tool_id.to_string();
        if let DraftState::Collecting { ghost, .. } = self.draft_mut() {
            *ghost = Some(Ghost { owner, drawing });
            self.invalidate();
        }
    }

    pub fn clear_ghost(&mut self) {
        if let DraftState::Collecting { ghost, .. } = self.draft_mut() {
            if ghost.take().is_some() {
                self.invalidate();
            }
        }
    }

    /// Drop previews left behind by other tools.
    pub fn discard_foreign_ghosts(&mut self) -> usize {
        let discarded = self.drafts.discard_foreign_ghosts(self.tool_id);
        if discarded > 0 {
            log::debug!("{}: discarded {} stale ghost(s)", self.tool_id, discarded);
            self.invalidate();
        }
        discarded
    }

    pub fn reset_draft(&mut self) {
        self.drafts.reset(self.tool_id);
        self.invalidate();
    }

    pub fn begin_marquee(&mut self, origin: Point) {
        *self.draft_mut() = DraftState::Marquee {
            origin,
            current: origin,
        };
        self.invalidate();
    }

    /// Move the marquee's free corner. False when no marquee is active.
    pub fn update_marquee(&mut self, point: Point) -> bool {
        let DraftState::Marquee { current, .. } = self.draft_mut() else {
            return false;
        };
        *current = point;
        self.invalidate();
        true
    }

    /// Finish the marquee and return its rectangle.
    pub fn take_marquee(&mut self) -> Option<kurbo::Rect> {
        let rect = self.draft().marquee()?;
        self.reset_draft();
        Some(rect)
    }
}
