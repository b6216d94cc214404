//! Click-to-place tool collecting a fixed number of anchors.

use crate::chart::{CoordinateMapper, price_span};
use crate::config::ChannelWidth;
use crate::drawing::{Anchor, Drawing, DrawingKind, Geometry};
use crate::input::{MouseButton, PointerEvent};
use crate::plugin::{Capabilities, ToolContext, ToolError, ToolPlugin, ToolResult};

/// Distance between the rails of a 2-point channel, in price units.
///
/// Percent mode takes a share of `|price|` of the first anchor; pixel mode
/// converts a screen distance through the price axis and yields 0 when the
/// chart cannot map it.
pub fn channel_width(mode: ChannelWidth, first: Anchor, chart: &dyn CoordinateMapper) -> f64 {
    match mode {
        ChannelWidth::Percent(pct) => first.price.abs() * pct / 100.0,
        ChannelWidth::Pixels(px) => price_span(chart, first.price, px).unwrap_or_else(|| {
            log::warn!("Cannot convert {}px channel width at price {}", px, first.price);
            0.0
        }),
    }
}

/// Generic multi-point tool.
///
/// Each left click records an anchor. Once the kind's anchor count is reached
/// the drawing is committed with the configured style and layer, and
/// selected. Moving the pointer with pending anchors shows a ghost.
#[derive(Debug, Clone)]
pub struct AnchorTool {
    id: &'static str,
    label: &'static str,
    kind: DrawingKind,
}

impl AnchorTool {
    pub const fn new(id: &'static str, label: &'static str, kind: DrawingKind) -> Self {
        Self { id, label, kind }
    }

    pub fn drawing_kind(&self) -> DrawingKind {
        self.kind
    }

    fn build(&self, ctx: &ToolContext<'_>, anchors: &[Anchor]) -> ToolResult<Drawing> {
        let settings = ctx.settings();
        let width = match (self.kind, anchors.first()) {
            (DrawingKind::ParallelChannel, Some(first)) => {
                channel_width(settings.channel_width, *first, ctx.chart())
            }
            _ => 0.0,
        };
        let params = settings.geometry_params(width);
        let geometry = Geometry::from_anchors(self.kind, anchors, &params)
            .ok_or(ToolError::Geometry(self.kind.as_str()))?;
        Ok(Drawing::new(geometry)
            .with_style(settings.default_style.clone())
            .with_layer(settings.layer_id.clone()))
    }

    /// Pad collected anchors with the cursor up to the full count.
    fn preview_anchors(&self, collected: &[Anchor], cursor: Anchor) -> Vec<Anchor> {
        let mut anchors = collected.to_vec();
        anchors.resize(self.kind.point_count(), cursor);
        anchors
    }
}

impl ToolPlugin for AnchorTool {
    fn id(&self) -> &str {
        self.id
    }

    fn label(&self) -> &str {
        self.label
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::CLICK_TOOL
    }

    fn on_pointer_down(&self, event: &PointerEvent, ctx: &mut ToolContext<'_>) -> ToolResult<bool> {
        if event.button != MouseButton::Left {
            return Ok(false);
        }
        ctx.discard_foreign_ghosts();

        let point = ctx.xy(event);
        let collected = ctx.push_anchor(point.anchor());
        if collected < self.kind.point_count() {
            let preview = self.preview_anchors(ctx.anchors(), point.anchor());
            let ghost = self.build(ctx, &preview)?;
            ctx.set_ghost(ghost);
            return Ok(true);
        }

        let anchors = ctx.take_anchors();
        let drawing = self.build(ctx, &anchors)?;
        let draw = ctx.draw();
        if let Some(id) = draw.add(drawing) {
            log::debug!("{} committed {}", self.id, id);
            draw.select(&[id]);
        }
        Ok(true)
    }

    fn on_pointer_move(&self, event: &PointerEvent, ctx: &mut ToolContext<'_>) -> ToolResult<bool> {
        if ctx.anchors().is_empty() {
            return Ok(false);
        }
        let cursor = ctx.xy(event).anchor();
        let preview = self.preview_anchors(ctx.anchors(), cursor);
        let ghost = self.build(ctx, &preview)?;
        ctx.set_ghost(ghost);
        Ok(true)
    }
}
