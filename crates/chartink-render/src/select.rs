//! Pointer selection tool: click to pick, drag to marquee.

use chartink_core::config::HIT_PADDING;
use chartink_core::drawing::DrawingId;
use chartink_core::input::{MouseButton, PointerEvent};
use chartink_core::plugin::{Capabilities, ToolContext, ToolPlugin, ToolResult};

use crate::hit::{hit_test, marquee_select};

/// Selects drawings under the pointer or inside a dragged rectangle.
///
/// Holding shift extends the current selection.
#[derive(Debug, Clone)]
pub struct SelectTool {
    padding: f64,
}

impl Default for SelectTool {
    fn default() -> Self {
        Self::new(HIT_PADDING)
    }
}

impl SelectTool {
    pub const ID: &'static str = "select";

    pub fn new(padding: f64) -> Self {
        Self { padding }
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }
}

fn merge(mut current: Vec<DrawingId>, extra: Vec<DrawingId>) -> Vec<DrawingId> {
    for id in extra {
        if !current.contains(&id) {
            current.push(id);
        }
    }
    current
}

impl ToolPlugin for SelectTool {
    fn id(&self) -> &str {
        Self::ID
    }

    fn label(&self) -> &str {
        "Select"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL_POINTER
    }

    fn on_pointer_down(&self, event: &PointerEvent, ctx: &mut ToolContext<'_>) -> ToolResult<bool> {
        if event.button != MouseButton::Left {
            return Ok(false);
        }
        let chart = ctx.chart();
        let draw = ctx.draw();
        let extend = event.modifiers.shift;

        let hit = draw
            .read(|s| hit_test(s.drawings(), s.layers(), chart, event.position, self.padding))
            .flatten();
        if let Some(id) = hit {
            let selection = if extend {
                let current = draw.read(|s| s.selection().to_vec()).unwrap_or_default();
                merge(current, vec![id])
            } else {
                vec![id]
            };
            draw.select(&selection);
            return Ok(true);
        }

        if !extend {
            draw.clear_selection();
        }
        ctx.begin_marquee(event.position);
        Ok(true)
    }

    fn on_pointer_move(&self, event: &PointerEvent, ctx: &mut ToolContext<'_>) -> ToolResult<bool> {
        Ok(ctx.update_marquee(event.position))
    }

    fn on_pointer_up(&self, event: &PointerEvent, ctx: &mut ToolContext<'_>) -> ToolResult<bool> {
        let Some(rect) = ctx.take_marquee() else {
            return Ok(false);
        };
        let chart = ctx.chart();
        let draw = ctx.draw();
        let Some((picked, current)) =
            draw.read(|s| (marquee_select(s.drawings(), s.layers(), chart, rect), s.selection().to_vec()))
        else {
            return Ok(true);
        };
        log::debug!("Marquee {:?} picked {} drawing(s)", rect, picked.len());
        let selection = if event.modifiers.shift {
            merge(current, picked)
        } else {
            picked
        };
        draw.select(&selection);
        Ok(true)
    }
}
