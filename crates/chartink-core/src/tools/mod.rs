//! Built-in drawing tools.

mod anchor;

pub use anchor::{AnchorTool, channel_width};

use crate::drawing::DrawingKind;
use crate::plugin::{PluginManager, ToolPlugin};

/// Id, label and drawing kind of every built-in tool, in palette order.
pub const BUILTIN_TOOLS: [(&str, &str, DrawingKind); 12] = [
    ("trendline", "Trend Line", DrawingKind::Trendline),
    ("ray", "Ray", DrawingKind::Ray),
    ("hline", "Horizontal Line", DrawingKind::Hline),
    ("vline", "Vertical Line", DrawingKind::Vline),
    ("rect", "Rectangle", DrawingKind::Rect),
    ("ellipse", "Ellipse", DrawingKind::Ellipse),
    ("fib", "Fib Retracement", DrawingKind::Fib),
    ("parallel-channel", "Parallel Channel", DrawingKind::ParallelChannel),
    ("parallel-channel-3pt", "Parallel Channel (3 points)", DrawingKind::ParallelChannel3pt),
    ("pitchfork", "Pitchfork", DrawingKind::Pitchfork),
    ("text", "Text", DrawingKind::Text),
    ("ruler", "Ruler", DrawingKind::Measure),
];

/// Fresh instances of every built-in tool.
pub fn builtin_tools() -> Vec<Box<dyn ToolPlugin>> {
    BUILTIN_TOOLS
        .iter()
        .map(|&(id, label, kind)| Box::new(AnchorTool::new(id, label, kind)) as Box<dyn ToolPlugin>)
        .collect()
}

/// Register every built-in tool. Returns how many were new.
pub fn register_builtin(manager: &mut PluginManager) -> usize {
    builtin_tools()
        .into_iter()
        .map(|tool| manager.register(tool))
        .filter(|registered| *registered)
        .count()
}
