//! Drawing surfaces.

use kurbo::{BezPath, Point, Rect, Shape, Size, Stroke};
use peniko::Color;

use crate::renderer::RenderResult;

/// Target of paint routines. All coordinates are in pixels.
pub trait Surface {
    /// Fill the whole surface with `color`.
    fn clear(&mut self, size: Size, color: Color) -> RenderResult<()>;

    fn stroke(&mut self, path: &BezPath, stroke: &Stroke, color: Color) -> RenderResult<()>;

    fn fill(&mut self, path: &BezPath, color: Color) -> RenderResult<()>;

    /// Draw `text` with its top-left corner at `origin`.
    fn text(&mut self, origin: Point, text: &str, size: f64, color: Color) -> RenderResult<()>;
}

/// One recorded surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear {
        size: Size,
        color: Color,
    },
    Stroke {
        path: BezPath,
        width: f64,
        dashes: Vec<f64>,
        color: Color,
    },
    Fill {
        path: BezPath,
        color: Color,
    },
    Text {
        origin: Point,
        text: String,
        size: f64,
        color: Color,
    },
}

impl DrawCommand {
    /// Pixel area touched by the command.
    pub fn bounds(&self) -> Rect {
        match self {
            DrawCommand::Clear { size, .. } => size.to_rect(),
            DrawCommand::Stroke { path, width, .. } => path.bounding_box().inflate(width / 2.0, width / 2.0),
            DrawCommand::Fill { path, .. } => path.bounding_box(),
            DrawCommand::Text {
                origin, text, size, ..
            } => Rect::from_origin_size(*origin, (text.chars().count() as f64 * size * 0.6, *size)),
        }
    }
}

/// Surface that records every call. Used natively and by tests.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn reset(&mut self) {
        self.commands.clear();
    }

    /// Recorded texts, in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn stroke_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Stroke { .. }))
            .count()
    }

    pub fn dashed_stroke_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Stroke { dashes, .. } if !dashes.is_empty()))
            .count()
    }
}

impl Surface for DisplayList {
    fn clear(&mut self, size: Size, color: Color) -> RenderResult<()> {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear { size, color });
        Ok(())
    }

    fn stroke(&mut self, path: &BezPath, stroke: &Stroke, color: Color) -> RenderResult<()> {
        self.commands.push(DrawCommand::Stroke {
            path: path.clone(),
            width: stroke.width,
            dashes: stroke.dash_pattern.iter().copied().collect(),
            color,
        });
        Ok(())
    }

    fn fill(&mut self, path: &BezPath, color: Color) -> RenderResult<()> {
        self.commands.push(DrawCommand::Fill {
            path: path.clone(),
            color,
        });
        Ok(())
    }

    fn text(&mut self, origin: Point, text: &str, size: f64, color: Color) -> RenderResult<()> {
        self.commands.push(DrawCommand::Text {
            origin,
            text: text.to_string(),
            size,
            color,
        });
        Ok(())
    }
}
