//! Visual style of a drawing.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    /// Default chart-drawing blue.
    pub const fn accent() -> Self {
        Self::new(41, 98, 255, 255)
    }

    /// Multiply the alpha channel by `opacity`.
    pub fn with_opacity(self, opacity: f64) -> Self {
        let alpha = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a: alpha, ..self }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Dash pattern of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeStyle {
    /// Dash lengths in pixels, empty for solid strokes.
    pub fn dash_pattern(self, width: f64) -> Vec<f64> {
        let w = width.max(1.0);
        match self {
            StrokeStyle::Solid => Vec::new(),
            StrokeStyle::Dashed => vec![6.0 * w, 4.0 * w],
            StrokeStyle::Dotted => vec![w, 2.0 * w],
        }
    }
}

/// Style properties shared by every drawing kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingStyle {
    pub stroke_color: SerializableColor,
    pub stroke_width: f64,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub dash: StrokeStyle,
    /// Fill color (None = no fill). Only closed kinds use it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<SerializableColor>,
}

fn default_opacity() -> f64 {
    1.0
}

impl DrawingStyle {
    /// Get the stroke color with opacity applied.
    pub fn stroke_with_opacity(&self) -> Color {
        self.stroke_color.with_opacity(self.opacity).into()
    }

    /// Get the fill color with opacity applied.
    pub fn fill_with_opacity(&self) -> Option<Color> {
        self.fill_color.map(|c| c.with_opacity(self.opacity).into())
    }

    pub fn set_stroke(&mut self, color: Color) {
        self.stroke_color = color.into();
    }

    pub fn set_fill(&mut self, color: Option<Color>) {
        self.fill_color = color.map(Into::into);
    }
}

impl Default for DrawingStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::accent(),
            stroke_width: 1.5,
            opacity: 1.0,
            dash: StrokeStyle::Solid,
            fill_color: None,
        }
    }
}
