//! Drawing model: chart annotations anchored in (time, price) space.

mod layer;
mod style;

pub use layer::{DEFAULT_LAYER_ID, Layer, LayerSet};
pub use style::{DrawingStyle, SerializableColor, StrokeStyle};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for drawings (UUID v4 string).
pub type DrawingId = String;

/// Default fibonacci retracement ratios.
pub const FIB_LEVELS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];

/// Default font size for text drawings.
pub const DEFAULT_FONT_SIZE: f64 = 14.0;

fn default_fib_levels() -> Vec<f64> {
    FIB_LEVELS.to_vec()
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

fn default_layer_id() -> String {
    DEFAULT_LAYER_ID.to_string()
}

/// A point in chart space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Anchor {
    pub time: f64,
    pub price: f64,
}

impl Anchor {
    pub const fn new(time: f64, price: f64) -> Self {
        Self { time, price }
    }
}

/// Drawing kinds, in tool palette order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrawingKind {
    Trendline,
    Ray,
    Hline,
    Vline,
    Rect,
    Ellipse,
    Fib,
    ParallelChannel,
    #[serde(rename = "parallel-channel-3pt")]
    ParallelChannel3pt,
    Pitchfork,
    Text,
    Measure,
}

impl DrawingKind {
    pub const ALL: [DrawingKind; 12] = [
        DrawingKind::Trendline,
        DrawingKind::Ray,
        DrawingKind::Hline,
        DrawingKind::Vline,
        DrawingKind::Rect,
        DrawingKind::Ellipse,
        DrawingKind::Fib,
        DrawingKind::ParallelChannel,
        DrawingKind::ParallelChannel3pt,
        DrawingKind::Pitchfork,
        DrawingKind::Text,
        DrawingKind::Measure,
    ];

    /// Number of anchors a drawing of this kind carries.
    pub const fn point_count(self) -> usize {
        match self {
            DrawingKind::Hline | DrawingKind::Vline | DrawingKind::Text => 1,
            DrawingKind::Trendline
            | DrawingKind::Ray
            | DrawingKind::Rect
            | DrawingKind::Ellipse
            | DrawingKind::Fib
            | DrawingKind::ParallelChannel
            | DrawingKind::Measure => 2,
            DrawingKind::ParallelChannel3pt | DrawingKind::Pitchfork => 3,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DrawingKind::Trendline => "trendline",
            DrawingKind::Ray => "ray",
            DrawingKind::Hline => "hline",
            DrawingKind::Vline => "vline",
            DrawingKind::Rect => "rect",
            DrawingKind::Ellipse => "ellipse",
            DrawingKind::Fib => "fib",
            DrawingKind::ParallelChannel => "parallel-channel",
            DrawingKind::ParallelChannel3pt => "parallel-channel-3pt",
            DrawingKind::Pitchfork => "pitchfork",
            DrawingKind::Text => "text",
            DrawingKind::Measure => "measure",
        }
    }
}

impl std::fmt::Display for DrawingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific parameters used when building geometry from collected anchors.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryParams {
    /// Price distance between the rails of a 2-point channel.
    pub channel_width: f64,
    pub fib_levels: Vec<f64>,
    pub text: String,
    pub font_size: f64,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            channel_width: 0.0,
            fib_levels: default_fib_levels(),
            text: String::new(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

/// Anchors plus kind-specific fields. The anchor count is fixed per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Geometry {
    Trendline {
        points: [Anchor; 2],
    },
    Ray {
        points: [Anchor; 2],
    },
    Hline {
        points: [Anchor; 1],
    },
    Vline {
        points: [Anchor; 1],
    },
    Rect {
        points: [Anchor; 2],
    },
    Ellipse {
        points: [Anchor; 2],
    },
    Fib {
        points: [Anchor; 2],
        #[serde(default = "default_fib_levels")]
        levels: Vec<f64>,
    },
    ParallelChannel {
        points: [Anchor; 2],
        width: f64,
    },
    #[serde(rename = "parallel-channel-3pt")]
    ParallelChannel3pt {
        points: [Anchor; 3],
    },
    Pitchfork {
        points: [Anchor; 3],
    },
    Text {
        points: [Anchor; 1],
        content: String,
        #[serde(rename = "fontSize", default = "default_font_size")]
        font_size: f64,
    },
    Measure {
        points: [Anchor; 2],
    },
}

impl Geometry {
    /// Build geometry of `kind` from exactly `kind.point_count()` anchors.
    pub fn from_anchors(kind: DrawingKind, anchors: &[Anchor], params: &GeometryParams) -> Option<Self> {
        fn arr<const N: usize>(anchors: &[Anchor]) -> Option<[Anchor; N]> {
            anchors.try_into().ok()
        }
        let geometry = match kind {
            DrawingKind::Trendline => Geometry::Trendline { points: arr(anchors)? },
            DrawingKind::Ray => Geometry::Ray { points: arr(anchors)? },
            DrawingKind::Hline => Geometry::Hline { points: arr(anchors)? },
            DrawingKind::Vline => Geometry::Vline { points: arr(anchors)? },
            DrawingKind::Rect => Geometry::Rect { points: arr(anchors)? },
            DrawingKind::Ellipse => Geometry::Ellipse { points: arr(anchors)? },
            DrawingKind::Fib => Geometry::Fib {
                points: arr(anchors)?,
                levels: params.fib_levels.clone(),
            },
            DrawingKind::ParallelChannel => Geometry::ParallelChannel {
                points: arr(anchors)?,
                width: params.channel_width,
            },
            DrawingKind::ParallelChannel3pt => Geometry::ParallelChannel3pt { points: arr(anchors)? },
            DrawingKind::Pitchfork => Geometry::Pitchfork { points: arr(anchors)? },
            DrawingKind::Text => Geometry::Text {
                points: arr(anchors)?,
                content: params.text.clone(),
                font_size: params.font_size,
            },
            DrawingKind::Measure => Geometry::Measure { points: arr(anchors)? },
        };
        Some(geometry)
    }

    pub fn kind(&self) -> DrawingKind {
        match self {
            Geometry::Trendline { .. } => DrawingKind::Trendline,
            Geometry::Ray { .. } => DrawingKind::Ray,
            Geometry::Hline { .. } => DrawingKind::Hline,
            Geometry::Vline { .. } => DrawingKind::Vline,
            Geometry::Rect { .. } => DrawingKind::Rect,
            Geometry::Ellipse { .. } => DrawingKind::Ellipse,
            Geometry::Fib { .. } => DrawingKind::Fib,
            Geometry::ParallelChannel { .. } => DrawingKind::ParallelChannel,
            Geometry::ParallelChannel3pt { .. } => DrawingKind::ParallelChannel3pt,
            Geometry::Pitchfork { .. } => DrawingKind::Pitchfork,
            Geometry::Text { .. } => DrawingKind::Text,
            Geometry::Measure { .. } => DrawingKind::Measure,
        }
    }

    pub fn points(&self) -> &[Anchor] {
        match self {
            Geometry::Hline { points } | Geometry::Vline { points } | Geometry::Text { points, .. } => {
                points
            }
            Geometry::Trendline { points }
            | Geometry::Ray { points }
            | Geometry::Rect { points }
            | Geometry::Ellipse { points }
            | Geometry::Fib { points, .. }
            | Geometry::ParallelChannel { points, .. }
            | Geometry::Measure { points } => points,
            Geometry::ParallelChannel3pt { points } | Geometry::Pitchfork { points } => points,
        }
    }

    pub fn points_mut(&mut self) -> &mut [Anchor] {
        match self {
            Geometry::Hline { points } | Geometry::Vline { points } | Geometry::Text { points, .. } => {
                points
            }
            Geometry::Trendline { points }
            | Geometry::Ray { points }
            | Geometry::Rect { points }
            | Geometry::Ellipse { points }
            | Geometry::Fib { points, .. }
            | Geometry::ParallelChannel { points, .. }
            | Geometry::Measure { points } => points,
            Geometry::ParallelChannel3pt { points } | Geometry::Pitchfork { points } => points,
        }
    }

    /// Replace all anchors. Fails when the count does not match the kind.
    pub fn set_points(&mut self, anchors: &[Anchor]) -> Result<(), (usize, usize)> {
        let slot = self.points_mut();
        if slot.len() != anchors.len() {
            return Err((slot.len(), anchors.len()));
        }
        slot.copy_from_slice(anchors);
        Ok(())
    }

    /// Shift every anchor by a time and price delta.
    pub fn translate(&mut self, dt: f64, dp: f64) {
        for a in self.points_mut() {
            a.time += dt;
            a.price += dp;
        }
    }
}

/// A committed chart annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    pub(crate) id: DrawingId,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(default)]
    pub style: DrawingStyle,
    #[serde(default = "default_layer_id")]
    pub layer_id: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl Drawing {
    /// Create a drawing with a fresh id on the default layer.
    pub fn new(geometry: Geometry) -> Self {
        Self::reconstruct(Uuid::new_v4().to_string(), geometry)
    }

    /// Rebuild a drawing with a known id (e.g. when loading).
    pub fn reconstruct(id: impl Into<DrawingId>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
            style: DrawingStyle::default(),
            layer_id: default_layer_id(),
            locked: false,
            hidden: false,
        }
    }

    pub fn with_style(mut self, style: DrawingStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_layer(mut self, layer_id: impl Into<String>) -> Self {
        self.layer_id = layer_id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> DrawingKind {
        self.geometry.kind()
    }

    pub fn points(&self) -> &[Anchor] {
        self.geometry.points()
    }
}

/// Partial update applied to a stored drawing. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawingPatch {
    pub points: Option<Vec<Anchor>>,
    pub style: Option<DrawingStyle>,
    pub layer_id: Option<String>,
    pub locked: Option<bool>,
    pub hidden: Option<bool>,
}

impl DrawingPatch {
    pub fn points(points: impl Into<Vec<Anchor>>) -> Self {
        Self {
            points: Some(points.into()),
            ..Default::default()
        }
    }

    pub fn style(style: DrawingStyle) -> Self {
        Self {
            style: Some(style),
            ..Default::default()
        }
    }

    pub fn locked(locked: bool) -> Self {
        Self {
            locked: Some(locked),
            ..Default::default()
        }
    }

    pub fn hidden(hidden: bool) -> Self {
        Self {
            hidden: Some(hidden),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Whether the patch moves anchors.
    pub fn touches_geometry(&self) -> bool {
        self.points.is_some()
    }
}
