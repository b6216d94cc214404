//! Renderer trait abstraction.

use chartink_core::chart::CoordinateMapper;
use chartink_core::drawing::{Drawing, DrawingId, LayerSet};
use chartink_core::plugin::Ghost;
use chartink_core::store::ShapeStore;
use kurbo::{Ellipse, Rect, Shape, Size, Stroke};
use peniko::Color;
use thiserror::Error;

use crate::handles::{HANDLE_SIZE, get_handles};
use crate::paint::paint_drawing;
use crate::surface::Surface;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Opacity multiplier of ghost previews.
pub const GHOST_OPACITY: f32 = 0.5;

/// Context for a single render frame.
pub struct RenderContext<'a> {
    pub drawings: &'a [Drawing],
    pub selection: &'a [DrawingId],
    pub layers: &'a LayerSet,
    /// Previews of drawings being placed.
    pub ghosts: Vec<&'a Drawing>,
    pub chart: &'a dyn CoordinateMapper,
    /// Viewport size in pixels.
    pub viewport_size: Size,
    /// Cleared to before painting. Transparent lets the chart show through.
    pub background_color: Color,
    /// Selection highlight color.
    pub selection_color: Color,
    /// Selection rectangle (marquee) in pixels.
    pub marquee: Option<Rect>,
    pub ghost_opacity: f32,
}

impl<'a> RenderContext<'a> {
    /// Create a context over the contents of a store.
    pub fn new(store: &'a dyn ShapeStore, chart: &'a dyn CoordinateMapper, viewport_size: Size) -> Self {
        Self {
            drawings: store.drawings(),
            selection: store.selection(),
            layers: store.layers(),
            ghosts: Vec::new(),
            chart,
            viewport_size,
            background_color: Color::TRANSPARENT,
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            marquee: None,
            ghost_opacity: GHOST_OPACITY,
        }
    }

    /// Set the ghost previews.
    pub fn with_ghosts(mut self, ghosts: impl IntoIterator<Item = &'a Ghost>) -> Self {
        self.ghosts = ghosts.into_iter().map(|g| &g.drawing).collect();
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    /// Set the selection highlight color.
    pub fn with_selection_color(mut self, color: Color) -> Self {
        self.selection_color = color;
        self
    }

    /// Set the selection rectangle.
    pub fn with_marquee(mut self, rect: Option<Rect>) -> Self {
        self.marquee = rect;
        self
    }

    pub fn with_ghost_opacity(mut self, opacity: f32) -> Self {
        self.ghost_opacity = opacity.clamp(0.0, 1.0);
        self
    }

    fn is_selected(&self, id: &str) -> bool {
        self.selection.iter().any(|s| s == id)
    }
}

/// What the last frame contained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawings: usize,
    pub ghosts: usize,
    pub handles: usize,
    /// Drawings not shown because an anchor could not be mapped.
    pub skipped: usize,
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Build the command buffer for a frame.
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<FrameStats>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}

/// Renderer painting onto any [`Surface`].
#[derive(Debug, Default)]
pub struct SurfaceRenderer<S> {
    surface: S,
    last_stats: FrameStats,
}

impl<S: Surface> SurfaceRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            last_stats: FrameStats::default(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Render handles of a selected drawing.
    fn render_handles(&mut self, drawing: &Drawing, ctx: &RenderContext) -> RenderResult<usize> {
        let handles = get_handles(drawing, ctx.chart);
        let half = HANDLE_SIZE / 2.0;
        for handle in &handles {
            let path = if handle.is_round() {
                Ellipse::new(handle.position, (half, half), 0.0).to_path(0.1)
            } else {
                Rect::from_center_size(handle.position, (HANDLE_SIZE, HANDLE_SIZE)).to_path(0.1)
            };
            // White fill, blue border
            self.surface.fill(&path, Color::WHITE)?;
            self.surface.stroke(&path, &Stroke::new(1.5), ctx.selection_color)?;
        }
        Ok(handles.len())
    }

    /// Render a selection rectangle (marquee).
    fn render_marquee(&mut self, rect: Rect, color: Color) -> RenderResult<()> {
        let path = rect.abs().to_path(0.1);
        self.surface.fill(&path, color.with_alpha(0.1))?;
        let stroke = Stroke::new(1.0).with_dashes(0.0, [4.0, 4.0]);
        self.surface.stroke(&path, &stroke, color)
    }
}

impl<S: Surface> Renderer for SurfaceRenderer<S> {
    fn build_scene(&mut self, ctx: &RenderContext) -> RenderResult<FrameStats> {
        let mut stats = FrameStats::default();
        self.surface.clear(ctx.viewport_size, self.background_color(ctx))?;

        let visible = ctx
            .drawings
            .iter()
            .filter(|d| !d.hidden && ctx.layers.is_visible(&d.layer_id));
        for drawing in visible.clone() {
            let alpha = ctx.layers.opacity(&drawing.layer_id) as f32;
            if paint_drawing(&mut self.surface, drawing, ctx.chart, ctx.viewport_size, alpha)? {
                stats.drawings += 1;
            } else {
                stats.skipped += 1;
            }
        }

        for ghost in &ctx.ghosts {
            if paint_drawing(&mut self.surface, ghost, ctx.chart, ctx.viewport_size, ctx.ghost_opacity)? {
                stats.ghosts += 1;
            }
        }

        for drawing in visible.filter(|d| ctx.is_selected(d.id())) {
            stats.handles += self.render_handles(drawing, ctx)?;
        }

        if let Some(rect) = ctx.marquee {
            self.render_marquee(rect, ctx.selection_color)?;
        }

        self.last_stats = stats;
        Ok(stats)
    }
}
