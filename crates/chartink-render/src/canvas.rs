//! HTML canvas 2D surface.

use kurbo::{BezPath, PathEl, Point, Size, Stroke};
use peniko::Color;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::renderer::{RenderError, RenderResult};
use crate::surface::Surface;

/// CSS `rgba()` string of a color.
pub fn css_color(color: Color) -> String {
    let rgba = color.to_rgba8();
    format!(
        "rgba({}, {}, {}, {:.3})",
        rgba.r,
        rgba.g,
        rgba.b,
        f64::from(rgba.a) / 255.0
    )
}

fn js_error(context: &str, err: JsValue) -> RenderError {
    RenderError::Surface(format!("{}: {:?}", context, err))
}

/// Surface backed by a `CanvasRenderingContext2d`.
pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }

    /// Acquire the 2D context of a canvas element.
    pub fn from_canvas(canvas: &HtmlCanvasElement) -> RenderResult<Self> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|e| js_error("getContext failed", e))?
            .ok_or_else(|| RenderError::InitFailed("2D context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| RenderError::InitFailed("Context is not 2D".to_string()))?;
        Ok(Self::new(ctx))
    }

    pub fn context(&self) -> &CanvasRenderingContext2d {
        &self.ctx
    }

    fn trace(&self, path: &BezPath) {
        self.ctx.begin_path();
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => self.ctx.move_to(p.x, p.y),
                PathEl::LineTo(p) => self.ctx.line_to(p.x, p.y),
                PathEl::QuadTo(c, p) => self.ctx.quadratic_curve_to(c.x, c.y, p.x, p.y),
                PathEl::CurveTo(c1, c2, p) => self.ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y),
                PathEl::ClosePath => self.ctx.close_path(),
            }
        }
    }

    fn set_dashes(&self, stroke: &Stroke) -> RenderResult<()> {
        let dashes = js_sys::Array::new();
        for dash in stroke.dash_pattern.iter() {
            dashes.push(&JsValue::from_f64(*dash));
        }
        self.ctx
            .set_line_dash(&dashes)
            .map_err(|e| js_error("setLineDash failed", e))?;
        self.ctx.set_line_dash_offset(stroke.dash_offset);
        Ok(())
    }
}

impl Surface for CanvasSurface {
    fn clear(&mut self, size: Size, color: Color) -> RenderResult<()> {
        self.ctx.clear_rect(0.0, 0.0, size.width, size.height);
        if color.components[3] > 0.0 {
            self.ctx.set_fill_style_str(&css_color(color));
            self.ctx.fill_rect(0.0, 0.0, size.width, size.height);
        }
        Ok(())
    }

    fn stroke(&mut self, path: &BezPath, stroke: &Stroke, color: Color) -> RenderResult<()> {
        self.trace(path);
        self.set_dashes(stroke)?;
        self.ctx.set_line_width(stroke.width);
        self.ctx.set_stroke_style_str(&css_color(color));
        self.ctx.stroke();
        Ok(())
    }

    fn fill(&mut self, path: &BezPath, color: Color) -> RenderResult<()> {
        self.trace(path);
        self.ctx.set_fill_style_str(&css_color(color));
        self.ctx.fill();
        Ok(())
    }

    fn text(&mut self, origin: Point, text: &str, size: f64, color: Color) -> RenderResult<()> {
        self.ctx.set_font(&format!("{}px sans-serif", size));
        self.ctx.set_text_baseline("top");
        self.ctx.set_fill_style_str(&css_color(color));
        self.ctx
            .fill_text(text, origin.x, origin.y)
            .map_err(|e| js_error("fillText failed", e))
    }
}
