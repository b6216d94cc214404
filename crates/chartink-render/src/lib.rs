//! Chartink Render Library
//!
//! Paints drawings onto a [`Surface`], resolves pointer hits and marquee
//! selections, and schedules frames behind a dirty flag. The browser build
//! renders through the canvas 2D API.

mod frame;
mod handles;
mod hit;
mod paint;
mod renderer;
mod select;
mod surface;

#[cfg(target_arch = "wasm32")]
mod canvas;

pub use frame::FrameScheduler;
pub use handles::{Corner, Edge, HANDLE_HIT_TOLERANCE, HANDLE_SIZE, Handle, HandleKind, get_handles, hit_test_handles};
pub use hit::{drawing_distance, hit_test, is_pickable, marquee_select};
pub use paint::{
    ChannelLines, FibRow, LABEL_SIZE, PitchforkLines, channel_lines, extend_ray, fib_label, fib_rows, measure_label,
    paint_drawing, pitchfork_lines, text_box,
};
pub use renderer::{FrameStats, GHOST_OPACITY, RenderContext, RenderError, RenderResult, Renderer, SurfaceRenderer};
pub use select::SelectTool;
pub use surface::{DisplayList, DrawCommand, Surface};

#[cfg(target_arch = "wasm32")]
pub use canvas::{CanvasSurface, css_color};
#[cfg(target_arch = "wasm32")]
pub use frame::AnimationLoop;
