//! Tool plugin contract.
//!
//! A tool plugin turns pointer gestures into drawings. Plugins are stateless:
//! anything that must survive between events (collected anchors, ghost
//! previews, marquee rectangles) lives in the manager's [`DraftStore`] and is
//! reached through the [`ToolContext`] handed to every callback.

mod context;
mod draft;
mod manager;

pub use context::{DrawOps, ResolvedPoint, ToolContext};
pub use draft::{DraftState, DraftStore, Ghost};
pub use manager::PluginManager;

use std::rc::Rc;

use thiserror::Error;

use crate::chart::{CoordinateMapper, PriceSeries, RedrawHandle};
use crate::input::PointerEvent;
use crate::snap::Snapper;
use crate::store::StoreError;

/// Failure inside a plugin callback. The manager logs it and carries on.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("chart coordinates unavailable")]
    Unmapped,
    #[error("cannot build {0} from the collected anchors")]
    Geometry(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Other(String),
}

/// Result type for plugin callbacks.
pub type ToolResult<T> = Result<T, ToolError>;

/// Precondition failure when installing an environment.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EnvError {
    #[error("missing environment handle: {0}")]
    Missing(&'static str),
}

/// Plugin category. Only tools exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluginKind {
    #[default]
    Tool,
}

/// Pointer callback selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

/// Optional callbacks a plugin implements. The manager only calls declared ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub mount: bool,
    pub unmount: bool,
    pub pointer_down: bool,
    pub pointer_move: bool,
    pub pointer_up: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        mount: false,
        unmount: false,
        pointer_down: false,
        pointer_move: false,
        pointer_up: false,
    };

    /// Down and move, the usual set for click-to-place tools.
    pub const CLICK_TOOL: Capabilities = Capabilities {
        pointer_down: true,
        pointer_move: true,
        ..Capabilities::NONE
    };

    pub const ALL_POINTER: Capabilities = Capabilities {
        pointer_up: true,
        ..Capabilities::CLICK_TOOL
    };

    pub const fn with_mount(mut self) -> Self {
        self.mount = true;
        self.unmount = true;
        self
    }

    pub fn handles(&self, phase: PointerPhase) -> bool {
        match phase {
            PointerPhase::Down => self.pointer_down,
            PointerPhase::Move => self.pointer_move,
            PointerPhase::Up => self.pointer_up,
        }
    }
}

/// A chart drawing tool.
///
/// Callbacks return `Ok(true)` when they consumed the event.
pub trait ToolPlugin {
    fn id(&self) -> &str;

    fn label(&self) -> &str;

    fn kind(&self) -> PluginKind {
        PluginKind::Tool
    }

    fn capabilities(&self) -> Capabilities;

    fn mount(&self, _ctx: &mut ToolContext<'_>) -> ToolResult<()> {
        Ok(())
    }

    fn unmount(&self) -> ToolResult<()> {
        Ok(())
    }

    fn on_pointer_down(&self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) -> ToolResult<bool> {
        Ok(false)
    }

    fn on_pointer_move(&self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) -> ToolResult<bool> {
        Ok(false)
    }

    fn on_pointer_up(&self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) -> ToolResult<bool> {
        Ok(false)
    }
}

/// Chart-side handles every plugin needs.
#[derive(Clone)]
pub struct PluginEnv {
    pub chart: Rc<dyn CoordinateMapper>,
    pub series: Rc<dyn PriceSeries>,
    pub canvas: Rc<dyn RedrawHandle>,
    pub snap: Rc<dyn Snapper>,
}

/// Environment handles as supplied by the host, validated by
/// [`PluginManager::set_env`].
#[derive(Clone, Default)]
pub struct EnvHandles {
    pub chart: Option<Rc<dyn CoordinateMapper>>,
    pub series: Option<Rc<dyn PriceSeries>>,
    pub canvas: Option<Rc<dyn RedrawHandle>>,
    pub snap: Option<Rc<dyn Snapper>>,
}

impl EnvHandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chart(mut self, chart: Rc<dyn CoordinateMapper>) -> Self {
        self.chart = Some(chart);
        self
    }

    pub fn series(mut self, series: Rc<dyn PriceSeries>) -> Self {
        self.series = Some(series);
        self
    }

    pub fn canvas(mut self, canvas: Rc<dyn RedrawHandle>) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn snap(mut self, snap: Rc<dyn Snapper>) -> Self {
        self.snap = Some(snap);
        self
    }

    /// Check that every handle is present.
    pub fn validate(self) -> Result<PluginEnv, EnvError> {
        Ok(PluginEnv {
            chart: self.chart.ok_or(EnvError::Missing("chart"))?,
            series: self.series.ok_or(EnvError::Missing("series"))?,
            canvas: self.canvas.ok_or(EnvError::Missing("canvas"))?,
            snap: self.snap.ok_or(EnvError::Missing("snap"))?,
        })
    }
}
