//! Chartink Application
//!
//! Wires the drawing store, tool plugins, renderer and persistence into a
//! chart session, with a native demo and a browser entry point.

mod session;
mod shortcuts;

#[cfg(not(target_arch = "wasm32"))]
mod demo;

pub use session::{ChartSession, SessionError, SessionResult, viewport_for};
pub use shortcuts::{Action, Shortcut, ShortcutRegistry};

#[cfg(not(target_arch = "wasm32"))]
pub use demo::{DemoReport, run_demo, synthetic_bars};

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{ChartHandle, mount};
