//! chartink Core Library
//!
//! Platform-agnostic drawing model, tool plugins, snapping and persistence
//! for chart annotations.

pub mod chart;
pub mod config;
pub mod drawing;
pub mod geometry;
pub mod input;
pub mod plugin;
pub mod snap;
pub mod storage;
pub mod store;
pub mod tools;

pub use chart::{Bar, CoordinateMapper, PriceSeries, RedrawHandle};
pub use config::{ChannelWidth, EngineConfig, ToolSettings};
pub use drawing::{Anchor, Drawing, DrawingId, DrawingKind, DrawingPatch, DrawingStyle, Geometry};
pub use input::{Modifiers, MouseButton, PointerEvent};
pub use plugin::{EnvError, EnvHandles, PluginManager, ToolContext, ToolError, ToolPlugin};
pub use snap::{ChartSnapper, SnapConfig, SnapResult, SnapSettings, Snapper};
pub use storage::{KeyValueStore, MigrationRegistry, PersistSnapshot, ProjectSlots, ProjectV1, VersionHistory};
pub use store::{DrawingStore, ShapeStore, SharedStore, StoreError, StoreEvent};
