//! A chart session: drawings, tools, frames and persistence wired together.

use std::cell::RefCell;
use std::rc::Rc;

use chartink_core::chart::{Bar, CoordinateMapper, LinearViewport, PriceSeries};
use chartink_core::config::EngineConfig;
use chartink_core::drawing::Drawing;
use chartink_core::input::PointerEvent;
use chartink_core::plugin::{EnvError, EnvHandles, PluginManager};
use chartink_core::snap::ChartSnapper;
use chartink_core::storage::{
    DRAWINGS_STATE, KeyValueStore, MigrationError, MigrationRegistry, PersistError, PersistSnapshot,
    ProjectSlots, ProjectV1, VersionHistory, VersionedState,
};
use chartink_core::store::{DrawingStore, ShapeStore};
use chartink_core::tools::register_builtin;
use chartink_render::{
    FrameScheduler, FrameStats, RenderContext, RenderError, Renderer, SelectTool, Surface, SurfaceRenderer,
};
use kurbo::Size;
use peniko::Color;
use serde_json::Value;
use thiserror::Error;

use crate::shortcuts::Action;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("Invalid drawings: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Drawing store is busy")]
    Busy,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Viewport fitting `bars` into `size`, with a 5% price margin.
///
/// Without bars the chart maps pixels one to one onto time and price.
pub fn viewport_for(bars: &[Bar], size: Size) -> LinearViewport {
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return LinearViewport::fit((0.0, size.width), (0.0, size.height), size);
    };
    let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let margin = ((high - low) * 0.05).max(f64::EPSILON);
    LinearViewport::fit((first.time, last.time), (low - margin, high + margin), size)
}

/// One interactive chart.
pub struct ChartSession<S> {
    config: EngineConfig,
    store: Rc<RefCell<DrawingStore>>,
    manager: PluginManager,
    frames: Rc<FrameScheduler>,
    chart: Rc<dyn CoordinateMapper>,
    series: Rc<dyn PriceSeries>,
    renderer: SurfaceRenderer<S>,
    viewport: Size,
    background: Color,
    slots: ProjectSlots,
    history: VersionHistory,
    migrations: MigrationRegistry,
}

impl<S: Surface> ChartSession<S> {
    /// Build a session with every built-in tool plus selection, which starts active.
    pub fn new(
        config: EngineConfig,
        kv: Rc<dyn KeyValueStore>,
        chart: Rc<dyn CoordinateMapper>,
        series: Rc<dyn PriceSeries>,
        surface: S,
        viewport: Size,
    ) -> SessionResult<Self> {
        let store = DrawingStore::new().shared();
        let frames = Rc::new(FrameScheduler::new());

        let redraw = frames.clone();
        store.borrow_mut().subscribe(Box::new(move |_| {
            redraw.invalidate();
            Ok(())
        }));

        let mut manager = PluginManager::with_settings(store.clone(), config.tools.clone());
        let tools = register_builtin(&mut manager);
        manager.register(Box::new(SelectTool::new(config.hit_padding)));
        log::debug!("Registered {} drawing tools", tools);

        let mut session = Self {
            slots: ProjectSlots::with_namespace(kv.clone(), config.namespace.clone()),
            history: VersionHistory::with_namespace(kv, config.namespace.clone()),
            migrations: MigrationRegistry::default(),
            config,
            store,
            manager,
            frames,
            chart,
            series,
            renderer: SurfaceRenderer::new(surface),
            viewport,
            background: Color::TRANSPARENT,
        };
        session.install_env()?;
        session.manager.set_active(Some(SelectTool::ID));
        Ok(session)
    }

    fn install_env(&mut self) -> SessionResult<()> {
        let snapper = ChartSnapper::new(self.config.snap.clone(), self.chart.clone(), self.series.clone());
        self.manager.set_env(
            EnvHandles::new()
                .chart(self.chart.clone())
                .series(self.series.clone())
                .canvas(self.frames.clone())
                .snap(Rc::new(snapper)),
        )?;
        Ok(())
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Rc<RefCell<DrawingStore>> {
        &self.store
    }

    pub fn manager(&self) -> &PluginManager {
        &self.manager
    }

    pub fn frames(&self) -> Rc<FrameScheduler> {
        self.frames.clone()
    }

    pub fn surface(&self) -> &S {
        self.renderer.surface()
    }

    pub fn migrations_mut(&mut self) -> &mut MigrationRegistry {
        &mut self.migrations
    }

    /// Swap the chart mapping, e.g. after the host panned or resized the chart.
    pub fn set_chart(&mut self, chart: Rc<dyn CoordinateMapper>, viewport: Size) -> SessionResult<()> {
        self.chart = chart;
        self.viewport = viewport;
        self.install_env()?;
        self.frames.invalidate();
        Ok(())
    }

    /// Swap the price series the snap magnet and tools read.
    pub fn set_series(&mut self, series: Rc<dyn PriceSeries>) -> SessionResult<()> {
        self.series = series;
        self.install_env()
    }

    /// Activate a tool by id. `None` deactivates every tool.
    pub fn set_tool(&mut self, id: Option<&str>) -> bool {
        self.manager.set_active(id)
    }

    pub fn active_tool(&self) -> Option<&str> {
        self.manager.active()
    }

    pub fn pointer_down(&mut self, event: &PointerEvent) -> bool {
        self.manager.pointer_down(event)
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) -> bool {
        self.manager.pointer_move(event)
    }

    pub fn pointer_up(&mut self, event: &PointerEvent) -> bool {
        self.manager.pointer_up(event)
    }

    /// Run a keyboard action. Returns whether anything changed.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Cancel => {
                self.manager.cancel();
                true
            }
            Action::Tool(id) => self.set_tool(Some(id)),
            Action::DeleteSelected => self.with_store(|s| !s.delete_selected().is_empty()),
            Action::Undo => self.with_store(DrawingStore::undo),
            Action::Redo => self.with_store(DrawingStore::redo),
            Action::SelectAll => self.with_store(|s| {
                s.select_all();
                true
            }),
            Action::Snapshot => match self.snapshot() {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Snapshot failed: {}", e);
                    false
                }
            },
        }
    }

    fn with_store(&self, f: impl FnOnce(&mut DrawingStore) -> bool) -> bool {
        match self.store.try_borrow_mut() {
            Ok(mut store) => f(&mut store),
            Err(_) => {
                log::warn!("Drawing store busy, action dropped");
                false
            }
        }
    }

    /// Paint if anything changed since the last frame.
    pub fn render_frame(&mut self) -> SessionResult<Option<FrameStats>> {
        let frames = self.frames.clone();
        let mut result = Ok(None);
        frames.frame(|| result = self.paint().map(Some));
        result
    }

    /// Paint unconditionally.
    pub fn paint(&mut self) -> SessionResult<FrameStats> {
        let store = self.store.try_borrow().map_err(|_| SessionError::Busy)?;
        let ctx = RenderContext::new(&*store, self.chart.as_ref(), self.viewport)
            .with_background(self.background)
            .with_ghosts(self.manager.ghosts())
            .with_marquee(self.manager.marquee());
        Ok(self.renderer.build_scene(&ctx)?)
    }

    /// Save the drawings as a named project.
    pub fn save_project(&self, name: &str) -> SessionResult<()> {
        let drawings = self.store.try_borrow().map_err(|_| SessionError::Busy)?.drawings().to_vec();
        let project = ProjectV1::new(name, drawings).with_timeframe(self.series.timeframe());
        self.slots.save_slot(name, &project)?;
        log::info!("Saved project {}", name);
        Ok(())
    }

    /// Replace the drawings with a saved project. False when it cannot be loaded.
    pub fn load_project(&mut self, name: &str) -> bool {
        let Some(project) = self.slots.load_slot(name) else {
            log::warn!("Project {} not loaded", name);
            return false;
        };
        self.manager.cancel();
        self.with_store(|s| {
            s.replace_all(project.drawings, Vec::new());
            true
        })
    }

    pub fn delete_project(&self, name: &str) -> SessionResult<()> {
        Ok(self.slots.delete_slot(name)?)
    }

    pub fn projects(&self) -> Vec<String> {
        self.slots.list_slots()
    }

    /// Record the drawings and selection in the version history.
    pub fn snapshot(&self) -> SessionResult<()> {
        let snapshot = PersistSnapshot::capture(&*self.store.try_borrow().map_err(|_| SessionError::Busy)?);
        Ok(self.history.save_version(&snapshot)?)
    }

    /// Restore the latest snapshot. False when there is none.
    pub fn restore_current(&mut self) -> bool {
        let Some(snapshot) = self.history.load_current() else {
            return false;
        };
        self.manager.cancel();
        self.with_store(|s| {
            s.replace_all(snapshot.drawings, snapshot.selection);
            true
        })
    }

    pub fn versions(&self) -> Vec<PersistSnapshot> {
        self.history.list_versions()
    }

    /// Drawings as a schema-versioned state.
    pub fn export_state(&self) -> SessionResult<Value> {
        let store = self.store.try_borrow().map_err(|_| SessionError::Busy)?;
        let state = VersionedState::current(serde_json::to_value(store.drawings())?);
        Ok(serde_json::to_value(state)?)
    }

    /// Replace the drawings with a versioned state, migrating it forward first.
    ///
    /// Returns how many drawings were loaded.
    pub fn import_state(&mut self, state: &Value) -> SessionResult<usize> {
        let migrated = self.migrations.migrate_state(DRAWINGS_STATE, state)?;
        let state: VersionedState = serde_json::from_value(migrated)?;
        let drawings: Vec<Drawing> = serde_json::from_value(state.data)?;
        let count = drawings.len();
        self.manager.cancel();
        if !self.with_store(|s| {
            s.replace_all(drawings, Vec::new());
            true
        }) {
            return Err(SessionError::Busy);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartink_core::chart::{BarSeries, IdentityMapper};
    use chartink_core::drawing::{Anchor, Geometry};
    use chartink_core::storage::{CURRENT_SCHEMA_VERSION, MemoryKv};
    use chartink_render::DisplayList;
    use serde_json::json;

    fn session() -> ChartSession<DisplayList> {
        session_on(Rc::new(MemoryKv::new()))
    }

    fn session_on(kv: Rc<MemoryKv>) -> ChartSession<DisplayList> {
        ChartSession::new(
            EngineConfig::default(),
            kv,
            Rc::new(IdentityMapper),
            Rc::new(BarSeries::new("AAPL", "1d", Vec::new())),
            DisplayList::new(),
            Size::new(300.0, 200.0),
        )
        .unwrap()
    }

    fn draw_trendline(s: &mut ChartSession<DisplayList>) {
        assert!(s.set_tool(Some("trendline")));
        s.pointer_down(&PointerEvent::at(10.0, 10.0));
        s.pointer_down(&PointerEvent::at(90.0, 50.0));
    }

    #[test]
    fn test_select_tool_starts_active() {
        let s = session();
        assert_eq!(s.active_tool(), Some(SelectTool::ID));
        assert!(s.manager().plugin("ruler").is_some());
    }

    #[test]
    fn test_render_frame_only_when_dirty() {
        let mut s = session();
        assert!(s.render_frame().unwrap().is_some());
        assert!(s.render_frame().unwrap().is_none());

        draw_trendline(&mut s);
        let stats = s.render_frame().unwrap().unwrap();
        assert_eq!(stats.drawings, 1);
        assert!(s.render_frame().unwrap().is_none());
    }

    #[test]
    fn test_keyboard_actions() {
        let mut s = session();
        draw_trendline(&mut s);
        assert!(s.apply(Action::DeleteSelected));
        assert!(s.store().borrow().is_empty());
        assert!(s.apply(Action::Undo));
        assert_eq!(s.store().borrow().len(), 1);
        assert!(s.apply(Action::Redo));
        assert!(s.store().borrow().is_empty());
        assert!(!s.apply(Action::Redo));
    }

    #[test]
    fn test_cancel_drops_pending_anchor() {
        let mut s = session();
        s.set_tool(Some("pitchfork"));
        s.pointer_down(&PointerEvent::at(1.0, 1.0));
        s.pointer_move(&PointerEvent::at(5.0, 5.0));
        assert_eq!(s.manager().ghosts().count(), 1);
        s.apply(Action::Cancel);
        assert_eq!(s.manager().ghosts().count(), 0);
    }

    #[test]
    fn test_project_round_trip() {
        let kv = Rc::new(MemoryKv::new());
        let mut s = session_on(kv.clone());
        draw_trendline(&mut s);
        s.save_project("swing").unwrap();
        assert_eq!(s.projects(), vec!["swing".to_string()]);

        let mut other = session_on(kv);
        assert!(other.load_project("swing"));
        assert_eq!(other.store().borrow().len(), 1);
        assert!(!other.load_project("missing"));
    }

    #[test]
    fn test_snapshot_and_restore() {
        let mut s = session();
        draw_trendline(&mut s);
        s.apply(Action::Snapshot);
        s.store().borrow_mut().clear();
        assert!(s.restore_current());
        let store = s.store().borrow();
        assert_eq!(store.len(), 1);
        assert_eq!(store.selection().len(), 1);
        drop(store);
        assert_eq!(s.versions().len(), 1);
    }

    #[test]
    fn test_import_legacy_state() {
        let mut s = session();
        let legacy = json!({
            "schemaVersion": 2,
            "data": [{
                "id": "old",
                "kind": "hline",
                "points": [{ "time": 0.0, "price": 42.0 }],
                "layerId": "default"
            }]
        });
        assert_eq!(s.import_state(&legacy).unwrap(), 1);
        assert_eq!(s.store().borrow().drawings()[0].id(), "old");

        let exported = s.export_state().unwrap();
        assert_eq!(exported["schemaVersion"], json!(CURRENT_SCHEMA_VERSION));

        let future = json!({ "schemaVersion": 99, "data": [] });
        assert!(matches!(
            s.import_state(&future),
            Err(SessionError::Migration(MigrationError::UnsupportedVersion { .. }))
        ));
    }

    #[test]
    fn test_viewport_for_bars() {
        let bars = [
            Bar {
                time: 0.0,
                open: 10.0,
                high: 20.0,
                low: 0.0,
                close: 15.0,
            },
            Bar {
                time: 100.0,
                open: 15.0,
                high: 20.0,
                low: 0.0,
                close: 5.0,
            },
        ];
        let vp = viewport_for(&bars, Size::new(100.0, 110.0));
        assert_eq!(vp.time_to_x(100.0), Some(100.0));
        assert!((vp.price_to_y(-1.0).unwrap() - 110.0).abs() < 1e-9);

        let empty = viewport_for(&[], Size::new(50.0, 50.0));
        assert_eq!(empty.x_to_time(25.0), Some(25.0));
    }

    #[test]
    fn test_geometry_survives_round_trip_through_state() {
        let mut s = session();
        s.set_tool(Some("ruler"));
        s.pointer_down(&PointerEvent::at(0.0, 0.0));
        s.pointer_down(&PointerEvent::at(10.0, 0.0));
        let state = s.export_state().unwrap();

        let mut other = session();
        other.import_state(&state).unwrap();
        assert_eq!(
            other.store().borrow().drawings()[0].geometry,
            Geometry::Measure {
                points: [Anchor::new(0.0, 0.0), Anchor::new(10.0, 0.0)]
            }
        );
    }
}
