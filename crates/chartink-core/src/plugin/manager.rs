//! Plugin registry, environment lifecycle and pointer dispatch.

use kurbo::Rect;

use super::context::ToolContext;
use super::draft::{DraftStore, Ghost};
use super::{EnvError, EnvHandles, PluginEnv, PointerPhase, ToolPlugin};
use crate::config::ToolSettings;
use crate::input::PointerEvent;
use crate::store::SharedStore;

/// Owns the tool plugins of one chart and routes pointer events to the active one.
pub struct PluginManager {
    plugins: Vec<Box<dyn ToolPlugin>>,
    active: Option<String>,
    env: Option<PluginEnv>,
    drafts: DraftStore,
    store: SharedStore,
    settings: ToolSettings,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugins", &self.plugin_ids())
            .field("active", &self.active)
            .field("has_env", &self.env.is_some())
            .field("drafts", &self.drafts)
            .finish_non_exhaustive()
    }
}

impl PluginManager {
    pub fn new(store: SharedStore) -> Self {
        Self::with_settings(store, ToolSettings::default())
    }

    pub fn with_settings(store: SharedStore, settings: ToolSettings) -> Self {
        Self {
            plugins: Vec::new(),
            active: None,
            env: None,
            drafts: DraftStore::new(),
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ToolSettings {
        &mut self.settings
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Register a plugin. A second plugin with the same id is ignored.
    ///
    /// Mounts immediately when an environment is installed.
    pub fn register(&mut self, plugin: Box<dyn ToolPlugin>) -> bool {
        if self.plugin(plugin.id()).is_some() {
            log::debug!("Plugin {} already registered", plugin.id());
            return false;
        }
        if let Some(env) = &self.env {
            mount_one(plugin.as_ref(), env, &mut self.drafts, &self.store, &self.settings);
        }
        self.plugins.push(plugin);
        true
    }

    /// Remove a plugin, unmounting it first when an environment is installed.
    pub fn unregister(&mut self, id: &str) -> bool {
        let Some(idx) = self.plugins.iter().position(|p| p.id() == id) else {
            return false;
        };
        let plugin = self.plugins.remove(idx);
        if self.env.is_some() {
            unmount_one(plugin.as_ref());
        }
        self.drafts.reset(id);
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        true
    }

    pub fn plugin(&self, id: &str) -> Option<&dyn ToolPlugin> {
        self.plugins.iter().find(|p| p.id() == id).map(|p| p.as_ref())
    }

    pub fn plugin_ids(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.id()).collect()
    }

    /// Install the chart environment and mount every plugin.
    ///
    /// Fails before mounting anything when a handle is missing. Mount errors
    /// are logged per plugin.
    pub fn set_env(&mut self, handles: EnvHandles) -> Result<(), EnvError> {
        let env = handles.validate()?;
        if self.env.is_some() {
            self.clear_env();
        }
        for plugin in &self.plugins {
            mount_one(plugin.as_ref(), &env, &mut self.drafts, &self.store, &self.settings);
        }
        self.env = Some(env);
        Ok(())
    }

    /// Unmount every plugin and drop the environment and all drafts.
    pub fn clear_env(&mut self) {
        if self.env.take().is_none() {
            return;
        }
        for plugin in &self.plugins {
            unmount_one(plugin.as_ref());
        }
        self.drafts.clear();
    }

    pub fn has_env(&self) -> bool {
        self.env.is_some()
    }

    pub fn env(&self) -> Option<&PluginEnv> {
        self.env.as_ref()
    }

    /// Activate a tool by id, or deactivate with `None`.
    ///
    /// The previously active tool loses its draft.
    pub fn set_active(&mut self, id: Option<&str>) -> bool {
        if let Some(id) = id {
            if self.plugin(id).is_none() {
                log::warn!("Cannot activate unknown tool {}", id);
                return false;
            }
        }
        if self.active.as_deref() != id {
            if let Some(previous) = self.active.take() {
                self.drafts.reset(&previous);
            }
            self.active = id.map(str::to_string);
            self.invalidate();
        }
        true
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Abandon the active tool's draft.
    pub fn cancel(&mut self) {
        if let Some(active) = &self.active {
            self.drafts.reset(active);
            self.invalidate();
        }
    }

    fn invalidate(&self) {
        if let Some(env) = &self.env {
            env.canvas.invalidate();
        }
    }

    /// Context for the active tool. `None` without an active tool or environment.
    pub fn ctx(&mut self) -> Option<ToolContext<'_>> {
        let id = self.active.as_deref()?;
        let plugin = self.plugins.iter().find(|p| p.id() == id)?;
        let env = self.env.as_ref()?;
        Some(ToolContext::new(
            plugin.id(),
            env,
            &mut self.drafts,
            &self.store,
            &self.settings,
        ))
    }

    pub fn pointer_down(&mut self, event: &PointerEvent) -> bool {
        self.dispatch(PointerPhase::Down, event)
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) -> bool {
        self.dispatch(PointerPhase::Move, event)
    }

    pub fn pointer_up(&mut self, event: &PointerEvent) -> bool {
        self.dispatch(PointerPhase::Up, event)
    }

    fn dispatch(&mut self, phase: PointerPhase, event: &PointerEvent) -> bool {
        let Some(active) = self.active.as_deref() else {
            return false;
        };
        let Some(plugin) = self.plugins.iter().find(|p| p.id() == active) else {
            return false;
        };
        if !plugin.capabilities().handles(phase) {
            return false;
        }
        let Some(env) = self.env.as_ref() else {
            log::debug!("Pointer {:?} for {} ignored without environment", phase, active);
            return false;
        };
        let mut ctx = ToolContext::new(plugin.id(), env, &mut self.drafts, &self.store, &self.settings);
        let result = match phase {
            PointerPhase::Down => plugin.on_pointer_down(event, &mut ctx),
            PointerPhase::Move => plugin.on_pointer_move(event, &mut ctx),
            PointerPhase::Up => plugin.on_pointer_up(event, &mut ctx),
        };
        match result {
            Ok(consumed) => consumed,
            Err(e) => {
                log::error!("Tool {} failed on pointer {:?}: {}", plugin.id(), phase, e);
                false
            }
        }
    }

    /// Ghost previews of every tool, for the renderer.
    pub fn ghosts(&self) -> impl Iterator<Item = &Ghost> {
        self.drafts.ghosts()
    }

    /// Marquee being dragged, if any.
    pub fn marquee(&self) -> Option<Rect> {
        self.drafts.marquee()
    }

    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    pub fn drafts_mut(&mut self) -> &mut DraftStore {
        &mut self.drafts
    }
}

fn mount_one(
    plugin: &dyn ToolPlugin,
    env: &PluginEnv,
    drafts: &mut DraftStore,
    store: &SharedStore,
    settings: &ToolSettings,
) {
    if !plugin.capabilities().mount {
        return;
    }
    let mut ctx = ToolContext::new(plugin.id(), env, drafts, store, settings);
    match plugin.mount(&mut ctx) {
        Ok(()) => log::debug!("Mounted {}", plugin.id()),
        Err(e) => log::warn!("Mount of {} failed: {}", plugin.id(), e),
    }
}

fn unmount_one(plugin: &dyn ToolPlugin) {
    if !plugin.capabilities().unmount {
        return;
    }
    if let Err(e) = plugin.unmount() {
        log::warn!("Unmount of {} failed: {}", plugin.id(), e);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::chart::{BarSeries, IdentityMapper, RedrawCounter};
    use crate::plugin::{Capabilities, ToolError, ToolResult};
    use crate::snap::NoSnap;
    use crate::store::DrawingStore;

    /// Records calls into shared counters.
    struct RecordingTool {
        id: &'static str,
        caps: Capabilities,
        fail: bool,
        mounts: Rc<Cell<u32>>,
        unmounts: Rc<Cell<u32>>,
        downs: Rc<Cell<u32>>,
    }

    impl RecordingTool {
        fn new(id: &'static str, caps: Capabilities) -> Self {
            Self {
                id,
                caps,
                fail: false,
                mounts: Rc::default(),
                unmounts: Rc::default(),
                downs: Rc::default(),
            }
        }
    }

    impl ToolPlugin for RecordingTool {
        fn id(&self) -> &str {
            self.id
        }

        fn label(&self) -> &str {
            "Recording Tool"
        }

        fn capabilities(&self) -> Capabilities {
            self.caps
        }

        fn mount(&self, _ctx: &mut ToolContext<'_>) -> ToolResult<()> {
            self.mounts.set(self.mounts.get() + 1);
            if self.fail {
                return Err(ToolError::Other("mount".into()));
            }
            Ok(())
        }

        fn unmount(&self) -> ToolResult<()> {
            self.unmounts.set(self.unmounts.get() + 1);
            if self.fail {
                return Err(ToolError::Other("unmount".into()));
            }
            Ok(())
        }

        fn on_pointer_down(&self, _event: &PointerEvent, _ctx: &mut ToolContext<'_>) -> ToolResult<bool> {
            self.downs.set(self.downs.get() + 1);
            if self.fail {
                return Err(ToolError::Other("down".into()));
            }
            Ok(true)
        }
    }

    fn manager() -> PluginManager {
        let store: SharedStore = Rc::new(RefCell::new(DrawingStore::new()));
        PluginManager::new(store)
    }

    fn handles() -> EnvHandles {
        EnvHandles::new()
            .chart(Rc::new(IdentityMapper))
            .series(Rc::new(BarSeries::new("AAPL", "1d", Vec::new())))
            .canvas(Rc::new(RedrawCounter::new()))
            .snap(Rc::new(NoSnap))
    }

    #[test]
    fn test_no_active_tool_returns_false() {
        let mut m = manager();
        m.set_env(handles()).unwrap();
        assert!(!m.pointer_down(&PointerEvent::at(1.0, 1.0)));
        assert!(!m.pointer_move(&PointerEvent::at(1.0, 1.0)));
        assert!(!m.pointer_up(&PointerEvent::at(1.0, 1.0)));
    }

    #[test]
    fn test_register_idempotent() {
        let mut m = manager();
        assert!(m.register(Box::new(RecordingTool::new("p", Capabilities::NONE))));
        assert!(!m.register(Box::new(RecordingTool::new("p", Capabilities::NONE))));
        assert_eq!(m.plugin_ids(), vec!["p"]);
    }

    #[test]
    fn test_set_env_missing_handle_mounts_nothing() {
        let mut m = manager();
        let tool = RecordingTool::new("p", Capabilities::NONE.with_mount());
        let mounts = tool.mounts.clone();
        m.register(Box::new(tool));
        let err = m.set_env(EnvHandles::new().chart(Rc::new(IdentityMapper))).unwrap_err();
        assert_eq!(err, EnvError::Missing("series"));
        assert_eq!(mounts.get(), 0);
        assert!(!m.has_env());
    }

    #[test]
    fn test_register_after_env_mounts() {
        let mut m = manager();
        m.set_env(handles()).unwrap();
        let tool = RecordingTool::new("late", Capabilities::NONE.with_mount());
        let mounts = tool.mounts.clone();
        m.register(Box::new(tool));
        assert_eq!(mounts.get(), 1);
    }

    #[test]
    fn test_mount_failure_isolated() {
        let mut m = manager();
        let mut bad = RecordingTool::new("bad", Capabilities::NONE.with_mount());
        bad.fail = true;
        let good = RecordingTool::new("good", Capabilities::NONE.with_mount());
        let good_mounts = good.mounts.clone();
        let good_unmounts = good.unmounts.clone();
        m.register(Box::new(bad));
        m.register(Box::new(good));
        assert!(m.set_env(handles()).is_ok());
        assert_eq!(good_mounts.get(), 1);
        m.clear_env();
        assert_eq!(good_unmounts.get(), 1);
        assert!(!m.has_env());
    }

    #[test]
    fn test_undeclared_handler_not_called() {
        let mut m = manager();
        let tool = RecordingTool::new("p", Capabilities::NONE);
        let downs = tool.downs.clone();
        m.register(Box::new(tool));
        m.set_env(handles()).unwrap();
        assert!(m.set_active(Some("p")));
        assert!(!m.pointer_down(&PointerEvent::at(0.0, 0.0)));
        assert_eq!(downs.get(), 0);
    }

    #[test]
    fn test_handler_result_and_error() {
        let mut m = manager();
        let ok = RecordingTool::new("ok", Capabilities::CLICK_TOOL);
        let mut bad = RecordingTool::new("bad", Capabilities::CLICK_TOOL);
        bad.fail = true;
        let bad_downs = bad.downs.clone();
        m.register(Box::new(ok));
        m.register(Box::new(bad));
        m.set_env(handles()).unwrap();

        m.set_active(Some("ok"));
        assert!(m.pointer_down(&PointerEvent::at(0.0, 0.0)));
        m.set_active(Some("bad"));
        assert!(!m.pointer_down(&PointerEvent::at(0.0, 0.0)));
        assert_eq!(bad_downs.get(), 1);
    }

    #[test]
    fn test_set_active_unknown() {
        let mut m = manager();
        assert!(!m.set_active(Some("nope")));
        assert_eq!(m.active(), None);
        assert!(m.set_active(None));
    }

    #[test]
    fn test_ctx_requires_env_and_active() {
        let mut m = manager();
        m.register(Box::new(RecordingTool::new("p", Capabilities::CLICK_TOOL)));
        m.set_active(Some("p"));
        assert!(m.ctx().is_none());
        m.set_env(handles()).unwrap();
        let ctx = m.ctx().unwrap();
        assert_eq!(ctx.symbol(), "AAPL");
        assert_eq!(ctx.timeframe(), "1d");
        let p = ctx.xy(&PointerEvent::at(3.0, 4.0));
        assert_eq!((p.time, p.price, p.snapped), (3.0, 4.0, false));
    }
}
