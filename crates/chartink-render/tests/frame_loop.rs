use std::cell::RefCell;
use std::rc::Rc;

use chartink_core::chart::{BarSeries, IdentityMapper};
use chartink_core::input::PointerEvent;
use chartink_core::plugin::{EnvHandles, PluginManager};
use chartink_core::snap::NoSnap;
use chartink_core::store::DrawingStore;
use chartink_core::tools::register_builtin;
use chartink_render::{DisplayList, FrameScheduler, FrameStats, RenderContext, Renderer, SelectTool, SurfaceRenderer};
use kurbo::Size;

struct Chart {
    store: Rc<RefCell<DrawingStore>>,
    manager: PluginManager,
    frames: Rc<FrameScheduler>,
    renderer: SurfaceRenderer<DisplayList>,
}

impl Chart {
    fn new() -> Self {
        let store = DrawingStore::new().shared();
        let mut manager = PluginManager::new(store.clone());
        register_builtin(&mut manager);
        manager.register(Box::new(SelectTool::default()));
        let frames = Rc::new(FrameScheduler::new());
        manager
            .set_env(
                EnvHandles::new()
                    .chart(Rc::new(IdentityMapper))
                    .series(Rc::new(BarSeries::new("ETHUSD", "15m", Vec::new())))
                    .canvas(frames.clone())
                    .snap(Rc::new(NoSnap)),
            )
            .unwrap();
        Self {
            store,
            manager,
            frames,
            renderer: SurfaceRenderer::new(DisplayList::new()),
        }
    }

    /// Paint if dirty; returns the stats of the painted frame.
    fn tick(&mut self) -> Option<FrameStats> {
        let mut stats = None;
        let Self {
            store,
            manager,
            frames,
            renderer,
        } = self;
        frames.frame(|| {
            let store = store.borrow();
            let ctx = RenderContext::new(&*store, &IdentityMapper, Size::new(200.0, 200.0))
                .with_ghosts(manager.ghosts())
                .with_marquee(manager.marquee());
            stats = Some(renderer.build_scene(&ctx).unwrap());
        });
        stats
    }
}

#[test]
fn idle_chart_paints_once() {
    let mut chart = Chart::new();
    assert!(chart.tick().is_some());
    assert!(chart.tick().is_none());
    assert_eq!(chart.frames.painted_frames(), 1);
}

#[test]
fn ghost_then_commit_then_select() {
    let mut chart = Chart::new();
    chart.tick();

    chart.manager.set_active(Some("trendline"));
    chart.manager.pointer_down(&PointerEvent::at(10.0, 10.0));
    chart.manager.pointer_move(&PointerEvent::at(60.0, 40.0));
    let stats = chart.tick().unwrap();
    assert_eq!(stats.ghosts, 1);
    assert_eq!(stats.drawings, 0);

    chart.manager.pointer_down(&PointerEvent::at(60.0, 40.0));
    let stats = chart.tick().unwrap();
    assert_eq!(stats.ghosts, 0);
    assert_eq!(stats.drawings, 1);
    // Committed drawings come back selected: two anchors and the midpoint.
    assert_eq!(stats.handles, 3);

    chart.manager.set_active(Some(SelectTool::ID));
    chart.manager.pointer_down(&PointerEvent::at(150.0, 150.0));
    chart.manager.pointer_move(&PointerEvent::at(190.0, 190.0));
    let stats = chart.tick().unwrap();
    assert_eq!(stats.handles, 0);
    assert_eq!(chart.renderer.surface().dashed_stroke_count(), 1);

    chart.manager.pointer_up(&PointerEvent::at(190.0, 190.0));
    chart.tick().unwrap();
    assert!(chart.manager.marquee().is_none());
    assert_eq!(chart.store.borrow().len(), 1);
}
