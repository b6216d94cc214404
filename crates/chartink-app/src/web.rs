//! WebAssembly entry point and browser event wiring.

use std::cell::RefCell;
use std::rc::Rc;

use chartink_core::chart::{Bar, BarSeries};
use chartink_core::config::EngineConfig;
use chartink_core::input::{Modifiers, MouseButton, PointerEvent};
use chartink_core::storage::LocalStorageKv;
use chartink_render::{AnimationLoop, CanvasSurface};
use kurbo::Size;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::session::{ChartSession, viewport_for};
use crate::shortcuts::ShortcutRegistry;

/// Canvas looked up when `mount` gets no id.
pub const CANVAS_ID: &str = "chartink-canvas";

type WebSession = Rc<RefCell<ChartSession<CanvasSurface>>>;

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_pointer(event: &web_sys::PointerEvent) -> PointerEvent {
    PointerEvent::at(f64::from(event.offset_x()), f64::from(event.offset_y()))
        .with_button(MouseButton::from_dom(event.button()))
        .with_modifiers(Modifiers {
            shift: event.shift_key(),
            ctrl: event.ctrl_key(),
            alt: event.alt_key(),
            meta: event.meta_key(),
        })
}

/// Initialize panic reporting and logging.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_ok() {
        log::info!("Starting chartink (WASM)");
    }
}

/// A mounted chart. Dropping it detaches every listener and stops rendering.
#[wasm_bindgen]
pub struct ChartHandle {
    session: WebSession,
    canvas: web_sys::HtmlCanvasElement,
    pointer_listeners: Vec<(&'static str, Closure<dyn FnMut(web_sys::PointerEvent)>)>,
    key_listener: Option<Closure<dyn FnMut(web_sys::KeyboardEvent)>>,
    _frames: AnimationLoop,
}

/// Mount a chart on a canvas.
///
/// `config` is an optional engine configuration and `bars` an optional list
/// of `{time, open, high, low, close}` objects, both as JSON.
#[wasm_bindgen]
pub fn mount(canvas_id: Option<String>, config: Option<String>, bars: Option<String>) -> Result<ChartHandle, JsValue> {
    let window = web_sys::window().ok_or_else(|| js_err("No window object"))?;
    let document = window.document().ok_or_else(|| js_err("No document"))?;
    let id = canvas_id.unwrap_or_else(|| CANVAS_ID.to_string());
    let canvas = document
        .get_element_by_id(&id)
        .ok_or_else(|| js_err(format!("Canvas #{} not found", id)))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| js_err(format!("#{} is not a canvas", id)))?;

    let config = match config {
        Some(json) => EngineConfig::from_json(&json).map_err(js_err)?,
        None => EngineConfig::default(),
    };
    let bars: Vec<Bar> = match bars {
        Some(json) => serde_json::from_str(&json).map_err(js_err)?,
        None => Vec::new(),
    };

    let size = Size::new(f64::from(canvas.width()), f64::from(canvas.height()));
    let chart = Rc::new(viewport_for(&bars, size));
    let series = Rc::new(BarSeries::new("", "", bars));
    let kv = Rc::new(LocalStorageKv::new().map_err(js_err)?);
    let surface = CanvasSurface::from_canvas(&canvas).map_err(js_err)?;
    let session = ChartSession::new(config, kv, chart, series, surface, size).map_err(js_err)?;
    let session: WebSession = Rc::new(RefCell::new(session));

    let frames = session.borrow().frames();
    let painter = session.clone();
    let retry = frames.clone();
    let animation = AnimationLoop::start(frames, move || match painter.try_borrow_mut() {
        Ok(mut session) => {
            if let Err(e) = session.paint() {
                log::error!("Frame failed: {}", e);
            }
        }
        Err(_) => retry.invalidate(),
    })
    .map_err(js_err)?;

    let mut handle = ChartHandle {
        session,
        canvas,
        pointer_listeners: Vec::new(),
        key_listener: None,
        _frames: animation,
    };
    handle.attach_pointer("pointerdown", |s, e| s.pointer_down(e))?;
    handle.attach_pointer("pointermove", |s, e| s.pointer_move(e))?;
    handle.attach_pointer("pointerup", |s, e| s.pointer_up(e))?;
    handle.attach_keys(&window)?;
    log::info!("Mounted chart on #{}", id);
    Ok(handle)
}

impl ChartHandle {
    fn attach_pointer(
        &mut self,
        event_type: &'static str,
        forward: fn(&mut ChartSession<CanvasSurface>, &PointerEvent) -> bool,
    ) -> Result<(), JsValue> {
        let session = self.session.clone();
        let closure = Closure::wrap(Box::new(move |event: web_sys::PointerEvent| {
            let Ok(mut session) = session.try_borrow_mut() else {
                log::warn!("Session busy, {} dropped", event_type);
                return;
            };
            if forward(&mut session, &to_pointer(&event)) {
                event.prevent_default();
            }
        }) as Box<dyn FnMut(web_sys::PointerEvent)>);
        self.canvas
            .add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref())?;
        self.pointer_listeners.push((event_type, closure));
        Ok(())
    }

    fn attach_keys(&mut self, window: &web_sys::Window) -> Result<(), JsValue> {
        let session = self.session.clone();
        let closure = Closure::wrap(Box::new(move |event: web_sys::KeyboardEvent| {
            let cmd = event.ctrl_key() || event.meta_key();
            let Some(action) = ShortcutRegistry::resolve(&event.key(), cmd, event.shift_key()) else {
                return;
            };
            if let Ok(mut session) = session.try_borrow_mut() {
                if session.apply(action) {
                    event.prevent_default();
                }
            }
        }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);
        window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        self.key_listener = Some(closure);
        Ok(())
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut ChartSession<CanvasSurface>) -> R) -> Result<R, JsValue> {
        let mut session = self.session.try_borrow_mut().map_err(|_| js_err("Session busy"))?;
        Ok(f(&mut session))
    }
}

#[wasm_bindgen]
impl ChartHandle {
    /// Activate a tool by id; an empty id deactivates every tool.
    #[wasm_bindgen(js_name = setTool)]
    pub fn set_tool(&self, id: &str) -> Result<bool, JsValue> {
        self.with_session(|s| s.set_tool((!id.is_empty()).then_some(id)))
    }

    /// Replace the bars and refit the chart to them and the canvas size.
    #[wasm_bindgen(js_name = setBars)]
    pub fn set_bars(&self, bars: &str) -> Result<(), JsValue> {
        let bars: Vec<Bar> = serde_json::from_str(bars).map_err(js_err)?;
        let size = Size::new(f64::from(self.canvas.width()), f64::from(self.canvas.height()));
        let chart = Rc::new(viewport_for(&bars, size));
        let series = Rc::new(BarSeries::new("", "", bars));
        self.with_session(|s| {
            s.set_series(series)?;
            s.set_chart(chart, size)
        })?
        .map_err(js_err)
    }

    pub fn save(&self, name: &str) -> Result<(), JsValue> {
        self.with_session(|s| s.save_project(name))?.map_err(js_err)
    }

    pub fn load(&self, name: &str) -> Result<bool, JsValue> {
        self.with_session(|s| s.load_project(name))
    }

    pub fn remove(&self, name: &str) -> Result<(), JsValue> {
        self.with_session(|s| s.delete_project(name))?.map_err(js_err)
    }

    pub fn projects(&self) -> Result<Vec<String>, JsValue> {
        self.with_session(|s| s.projects())
    }

    pub fn snapshot(&self) -> Result<(), JsValue> {
        self.with_session(|s| s.snapshot())?.map_err(js_err)
    }

    #[wasm_bindgen(js_name = restoreCurrent)]
    pub fn restore_current(&self) -> Result<bool, JsValue> {
        self.with_session(|s| s.restore_current())
    }

    /// Drawings as schema-versioned JSON.
    #[wasm_bindgen(js_name = exportState)]
    pub fn export_state(&self) -> Result<String, JsValue> {
        let state = self.with_session(|s| s.export_state())?.map_err(js_err)?;
        serde_json::to_string(&state).map_err(js_err)
    }

    /// Load drawings from versioned JSON, migrating older schemas.
    #[wasm_bindgen(js_name = importState)]
    pub fn import_state(&self, json: &str) -> Result<usize, JsValue> {
        let state: serde_json::Value = serde_json::from_str(json).map_err(js_err)?;
        self.with_session(|s| s.import_state(&state))?.map_err(js_err)
    }

    /// Cancel the drawing being placed.
    pub fn cancel(&self) -> Result<(), JsValue> {
        self.with_session(|s| {
            s.apply(crate::shortcuts::Action::Cancel);
        })
    }
}

impl Drop for ChartHandle {
    fn drop(&mut self) {
        for (event_type, closure) in &self.pointer_listeners {
            let _ = self
                .canvas
                .remove_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref());
        }
        if let (Some(window), Some(closure)) = (web_sys::window(), &self.key_listener) {
            let _ = window.remove_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        }
    }
}
