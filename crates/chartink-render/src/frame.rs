//! Dirty-flag frame scheduling.

use std::cell::Cell;

use chartink_core::chart::RedrawHandle;

/// Coalesces redraw requests into at most one paint per frame.
#[derive(Debug)]
pub struct FrameScheduler {
    dirty: Cell<bool>,
    painted: Cell<u64>,
}

impl Default for FrameScheduler {
    /// Starts dirty so the first frame paints.
    fn default() -> Self {
        Self {
            dirty: Cell::new(true),
            painted: Cell::new(0),
        }
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&self) {
        self.dirty.set(true);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Number of frames that actually painted.
    pub fn painted_frames(&self) -> u64 {
        self.painted.get()
    }

    /// Run `paint` if a redraw was requested. Returns whether it ran.
    ///
    /// The flag is cleared before painting, so invalidations raised while
    /// painting schedule another frame.
    pub fn frame(&self, paint: impl FnOnce()) -> bool {
        if !self.dirty.replace(false) {
            return false;
        }
        paint();
        self.painted.set(self.painted.get() + 1);
        true
    }
}

impl RedrawHandle for FrameScheduler {
    fn invalidate(&self) {
        FrameScheduler::invalidate(self);
    }
}

/// Bookkeeping of an animation-frame loop: whether it still runs and which
/// frame request is outstanding.
#[derive(Debug)]
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
pub(crate) struct LoopState {
    running: Cell<bool>,
    pending: Cell<Option<i32>>,
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
impl LoopState {
    pub(crate) fn new() -> Self {
        Self {
            running: Cell::new(true),
            pending: Cell::new(None),
        }
    }

    /// Record the id of a frame request.
    pub(crate) fn requested(&self, id: i32) {
        self.pending.set(Some(id));
    }

    /// A requested frame fired. Returns whether the loop should paint and
    /// request the next one.
    pub(crate) fn fired(&self) -> bool {
        self.pending.set(None);
        self.running.get()
    }

    /// Stop the loop. Returns the request that must be cancelled before the
    /// callback is released.
    pub(crate) fn stop(&self) -> Option<i32> {
        self.running.set(false);
        self.pending.take()
    }
}

#[cfg(target_arch = "wasm32")]
pub use animation::AnimationLoop;

#[cfg(target_arch = "wasm32")]
mod animation {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::closure::Closure;

    use super::{FrameScheduler, LoopState};
    use crate::renderer::{RenderError, RenderResult};

    type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

    /// `requestAnimationFrame` loop driving a [`FrameScheduler`].
    ///
    /// Dropping the handle cancels the pending frame and stops the loop.
    pub struct AnimationLoop {
        callback: FrameCallback,
        state: Rc<LoopState>,
    }

    fn request_frame(callback: &FrameCallback, state: &LoopState) -> RenderResult<()> {
        let window = web_sys::window()
            .ok_or_else(|| RenderError::InitFailed("No window object".to_string()))?;
        let callback = callback.borrow();
        let Some(closure) = callback.as_ref() else {
            return Ok(());
        };
        let id = window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(|e| RenderError::Surface(format!("requestAnimationFrame failed: {:?}", e)))?;
        state.requested(id);
        Ok(())
    }

    impl AnimationLoop {
        /// Start calling `paint` on every animation frame in which `scheduler` is dirty.
        pub fn start(scheduler: Rc<FrameScheduler>, mut paint: impl FnMut() + 'static) -> RenderResult<Self> {
            let callback: FrameCallback = Rc::new(RefCell::new(None));
            let state = Rc::new(LoopState::new());

            let next = callback.clone();
            let loop_state = state.clone();
            *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |_timestamp: f64| {
                if !loop_state.fired() {
                    return;
                }
                scheduler.frame(&mut paint);
                if let Err(e) = request_frame(&next, &loop_state) {
                    log::error!("Animation loop stopped: {}", e);
                }
            }) as Box<dyn FnMut(f64)>));

            request_frame(&callback, &state)?;
            Ok(Self { callback, state })
        }
    }

    impl Drop for AnimationLoop {
        fn drop(&mut self) {
            if let Some(id) = self.state.stop() {
                match web_sys::window() {
                    Some(window) => {
                        if let Err(e) = window.cancel_animation_frame(id) {
                            log::warn!("cancelAnimationFrame failed: {:?}", e);
                        }
                    }
                    None => log::warn!("No window to cancel frame {}", id),
                }
            }
            // The callback holds a handle to its own slot; clearing it frees both.
            if let Ok(mut callback) = self.callback.try_borrow_mut() {
                callback.take();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_paints() {
        let scheduler = FrameScheduler::new();
        assert!(scheduler.is_dirty());
        assert!(scheduler.frame(|| {}));
        assert!(!scheduler.is_dirty());
    }

    #[test]
    fn test_frames_coalesce_invalidations() {
        let scheduler = FrameScheduler::new();
        scheduler.frame(|| {});

        let mut runs = 0;
        assert!(!scheduler.frame(|| runs += 1));
        scheduler.invalidate();
        scheduler.invalidate();
        assert!(scheduler.frame(|| runs += 1));
        assert!(!scheduler.frame(|| runs += 1));
        assert_eq!(runs, 1);
        assert_eq!(scheduler.painted_frames(), 2);
    }

    #[test]
    fn test_invalidate_during_paint_schedules_next_frame() {
        let scheduler = FrameScheduler::new();
        scheduler.frame(|| scheduler.invalidate());
        assert!(scheduler.is_dirty());
    }

    #[test]
    fn test_loop_state_tracks_pending_request() {
        let state = LoopState::new();
        state.requested(7);
        assert!(state.fired());
        state.requested(8);
        assert_eq!(state.stop(), Some(8));
        assert_eq!(state.stop(), None);
    }

    #[test]
    fn test_stopped_loop_skips_late_frame() {
        let state = LoopState::new();
        state.requested(3);
        assert!(state.fired());
        assert_eq!(state.stop(), None);
        assert!(!state.fired());
    }

    #[test]
    fn test_redraw_handle() {
        let scheduler = FrameScheduler::new();
        scheduler.frame(|| {});
        let handle: &dyn RedrawHandle = &scheduler;
        handle.invalidate();
        assert!(scheduler.is_dirty());
    }
}
