//! Drawing store: committed drawings, selection, layers and undo history.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::drawing::{Drawing, DrawingId, DrawingPatch, Layer, LayerSet};

/// Maximum number of undo states to keep.
const MAX_UNDO_HISTORY: usize = 50;

/// Errors raised by store operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("drawing not found: {0}")]
    NotFound(DrawingId),
    #[error("drawing already exists: {0}")]
    Duplicate(DrawingId),
    #[error("drawing is locked: {0}")]
    Locked(DrawingId),
    #[error("drawing {id} takes {expected} points, got {got}")]
    PointCount {
        id: DrawingId,
        expected: usize,
        got: usize,
    },
    #[error("store is busy")]
    Busy,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Change notification delivered to store listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Added(DrawingId),
    Updated(DrawingId),
    Removed(DrawingId),
    SelectionChanged,
    /// Bulk replace, undo or redo.
    Reset,
}

/// Store listener. An error is logged and does not stop other listeners.
pub type Listener = Box<dyn FnMut(&StoreEvent) -> Result<(), Box<dyn std::error::Error>>>;

/// Handle returned by [`DrawingStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// The operations tools may perform on committed drawings.
pub trait ShapeStore {
    fn add(&mut self, drawing: Drawing) -> StoreResult<DrawingId>;
    fn update(&mut self, id: &str, patch: DrawingPatch) -> StoreResult<()>;
    /// Replace the selection with `ids`.
    fn select(&mut self, ids: &[DrawingId]) -> StoreResult<()>;
    fn clear_selection(&mut self);
    /// Drawings back to front.
    fn drawings(&self) -> &[Drawing];
    fn selection(&self) -> &[DrawingId];
    fn layers(&self) -> &LayerSet;
}

/// Shared, single-threaded handle to a store.
pub type SharedStore = Rc<RefCell<dyn ShapeStore>>;

#[derive(Debug, Clone)]
struct StoreSnapshot {
    drawings: Vec<Drawing>,
    selection: Vec<DrawingId>,
}

/// In-memory drawing store.
#[derive(Default)]
pub struct DrawingStore {
    /// Back to front.
    drawings: Vec<Drawing>,
    selection: Vec<DrawingId>,
    layers: LayerSet,
    undo_stack: Vec<StoreSnapshot>,
    redo_stack: Vec<StoreSnapshot>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl fmt::Debug for DrawingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawingStore")
            .field("drawings", &self.drawings.len())
            .field("selection", &self.selection)
            .field("layers", &self.layers)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl DrawingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap into a shared handle.
    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        before != self.listeners.len()
    }

    fn notify(&mut self, event: StoreEvent) {
        for (id, listener) in &mut self.listeners {
            if let Err(e) = listener(&event) {
                log::warn!("Store listener {:?} failed on {:?}: {}", id, event, e);
            }
        }
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            drawings: self.drawings.clone(),
            selection: self.selection.clone(),
        }
    }

    /// Push current state to undo stack (call before making changes).
    fn push_undo(&mut self) {
        self.undo_stack.push(self.snapshot());
        self.redo_stack.clear();
        if self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    fn restore(&mut self, snapshot: StoreSnapshot) {
        self.drawings = snapshot.drawings;
        self.selection = snapshot.selection;
        self.notify(StoreEvent::Reset);
    }

    /// Undo the last change. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.redo_stack.push(current);
        self.restore(snapshot);
        true
    }

    /// Redo the last undone change. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.undo_stack.push(current);
        self.restore(snapshot);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.drawings.iter().position(|d| d.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Drawing> {
        self.drawings.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.iter().any(|s| s == id)
    }

    /// Selected drawings in selection order.
    pub fn selected_drawings(&self) -> impl Iterator<Item = &Drawing> {
        self.selection.iter().filter_map(|id| self.get(id))
    }

    /// Remove a drawing, pruning it from the selection.
    pub fn remove(&mut self, id: &str) -> StoreResult<Drawing> {
        let idx = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.push_undo();
        let removed = self.drawings.remove(idx);
        let was_selected = self.is_selected(id);
        self.selection.retain(|s| s != id);
        self.notify(StoreEvent::Removed(removed.id.clone()));
        if was_selected {
            self.notify(StoreEvent::SelectionChanged);
        }
        Ok(removed)
    }

    /// Delete every selected drawing that is not locked. Returns the removed ids.
    pub fn delete_selected(&mut self) -> Vec<DrawingId> {
        let doomed: Vec<DrawingId> = self
            .selected_drawings()
            .filter(|d| !d.locked)
            .map(|d| d.id.clone())
            .collect();
        if doomed.is_empty() {
            return doomed;
        }
        self.push_undo();
        self.drawings.retain(|d| !doomed.contains(&d.id));
        self.selection.retain(|s| !doomed.contains(s));
        for id in &doomed {
            self.notify(StoreEvent::Removed(id.clone()));
        }
        self.notify(StoreEvent::SelectionChanged);
        doomed
    }

    /// Replace every drawing at once, e.g. after loading a project.
    ///
    /// Selection ids that do not exist in the new list are dropped.
    /// Undo history is cleared.
    pub fn replace_all(&mut self, drawings: Vec<Drawing>, selection: Vec<DrawingId>) {
        self.drawings = drawings;
        let mut kept: Vec<DrawingId> = Vec::with_capacity(selection.len());
        for id in selection {
            if self.contains(&id) && !kept.contains(&id) {
                kept.push(id);
            }
        }
        self.selection = kept;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.notify(StoreEvent::Reset);
    }

    pub fn clear(&mut self) {
        self.replace_all(Vec::new(), Vec::new());
    }

    /// Add to selection, keeping order and ignoring duplicates.
    pub fn add_to_selection(&mut self, id: &str) -> StoreResult<()> {
        if !self.contains(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        if !self.is_selected(id) {
            self.selection.push(id.to_string());
            self.notify(StoreEvent::SelectionChanged);
        }
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.selection = self.drawings.iter().map(|d| d.id.clone()).collect();
        self.notify(StoreEvent::SelectionChanged);
    }

    /// Bring a drawing to the front (topmost).
    pub fn bring_to_front(&mut self, id: &str) -> StoreResult<()> {
        let idx = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.push_undo();
        let drawing = self.drawings.remove(idx);
        self.drawings.push(drawing);
        self.notify(StoreEvent::Updated(id.to_string()));
        Ok(())
    }

    /// Send a drawing to the back (bottommost).
    pub fn send_to_back(&mut self, id: &str) -> StoreResult<()> {
        let idx = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.push_undo();
        let drawing = self.drawings.remove(idx);
        self.drawings.insert(0, drawing);
        self.notify(StoreEvent::Updated(id.to_string()));
        Ok(())
    }

    pub fn upsert_layer(&mut self, layer: Layer) {
        self.layers.upsert(layer);
        self.notify(StoreEvent::Reset);
    }

    pub fn layers_mut(&mut self) -> &mut LayerSet {
        &mut self.layers
    }
}

impl ShapeStore for DrawingStore {
    fn add(&mut self, drawing: Drawing) -> StoreResult<DrawingId> {
        if self.contains(&drawing.id) {
            return Err(StoreError::Duplicate(drawing.id));
        }
        self.push_undo();
        let id = drawing.id.clone();
        self.drawings.push(drawing);
        log::debug!("Added drawing {}", id);
        self.notify(StoreEvent::Added(id.clone()));
        Ok(id)
    }

    /// Locked drawings reject anchor moves; style and flags can still change.
    fn update(&mut self, id: &str, patch: DrawingPatch) -> StoreResult<()> {
        let idx = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let current = &self.drawings[idx];
        let unlocking = patch.locked == Some(false);
        if current.locked && patch.touches_geometry() && !unlocking {
            return Err(StoreError::Locked(id.to_string()));
        }
        if let Some(points) = &patch.points {
            let expected = current.kind().point_count();
            if points.len() != expected {
                return Err(StoreError::PointCount {
                    id: id.to_string(),
                    expected,
                    got: points.len(),
                });
            }
        }
        if patch.is_empty() {
            return Ok(());
        }

        self.push_undo();
        let drawing = &mut self.drawings[idx];
        if let Some(points) = patch.points {
            // Length checked above.
            let _ = drawing.geometry.set_points(&points);
        }
        if let Some(style) = patch.style {
            drawing.style = style;
        }
        if let Some(layer_id) = patch.layer_id {
            drawing.layer_id = layer_id;
        }
        if let Some(locked) = patch.locked {
            drawing.locked = locked;
        }
        if let Some(hidden) = patch.hidden {
            drawing.hidden = hidden;
        }
        self.notify(StoreEvent::Updated(id.to_string()));
        Ok(())
    }

    fn select(&mut self, ids: &[DrawingId]) -> StoreResult<()> {
        if let Some(missing) = ids.iter().find(|id| !self.contains(id)) {
            return Err(StoreError::NotFound(missing.clone()));
        }
        let mut selection: Vec<DrawingId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !selection.contains(id) {
                selection.push(id.clone());
            }
        }
        self.selection = selection;
        self.notify(StoreEvent::SelectionChanged);
        Ok(())
    }

    fn clear_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.notify(StoreEvent::SelectionChanged);
    }

    fn drawings(&self) -> &[Drawing] {
        &self.drawings
    }

    fn selection(&self) -> &[DrawingId] {
        &self.selection
    }

    fn layers(&self) -> &LayerSet {
        &self.layers
    }
}
