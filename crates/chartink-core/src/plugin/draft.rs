//! Per-tool in-progress state owned by the plugin manager.

use std::collections::HashMap;

use kurbo::{Point, Rect};

use crate::drawing::{Anchor, Drawing};
use crate::geometry::rect_from_points;

/// Preview of a drawing that is not committed yet, tagged with its tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Ghost {
    pub owner: String,
    pub drawing: Drawing,
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DraftState {
    /// Tool is idle, waiting for interaction.
    #[default]
    Idle,
    /// Anchors collected so far, plus the preview following the cursor.
    Collecting {
        anchors: Vec<Anchor>,
        ghost: Option<Ghost>,
    },
    /// Rubber-band selection in pixels.
    Marquee { origin: Point, current: Point },
}

static IDLE: DraftState = DraftState::Idle;

impl DraftState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DraftState::Idle)
    }

    pub fn anchors(&self) -> &[Anchor] {
        match self {
            DraftState::Collecting { anchors, .. } => anchors,
            _ => &[],
        }
    }

    pub fn ghost(&self) -> Option<&Ghost> {
        match self {
            DraftState::Collecting { ghost, .. } => ghost.as_ref(),
            _ => None,
        }
    }

    pub fn marquee(&self) -> Option<Rect> {
        match self {
            DraftState::Marquee { origin, current } => Some(rect_from_points(*origin, *current)),
            _ => None,
        }
    }
}

/// Draft states keyed by tool id.
#[derive(Debug, Default)]
pub struct DraftStore {
    drafts: HashMap<String, DraftState>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a tool; tools never touched are idle.
    pub fn state(&self, tool_id: &str) -> &DraftState {
        self.drafts.get(tool_id).unwrap_or(&IDLE)
    }

    pub fn state_mut(&mut self, tool_id: &str) -> &mut DraftState {
        self.drafts.entry(tool_id.to_string()).or_default()
    }

    pub fn reset(&mut self, tool_id: &str) {
        self.drafts.remove(tool_id);
    }

    pub fn clear(&mut self) {
        self.drafts.clear();
    }

    /// Every ghost preview currently held.
    pub fn ghosts(&self) -> impl Iterator<Item = &Ghost> {
        self.drafts.values().filter_map(DraftState::ghost)
    }

    /// Active marquee rectangle, if any tool is dragging one.
    pub fn marquee(&self) -> Option<Rect> {
        self.drafts.values().find_map(DraftState::marquee)
    }

    /// Drop ghosts owned by tools other than `owner`. Returns how many went away.
    pub fn discard_foreign_ghosts(&mut self, owner: &str) -> usize {
        let mut discarded = 0;
        for state in self.drafts.values_mut() {
            if let DraftState::Collecting { ghost, .. } = state {
                if ghost.as_ref().is_some_and(|g| g.owner != owner) {
                    *ghost = None;
                    discarded += 1;
                }
            }
        }
        discarded
    }
}
