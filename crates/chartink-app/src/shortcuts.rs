//! Keyboard shortcut registry and documentation.

use chartink_render::SelectTool;

/// What a shortcut does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Abandon the drawing being placed.
    Cancel,
    DeleteSelected,
    Undo,
    Redo,
    SelectAll,
    /// Record the drawings in the version history.
    Snapshot,
    /// Activate a tool by id.
    Tool(&'static str),
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub action: Action,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(key: &'static str, ctrl: bool, shift: bool, action: Action, description: &'static str) -> Self {
        Self {
            key,
            ctrl,
            shift,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+S").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }

    /// Whether a key press triggers this shortcut. Letters match in any case.
    pub fn matches(&self, key: &str, ctrl: bool, shift: bool) -> bool {
        self.ctrl == ctrl && self.shift == shift && self.key.eq_ignore_ascii_case(key)
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("A", true, false, Action::SelectAll, "Select all drawings"),
            Shortcut::new("S", true, false, Action::Snapshot, "Save a snapshot"),
            Shortcut::new("Z", true, false, Action::Undo, "Undo"),
            Shortcut::new("Z", true, true, Action::Redo, "Redo"),
            Shortcut::new("Y", true, false, Action::Redo, "Redo"),
            Shortcut::new("Delete", false, false, Action::DeleteSelected, "Delete selected drawings"),
            Shortcut::new("Backspace", false, false, Action::DeleteSelected, "Delete selected drawings"),
            Shortcut::new("Escape", false, false, Action::Cancel, "Cancel current drawing"),
            Shortcut::new("V", false, false, Action::Tool(SelectTool::ID), "Select tool"),
            Shortcut::new("T", false, false, Action::Tool("trendline"), "Trend line"),
            Shortcut::new("R", false, false, Action::Tool("ray"), "Ray"),
            Shortcut::new("H", false, false, Action::Tool("hline"), "Horizontal line"),
            Shortcut::new("B", false, false, Action::Tool("rect"), "Rectangle"),
            Shortcut::new("F", false, false, Action::Tool("fib"), "Fib retracement"),
            Shortcut::new("P", false, false, Action::Tool("pitchfork"), "Pitchfork"),
            Shortcut::new("M", false, false, Action::Tool("ruler"), "Ruler"),
        ]
    }

    /// Action bound to a key press, if any. `cmd` is Ctrl, or Meta on macOS.
    pub fn resolve(key: &str, cmd: bool, shift: bool) -> Option<Action> {
        Self::all()
            .into_iter()
            .find(|s| s.matches(key, cmd, shift))
            .map(|s| s.action)
    }

    /// Log all shortcuts.
    pub fn log_all() {
        for shortcut in Self::all() {
            log::info!("  {:20} {}", shortcut.format(), shortcut.description);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartink_core::tools::BUILTIN_TOOLS;

    #[test]
    fn test_format() {
        let redo = Shortcut::new("Z", true, true, Action::Redo, "Redo");
        assert_eq!(redo.format(), "Ctrl+Shift+Z");
        assert_eq!(
            Shortcut::new("Escape", false, false, Action::Cancel, "").format(),
            "Escape"
        );
    }

    #[test]
    fn test_resolve() {
        assert_eq!(ShortcutRegistry::resolve("z", true, false), Some(Action::Undo));
        assert_eq!(ShortcutRegistry::resolve("Z", true, true), Some(Action::Redo));
        assert_eq!(ShortcutRegistry::resolve("t", false, false), Some(Action::Tool("trendline")));
        assert_eq!(ShortcutRegistry::resolve("t", true, false), None);
        assert_eq!(ShortcutRegistry::resolve("q", false, false), None);
    }

    #[test]
    fn test_tool_shortcuts_name_real_tools() {
        for shortcut in ShortcutRegistry::all() {
            if let Action::Tool(id) = shortcut.action {
                assert!(
                    id == SelectTool::ID || BUILTIN_TOOLS.iter().any(|(tool, _, _)| *tool == id),
                    "unknown tool {id}"
                );
            }
        }
    }
}
