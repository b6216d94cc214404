//! Pointer input delivered to tool plugins.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Map a DOM `MouseEvent.button` code.
    pub fn from_dom(code: i16) -> Self {
        match code {
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// A pointer sample in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub position: Point,
    #[serde(default)]
    pub button: MouseButton,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl PointerEvent {
    /// Left-button event without modifiers.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            button: MouseButton::Left,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_button_codes() {
        assert_eq!(MouseButton::from_dom(0), MouseButton::Left);
        assert_eq!(MouseButton::from_dom(1), MouseButton::Middle);
        assert_eq!(MouseButton::from_dom(2), MouseButton::Right);
        assert_eq!(MouseButton::from_dom(7), MouseButton::Left);
    }

    #[test]
    fn test_builder() {
        let shift = Modifiers {
            shift: true,
            ..Default::default()
        };
        let ev = PointerEvent::at(1.0, 2.0)
            .with_button(MouseButton::Right)
            .with_modifiers(shift);
        assert_eq!(ev.position, Point::new(1.0, 2.0));
        assert_eq!(ev.button, MouseButton::Right);
        assert!(ev.modifiers.shift);
    }
}
