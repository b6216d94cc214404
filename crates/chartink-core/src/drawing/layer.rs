//! Drawing layers and visibility gating.

use serde::{Deserialize, Serialize};

/// Id of the layer new drawings land on unless configured otherwise.
pub const DEFAULT_LAYER_ID: &str = "default";

/// A named group of drawings that can be hidden or faded together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl Layer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            visible: None,
            opacity: None,
        }
    }

    /// A layer is shown unless explicitly hidden or faded to zero opacity.
    pub fn is_visible(&self) -> bool {
        self.visible != Some(false) && self.opacity.unwrap_or(1.0) > 0.0
    }

    /// Opacity multiplier applied on top of each drawing's own style.
    pub fn effective_opacity(&self) -> f64 {
        self.opacity.unwrap_or(1.0).clamp(0.0, 1.0)
    }
}

/// Ordered set of layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerSet {
    layers: Vec<Layer>,
}

impl LayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Insert or replace a layer by id.
    pub fn upsert(&mut self, layer: Layer) {
        match self.get_mut(&layer.id) {
            Some(existing) => *existing = layer,
            None => self.layers.push(layer),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Layer> {
        let idx = self.layers.iter().position(|l| l.id == id)?;
        Some(self.layers.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    /// Unknown layers count as visible.
    pub fn is_visible(&self, layer_id: &str) -> bool {
        self.get(layer_id).is_none_or(Layer::is_visible)
    }

    pub fn opacity(&self, layer_id: &str) -> f64 {
        self.get(layer_id).map_or(1.0, Layer::effective_opacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_visibility_rules() {
        let mut layer = Layer::new("a", "A");
        assert!(layer.is_visible());
        layer.visible = Some(true);
        assert!(layer.is_visible());
        layer.opacity = Some(0.0);
        assert!(!layer.is_visible());
        layer.opacity = Some(0.3);
        layer.visible = Some(false);
        assert!(!layer.is_visible());
    }

    #[test]
    fn test_unknown_layer_is_visible() {
        let mut set = LayerSet::new();
        set.upsert(Layer {
            visible: Some(false),
            ..Layer::new("hidden", "Hidden")
        });
        assert!(!set.is_visible("hidden"));
        assert!(set.is_visible("nope"));
        assert_eq!(set.opacity("nope"), 1.0);
    }

    #[test]
    fn test_upsert_replaces() {
        let mut set = LayerSet::new();
        set.upsert(Layer::new("a", "First"));
        set.upsert(Layer::new("a", "Second"));
        assert_eq!(set.iter().count(), 1);
        assert_eq!(set.get("a").unwrap().name, "Second");
        assert!(set.remove("a").is_some());
        assert!(set.remove("a").is_none());
    }
}
