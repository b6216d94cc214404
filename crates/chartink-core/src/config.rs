//! Engine configuration, loadable from JSON.

use serde::{Deserialize, Serialize};

use crate::drawing::{DEFAULT_FONT_SIZE, DEFAULT_LAYER_ID, DrawingStyle, FIB_LEVELS, GeometryParams};
use crate::snap::SnapSettings;

/// Storage namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "chartink";

/// Pixel radius within which a pointer hits a drawing.
pub const HIT_PADDING: f64 = 6.0;

/// How a 2-point channel derives the distance between its rails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum ChannelWidth {
    /// Percentage of the first anchor's absolute price.
    Percent(f64),
    /// Screen-space distance converted through the price axis.
    Pixels(f64),
}

impl Default for ChannelWidth {
    fn default() -> Self {
        ChannelWidth::Percent(1.0)
    }
}

/// Settings applied to drawings committed by the built-in tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolSettings {
    pub default_style: DrawingStyle,
    /// Layer new drawings are placed on.
    pub layer_id: String,
    pub channel_width: ChannelWidth,
    pub fib_levels: Vec<f64>,
    pub text_content: String,
    pub font_size: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            default_style: DrawingStyle::default(),
            layer_id: DEFAULT_LAYER_ID.to_string(),
            channel_width: ChannelWidth::default(),
            fib_levels: FIB_LEVELS.to_vec(),
            text_content: "Text".to_string(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl ToolSettings {
    /// Geometry parameters with a precomputed channel width.
    pub fn geometry_params(&self, channel_width: f64) -> GeometryParams {
        GeometryParams {
            channel_width,
            fib_levels: self.fib_levels.clone(),
            text: self.text_content.clone(),
            font_size: self.font_size,
        }
    }
}

/// Top-level configuration of a chart session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Prefix of every persistence key.
    pub namespace: String,
    pub snap: SnapSettings,
    pub hit_padding: f64,
    pub tools: ToolSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            snap: SnapSettings::default(),
            hit_padding: HIT_PADDING,
            tools: ToolSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.namespace, "chartink");
        assert_eq!(config.tools.channel_width, ChannelWidth::Percent(1.0));
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "namespace": "desk",
            "hitPadding": 4,
            "snap": { "gridStep": 5, "perTool": { "hline": { "levels": true } } },
            "tools": { "channelWidth": { "mode": "pixels", "value": 24 }, "layerId": "notes" }
        }"#;
        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.namespace, "desk");
        assert_eq!(config.hit_padding, 4.0);
        assert_eq!(config.snap.grid_step, 5.0);
        assert!(config.snap.config_for(Some("hline")).levels);
        assert!(!config.snap.config_for(Some("hline")).grid);
        assert_eq!(config.tools.channel_width, ChannelWidth::Pixels(24.0));
        assert_eq!(config.tools.layer_id, "notes");
        assert_eq!(config.tools.fib_levels, FIB_LEVELS.to_vec());
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::default();
        let back = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
