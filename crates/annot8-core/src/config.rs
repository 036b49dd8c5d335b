//! Engine configuration.

use crate::shapes::ShapeStyle;
use kurbo::{Size, Vec2};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Tunables for the annotation engine. Every field has a default, so a partial JSON
/// document only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period before the live scene is written to the store.
    pub save_debounce_ms: u64,
    /// Quiet period before the surface box is re-measured.
    pub resync_debounce_ms: u64,
    /// Quiet period before note edits are committed.
    pub notes_debounce_ms: u64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    /// Largest accepted source file.
    pub max_file_bytes: u64,
    /// Size of an inserted rectangle.
    pub rectangle_size: Size,
    /// Radii of an inserted ellipse.
    pub ellipse_radii: Vec2,
    /// Content of an inserted text object.
    pub text_placeholder: String,
    pub text_font_size: f64,
    pub pen: ShapeStyle,
    pub highlighter: ShapeStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 1000,
            resync_debounce_ms: 100,
            notes_debounce_ms: 300,
            min_zoom: 0.5,
            max_zoom: 2.0,
            zoom_step: 0.1,
            max_file_bytes: 25 * 1024 * 1024,
            rectangle_size: Size::new(100.0, 80.0),
            ellipse_radii: Vec2::new(50.0, 40.0),
            text_placeholder: "Type here".to_string(),
            text_font_size: 16.0,
            pen: ShapeStyle::pen(),
            highlighter: ShapeStyle::highlighter(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_zoom > 0.0 && self.min_zoom.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "min_zoom must be positive, got {}",
                self.min_zoom
            )));
        }
        if !(self.max_zoom >= self.min_zoom && self.max_zoom.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "max_zoom ({}) must not be below min_zoom ({})",
                self.max_zoom, self.min_zoom
            )));
        }
        if !(self.zoom_step > 0.0) {
            return Err(ConfigError::Invalid("zoom_step must be positive".to_string()));
        }
        if !(self.text_font_size > 0.0) {
            return Err(ConfigError::Invalid("text_font_size must be positive".to_string()));
        }
        if self.rectangle_size.width < 0.0
            || self.rectangle_size.height < 0.0
            || self.ellipse_radii.x < 0.0
            || self.ellipse_radii.y < 0.0
        {
            return Err(ConfigError::Invalid("default shape extents must be non-negative".to_string()));
        }
        Ok(())
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn resync_debounce(&self) -> Duration {
        Duration::from_millis(self.resync_debounce_ms)
    }

    pub fn notes_debounce(&self) -> Duration {
        Duration::from_millis(self.notes_debounce_ms)
    }

    /// Clamp a requested zoom into the configured range.
    pub fn clamp_zoom(&self, scale: f64) -> f64 {
        scale.clamp(self.min_zoom, self.max_zoom)
    }
}
