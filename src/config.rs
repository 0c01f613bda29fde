//! Viewer configuration.
//!
//! Every field has a default so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::annotations::PenConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub const MIN_ZOOM_STEP: f64 = 0.01;

/// Zoom bounds and the step used by zoom in/out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self { min: 0.4, max: 4.0, step: 0.2 }
    }
}

impl ZoomConfig {
    /// Clamp into `[min, max]`. Never panics, even on an inverted range.
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.max(self.min).min(self.max)
    }
}

/// Size of the whiteboard page-gallery shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeSize {
    pub w: f64,
    pub h: f64,
}

impl Default for ShapeSize {
    fn default() -> Self {
        Self { w: 720.0, h: 480.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub zoom: ZoomConfig,
    pub pen: PenConfig,
    /// Scale used when pre-rendering pages for the whiteboard gallery.
    pub gallery_scale: f64,
    pub shape_size: ShapeSize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomConfig::default(),
            pen: PenConfig::default(),
            gallery_scale: 1.5,
            shape_size: ShapeSize::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let mut config: ViewerConfig = serde_json::from_str(json)?;
        config.pen.set_width(config.pen.width);
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let zoom = &self.zoom;
        let finite = [zoom.min, zoom.max, zoom.step, self.gallery_scale].iter().all(|v| v.is_finite());
        if !finite {
            return Err(ConfigError::Invalid("numbers must be finite".to_string()));
        }
        if zoom.min <= 0.0 || zoom.min > zoom.max {
            return Err(ConfigError::Invalid(format!(
                "zoom range {}..{} is empty or non-positive",
                zoom.min, zoom.max
            )));
        }
        if !(zoom.min <= 1.0 && 1.0 <= zoom.max) {
            return Err(ConfigError::Invalid(format!(
                "zoom range {}..{} must include 100%",
                zoom.min, zoom.max
            )));
        }
        // Zoom steps are rounded to hundredths; anything smaller never moves.
        if zoom.step < MIN_ZOOM_STEP {
            return Err(ConfigError::Invalid(format!("zoom step must be at least {MIN_ZOOM_STEP}")));
        }
        if self.gallery_scale <= 0.0 {
            return Err(ConfigError::Invalid("gallery scale must be positive".to_string()));
        }
        if self.shape_size.w <= 0.0 || self.shape_size.h <= 0.0 {
            return Err(ConfigError::Invalid("shape size must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::PenColor;

    #[test]
    fn empty_object_yields_defaults() {
        let config = ViewerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.zoom, ZoomConfig { min: 0.4, max: 4.0, step: 0.2 });
        assert_eq!(config.shape_size, ShapeSize { w: 720.0, h: 480.0 });
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config =
            ViewerConfig::from_json_str(r##"{"zoom": {"max": 2.5}, "pen": {"color": "#000000", "width": 30}}"##)
                .unwrap();
        assert_eq!(config.zoom.max, 2.5);
        assert_eq!(config.zoom.min, 0.4);
        assert_eq!(config.pen.color, PenColor::Black);
        assert_eq!(config.pen.width, 12);
    }

    #[test]
    fn inverted_zoom_range_is_rejected() {
        let err = ViewerConfig::from_json_str(r#"{"zoom": {"min": 3.0, "max": 1.0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zoom_range_must_include_one() {
        for json in [r#"{"zoom": {"min": 1.5, "max": 3.0}}"#, r#"{"zoom": {"min": 0.2, "max": 0.8}}"#] {
            let err = ViewerConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{json} should be rejected");
        }
        assert!(ViewerConfig::from_json_str(r#"{"zoom": {"min": 1.0, "max": 1.0}}"#).is_ok());
    }

    #[test]
    fn zoom_step_below_a_hundredth_is_rejected() {
        let err = ViewerConfig::from_json_str(r#"{"zoom": {"step": 0.004}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(ViewerConfig::from_json_str(r#"{"zoom": {"step": 0.01}}"#).is_ok());
    }

    #[test]
    fn clamp_tolerates_inverted_range() {
        let zoom = ZoomConfig { min: 3.0, max: 1.0, step: 0.2 };
        assert_eq!(zoom.clamp(2.0), 1.0);
    }

    #[test]
    fn color_outside_palette_is_a_parse_error() {
        let err = ViewerConfig::from_json_str(r##"{"pen": {"color": "#abcdef"}}"##).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
