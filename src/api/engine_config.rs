use serde::{Deserialize, Serialize};

use crate::core::ScreenSize;
use crate::error::{ChartError, ChartResult};
use crate::interaction::AnimationConfig;
use crate::render::SurfaceMode;

/// Immutable settings shared by every tree of a [`Composition`](super::Composition).
///
/// This type is serializable so host applications can persist/load the setup
/// without inventing their own ad-hoc format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositionConfig {
    /// Screen pixels added around the aggregate padding when fitting content.
    #[serde(default = "default_padding_margin")]
    pub padding_margin: f64,
    /// Zoom step of one wheel notch; the opposite direction uses its reciprocal.
    #[serde(default = "default_zoom_level_factor")]
    pub zoom_level_factor: f64,
    /// Zoom never shrinks a viewport dimension below this.
    #[serde(default = "default_min_viewport_extent")]
    pub min_viewport_extent: f64,
    /// Extent given to a zero-width or zero-height content union.
    #[serde(default = "default_degenerate_bounds_extent")]
    pub degenerate_bounds_extent: f64,
    /// Aspect ratio (`scale_x / scale_y`) for new masters.
    #[serde(default)]
    pub aspect_ratio: Option<f64>,
    /// Screen size of a master until the host reports the real one.
    #[serde(default = "default_screen_size")]
    pub default_screen_size: ScreenSize,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub surface_mode: SurfaceMode,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            padding_margin: default_padding_margin(),
            zoom_level_factor: default_zoom_level_factor(),
            min_viewport_extent: default_min_viewport_extent(),
            degenerate_bounds_extent: default_degenerate_bounds_extent(),
            aspect_ratio: None,
            default_screen_size: default_screen_size(),
            animation: AnimationConfig::default(),
            surface_mode: SurfaceMode::default(),
        }
    }
}

impl CompositionConfig {
    #[must_use]
    pub fn with_aspect_ratio(mut self, aspect_ratio: Option<f64>) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    #[must_use]
    pub fn with_padding_margin(mut self, padding_margin: f64) -> Self {
        self.padding_margin = padding_margin;
        self
    }

    #[must_use]
    pub fn with_default_screen_size(mut self, size: ScreenSize) -> Self {
        self.default_screen_size = size;
        self
    }

    #[must_use]
    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    /// Disables animated navigation: every target is applied immediately.
    #[must_use]
    pub fn without_animation(mut self) -> Self {
        self.animation.enabled = false;
        self
    }

    #[must_use]
    pub fn with_surface_mode(mut self, surface_mode: SurfaceMode) -> Self {
        self.surface_mode = surface_mode;
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.padding_margin.is_finite() || self.padding_margin < 0.0 {
            return Err(ChartError::InvalidData(
                "padding margin must be finite and >= 0".to_owned(),
            ));
        }
        if !self.zoom_level_factor.is_finite() || self.zoom_level_factor <= 1.0 {
            return Err(ChartError::InvalidData(
                "zoom level factor must be finite and > 1".to_owned(),
            ));
        }
        if !self.min_viewport_extent.is_finite() || self.min_viewport_extent <= 0.0 {
            return Err(ChartError::InvalidData(
                "min viewport extent must be finite and > 0".to_owned(),
            ));
        }
        if !self.degenerate_bounds_extent.is_finite() || self.degenerate_bounds_extent <= 0.0 {
            return Err(ChartError::InvalidData(
                "degenerate bounds extent must be finite and > 0".to_owned(),
            ));
        }
        if let Some(ratio) = self.aspect_ratio {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(ChartError::InvalidData(
                    "aspect ratio must be finite and > 0".to_owned(),
                ));
            }
        }
        self.default_screen_size.validate()?;
        let animation = self.animation;
        if !animation.pan_velocity.is_finite()
            || animation.pan_velocity <= 0.0
            || !animation.zoom_velocity.is_finite()
            || animation.zoom_velocity <= 0.0
        {
            return Err(ChartError::InvalidData(
                "animation velocities must be finite and > 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Serializes config to pretty JSON for debug/config files.
    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChartError::InvalidData(format!("failed to serialize config: {e}")))
    }

    /// Deserializes and validates config from JSON.
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidData(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

fn default_padding_margin() -> f64 {
    20.0
}

fn default_zoom_level_factor() -> f64 {
    1.2
}

fn default_min_viewport_extent() -> f64 {
    1e-9
}

fn default_degenerate_bounds_extent() -> f64 {
    1.0
}

fn default_screen_size() -> ScreenSize {
    ScreenSize::new(640.0, 480.0)
}
