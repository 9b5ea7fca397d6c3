//! Canvas configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Size};
use crate::{CanvasError, CanvasResult};

/// Tunables for artwork sizing and drag constraints.
///
/// Defaults match the storefront's print canvas: a 600×700 container,
/// artwork fitted into 500×500, displayed between 50 and 800 pixels on
/// its dominant side, and at least a quarter of every layer kept on the
/// canvas while dragging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Maximum canvas width for a mockup background.
    pub container_max_width: f32,
    /// Maximum canvas height for a mockup background.
    pub container_max_height: f32,
    /// Width of the box new artwork is fitted into.
    pub artwork_max_width: f32,
    /// Height of the box new artwork is fitted into.
    pub artwork_max_height: f32,
    /// Smallest displayed size of a layer's dominant side, in pixels.
    pub artwork_min_size: f32,
    /// Largest displayed size of a layer's dominant side, in pixels.
    pub artwork_max_resize: f32,
    /// Fraction of a layer's scaled box that must stay on the canvas.
    pub visible_fraction: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            container_max_width: 600.0,
            container_max_height: 700.0,
            artwork_max_width: 500.0,
            artwork_max_height: 500.0,
            artwork_min_size: 50.0,
            artwork_max_resize: 800.0,
            visible_fraction: 0.25,
        }
    }
}

impl CanvasConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> CanvasResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> CanvasResult<()> {
        let positive = [
            ("container_max_width", self.container_max_width),
            ("container_max_height", self.container_max_height),
            ("artwork_max_width", self.artwork_max_width),
            ("artwork_max_height", self.artwork_max_height),
            ("artwork_min_size", self.artwork_min_size),
            ("artwork_max_resize", self.artwork_max_resize),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CanvasError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.artwork_min_size >= self.artwork_max_resize {
            return Err(CanvasError::InvalidConfig(format!(
                "artwork_min_size ({}) must be below artwork_max_resize ({})",
                self.artwork_min_size, self.artwork_max_resize
            )));
        }
        if !(0.0..=1.0).contains(&self.visible_fraction) {
            return Err(CanvasError::InvalidConfig(format!(
                "visible_fraction must be within [0, 1], got {}",
                self.visible_fraction
            )));
        }
        Ok(())
    }

    /// Canvas rectangle for a mockup of `background` size: the image fitted
    /// into the container box, origin at `(0, 0)`.
    ///
    /// Unlike artwork fitting this may upscale a small mockup to fill the
    /// container.
    #[must_use]
    pub fn fit_canvas_bounds(&self, background: Size) -> Rect {
        if background.width <= 0.0 || background.height <= 0.0 {
            return Rect::new(0.0, 0.0, self.container_max_width, self.container_max_height);
        }
        let aspect = background.width / background.height;
        let mut width = self.container_max_width;
        let mut height = width / aspect;
        if height > self.container_max_height {
            height = self.container_max_height;
            width = height * aspect;
        }
        Rect::new(0.0, 0.0, width, height)
    }
}
