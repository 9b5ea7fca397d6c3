//! Layers - placed artwork with a position, scale and rotation.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{axis_aligned_bounds, point_in_oriented_rect, OrientedRect, Point, Rect, Size};
use crate::{CanvasConfig, CanvasError, CanvasResult};

/// Unique identifier for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    /// Create a new unique layer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Decoded artwork pixels: RGBA8, straight alpha, row-major.
///
/// Cloning shares the pixel buffer; the engine never writes to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl ArtworkImage {
    /// Wrap an RGBA8 buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::ImageLoad`] if either dimension is zero or the
    /// buffer length is not `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> CanvasResult<Self> {
        if width == 0 || height == 0 {
            return Err(CanvasError::ImageLoad(format!(
                "image has empty dimensions {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(CanvasError::ImageLoad(format!(
                "expected {expected} bytes for {width}x{height} RGBA, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// A single-colour image, handy for placeholders and tests.
    /// Zero dimensions are bumped to one pixel.
    #[must_use]
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let pixels: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Natural size as floating-point dimensions.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn natural_size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }
}

/// How to place new artwork. Unset fields take canvas defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Reuse an identifier (restoring a saved layer).
    pub id: Option<LayerId>,
    /// Where the artwork came from, persisted as `image_url`.
    pub source: Option<String>,
    /// Transform origin; the canvas center when `None`.
    pub position: Option<Point>,
    /// Requested scale, clamped to the layer's range.
    pub scale: f32,
    /// Rotation in radians.
    pub rotation: f32,
    /// Explicit unscaled size instead of fitting the image.
    pub base_size: Option<Size>,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            id: None,
            source: None,
            position: None,
            scale: 1.0,
            rotation: 0.0,
            base_size: None,
        }
    }
}

impl Placement {
    /// Set the identifier.
    #[must_use]
    pub fn with_id(mut self, id: LayerId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the source reference.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the position.
    #[must_use]
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the scale.
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Set the rotation in radians.
    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the unscaled size explicitly.
    #[must_use]
    pub fn with_base_size(mut self, base_size: Size) -> Self {
        self.base_size = Some(base_size);
        self
    }
}

/// Unscaled layer size: the image's natural size fitted into the configured
/// artwork box, never upscaled.
#[must_use]
pub fn fit_base_size(natural: Size, config: &CanvasConfig) -> Size {
    natural.fit_within(config.artwork_max_width, config.artwork_max_height)
}

/// One placed artwork instance.
///
/// Fields are private so every mutation goes through a clamping setter:
/// `scale` always lies in `[min_scale, max_scale]` and `position` always
/// keeps `visible_fraction` of the scaled box on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    id: LayerId,
    image: ArtworkImage,
    source: Option<String>,
    position: Point,
    scale: f32,
    rotation: f32,
    base_size: Size,
    min_scale: f32,
    max_scale: f32,
    visible_fraction: f32,
}

impl Layer {
    /// Place artwork on a canvas with the given bounds.
    #[must_use]
    pub fn place(
        image: ArtworkImage,
        placement: Placement,
        config: &CanvasConfig,
        canvas_bounds: Rect,
    ) -> Self {
        let base_size = placement
            .base_size
            .filter(|s| s.width > 0.0 && s.height > 0.0 && s.width.is_finite() && s.height.is_finite())
            .unwrap_or_else(|| fit_base_size(image.natural_size(), config));
        let dominant = base_size.dominant();

        let mut layer = Self {
            id: placement.id.unwrap_or_default(),
            image,
            source: placement.source,
            position: canvas_bounds.center(),
            scale: 1.0,
            rotation: 0.0,
            base_size,
            min_scale: config.artwork_min_size / dominant,
            max_scale: config.artwork_max_resize / dominant,
            visible_fraction: config.visible_fraction,
        };
        layer.set_rotation(placement.rotation);
        layer.set_scale(placement.scale, canvas_bounds);
        if let Some(position) = placement.position {
            layer.set_position(position, canvas_bounds);
        }
        layer
    }

    /// Move the layer, clamped so `visible_fraction` of it stays on the
    /// canvas. Non-finite coordinates leave that axis unchanged.
    pub fn set_position(&mut self, position: Point, canvas_bounds: Rect) {
        let x = if position.x.is_finite() {
            position.x
        } else {
            self.position.x
        };
        let y = if position.y.is_finite() {
            position.y
        } else {
            self.position.y
        };
        self.position = self.clamp_position(Point::new(x, y), canvas_bounds);
    }

    /// Change the scale, clamped to `[min_scale, max_scale]`. The position
    /// is re-clamped since the allowed region depends on the scaled size.
    pub fn set_scale(&mut self, scale: f32, canvas_bounds: Rect) {
        let requested = if scale.is_finite() { scale } else { self.scale };
        self.scale = requested.max(self.min_scale).min(self.max_scale);
        self.position = self.clamp_position(self.position, canvas_bounds);
    }

    /// Change the rotation in radians. Stored unbounded.
    pub fn set_rotation(&mut self, rotation: f32) {
        if rotation.is_finite() {
            self.rotation = rotation;
        }
    }

    fn clamp_position(&self, position: Point, bounds: Rect) -> Point {
        let size = self.displayed_size();
        let slack = 1.0 - self.visible_fraction;
        let reach_x = size.width / 2.0 * slack;
        let reach_y = size.height / 2.0 * slack;
        Point::new(
            position
                .x
                .max(bounds.min_x() - reach_x)
                .min(bounds.max_x() + reach_x),
            position
                .y
                .max(bounds.min_y() - reach_y)
                .min(bounds.max_y() + reach_y),
        )
    }

    /// Identifier.
    #[must_use]
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Artwork pixels.
    #[must_use]
    pub fn image(&self) -> &ArtworkImage {
        &self.image
    }

    /// Where the artwork came from, if known.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Transform origin in canvas space.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Uniform scale.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Rotation in radians.
    #[must_use]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Unscaled size.
    #[must_use]
    pub fn base_size(&self) -> Size {
        self.base_size
    }

    /// Allowed scale range.
    #[must_use]
    pub fn scale_range(&self) -> (f32, f32) {
        (self.min_scale, self.max_scale)
    }

    /// Size as currently displayed (`base_size * scale`).
    #[must_use]
    pub fn displayed_size(&self) -> Size {
        self.base_size.scaled(self.scale)
    }

    /// The layer's footprint as an oriented rectangle.
    #[must_use]
    pub fn oriented_rect(&self) -> OrientedRect {
        OrientedRect {
            center: self.position,
            size: self.base_size,
            scale: self.scale,
            rotation: self.rotation,
        }
    }

    /// Whether a canvas-space point hits the layer, rotation included.
    #[must_use]
    pub fn contains_point(&self, point: Point) -> bool {
        point_in_oriented_rect(point, &self.oriented_rect())
    }

    /// Axis-aligned bounds of the rotated, scaled layer.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        axis_aligned_bounds(&self.oriented_rect())
    }
}
