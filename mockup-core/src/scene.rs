//! Scene: the background, ordered layers and selection.

use crate::geometry::{Point, Rect, Vector};
use crate::layer::{ArtworkImage, Layer, LayerId, Placement};
use crate::{CanvasConfig, CanvasError, CanvasResult};

/// The full canvas state.
///
/// Layer order is z-order: later layers draw on top and win hit-tests.
/// The scene owns every layer; callers read them by reference or take a
/// [`SceneSnapshot`] for rendering off the interaction thread.
#[derive(Debug, Clone)]
pub struct Scene {
    layers: Vec<Layer>,
    background: Option<ArtworkImage>,
    canvas_bounds: Rect,
    selected: Option<LayerId>,
    config: CanvasConfig,
}

impl Scene {
    /// Create an empty scene.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidConfig`] if the bounds are degenerate or
    /// the configuration does not validate.
    pub fn new(canvas_bounds: Rect, config: CanvasConfig) -> CanvasResult<Self> {
        config.validate()?;
        if !canvas_bounds.is_valid() {
            return Err(CanvasError::InvalidConfig(format!(
                "canvas bounds must have a positive size, got {canvas_bounds:?}"
            )));
        }
        Ok(Self {
            layers: Vec::new(),
            background: None,
            canvas_bounds,
            selected: None,
            config,
        })
    }

    /// Canvas rectangle all layers live in.
    #[must_use]
    pub fn canvas_bounds(&self) -> Rect {
        self.canvas_bounds
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Background mockup, if any.
    #[must_use]
    pub fn background(&self) -> Option<&ArtworkImage> {
        self.background.as_ref()
    }

    /// Replace the background mockup.
    pub fn set_background(&mut self, background: Option<ArtworkImage>) {
        self.background = background;
    }

    /// Resize the canvas. Every layer is re-clamped against the new bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidConfig`] for degenerate bounds.
    pub fn set_canvas_bounds(&mut self, bounds: Rect) -> CanvasResult<()> {
        if !bounds.is_valid() {
            return Err(CanvasError::InvalidConfig(format!(
                "canvas bounds must have a positive size, got {bounds:?}"
            )));
        }
        self.canvas_bounds = bounds;
        for layer in &mut self.layers {
            let position = layer.position();
            layer.set_position(position, bounds);
        }
        Ok(())
    }

    /// Place new artwork on top of the stack.
    pub fn place_artwork(&mut self, image: ArtworkImage, placement: Placement) -> LayerId {
        let layer = Layer::place(image, placement, &self.config, self.canvas_bounds);
        self.add_layer(layer)
    }

    /// Add a layer on top of the stack.
    ///
    /// A layer whose id is already present replaces the existing one in
    /// place, keeping its z-order.
    pub fn add_layer(&mut self, mut layer: Layer) -> LayerId {
        let id = layer.id();
        let scale = layer.scale();
        layer.set_scale(scale, self.canvas_bounds);

        if let Some(index) = self.index_of(id) {
            self.layers[index] = layer;
        } else {
            self.layers.push(layer);
        }
        id
    }

    /// Remove a layer. Clears the selection if it pointed at it.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is not found.
    pub fn remove_layer(&mut self, id: LayerId) -> CanvasResult<Layer> {
        let index = self
            .index_of(id)
            .ok_or_else(|| CanvasError::LayerNotFound(id.to_string()))?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Ok(self.layers.remove(index))
    }

    /// Get a layer by ID.
    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    /// All layers, bottom to top.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Stack index of a layer.
    #[must_use]
    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Whether the scene has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Find the topmost layer under a canvas-space point.
    #[must_use]
    pub fn layer_at(&self, point: Point) -> Option<LayerId> {
        self.layers
            .iter()
            .rev()
            .find(|l| l.contains_point(point))
            .map(Layer::id)
    }

    /// Select a layer, or clear the selection with `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is not found; the selection is
    /// unchanged in that case.
    pub fn select(&mut self, id: Option<LayerId>) -> CanvasResult<()> {
        if let Some(id) = id {
            if self.index_of(id).is_none() {
                return Err(CanvasError::LayerNotFound(id.to_string()));
            }
        }
        self.selected = id;
        Ok(())
    }

    /// Currently selected layer ID.
    #[must_use]
    pub fn selected_id(&self) -> Option<LayerId> {
        self.selected
    }

    /// Currently selected layer.
    #[must_use]
    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selected.and_then(|id| self.layer(id))
    }

    fn layer_mut(&mut self, id: LayerId) -> CanvasResult<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| l.id() == id)
            .ok_or_else(|| CanvasError::LayerNotFound(id.to_string()))
    }

    /// Move a layer to `position` (clamped).
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is not found.
    pub fn set_layer_position(&mut self, id: LayerId, position: Point) -> CanvasResult<&Layer> {
        let bounds = self.canvas_bounds;
        let layer = self.layer_mut(id)?;
        layer.set_position(position, bounds);
        Ok(&*layer)
    }

    /// Move a layer by `delta` (clamped).
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is not found.
    pub fn translate_layer(&mut self, id: LayerId, delta: Vector) -> CanvasResult<&Layer> {
        let bounds = self.canvas_bounds;
        let layer = self.layer_mut(id)?;
        let target = layer.position() + delta;
        layer.set_position(target, bounds);
        Ok(&*layer)
    }

    /// Scale a layer (clamped).
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is not found.
    pub fn set_layer_scale(&mut self, id: LayerId, scale: f32) -> CanvasResult<&Layer> {
        let bounds = self.canvas_bounds;
        let layer = self.layer_mut(id)?;
        layer.set_scale(scale, bounds);
        Ok(&*layer)
    }

    /// Rotate a layer to `rotation` radians.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is not found.
    pub fn set_layer_rotation(&mut self, id: LayerId, rotation: f32) -> CanvasResult<&Layer> {
        let layer = self.layer_mut(id)?;
        layer.set_rotation(rotation);
        Ok(&*layer)
    }

    /// Move a layer to a stack index (clamped to the top).
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is not found.
    pub fn move_layer(&mut self, id: LayerId, index: usize) -> CanvasResult<()> {
        let from = self
            .index_of(id)
            .ok_or_else(|| CanvasError::LayerNotFound(id.to_string()))?;
        let layer = self.layers.remove(from);
        let to = index.min(self.layers.len());
        self.layers.insert(to, layer);
        Ok(())
    }

    /// Raise a layer to the top of the stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is not found.
    pub fn bring_to_front(&mut self, id: LayerId) -> CanvasResult<()> {
        self.move_layer(id, usize::MAX)
    }

    /// Lower a layer to the bottom of the stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is not found.
    pub fn send_to_back(&mut self, id: LayerId) -> CanvasResult<()> {
        self.move_layer(id, 0)
    }

    /// Copy the renderable state by value.
    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            canvas_bounds: self.canvas_bounds,
            background: self.background.clone(),
            layers: self.layers.clone(),
            selected: self.selected,
        }
    }
}

/// An immutable copy of a scene for rendering and export.
///
/// Pixel buffers are shared, so taking a snapshot is cheap.
#[derive(Debug, Clone)]
pub struct SceneSnapshot {
    canvas_bounds: Rect,
    background: Option<ArtworkImage>,
    layers: Vec<Layer>,
    selected: Option<LayerId>,
}

impl SceneSnapshot {
    /// Canvas rectangle.
    #[must_use]
    pub fn canvas_bounds(&self) -> Rect {
        self.canvas_bounds
    }

    /// Background mockup, if any.
    #[must_use]
    pub fn background(&self) -> Option<&ArtworkImage> {
        self.background.as_ref()
    }

    /// Layers, bottom to top.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The selected layer at snapshot time.
    #[must_use]
    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selected
            .and_then(|id| self.layers.iter().find(|l| l.id() == id))
    }
}
