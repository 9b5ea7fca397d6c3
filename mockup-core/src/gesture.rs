//! # Gesture Interpreter
//!
//! Turns tap/pan/pinch/rotate events into scene mutations.
//!
//! ```text
//! Tap            → hit-test topmost-first → select / deselect
//! Pan    change  → position += incremental translation (clamped)
//! Pinch  change  → scale = initial_scale × cumulative ratio (clamped)
//! Rotate change  → rotation = initial_rotation + cumulative angle
//! any    end     → one LayerUpdated notification
//! ```
//!
//! Pan, pinch and rotate are tracked independently. Pinch and rotate
//! usually arrive together from the same two fingers; each keeps its own
//! baseline, captured at its own `Begin`, so neither resets the other.
//! Every gesture is bound to the layer that was selected when it began and
//! is silently dropped if that layer is deselected or removed.

use crate::event::{CanvasNotification, GestureEvent, GestureKind, GesturePhase};
use crate::geometry::{Point, Vector};
use crate::layer::LayerId;
use crate::scene::Scene;

/// Baseline captured when a pinch or rotate begins.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Baseline {
    layer: LayerId,
    initial: f32,
}

/// Which continuous gestures are in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveGestures {
    /// A pan is driving the position.
    pub panning: bool,
    /// A pinch is driving the scale.
    pub scaling: bool,
    /// A rotation is driving the angle.
    pub rotating: bool,
}

impl ActiveGestures {
    /// No gesture is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !(self.panning || self.scaling || self.rotating)
    }
}

/// Per-gesture transient state. Holds no layers, only IDs and baselines.
#[derive(Debug, Default)]
pub struct GestureInterpreter {
    pan: Option<LayerId>,
    pinch: Option<Baseline>,
    rotate: Option<Baseline>,
}

impl GestureInterpreter {
    /// Create an idle interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Which gestures are currently active.
    #[must_use]
    pub fn active_gestures(&self) -> ActiveGestures {
        ActiveGestures {
            panning: self.pan.is_some(),
            scaling: self.pinch.is_some(),
            rotating: self.rotate.is_some(),
        }
    }

    /// Whether a specific gesture kind is active.
    #[must_use]
    pub fn is_active(&self, kind: GestureKind) -> bool {
        match kind {
            GestureKind::Pan => self.pan.is_some(),
            GestureKind::Pinch => self.pinch.is_some(),
            GestureKind::Rotate => self.rotate.is_some(),
        }
    }

    /// Drop every in-flight gesture without notifying.
    pub fn reset(&mut self) {
        self.pan = None;
        self.pinch = None;
        self.rotate = None;
    }

    /// Apply one gesture event to the scene.
    ///
    /// Returns a notification for taps and for the `End` of a gesture that
    /// was applied to a still-selected layer.
    pub fn handle(
        &mut self,
        scene: &mut Scene,
        event: &GestureEvent,
    ) -> Option<CanvasNotification> {
        match *event {
            GestureEvent::Tap { point } => Some(Self::tap(scene, point)),
            GestureEvent::Pan { phase, translation } => self.pan(scene, phase, translation),
            GestureEvent::Pinch { phase, scale } => self.pinch(scene, phase, scale),
            GestureEvent::Rotate { phase, rotation } => self.rotate(scene, phase, rotation),
        }
    }

    fn tap(scene: &mut Scene, point: Point) -> CanvasNotification {
        let hit = scene.layer_at(point);
        if let Err(err) = scene.select(hit) {
            tracing::warn!("Tap hit a layer the scene could not select: {err}");
        }
        tracing::debug!(?point, selected = ?scene.selected_id(), "Tap");
        CanvasNotification::SelectionChanged(scene.selected_id())
    }

    fn pan(
        &mut self,
        scene: &mut Scene,
        phase: GesturePhase,
        translation: Vector,
    ) -> Option<CanvasNotification> {
        match phase {
            GesturePhase::Begin => {
                self.pan = live_selection(scene);
                tracing::debug!(layer = ?self.pan, "Pan began");
                None
            }
            GesturePhase::Change => {
                // Pan keeps no baseline, so a change without a begin adopts
                // the current selection.
                if self.pan.is_none() {
                    self.pan = live_selection(scene);
                }
                let id = self.pan.filter(|id| scene.selected_id() == Some(*id))?;
                match scene.translate_layer(id, translation) {
                    Ok(layer) => tracing::trace!(position = ?layer.position(), "Pan"),
                    Err(_) => self.pan = None,
                }
                None
            }
            GesturePhase::End => {
                let id = self.pan.take()?;
                tracing::debug!(layer = %id, "Pan ended");
                finished(scene, id)
            }
        }
    }

    fn pinch(
        &mut self,
        scene: &mut Scene,
        phase: GesturePhase,
        factor: f32,
    ) -> Option<CanvasNotification> {
        match phase {
            GesturePhase::Begin => {
                self.pinch = live_selection(scene).and_then(|id| {
                    scene.layer(id).map(|layer| Baseline {
                        layer: id,
                        initial: layer.scale(),
                    })
                });
                tracing::debug!(baseline = ?self.pinch, "Pinch began");
                None
            }
            GesturePhase::Change => {
                let baseline = self.pinch.filter(|b| scene.selected_id() == Some(b.layer))?;
                match scene.set_layer_scale(baseline.layer, baseline.initial * factor) {
                    Ok(layer) => tracing::trace!(scale = layer.scale(), "Pinch"),
                    Err(_) => self.pinch = None,
                }
                None
            }
            GesturePhase::End => {
                let baseline = self.pinch.take()?;
                tracing::debug!(layer = %baseline.layer, "Pinch ended");
                finished(scene, baseline.layer)
            }
        }
    }

    fn rotate(
        &mut self,
        scene: &mut Scene,
        phase: GesturePhase,
        delta: f32,
    ) -> Option<CanvasNotification> {
        match phase {
            GesturePhase::Begin => {
                self.rotate = live_selection(scene).and_then(|id| {
                    scene.layer(id).map(|layer| Baseline {
                        layer: id,
                        initial: layer.rotation(),
                    })
                });
                tracing::debug!(baseline = ?self.rotate, "Rotate began");
                None
            }
            GesturePhase::Change => {
                let baseline = self.rotate.filter(|b| scene.selected_id() == Some(b.layer))?;
                match scene.set_layer_rotation(baseline.layer, baseline.initial + delta) {
                    Ok(layer) => tracing::trace!(rotation = layer.rotation(), "Rotate"),
                    Err(_) => self.rotate = None,
                }
                None
            }
            GesturePhase::End => {
                let baseline = self.rotate.take()?;
                tracing::debug!(layer = %baseline.layer, "Rotate ended");
                finished(scene, baseline.layer)
            }
        }
    }
}

/// The selected layer, if it still exists.
fn live_selection(scene: &Scene) -> Option<LayerId> {
    scene.selected_layer().map(crate::Layer::id)
}

/// Final-state notification for a gesture bound to `id`, if that layer is
/// still the selected one.
fn finished(scene: &Scene, id: LayerId) -> Option<CanvasNotification> {
    scene
        .selected_layer()
        .filter(|layer| layer.id() == id)
        .map(|layer| CanvasNotification::LayerUpdated(layer.clone()))
}
