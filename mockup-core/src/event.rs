//! Input gestures and output notifications for canvas interaction.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Vector};
use crate::layer::{Layer, LayerId};

/// Lifecycle phase of a continuous gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GesturePhase {
    /// Fingers down, gesture recognised.
    Begin,
    /// Gesture moved.
    Change,
    /// Fingers lifted.
    End,
}

/// The continuous gesture kinds, tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    /// One-finger drag.
    Pan,
    /// Two-finger scale.
    Pinch,
    /// Two-finger rotation.
    Rotate,
}

/// A recognised gesture, already converted to canvas space by the caller.
///
/// Serialized as `{"kind": "pan", "phase": "change", "translation": {...}}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GestureEvent {
    /// Single tap at a point.
    Tap {
        /// Tap location.
        point: Point,
    },

    /// Drag. `translation` is the movement since the previous pan event.
    Pan {
        /// Gesture phase.
        phase: GesturePhase,
        /// Incremental translation.
        #[serde(default)]
        translation: Vector,
    },

    /// Pinch. `scale` is the cumulative ratio since the gesture began.
    Pinch {
        /// Gesture phase.
        phase: GesturePhase,
        /// Cumulative scale ratio (1.0 = unchanged).
        #[serde(default = "unit_scale")]
        scale: f32,
    },

    /// Rotation. `rotation` is the cumulative angle since the gesture began.
    Rotate {
        /// Gesture phase.
        phase: GesturePhase,
        /// Cumulative rotation in radians.
        #[serde(default)]
        rotation: f32,
    },
}

fn unit_scale() -> f32 {
    1.0
}

impl GestureEvent {
    /// Tap at `(x, y)`.
    #[must_use]
    pub fn tap(x: f32, y: f32) -> Self {
        Self::Tap {
            point: Point::new(x, y),
        }
    }

    /// Pan event with an incremental translation.
    #[must_use]
    pub fn pan(phase: GesturePhase, dx: f32, dy: f32) -> Self {
        Self::Pan {
            phase,
            translation: Vector::new(dx, dy),
        }
    }

    /// Pinch event with a cumulative ratio.
    #[must_use]
    pub fn pinch(phase: GesturePhase, scale: f32) -> Self {
        Self::Pinch { phase, scale }
    }

    /// Rotate event with a cumulative angle in radians.
    #[must_use]
    pub fn rotate(phase: GesturePhase, rotation: f32) -> Self {
        Self::Rotate { phase, rotation }
    }

    /// Continuous kind and phase, or `None` for a tap.
    #[must_use]
    pub fn continuous(&self) -> Option<(GestureKind, GesturePhase)> {
        match *self {
            Self::Tap { .. } => None,
            Self::Pan { phase, .. } => Some((GestureKind::Pan, phase)),
            Self::Pinch { phase, .. } => Some((GestureKind::Pinch, phase)),
            Self::Rotate { phase, .. } => Some((GestureKind::Rotate, phase)),
        }
    }
}

/// Something the host app should hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasNotification {
    /// A gesture ended; carries the layer's final state.
    LayerUpdated(Layer),
    /// A tap changed (or cleared) the selection.
    SelectionChanged(Option<LayerId>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_json_shape() {
        let event = GestureEvent::pan(GesturePhase::Change, 50.0, 0.0);
        let json = serde_json::to_value(event).expect("serialize");
        assert_eq!(json["kind"], "pan");
        assert_eq!(json["phase"], "change");
        assert_eq!(json["translation"]["dx"], 50.0);
    }

    #[test]
    fn test_gesture_defaults_on_begin() {
        let pinch: GestureEvent =
            serde_json::from_str(r#"{"kind":"pinch","phase":"begin"}"#).expect("parse");
        assert_eq!(pinch, GestureEvent::pinch(GesturePhase::Begin, 1.0));

        let tap: GestureEvent =
            serde_json::from_str(r#"{"kind":"tap","point":{"x":3,"y":4}}"#).expect("parse");
        assert_eq!(tap, GestureEvent::tap(3.0, 4.0));
    }

    #[test]
    fn test_continuous_kind() {
        assert_eq!(GestureEvent::tap(0.0, 0.0).continuous(), None);
        assert_eq!(
            GestureEvent::rotate(GesturePhase::End, 0.0).continuous(),
            Some((GestureKind::Rotate, GesturePhase::End))
        );
    }
}
