//! # Mockup Canvas Core
//!
//! Interactive design-canvas engine: users place artwork on a garment
//! mockup and move, scale and rotate it with touch gestures.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 mockup-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Geometry        │  Layer Model             │
//! │  - Affine        │  - Clamped transforms    │
//! │  - Oriented hit  │  - Scene / z-order       │
//! │  - Bounds        │  - Selection             │
//! ├─────────────────────────────────────────────┤
//! │  Gestures        │  Sync / State            │
//! │  - Tap select    │  - Persisted records     │
//! │  - Pan/pinch/rot │  - Async artwork loads   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Rendering lives in `mockup-renderer`, which consumes [`SceneSnapshot`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod gesture;
pub mod layer;
pub mod scene;
pub mod state;
pub mod sync;

pub use config::CanvasConfig;
pub use error::{CanvasError, CanvasResult};
pub use event::{CanvasNotification, GestureEvent, GestureKind, GesturePhase};
pub use geometry::{
    axis_aligned_bounds, point_in_oriented_rect, Affine, OrientedRect, Point, Rect, Size, Vector,
};
pub use gesture::{ActiveGestures, GestureInterpreter};
pub use layer::{fit_base_size, ArtworkImage, Layer, LayerId, Placement};
pub use scene::{Scene, SceneSnapshot};
pub use state::{CanvasState, LoadEvent};
pub use sync::{
    from_persisted, layer_from_record, to_persisted, DesignDocument, ImageLoader, LayerRecord,
    LoadFailure, LoadReport, PrintView, RecordKind,
};

/// Canvas core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
