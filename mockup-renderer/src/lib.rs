//! # Mockup Canvas Renderer
//!
//! Software compositor and exporter for mockup canvas scenes, built on
//! tiny-skia.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          SceneSnapshot (mockup-core)        │
//! ├─────────────────────────────────────────────┤
//! │  Compositor                                 │
//! │  background → layers → selection (optional) │
//! ├──────────────────────┬──────────────────────┤
//! │  RasterSurface       │  SceneExporter       │
//! │  (interactive view)  │  PNG / JPEG, no UI   │
//! └──────────────────────┴──────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compositor;
pub mod error;
pub mod export;
pub mod image;

pub use compositor::{Compositor, CompositorConfig, RasterSurface, SelectionStyle};
pub use error::{RenderError, RenderResult};
pub use export::{ExportConfig, ExportFormat, ExportPreset, SceneExporter};
pub use crate::image::{
    is_data_uri, load_image_from_bytes, load_image_from_data_uri, load_image_from_path,
    ImageFormat,
};
