//! # Mockup Canvas CLI
//!
//! Headless host for the mockup canvas. It restores a saved design, places
//! new artwork, replays a recorded gesture sequence and exports the result.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p mockup-cli -- --artwork logo.png --output mockup.png
//! ```
//!
//! ## Restoring and saving a design:
//!
//! ```bash
//! cargo run -p mockup-cli -- --design design.json --gestures drag.json \
//!     --output mockup.jpg --preset high --save-design design.json
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `CliConfig` - Resolved run configuration
//! - `SourceImageLoader` - Fetches artwork from files, URLs and data URIs
//! - `run` - Drives a `CanvasState` and exports through `SceneExporter`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod app;
mod loader;

pub use app::{run, RunSummary};
pub use loader::{LoadError, SourceImageLoader, SourceKind};

use std::path::PathBuf;

use clap::Parser;
use mockup_renderer::{ExportFormat, ExportPreset};

/// Command-line arguments for mockup-cli.
#[derive(Debug, Clone, Parser)]
#[command(name = "mockup-cli")]
#[command(about = "Place artwork on a garment mockup and export it")]
#[command(version)]
pub struct CliArgs {
    /// Saved design to restore (a design document or a bare layer list)
    #[arg(long, env = "MOCKUP_DESIGN")]
    pub design: Option<PathBuf>,

    /// Artwork to place on top (path, file:// or http(s) URL, data URI)
    #[arg(long = "artwork")]
    pub artwork: Vec<String>,

    /// Mockup background image; the canvas is fitted to its aspect ratio
    #[arg(long)]
    pub background: Option<String>,

    /// Canvas width when no background is given
    #[arg(long, default_value = "600")]
    pub width: f32,

    /// Canvas height when no background is given
    #[arg(long, default_value = "700")]
    pub height: f32,

    /// Canvas configuration JSON (limits and container size)
    #[arg(long, env = "MOCKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON array of gesture events to replay before export
    #[arg(long)]
    pub gestures: Option<PathBuf>,

    /// Export quality preset (high, medium, low)
    #[arg(long, default_value = "medium")]
    pub preset: ExportPreset,

    /// Pixel ratio overriding the preset's
    #[arg(long)]
    pub pixel_ratio: Option<f32>,

    /// Output format (png, jpg); inferred from the output extension if unset
    #[arg(long)]
    pub format: Option<ExportFormat>,

    /// Where to write the exported artwork
    #[arg(long, short)]
    pub output: PathBuf,

    /// Write the resulting design document here
    #[arg(long)]
    pub save_design: Option<PathBuf>,
}

/// Resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Saved design to restore.
    pub design: Option<PathBuf>,
    /// Artwork sources placed after the design, bottom to top.
    pub artwork: Vec<String>,
    /// Mockup background source.
    pub background: Option<String>,
    /// Canvas size used without a background.
    pub canvas_size: (f32, f32),
    /// Canvas configuration file.
    pub config: Option<PathBuf>,
    /// Gesture script.
    pub gestures: Option<PathBuf>,
    /// Export quality preset.
    pub preset: ExportPreset,
    /// Pixel ratio override.
    pub pixel_ratio: Option<f32>,
    /// Export format.
    pub format: ExportFormat,
    /// Export destination.
    pub output: PathBuf,
    /// Design document destination.
    pub save_design: Option<PathBuf>,
}

impl CliConfig {
    /// A configuration that only exports to `output`.
    #[must_use]
    pub fn new(output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        Self {
            design: None,
            artwork: Vec::new(),
            background: None,
            canvas_size: (600.0, 700.0),
            config: None,
            gestures: None,
            preset: ExportPreset::Medium,
            pixel_ratio: None,
            format: format_for_path(&output),
            output,
            save_design: None,
        }
    }
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        let format = args.format.unwrap_or_else(|| format_for_path(&args.output));
        Self {
            design: args.design,
            artwork: args.artwork,
            background: args.background,
            canvas_size: (args.width, args.height),
            config: args.config,
            gestures: args.gestures,
            preset: args.preset,
            pixel_ratio: args.pixel_ratio,
            format,
            output: args.output,
            save_design: args.save_design,
        }
    }
}

/// Format implied by a path's extension, PNG otherwise.
fn format_for_path(path: &std::path::Path) -> ExportFormat {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ExportFormat::from_extension)
        .unwrap_or(ExportFormat::Png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_inferred_from_output() {
        let args = CliArgs::parse_from(["mockup-cli", "--output", "out/mockup.JPG"]);
        let config = CliConfig::from(args);
        assert_eq!(config.format, ExportFormat::Jpeg);
        assert_eq!(config.preset, ExportPreset::Medium);
        assert_eq!(config.canvas_size, (600.0, 700.0));
    }

    #[test]
    fn test_explicit_format_wins() {
        let args = CliArgs::parse_from([
            "mockup-cli",
            "--output",
            "mockup.jpg",
            "--format",
            "png",
            "--preset",
            "high",
            "--artwork",
            "a.png",
            "--artwork",
            "b.png",
        ]);
        let config = CliConfig::from(args);
        assert_eq!(config.format, ExportFormat::Png);
        assert_eq!(config.preset, ExportPreset::High);
        assert_eq!(config.artwork, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_unknown_extension_defaults_to_png() {
        assert_eq!(CliConfig::new("mockup.webp").format, ExportFormat::Png);
        assert_eq!(CliConfig::new("mockup").format, ExportFormat::Png);
    }
}
