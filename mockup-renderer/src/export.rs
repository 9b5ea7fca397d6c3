//! Artwork export.
//!
//! Export always renders without selection decoration, at
//! `pixel_ratio × canvas bounds`, independent of how the canvas is shown
//! on screen. The surface is then encoded as PNG or JPEG.

use std::fmt;
use std::str::FromStr;

use image::ImageEncoder;
use mockup_core::SceneSnapshot;
use serde::{Deserialize, Serialize};

use crate::compositor::{Compositor, RasterSurface};
use crate::error::{RenderError, RenderResult};

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// PNG image with transparency.
    Png,
    /// JPEG image flattened over the export background.
    Jpeg,
}

impl ExportFormat {
    /// Format for a file extension, if supported.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Conventional file extension.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unknown export format '{s}'"))
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Named export quality levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPreset {
    /// 3x resolution, maximum quality.
    High,
    /// 2x resolution, 0.9 quality.
    Medium,
    /// 1x resolution, 0.8 quality.
    Low,
}

impl ExportPreset {
    /// Pixels per canvas unit.
    #[must_use]
    pub fn pixel_ratio(self) -> f32 {
        match self {
            Self::High => 3.0,
            Self::Medium => 2.0,
            Self::Low => 1.0,
        }
    }

    /// Encoder quality in `[0, 1]`.
    #[must_use]
    pub fn quality(self) -> f32 {
        match self {
            Self::High => 1.0,
            Self::Medium => 0.9,
            Self::Low => 0.8,
        }
    }
}

impl FromStr for ExportPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("unknown export preset '{s}'")),
        }
    }
}

/// Configuration for scene export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Pixels per canvas unit (default: 2.0).
    pub pixel_ratio: f32,
    /// Encoder quality in `[0, 1]` (default: 0.9). Only JPEG uses it.
    pub quality: f32,
    /// Colour JPEG output is flattened onto (RGB; JPEG has no alpha).
    pub background: [u8; 3],
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportPreset::Medium.into()
    }
}

impl From<ExportPreset> for ExportConfig {
    fn from(preset: ExportPreset) -> Self {
        Self {
            pixel_ratio: preset.pixel_ratio(),
            quality: preset.quality(),
            background: [255, 255, 255],
        }
    }
}

impl ExportConfig {
    /// JPEG quality on the encoder's 1-100 scale.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn jpeg_quality(&self) -> u8 {
        let quality = if self.quality.is_finite() {
            self.quality
        } else {
            1.0
        };
        (quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Exports scene snapshots as finished artwork.
#[derive(Debug, Clone, Default)]
pub struct SceneExporter {
    config: ExportConfig,
    compositor: Compositor,
}

impl SceneExporter {
    /// Create a new exporter with the given configuration.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            compositor: Compositor::default(),
        }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Use a specific compositor (e.g. a non-transparent clear colour).
    #[must_use]
    pub fn with_compositor(mut self, compositor: Compositor) -> Self {
        self.compositor = compositor;
        self
    }

    /// The export configuration.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Rasterize the scene for export. Selection is never drawn.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid pixel ratio or if the surface cannot
    /// be allocated.
    pub fn export_image(
        &self,
        snapshot: &SceneSnapshot,
        pixel_ratio: f32,
    ) -> RenderResult<RasterSurface> {
        self.compositor.render_at(snapshot, pixel_ratio, false)
    }

    /// Rasterize at the configured pixel ratio and encode.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn export(&self, snapshot: &SceneSnapshot, format: ExportFormat) -> RenderResult<Vec<u8>> {
        let surface = self.export_image(snapshot, self.config.pixel_ratio)?;
        self.encode(&surface, format)
    }

    /// Encode an already rendered surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails.
    pub fn encode(&self, surface: &RasterSurface, format: ExportFormat) -> RenderResult<Vec<u8>> {
        let bytes = match format {
            ExportFormat::Png => surface.encode_png()?,
            ExportFormat::Jpeg => self.encode_jpeg(surface)?,
        };
        tracing::info!(
            width = surface.width(),
            height = surface.height(),
            %format,
            bytes = bytes.len(),
            "Artwork exported"
        );
        Ok(bytes)
    }

    /// Flatten onto the background and encode as JPEG.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn encode_jpeg(&self, surface: &RasterSurface) -> RenderResult<Vec<u8>> {
        let (width, height) = (surface.width(), surface.height());
        let bg = &self.config.background;
        let mut rgb_data = Vec::with_capacity(width as usize * height as usize * 3);
        for pixel in surface.to_rgba().chunks_exact(4) {
            let alpha = f32::from(pixel[3]) / 255.0;
            let inv = 1.0 - alpha;
            for (channel, backdrop) in pixel[..3].iter().zip(bg) {
                let value = f32::from(*channel).mul_add(alpha, f32::from(*backdrop) * inv);
                rgb_data.push(value.round().clamp(0.0, 255.0) as u8);
            }
        }

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.config.jpeg_quality());
        encoder
            .write_image(&rgb_data, width, height, image::ExtendedColorType::Rgb8)
            .map_err(|e| RenderError::Export(format!("JPEG encoding failed: {e}")))?;

        Ok(buf.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockup_core::{ArtworkImage, CanvasConfig, Placement, Rect, Scene};

    fn scene() -> Scene {
        let mut scene =
            Scene::new(Rect::new(0.0, 0.0, 60.0, 70.0), CanvasConfig::default()).expect("scene");
        let id = scene.place_artwork(
            ArtworkImage::solid(20, 20, [0, 200, 0, 255]),
            Placement::default(),
        );
        scene.select(Some(id)).expect("select");
        scene
    }

    #[test]
    fn test_presets() {
        assert!((ExportPreset::High.pixel_ratio() - 3.0).abs() < f32::EPSILON);
        assert!((ExportPreset::Low.quality() - 0.8).abs() < f32::EPSILON);
        let config = ExportConfig::from(ExportPreset::High);
        assert_eq!(config.jpeg_quality(), 100);
        assert_eq!(ExportConfig::default().jpeg_quality(), 90);
        assert_eq!("Medium".parse::<ExportPreset>(), Ok(ExportPreset::Medium));
        assert!("ultra".parse::<ExportPreset>().is_err());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("PNG".parse::<ExportFormat>(), Ok(ExportFormat::Png));
        assert_eq!(ExportFormat::from_extension("jpeg"), Some(ExportFormat::Jpeg));
        assert_eq!(ExportFormat::from_extension("svg"), None);
        assert_eq!(ExportFormat::Jpeg.to_string(), "jpg");
    }

    #[test]
    fn test_png_export_produces_valid_bytes() {
        let exporter = SceneExporter::with_defaults();
        let png = exporter
            .export(&scene().snapshot(), ExportFormat::Png)
            .expect("png export");

        // PNG magic bytes: \x89PNG
        assert!(png.len() > 8);
        assert_eq!(&png[0..4], &[137, 80, 78, 71]);
    }

    #[test]
    fn test_jpeg_export_produces_valid_bytes() {
        let exporter = SceneExporter::new(ExportPreset::Low.into());
        let jpeg = exporter
            .export(&scene().snapshot(), ExportFormat::Jpeg)
            .expect("jpeg export");

        // JPEG magic bytes: FFD8
        assert!(jpeg.len() > 2);
        assert_eq!(jpeg[0], 0xFF);
        assert_eq!(jpeg[1], 0xD8);

        let decoded = image::load_from_memory(&jpeg).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (60, 70));
    }

    #[test]
    fn test_export_image_never_draws_selection() {
        let snapshot = scene().snapshot();
        let exporter = SceneExporter::with_defaults();
        let exported = exporter.export_image(&snapshot, 1.0).expect("export");
        let plain = Compositor::default()
            .render(&snapshot, false)
            .expect("render");
        assert_eq!(exported.to_rgba(), plain.to_rgba());
    }
}
