//! Persisted design records and conversion to and from layers.
//!
//! A saved design is a flat list of [`LayerRecord`]s. Width and height on
//! the wire are the *displayed* size. Records written by this crate also
//! carry the unscaled `base_width`/`base_height` and the scale, so a layer
//! reloads exactly even if its artwork is re-fetched at a different
//! resolution. Older records without the base size fall back to fitting the
//! reloaded image and deriving the scale from the displayed width.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};
use crate::layer::{fit_base_size, ArtworkImage, Layer, LayerId, Placement};
use crate::scene::Scene;
use crate::{CanvasConfig, CanvasError, CanvasResult};

/// Kind of content a record describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Placed artwork.
    Image,
    /// Text element (kept on the wire, not rendered by this engine).
    Text,
    /// Anything else a newer client wrote.
    #[serde(other)]
    Unknown,
}

impl RecordKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// One persisted canvas object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    /// Layer identifier (UUID string).
    pub id: String,
    /// Content kind.
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// Position x in canvas space, origin top-left.
    pub x: f32,
    /// Position y in canvas space, origin top-left.
    pub y: f32,
    /// Displayed width (`base_width * scale`).
    pub width: f32,
    /// Displayed height (`base_height * scale`).
    pub height: f32,
    /// Rotation in radians.
    #[serde(default)]
    pub rotation: f32,
    /// Horizontal scale.
    #[serde(default = "unit")]
    pub scale_x: f32,
    /// Vertical scale (equal to `scale_x` for image layers).
    #[serde(default = "unit")]
    pub scale_y: f32,
    /// Artwork location.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Unscaled width, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_width: Option<f32>,
    /// Unscaled height, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_height: Option<f32>,
    /// Text content for text records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Font family for text records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Font size for text records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// Fill colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    /// Stroke colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
}

/// Relative difference below which a stored scale matches the displayed
/// width.
const SCALE_TOLERANCE: f32 = 1e-3;

fn unit() -> f32 {
    1.0
}

impl LayerRecord {
    /// Record for an image layer.
    #[must_use]
    pub fn from_layer(layer: &Layer) -> Self {
        let position = layer.position();
        let displayed = layer.displayed_size();
        let base = layer.base_size();
        Self {
            id: layer.id().to_string(),
            kind: RecordKind::Image,
            x: position.x,
            y: position.y,
            width: displayed.width,
            height: displayed.height,
            rotation: layer.rotation(),
            scale_x: layer.scale(),
            scale_y: layer.scale(),
            image_url: layer.source().map(str::to_string),
            base_width: Some(base.width),
            base_height: Some(base.height),
            text: None,
            font_family: None,
            font_size: None,
            fill: None,
            stroke: None,
        }
    }

    /// Parsed layer ID.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidRecord`] if the ID is not a UUID.
    pub fn layer_id(&self) -> CanvasResult<LayerId> {
        self.id.parse().map_err(|e| CanvasError::InvalidRecord {
            id: self.id.clone(),
            reason: format!("id is not a UUID: {e}"),
        })
    }

    /// The artwork location of an image record.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::UnsupportedRecord`] for non-image records and
    /// [`CanvasError::InvalidRecord`] when no URL is present.
    pub fn image_source(&self) -> CanvasResult<&str> {
        if self.kind != RecordKind::Image {
            return Err(CanvasError::UnsupportedRecord {
                id: self.id.clone(),
                kind: self.kind.as_str().to_string(),
            });
        }
        self.image_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CanvasError::InvalidRecord {
                id: self.id.clone(),
                reason: "image record has no image_url".to_string(),
            })
    }

    fn explicit_base_size(&self) -> Option<Size> {
        match (self.base_width, self.base_height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite() => {
                Some(Size::new(w, h))
            }
            _ => None,
        }
    }
}

/// A saved design: the layer list plus view metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    /// Layers, bottom to top.
    #[serde(default)]
    pub canvas_objects: Vec<LayerRecord>,
    /// Garment colour behind the mockup.
    #[serde(default)]
    pub background_color: Option<String>,
    /// Which side of the garment the design is on.
    #[serde(default)]
    pub selected_view: Option<PrintView>,
}

/// Garment side a design is printed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintView {
    /// Front of the garment.
    Front,
    /// Back of the garment.
    Back,
    /// Neck label area.
    Neck,
}

impl DesignDocument {
    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        serde_json::to_string_pretty(self).map_err(CanvasError::Serialization)
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a design.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        serde_json::from_str(json).map_err(CanvasError::Serialization)
    }
}

/// Map every layer to its persisted record, bottom to top.
#[must_use]
pub fn to_persisted(scene: &Scene) -> Vec<LayerRecord> {
    scene.layers().iter().map(LayerRecord::from_layer).collect()
}

/// Fetches and decodes artwork for a source reference.
///
/// Implementations own networking and decoding; the engine only awaits the
/// result.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Load and decode the artwork at `source`.
    async fn load(&self, source: &str) -> CanvasResult<ArtworkImage>;
}

/// Rebuild a layer from its record and freshly loaded artwork.
///
/// # Errors
///
/// Returns an error if the record's ID is invalid.
pub fn layer_from_record(
    record: &LayerRecord,
    image: ArtworkImage,
    config: &CanvasConfig,
    canvas_bounds: Rect,
) -> CanvasResult<Layer> {
    let id = record.layer_id()?;
    let explicit = record.explicit_base_size();
    let base = explicit.unwrap_or_else(|| fit_base_size(image.natural_size(), config));

    let derived = (record.width > 0.0 && record.width.is_finite()).then(|| record.width / base.width);
    let stored = (record.scale_x > 0.0 && record.scale_x.is_finite()).then_some(record.scale_x);
    // The displayed width is authoritative; the stored scale only wins
    // when it agrees with it against an explicit base size.
    let scale = match (stored, derived) {
        (Some(stored), Some(derived))
            if explicit.is_some() && (stored - derived).abs() <= derived * SCALE_TOLERANCE =>
        {
            stored
        }
        (_, Some(derived)) => derived,
        (Some(stored), None) => stored,
        (None, None) => 1.0,
    };

    let mut placement = Placement::default()
        .with_id(id)
        .with_position(Point::new(record.x, record.y))
        .with_scale(scale)
        .with_rotation(record.rotation)
        .with_base_size(base);
    placement.source = record.image_url.clone();
    Ok(Layer::place(image, placement, config, canvas_bounds))
}

/// A record that could not be turned into a layer.
#[derive(Debug)]
pub struct LoadFailure {
    /// The record's ID as persisted.
    pub record_id: String,
    /// Why it failed.
    pub error: CanvasError,
}

/// Outcome of [`from_persisted`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Rebuilt layers, in record order.
    pub layers: Vec<Layer>,
    /// Records that were skipped, each with its own error.
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    /// Whether every record loaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Load every record's artwork concurrently and rebuild the layers.
///
/// A failing record is reported and omitted; the rest still load.
pub async fn from_persisted<L>(
    records: &[LayerRecord],
    loader: &L,
    config: &CanvasConfig,
    canvas_bounds: Rect,
) -> LoadReport
where
    L: ImageLoader + ?Sized,
{
    let loads = records.iter().map(|record| async move {
        let source = record.image_source()?;
        record.layer_id()?;
        let image = loader.load(source).await?;
        layer_from_record(record, image, config, canvas_bounds)
    });

    let mut report = LoadReport::default();
    for (record, result) in records.iter().zip(join_all(loads).await) {
        match result {
            Ok(layer) => report.layers.push(layer),
            Err(error) => {
                tracing::warn!("Skipping layer {}: {error}", record.id);
                report.failures.push(LoadFailure {
                    record_id: record.id.clone(),
                    error,
                });
            }
        }
    }
    tracing::debug!(
        loaded = report.layers.len(),
        failed = report.failures.len(),
        "Design loaded"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Rect {
        Rect::new(0.0, 0.0, 600.0, 700.0)
    }

    fn image_record(id: &str, url: Option<&str>) -> LayerRecord {
        LayerRecord {
            id: id.to_string(),
            kind: RecordKind::Image,
            x: 100.0,
            y: 120.0,
            width: 300.0,
            height: 150.0,
            rotation: 0.5,
            scale_x: 1.5,
            scale_y: 1.5,
            image_url: url.map(str::to_string),
            base_width: None,
            base_height: None,
            text: None,
            font_family: None,
            font_size: None,
            fill: None,
            stroke: None,
        }
    }

    #[test]
    fn test_record_json_field_names() {
        let record = image_record("8b5a6f43-3c1e-4f55-9d3a-2f0e7b9d1c11", Some("https://cdn/a.png"));
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["type"], "image");
        assert_eq!(json["image_url"], "https://cdn/a.png");
        assert_eq!(json["scale_x"], 1.5);
        assert!(json.get("text").is_none());
        assert!(json.get("base_width").is_none());
    }

    #[test]
    fn test_unknown_kind_parses() {
        let json = r#"{"id":"x","type":"sticker","x":0,"y":0,"width":1,"height":1}"#;
        let record: LayerRecord = serde_json::from_str(json).expect("parse");
        assert_eq!(record.kind, RecordKind::Unknown);
        assert!((record.scale_x - 1.0).abs() < f32::EPSILON);
        assert!(matches!(
            record.image_source(),
            Err(CanvasError::UnsupportedRecord { .. })
        ));
    }

    #[test]
    fn test_missing_url_is_invalid() {
        let record = image_record("8b5a6f43-3c1e-4f55-9d3a-2f0e7b9d1c11", None);
        assert!(matches!(
            record.image_source(),
            Err(CanvasError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_legacy_record_derives_scale_from_width() {
        let record = image_record("8b5a6f43-3c1e-4f55-9d3a-2f0e7b9d1c11", Some("a.png"));
        // 400x200 natural fits as-is; displayed 300 wide means scale 0.75.
        let image = ArtworkImage::solid(400, 200, [0, 0, 0, 255]);
        let layer =
            layer_from_record(&record, image, &CanvasConfig::default(), bounds()).expect("layer");
        assert!((layer.scale() - 0.75).abs() < 1e-5);
        assert!((layer.displayed_size().height - 150.0).abs() < 1e-3);
        assert_eq!(layer.position(), Point::new(100.0, 120.0));
    }

    #[test]
    fn test_explicit_base_size_restores_exactly() {
        let mut record = image_record("8b5a6f43-3c1e-4f55-9d3a-2f0e7b9d1c11", Some("a.png"));
        record.base_width = Some(200.0);
        record.base_height = Some(100.0);
        // Re-fetched artwork at a different resolution.
        let image = ArtworkImage::solid(1000, 500, [0, 0, 0, 255]);
        let layer =
            layer_from_record(&record, image, &CanvasConfig::default(), bounds()).expect("layer");
        assert_eq!(layer.base_size(), Size::new(200.0, 100.0));
        assert!((layer.scale() - 1.5).abs() < 1e-6);
        assert!((layer.displayed_size().width - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_base_size_without_scale_uses_displayed_width() {
        let json = r#"{
            "id": "8b5a6f43-3c1e-4f55-9d3a-2f0e7b9d1c11",
            "type": "image",
            "x": 100, "y": 120, "width": 300, "height": 150,
            "image_url": "a.png",
            "base_width": 200, "base_height": 100
        }"#;
        let record: LayerRecord = serde_json::from_str(json).expect("parse");
        let image = ArtworkImage::solid(200, 100, [0, 0, 0, 255]);
        let layer =
            layer_from_record(&record, image, &CanvasConfig::default(), bounds()).expect("layer");
        assert!((layer.scale() - 1.5).abs() < 1e-5);
        assert!((layer.displayed_size().width - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_design_document_round_trip() {
        let doc = DesignDocument {
            canvas_objects: vec![image_record(
                "8b5a6f43-3c1e-4f55-9d3a-2f0e7b9d1c11",
                Some("a.png"),
            )],
            background_color: Some("white".to_string()),
            selected_view: Some(PrintView::Back),
        };
        let json = doc.to_json().expect("json");
        assert!(json.contains("\"selected_view\": \"back\""));
        assert_eq!(DesignDocument::from_json(&json).expect("parse"), doc);
    }
}
