//! One headless canvas session: restore, place, replay, export.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use mockup_core::{
    CanvasConfig, CanvasNotification, CanvasState, DesignDocument, GestureEvent, ImageLoader,
    LayerRecord, LoadEvent, LoadFailure, Placement, Rect, Scene,
};
use mockup_renderer::{ExportConfig, SceneExporter};
use serde::Deserialize;

use crate::loader::SourceImageLoader;
use crate::CliConfig;

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Layers on the canvas at export time.
    pub layers: usize,
    /// Artwork that could not be loaded; the rest of the design still ran.
    pub failures: Vec<LoadFailure>,
    /// Gesture events replayed.
    pub gestures: usize,
    /// Layers a gesture finished on.
    pub updated_layers: usize,
    /// Size of the exported file in bytes.
    pub output_bytes: usize,
    /// Exported surface size in pixels.
    pub output_size: (u32, u32),
}

/// A design file: either a full document or a bare record list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DesignFile {
    Records(Vec<LayerRecord>),
    Document(DesignDocument),
}

impl From<DesignFile> for DesignDocument {
    fn from(file: DesignFile) -> Self {
        match file {
            DesignFile::Records(canvas_objects) => DesignDocument {
                canvas_objects,
                ..DesignDocument::default()
            },
            DesignFile::Document(document) => document,
        }
    }
}

async fn read_design(path: &Path) -> anyhow::Result<DesignDocument> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read design {}", path.display()))?;
    let file: DesignFile = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a design document", path.display()))?;
    Ok(file.into())
}

async fn read_gestures(path: &Path) -> anyhow::Result<Vec<GestureEvent>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read gestures {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a list of gesture events", path.display()))
}

/// Run one session as described by `config`.
///
/// Individual artwork failures are collected in the summary. Anything that
/// prevents producing an export is an error.
///
/// # Errors
///
/// Returns an error if the configuration, design or gesture files are
/// unreadable, the background cannot be loaded, or export fails.
pub async fn run(config: &CliConfig) -> anyhow::Result<RunSummary> {
    let canvas_config = match &config.config {
        Some(path) => CanvasConfig::from_json_file(path)
            .with_context(|| format!("failed to load canvas config {}", path.display()))?,
        None => CanvasConfig::default(),
    };

    let base_dir = config
        .design
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf);
    let loader = SourceImageLoader::new(base_dir)?;

    let background = match &config.background {
        Some(source) => Some(
            loader
                .load_source(source)
                .await
                .with_context(|| format!("failed to load background {source}"))?,
        ),
        None => None,
    };
    let bounds = match &background {
        Some(image) => canvas_config.fit_canvas_bounds(image.natural_size()),
        None => Rect::new(0.0, 0.0, config.canvas_size.0, config.canvas_size.1),
    };
    tracing::info!(
        width = bounds.width,
        height = bounds.height,
        "Canvas ready"
    );

    let mut scene = Scene::new(bounds, canvas_config)?;
    scene.set_background(background);
    let mut state = CanvasState::new(scene);
    let loader: Arc<dyn ImageLoader> = Arc::new(loader);

    let mut summary = RunSummary::default();
    let mut document = match &config.design {
        Some(path) => read_design(path).await?,
        None => DesignDocument::default(),
    };
    summary.failures = state.restore_design(&document.canvas_objects, &loader)?;

    for source in &config.artwork {
        state.request_artwork(Arc::clone(&loader), source.as_str(), Placement::default(), true)?;
    }

    for event in state.wait_for_loads().await {
        if let LoadEvent::Failed { id, error } = event {
            summary.failures.push(LoadFailure {
                record_id: id.to_string(),
                error,
            });
        }
    }

    if let Some(path) = &config.gestures {
        let events = read_gestures(path).await?;
        summary.gestures = events.len();
        for event in &events {
            if let Some(CanvasNotification::LayerUpdated(layer)) = state.process_gesture(event) {
                tracing::debug!(
                    id = %layer.id(),
                    x = layer.position().x,
                    y = layer.position().y,
                    scale = layer.scale(),
                    rotation = layer.rotation(),
                    "Layer updated"
                );
                summary.updated_layers += 1;
            }
        }
    }

    let mut export_config = ExportConfig::from(config.preset);
    if let Some(ratio) = config.pixel_ratio {
        export_config.pixel_ratio = ratio;
    }
    let ratio = export_config.pixel_ratio;
    let format = config.format;
    let snapshot = state.snapshot();
    summary.layers = snapshot.layers().len();

    let (bytes, output_size) = tokio::task::spawn_blocking(move || {
        let exporter = SceneExporter::new(export_config);
        let surface = exporter.export_image(&snapshot, ratio)?;
        let size = (surface.width(), surface.height());
        exporter.encode(&surface, format).map(|bytes| (bytes, size))
    })
    .await
    .context("export task panicked")??;

    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&config.output, &bytes)
        .await
        .with_context(|| format!("failed to write {}", config.output.display()))?;
    summary.output_bytes = bytes.len();
    summary.output_size = output_size;
    tracing::info!(
        path = %config.output.display(),
        bytes = bytes.len(),
        %format,
        "Artwork written"
    );

    if let Some(path) = &config.save_design {
        document.canvas_objects = state.to_persisted();
        tokio::fs::write(path, document.to_json()?)
            .await
            .with_context(|| format!("failed to write design {}", path.display()))?;
        state.mark_saved();
        tracing::info!(path = %path.display(), layers = document.canvas_objects.len(), "Design saved");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockup_core::{GesturePhase, LayerId};
    use mockup_renderer::ExportFormat;

    const RED_PNG_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    fn record(id: LayerId, url: &str, x: f32) -> LayerRecord {
        serde_json::from_value(serde_json::json!({
            "id": id.to_string(),
            "type": "image",
            "x": x,
            "y": 350.0,
            "width": 100.0,
            "height": 100.0,
            "rotation": 0.0,
            "scale_x": 100.0,
            "scale_y": 100.0,
            "image_url": url,
            "base_width": 1.0,
            "base_height": 1.0
        }))
        .expect("record")
    }

    #[tokio::test]
    async fn test_places_artwork_and_exports() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = CliConfig::new(dir.path().join("out/mockup.png"));
        config.artwork.push(RED_PNG_URI.to_string());
        config.preset = mockup_renderer::ExportPreset::Low;

        let summary = run(&config).await.expect("run");
        assert_eq!(summary.layers, 1);
        assert!(summary.failures.is_empty());
        assert_eq!(summary.output_size, (600, 700));

        let bytes = std::fs::read(&config.output).expect("output");
        assert_eq!(bytes.len(), summary.output_bytes);
        assert_eq!(&bytes[0..4], &[137, 80, 78, 71]);
    }

    #[tokio::test]
    async fn test_gestures_move_placed_artwork_into_saved_design() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gestures = dir.path().join("gestures.json");
        let events = vec![
            GestureEvent::tap(300.0, 350.0),
            GestureEvent::pan(GesturePhase::Begin, 0.0, 0.0),
            GestureEvent::pan(GesturePhase::Change, 50.0, 0.0),
            GestureEvent::pan(GesturePhase::End, 0.0, 0.0),
        ];
        std::fs::write(&gestures, serde_json::to_string(&events).expect("json")).expect("write");

        let mut config = CliConfig::new(dir.path().join("mockup.jpg"));
        config.artwork.push(RED_PNG_URI.to_string());
        config.gestures = Some(gestures);
        config.save_design = Some(dir.path().join("design.json"));
        config.pixel_ratio = Some(0.5);

        let summary = run(&config).await.expect("run");
        assert_eq!(summary.gestures, 4);
        assert_eq!(summary.updated_layers, 1);
        assert_eq!(summary.output_size, (300, 350));
        assert_eq!(config.format, ExportFormat::Jpeg);

        let saved = std::fs::read_to_string(dir.path().join("design.json")).expect("design");
        let document = DesignDocument::from_json(&saved).expect("parse");
        assert_eq!(document.canvas_objects.len(), 1);
        let moved = &document.canvas_objects[0];
        assert!((moved.x - 350.0).abs() < 1e-3);
        assert!((moved.y - 350.0).abs() < 1e-3);
        assert_eq!(moved.image_url.as_deref(), Some(RED_PNG_URI));
    }

    #[tokio::test]
    async fn test_restores_design_and_reports_failures() {
        let dir = tempfile::tempdir().expect("tempdir");
        let kept = LayerId::new();
        let records = vec![
            record(kept, RED_PNG_URI, 200.0),
            record(LayerId::new(), "missing.png", 400.0),
        ];
        let design = dir.path().join("design.json");
        std::fs::write(&design, serde_json::to_string(&records).expect("json")).expect("write");

        let mut config = CliConfig::new(dir.path().join("mockup.png"));
        config.design = Some(design.clone());
        config.save_design = Some(design.clone());
        config.preset = mockup_renderer::ExportPreset::Low;

        let summary = run(&config).await.expect("run");
        assert_eq!(summary.layers, 1);
        assert_eq!(summary.failures.len(), 1);

        let saved = DesignDocument::from_json(&std::fs::read_to_string(&design).expect("read"))
            .expect("parse");
        assert_eq!(saved.canvas_objects.len(), 1);
        assert_eq!(saved.canvas_objects[0].id, kept.to_string());
        assert!((saved.canvas_objects[0].x - 200.0).abs() < 1e-3);
        assert!((saved.canvas_objects[0].scale_x - 100.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_background_fits_canvas() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = CliConfig::new(dir.path().join("mockup.png"));
        config.background = Some(RED_PNG_URI.to_string());
        config.preset = mockup_renderer::ExportPreset::Low;

        let summary = run(&config).await.expect("run");
        // A square mockup fills the 600-wide container.
        assert_eq!(summary.output_size, (600, 600));
        assert_eq!(summary.layers, 0);
    }

    #[tokio::test]
    async fn test_unreadable_gestures_fail_the_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = CliConfig::new(dir.path().join("mockup.png"));
        config.gestures = Some(dir.path().join("nope.json"));
        assert!(run(&config).await.is_err());
        assert!(!config.output.exists());
    }
}
