//! Session Integration Tests
//!
//! Drives full CLI sessions against files on disk:
//! - Artwork read from a path relative to the design file
//! - Pinch and rotate scripts reaching the saved design
//! - Canvas config limits applied to placed artwork

use std::path::Path;

use mockup_cli::{run, CliConfig};
use mockup_core::{
    CanvasConfig, DesignDocument, GestureEvent, GesturePhase, LayerId, PrintView, Rect, Scene,
};
use mockup_renderer::{ExportFormat, ExportPreset, SceneExporter};

const EPS: f32 = 1e-3;

/// Write a blank `width`x`height` PNG.
fn write_png(path: &Path, width: f32, height: f32) {
    let scene =
        Scene::new(Rect::new(0.0, 0.0, width, height), CanvasConfig::default()).expect("scene");
    let bytes = SceneExporter::new(ExportPreset::Low.into())
        .export(&scene.snapshot(), ExportFormat::Png)
        .expect("png");
    std::fs::write(path, bytes).expect("write png");
}

fn write_json(path: &Path, value: &serde_json::Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).expect("json")).expect("write json");
}

// ============================================================================
// Design files
// ============================================================================

#[tokio::test]
async fn test_design_document_artwork_resolves_next_to_design() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_png(&dir.path().join("logo.png"), 200.0, 100.0);

    let id = LayerId::new();
    let design = dir.path().join("design.json");
    write_json(
        &design,
        &serde_json::json!({
            "canvas_objects": [{
                "id": id.to_string(),
                "type": "image",
                "x": 250.0,
                "y": 300.0,
                "width": 300.0,
                "height": 150.0,
                "rotation": 0.5,
                "scale_x": 1.5,
                "scale_y": 1.5,
                "image_url": "logo.png",
                "base_width": 200.0,
                "base_height": 100.0
            }],
            "background_color": "#1a1a1a",
            "selected_view": "back"
        }),
    );

    let saved = dir.path().join("saved.json");
    let mut config = CliConfig::new(dir.path().join("mockup.png"));
    config.design = Some(design);
    config.save_design = Some(saved.clone());
    config.preset = ExportPreset::Low;

    let summary = run(&config).await.expect("run");
    assert!(summary.failures.is_empty());
    assert_eq!(summary.layers, 1);

    let document =
        DesignDocument::from_json(&std::fs::read_to_string(saved).expect("read")).expect("parse");
    assert_eq!(document.background_color.as_deref(), Some("#1a1a1a"));
    assert_eq!(document.selected_view, Some(PrintView::Back));
    let record = &document.canvas_objects[0];
    assert_eq!(record.id, id.to_string());
    assert_eq!(record.image_url.as_deref(), Some("logo.png"));
    assert!((record.x - 250.0).abs() < EPS);
    assert!((record.rotation - 0.5).abs() < EPS);
    assert!((record.width - 300.0).abs() < EPS);
}

#[tokio::test]
async fn test_malformed_design_fails_before_export() {
    let dir = tempfile::tempdir().expect("tempdir");
    let design = dir.path().join("design.json");
    std::fs::write(&design, "{ not json").expect("write");

    let mut config = CliConfig::new(dir.path().join("mockup.png"));
    config.design = Some(design);

    assert!(run(&config).await.is_err());
    assert!(!config.output.exists());
}

// ============================================================================
// Gesture scripts
// ============================================================================

#[tokio::test]
async fn test_pinch_and_rotate_script() {
    let dir = tempfile::tempdir().expect("tempdir");
    let art = dir.path().join("art.png");
    write_png(&art, 100.0, 100.0);

    let script = vec![
        GestureEvent::tap(300.0, 350.0),
        GestureEvent::pinch(GesturePhase::Begin, 1.0),
        GestureEvent::rotate(GesturePhase::Begin, 0.0),
        GestureEvent::pinch(GesturePhase::Change, 2.0),
        GestureEvent::rotate(GesturePhase::Change, std::f32::consts::FRAC_PI_2),
        GestureEvent::pinch(GesturePhase::End, 2.0),
        GestureEvent::rotate(GesturePhase::End, std::f32::consts::FRAC_PI_2),
        // Nothing under this point: deselects.
        GestureEvent::tap(5.0, 5.0),
        GestureEvent::pan(GesturePhase::Begin, 0.0, 0.0),
        GestureEvent::pan(GesturePhase::Change, 100.0, 0.0),
        GestureEvent::pan(GesturePhase::End, 0.0, 0.0),
    ];
    let gestures = dir.path().join("gestures.json");
    write_json(&gestures, &serde_json::to_value(&script).expect("script"));

    let saved = dir.path().join("saved.json");
    let mut config = CliConfig::new(dir.path().join("mockup.jpg"));
    config.artwork.push(art.to_string_lossy().into_owned());
    config.gestures = Some(gestures);
    config.save_design = Some(saved.clone());
    config.preset = ExportPreset::Low;

    let summary = run(&config).await.expect("run");
    assert_eq!(summary.gestures, script.len());
    assert_eq!(summary.updated_layers, 2);

    let document =
        DesignDocument::from_json(&std::fs::read_to_string(saved).expect("read")).expect("parse");
    let record = &document.canvas_objects[0];
    assert!((record.scale_x - 2.0).abs() < EPS);
    assert!((record.width - 200.0).abs() < EPS);
    assert!((record.rotation - std::f32::consts::FRAC_PI_2).abs() < EPS);
    // The pan after deselecting had no target.
    assert!((record.x - 300.0).abs() < EPS);
}

// ============================================================================
// Canvas configuration
// ============================================================================

#[tokio::test]
async fn test_config_file_limits_artwork_scale() {
    let dir = tempfile::tempdir().expect("tempdir");
    let art = dir.path().join("art.png");
    write_png(&art, 100.0, 100.0);

    let canvas_config = dir.path().join("canvas.json");
    write_json(&canvas_config, &serde_json::json!({ "artwork_max_resize": 150.0 }));

    let script = vec![
        GestureEvent::pinch(GesturePhase::Begin, 1.0),
        GestureEvent::pinch(GesturePhase::Change, 4.0),
        GestureEvent::pinch(GesturePhase::End, 4.0),
    ];
    let gestures = dir.path().join("gestures.json");
    write_json(&gestures, &serde_json::to_value(&script).expect("script"));

    let saved = dir.path().join("saved.json");
    let mut config = CliConfig::new(dir.path().join("mockup.png"));
    config.config = Some(canvas_config);
    config.artwork.push(art.to_string_lossy().into_owned());
    config.gestures = Some(gestures);
    config.save_design = Some(saved.clone());
    config.pixel_ratio = Some(0.5);

    let summary = run(&config).await.expect("run");
    assert_eq!(summary.output_size, (300, 350));

    let document =
        DesignDocument::from_json(&std::fs::read_to_string(saved).expect("read")).expect("parse");
    assert!((document.canvas_objects[0].width - 150.0).abs() < EPS);
}

#[tokio::test]
async fn test_invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let canvas_config = dir.path().join("canvas.json");
    write_json(
        &canvas_config,
        &serde_json::json!({ "artwork_min_size": 900.0, "artwork_max_resize": 100.0 }),
    );

    let mut config = CliConfig::new(dir.path().join("mockup.png"));
    config.config = Some(canvas_config);
    assert!(run(&config).await.is_err());
}
