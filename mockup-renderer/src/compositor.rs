//! CPU scene compositor.
//!
//! ```text
//! clear → background (stretched to canvas bounds)
//!       → layers, bottom to top (translate · rotate · scale about center)
//!       → selection outline + corner handles (optional)
//! ```
//!
//! Everything is drawn in canvas space under a root transform of
//! `scale(pixel_ratio) · translate(-bounds.origin)`, so the same scene
//! renders identically at any output resolution.

use mockup_core::{Affine, ArtworkImage, Layer, Rect, SceneSnapshot};
use tiny_skia::{
    BlendMode, Color, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};

use crate::error::{RenderError, RenderResult};

/// Appearance of the selection decoration, in canvas units.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionStyle {
    /// Outline and handle stroke colour (RGBA).
    pub stroke_color: [u8; 4],
    /// Handle fill colour (RGBA).
    pub handle_fill: [u8; 4],
    /// Line width of the outline and handle borders.
    pub stroke_width: f32,
    /// Diameter of the round corner handles.
    pub handle_size: f32,
    /// Gap between the layer bounds and the outline.
    pub padding: f32,
}

impl Default for SelectionStyle {
    fn default() -> Self {
        Self {
            stroke_color: [0, 0, 0, 255],
            handle_fill: [255, 255, 255, 255],
            stroke_width: 2.0,
            handle_size: 12.0,
            padding: 5.0,
        }
    }
}

/// Configuration for the compositor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositorConfig {
    /// Colour the surface is cleared to before drawing (RGBA).
    pub clear_color: [u8; 4],
    /// Selection decoration.
    pub selection: SelectionStyle,
}

/// A rendered frame.
///
/// Pixels are stored premultiplied; accessors hand out straight alpha.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixmap: Pixmap,
}

impl RasterSurface {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// One pixel as straight RGBA, or `None` outside the surface.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixmap.pixel(x, y).map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
    }

    /// All pixels as straight RGBA8, row-major.
    #[must_use]
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = self.pixmap.data().to_vec();
        unpremultiply_rgba_in_place(&mut rgba);
        rgba
    }

    /// Encode as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if PNG encoding fails.
    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))
    }
}

/// Draws scene snapshots into raster surfaces. Never mutates the scene.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    config: CompositorConfig,
}

impl Compositor {
    /// Create a compositor with the given configuration.
    #[must_use]
    pub fn new(config: CompositorConfig) -> Self {
        Self { config }
    }

    /// The compositor configuration.
    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Render at one pixel per canvas unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be allocated.
    pub fn render(
        &self,
        snapshot: &SceneSnapshot,
        selection_visible: bool,
    ) -> RenderResult<RasterSurface> {
        self.render_at(snapshot, 1.0, selection_visible)
    }

    /// Render at `pixel_ratio` pixels per canvas unit.
    ///
    /// The surface is `round(bounds × pixel_ratio)` pixels.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidPixelRatio`] for a non-finite or
    /// non-positive ratio and [`RenderError::Surface`] if the surface
    /// cannot be allocated.
    pub fn render_at(
        &self,
        snapshot: &SceneSnapshot,
        pixel_ratio: f32,
        selection_visible: bool,
    ) -> RenderResult<RasterSurface> {
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
            return Err(RenderError::InvalidPixelRatio(pixel_ratio));
        }
        let bounds = snapshot.canvas_bounds();
        let (width, height) = surface_size(bounds, pixel_ratio);
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            RenderError::Surface(format!("cannot allocate a {width}x{height} surface"))
        })?;

        let [r, g, b, a] = self.config.clear_color;
        pixmap.fill(Color::from_rgba8(r, g, b, a));

        let root = Affine::scale(pixel_ratio) * Affine::translate(-bounds.x, -bounds.y);

        if let Some(background) = snapshot.background() {
            let natural = background.natural_size();
            let stretch = Affine::translate(bounds.x, bounds.y)
                * Affine::scale_xy(bounds.width / natural.width, bounds.height / natural.height);
            draw_artwork(&mut pixmap, background, root * stretch)?;
        }

        for layer in snapshot.layers() {
            draw_artwork(&mut pixmap, layer.image(), root * layer_transform(layer))?;
        }

        if selection_visible {
            if let Some(layer) = snapshot.selected_layer() {
                self.draw_selection(&mut pixmap, layer.bounds(), root);
            }
        }

        tracing::trace!(
            width,
            height,
            layers = snapshot.layers().len(),
            selection_visible,
            "Frame composited"
        );
        Ok(RasterSurface { pixmap })
    }

    fn draw_selection(&self, pixmap: &mut Pixmap, bounds: Rect, root: Affine) {
        let style = &self.config.selection;
        let outline = bounds.inset(-style.padding);
        let transform = to_skia(root);

        let mut stroke_paint = Paint::default();
        let [r, g, b, a] = style.stroke_color;
        stroke_paint.set_color_rgba8(r, g, b, a);
        stroke_paint.anti_alias = true;

        let mut fill_paint = Paint::default();
        let [r, g, b, a] = style.handle_fill;
        fill_paint.set_color_rgba8(r, g, b, a);
        fill_paint.anti_alias = true;

        let stroke = Stroke {
            width: style.stroke_width,
            ..Stroke::default()
        };

        if let Some(path) = tiny_skia::Rect::from_ltrb(
            outline.min_x(),
            outline.min_y(),
            outline.max_x(),
            outline.max_y(),
        )
        .map(PathBuilder::from_rect)
        {
            pixmap.stroke_path(&path, &stroke_paint, &stroke, transform, None);
        }

        let radius = style.handle_size / 2.0;
        let corners = [
            (outline.min_x(), outline.min_y()),
            (outline.max_x(), outline.min_y()),
            (outline.min_x(), outline.max_y()),
            (outline.max_x(), outline.max_y()),
        ];
        for (x, y) in corners {
            if let Some(handle) = PathBuilder::from_circle(x, y, radius) {
                pixmap.fill_path(&handle, &fill_paint, FillRule::Winding, transform, None);
                pixmap.stroke_path(&handle, &stroke_paint, &stroke, transform, None);
            }
        }
    }
}

/// Canvas-space transform mapping image pixels onto a layer's footprint.
fn layer_transform(layer: &Layer) -> Affine {
    let base = layer.base_size();
    let natural = layer.image().natural_size();
    layer.oriented_rect().transform()
        * Affine::translate(-base.width / 2.0, -base.height / 2.0)
        * Affine::scale_xy(base.width / natural.width, base.height / natural.height)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn surface_size(bounds: Rect, pixel_ratio: f32) -> (u32, u32) {
    let width = (bounds.width * pixel_ratio).round().max(1.0) as u32;
    let height = (bounds.height * pixel_ratio).round().max(1.0) as u32;
    (width, height)
}

fn to_skia(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a, b, c, d, e, f)
}

fn draw_artwork(target: &mut Pixmap, image: &ArtworkImage, transform: Affine) -> RenderResult<()> {
    let source = artwork_pixmap(image)?;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        blend_mode: BlendMode::SourceOver,
        ..PixmapPaint::default()
    };
    target.draw_pixmap(0, 0, source.as_ref(), &paint, to_skia(transform), None);
    Ok(())
}

fn artwork_pixmap(image: &ArtworkImage) -> RenderResult<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height()).ok_or_else(|| {
        RenderError::Surface(format!(
            "cannot allocate a {}x{} artwork pixmap",
            image.width(),
            image.height()
        ))
    })?;
    pixmap.data_mut().copy_from_slice(image.pixels());
    premultiply_rgba_in_place(pixmap.data_mut());
    Ok(pixmap)
}

#[allow(clippy::cast_possible_truncation)]
fn premultiply_rgba_in_place(bytes: &mut [u8]) {
    for pixel in bytes.chunks_exact_mut(4) {
        let alpha = u16::from(pixel[3]);
        for channel in &mut pixel[..3] {
            *channel = ((u16::from(*channel) * alpha + 127) / 255) as u8;
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn unpremultiply_rgba_in_place(bytes: &mut [u8]) {
    for pixel in bytes.chunks_exact_mut(4) {
        let alpha = u16::from(pixel[3]);
        if alpha == 0 {
            pixel[..3].fill(0);
            continue;
        }
        for channel in &mut pixel[..3] {
            *channel = ((u16::from(*channel) * 255 + alpha / 2) / alpha).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockup_core::{CanvasConfig, Placement, Point, Scene};

    const RED: [u8; 4] = [255, 0, 0, 255];

    fn scene_with_layer() -> Scene {
        let mut scene =
            Scene::new(Rect::new(0.0, 0.0, 600.0, 700.0), CanvasConfig::default()).expect("scene");
        let id = scene.place_artwork(ArtworkImage::solid(200, 200, RED), Placement::default());
        scene.select(Some(id)).expect("select");
        scene
    }

    #[test]
    fn test_empty_scene_is_clear() {
        let scene =
            Scene::new(Rect::new(0.0, 0.0, 40.0, 30.0), CanvasConfig::default()).expect("scene");
        let surface = Compositor::default()
            .render(&scene.snapshot(), true)
            .expect("render");
        assert_eq!((surface.width(), surface.height()), (40, 30));
        assert!(surface.to_rgba().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_layer_is_drawn_at_its_position() {
        let surface = Compositor::default()
            .render(&scene_with_layer().snapshot(), false)
            .expect("render");
        assert_eq!(surface.pixel(300, 350), Some(RED));
        assert_eq!(surface.pixel(210, 260), Some(RED));
        assert_eq!(surface.pixel(180, 350), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_rotated_layer_corners_are_empty() {
        let mut scene = scene_with_layer();
        let id = scene.selected_id().expect("selected");
        scene
            .set_layer_rotation(id, std::f32::consts::FRAC_PI_4)
            .expect("rotate");
        let surface = Compositor::default()
            .render(&scene.snapshot(), false)
            .expect("render");
        // The unrotated corner region is now outside the diamond.
        assert_eq!(surface.pixel(205, 255), Some([0, 0, 0, 0]));
        // The diamond reaches ~141px left of center along the axis.
        assert_eq!(surface.pixel(170, 350), Some(RED));
    }

    #[test]
    fn test_selection_decoration() {
        let snapshot = scene_with_layer().snapshot();
        let compositor = Compositor::default();
        let plain = compositor.render(&snapshot, false).expect("render");
        let selected = compositor.render(&snapshot, true).expect("render");

        // Outline 5px outside the 200x200 bounds.
        assert_eq!(plain.pixel(195, 350), Some([0, 0, 0, 0]));
        let outline = selected.pixel(195, 350).expect("pixel");
        assert_eq!(&outline[..3], &[0, 0, 0]);
        assert!(outline[3] > 200);
        // White handle centered on the outline corner.
        let handle = selected.pixel(195, 245).expect("pixel");
        assert!(handle.iter().all(|&c| c > 200));
        // Interior untouched.
        assert_eq!(selected.pixel(300, 350), Some(RED));
    }

    #[test]
    fn test_background_is_stretched_to_bounds() {
        let mut scene =
            Scene::new(Rect::new(100.0, 50.0, 60.0, 40.0), CanvasConfig::default()).expect("scene");
        scene.set_background(Some(ArtworkImage::solid(3, 2, [0, 0, 255, 255])));
        let surface = Compositor::default()
            .render(&scene.snapshot(), false)
            .expect("render");
        assert_eq!(surface.pixel(1, 1), Some([0, 0, 255, 255]));
        assert_eq!(surface.pixel(58, 38), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_render_does_not_touch_scene() {
        let scene = scene_with_layer();
        let before = scene.snapshot();
        let _ = Compositor::default().render(&before, true).expect("render");
        assert_eq!(scene.layers(), before.layers());
        assert_eq!(
            scene.selected_layer().map(Layer::position),
            Some(Point::new(300.0, 350.0))
        );
    }

    #[test]
    fn test_rejects_bad_pixel_ratio() {
        let snapshot = scene_with_layer().snapshot();
        let compositor = Compositor::default();
        assert!(matches!(
            compositor.render_at(&snapshot, 0.0, false),
            Err(RenderError::InvalidPixelRatio(_))
        ));
        assert!(compositor.render_at(&snapshot, f32::NAN, false).is_err());
    }

    #[test]
    fn test_premultiply_round_trip_on_opaque() {
        let mut px = vec![10, 20, 30, 255, 0, 0, 0, 0];
        premultiply_rgba_in_place(&mut px);
        unpremultiply_rgba_in_place(&mut px);
        assert_eq!(px, vec![10, 20, 30, 255, 0, 0, 0, 0]);
    }
}
