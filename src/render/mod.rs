//! Rendering seams and the per-view managers plugins register into.
//!
//! The engine decides *what* is drawn and in which order; shape drawing itself
//! is left to the renderers plugins contribute and to the [`Canvas`] the
//! embedding application provides.

mod overlay;
mod registry;
mod serializer;

use std::rc::Rc;

use image::RgbaImage;

use crate::camera::Camera;
use crate::geometry::{BoundingBox, Point};
use crate::model::Annotation;

pub use overlay::{
    AnnotationOverlayData, AnnotationOverlayer, Measure, MeasureManager, MeasureOverlayData,
    MeasureOverlayer, OverlayManager,
};
pub use registry::Registry;
pub use serializer::{Serializer, SerializerManager};

/// Drawing surface of one view.
pub trait Canvas {
    fn clear(&mut self);

    /// Draw an image into the canvas-space rectangle `dest`.
    fn draw_image(&mut self, image: &RgbaImage, dest: BoundingBox);

    /// Stroke a path given in canvas coordinates.
    fn draw_path(&mut self, points: &[Point], closed: bool);
}

/// Draws one annotation type.
pub trait AnnotationRenderer {
    fn render(&self, canvas: &mut dyn Canvas, camera: &Camera, annotation: &Annotation);

    /// Image-space vertices of the annotation (used for zooming and hit tests).
    fn vertices(&self, annotation: &Annotation) -> Vec<Point> {
        annotation.vertices.clone()
    }
}

/// Draws a raster layer (masks) of one annotation type.
pub trait RasterRenderer {
    fn render(&self, canvas: &mut dyn Canvas, camera: &Camera, annotation: &Annotation);
}

/// Renderers of one view, keyed by annotation type name.
pub struct RenderManager {
    annotation_renderers: Registry<dyn AnnotationRenderer>,
    raster_renderers: Registry<dyn RasterRenderer>,
}

impl RenderManager {
    pub fn new() -> Self {
        Self {
            annotation_renderers: Registry::new("annotation renderer"),
            raster_renderers: Registry::new("raster renderer"),
        }
    }

    pub fn register_annotation_renderer(&self, name: &str, renderer: Rc<dyn AnnotationRenderer>) {
        self.annotation_renderers.register(name, renderer);
    }

    pub fn unregister_annotation_renderer(&self, name: &str) {
        self.annotation_renderers.unregister(name);
    }

    pub fn register_raster_renderer(&self, name: &str, renderer: Rc<dyn RasterRenderer>) {
        self.raster_renderers.register(name, renderer);
    }

    pub fn unregister_raster_renderer(&self, name: &str) {
        self.raster_renderers.unregister(name);
    }

    pub fn annotation_renderer(&self, name: &str) -> Option<Rc<dyn AnnotationRenderer>> {
        self.annotation_renderers.get(name)
    }

    pub fn raster_renderer(&self, name: &str) -> Option<Rc<dyn RasterRenderer>> {
        self.raster_renderers.get(name)
    }

    pub fn annotation_renderer_names(&self) -> Vec<String> {
        self.annotation_renderers.names()
    }

    /// Vertices of an annotation as its renderer reports them.
    pub fn vertices(&self, annotation: &Annotation) -> Vec<Point> {
        match self.annotation_renderer(&annotation.annotation_type) {
            Some(renderer) => renderer.vertices(annotation),
            None => annotation.vertices.clone(),
        }
    }

    /// Draw `annotations` back to front. Returns how many were drawn.
    ///
    /// Annotations without a renderer, or rejected by `visible`, are skipped.
    pub fn render_annotations(
        &self,
        canvas: &mut dyn Canvas,
        camera: &Camera,
        annotations: &[Annotation],
        visible: impl Fn(&Annotation) -> bool,
    ) -> usize {
        let mut ordered: Vec<&Annotation> = annotations.iter().filter(|a| visible(a)).collect();
        ordered.sort_by_key(|a| a.z_index);

        let mut drawn = 0;
        for annotation in ordered {
            let name = annotation.annotation_type.as_str();
            if let Some(raster) = self.raster_renderer(name) {
                raster.render(canvas, camera, annotation);
                drawn += 1;
            } else if let Some(renderer) = self.annotation_renderer(name) {
                renderer.render(canvas, camera, annotation);
                drawn += 1;
            }
        }
        drawn
    }

    pub fn cleanup(&self) {
        self.annotation_renderers.clear();
        self.raster_renderers.clear();
    }
}

impl Default for RenderManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`Canvas`] that records draw calls. Used headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub clears: usize,
    /// Destination rectangle and image dimensions of every image draw
    pub images: Vec<(BoundingBox, u32, u32)>,
    pub paths: Vec<(Vec<Point>, bool)>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Canvas for RecordingCanvas {
    fn clear(&mut self) {
        self.clears += 1;
        self.images.clear();
        self.paths.clear();
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: BoundingBox) {
        self.images.push((dest, image.width(), image.height()));
    }

    fn draw_path(&mut self, points: &[Point], closed: bool) {
        self.paths.push((points.to_vec(), closed));
    }
}
