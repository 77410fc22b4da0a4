//! Viewport camera mathematics.
//!
//! Pure geometry with no I/O: the camera maps between image space and canvas
//! space through a uniform `scale` and a canvas-space `offset`:
//!
//! ```text
//! canvas = image * scale - offset
//! image  = (canvas + offset) / scale
//! ```

use crate::constants::{
    CANVAS_CONTENT_VISIBILITY_MARGIN, CURSOR_FIRST_VERTEX_MAX_DISTANCE, DEFAULT_ZOOM_FACTOR,
    MAX_SCALE,
};
use crate::geometry::{BoundingBox, Point, Size};

/// Pan/zoom state of one view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Canvas pixels per image pixel
    pub scale: f32,
    /// Canvas-space offset of the image origin
    pub offset: Point,
    /// Size of the drawing surface
    pub viewport: Size,
    /// Size of the displayed image
    pub image: Size,
}

impl Camera {
    /// Create a camera with unit scale over a 1x1 viewport and image.
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            offset: Point::default(),
            viewport: Size::new(1.0, 1.0),
            image: Size::new(1.0, 1.0),
        }
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Set the displayed image size, optionally refitting it into the viewport.
    pub fn set_image(&mut self, image: Size, reset_zoom: bool) {
        self.image = image;
        if reset_zoom {
            self.scale_to_fit();
        }
    }

    /// Scale at which the whole image fits the viewport.
    pub fn scale_to_fit_value(&self) -> f32 {
        let h_ratio = self.viewport.height / self.image.height;
        let w_ratio = self.viewport.width / self.image.width;
        h_ratio.min(w_ratio)
    }

    /// Fit the image into the viewport, centred horizontally and top-aligned.
    pub fn scale_to_fit(&mut self) {
        if self.image.is_empty() {
            return;
        }
        self.scale = self.scale_to_fit_value();
        let x_border = self.viewport.width - self.image.width * self.scale;
        self.offset = Point::new(-x_border / 2.0, 0.0);
    }

    /// Smallest allowed scale: half of the fit scale.
    pub fn min_zoom(&self) -> f32 {
        self.scale_to_fit_value() / 2.0
    }

    pub fn canvas_to_image(&self, point: Point) -> Point {
        (point + self.offset) * (1.0 / self.scale)
    }

    pub fn image_to_canvas(&self, point: Point) -> Point {
        point * self.scale - self.offset
    }

    /// Zoom around a canvas point. Factors above 1 zoom in.
    pub fn zoom(&mut self, factor: f32, at: Point) {
        if factor > 1.0 {
            self.zoom_in(at, factor);
        } else if factor > 0.0 {
            self.zoom_out(at, 1.0 / factor);
        }
    }

    /// Zoom in by `factor`, keeping the image point under `at` fixed.
    pub fn zoom_in(&mut self, at: Point, factor: f32) {
        let src = self.canvas_to_image(at);
        self.scale = (self.scale * factor).min(MAX_SCALE);
        self.anchor(src, at);
    }

    /// Zoom out by `factor`, keeping the image point under `at` fixed.
    pub fn zoom_out(&mut self, at: Point, factor: f32) {
        let src = self.canvas_to_image(at);
        self.scale = (self.scale / factor).max(self.min_zoom());
        self.anchor(src, at);
    }

    /// One default zoom step in, around the viewport centre.
    pub fn step_in(&mut self) {
        let centre = Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
        self.zoom_in(centre, DEFAULT_ZOOM_FACTOR);
    }

    /// One default zoom step out, around the viewport centre.
    pub fn step_out(&mut self) {
        let centre = Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0);
        self.zoom_out(centre, DEFAULT_ZOOM_FACTOR);
    }

    fn anchor(&mut self, src: Point, at: Point) {
        self.offset = src * self.scale - at;
    }

    /// Zoom so that the canvas-space box `p1`..`p2` fills the viewport, centred.
    pub fn zoom_to_box(&mut self, p1: Point, p2: Point) {
        let start = self.canvas_to_image(p1);
        let end = self.canvas_to_image(p2);

        let (w, h) = (self.viewport.width, self.viewport.height);
        let nw = (end.x - start.x).abs();
        let nh = (end.y - start.y).abs();
        if nw <= 0.0 || nh <= 0.0 {
            return;
        }
        self.scale = if w / h < nw / nh {
            (w / nw).min(MAX_SCALE)
        } else {
            (h / nh).min(MAX_SCALE)
        };

        let rect = BoundingBox::from_corners(start, end);
        let rect_start = rect.top_left() * self.scale;
        let rect_end = rect.bottom_right() * self.scale;
        let viewport_end = rect_start + Point::new(w, h);
        self.offset = rect_start - (viewport_end - rect_end) * 0.5;
    }

    /// Pan by a canvas delta (halved), keeping at least a margin of the image visible.
    pub fn scroll(&mut self, delta: Point) {
        self.offset = self.offset + delta * 0.5;

        let max_x = self.image.width * self.scale - CANVAS_CONTENT_VISIBILITY_MARGIN;
        let min_x = -self.viewport.width + CANVAS_CONTENT_VISIBILITY_MARGIN;
        let max_y = self.image.height * self.scale - CANVAS_CONTENT_VISIBILITY_MARGIN;
        let min_y = -self.viewport.height + CANVAS_CONTENT_VISIBILITY_MARGIN;

        // min/max rather than clamp: the bounds cross for images smaller than the margin
        self.offset.x = self.offset.x.min(max_x).max(min_x);
        self.offset.y = self.offset.y.min(max_y).max(min_y);
    }

    /// Destination rectangle (x, y, w, h) of an image drawn through this camera.
    pub fn draw_image_params(&self, image: Size) -> BoundingBox {
        BoundingBox::new(
            -self.offset.x,
            -self.offset.y,
            image.width * self.scale,
            image.height * self.scale,
        )
    }

    /// Whether a canvas cursor is close enough to the first vertex to close a path.
    pub fn cursor_is_closing_path(&self, cursor: Point, first_vertex: Point) -> bool {
        self.canvas_to_image(cursor).distance_to(&first_vertex)
            < CURSOR_FIRST_VERTEX_MAX_DISTANCE / self.scale
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

/// Image-space window around `vertices`, padded by `padding * image size` on each side.
///
/// Returns `(top_left, bottom_right)`, or `None` when there are no vertices.
pub fn zoom_window(vertices: &[Point], image: Size, padding: f32) -> Option<(Point, Point)> {
    let bbox = BoundingBox::enclosing(vertices)?;
    let pad = Point::new(image.width * padding, image.height * padding);
    Some((bbox.top_left() - pad, bbox.bottom_right() + pad))
}
