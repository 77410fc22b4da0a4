//! Text overlays and measurements shown next to annotations.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::camera::Camera;
use crate::events::Subscribers;
use crate::geometry::BoundingBox;
use crate::model::{Annotation, AnnotationId};

use super::Registry;

/// Produces overlay texts from one sub-annotation of an annotation.
pub trait AnnotationOverlayer {
    fn render(&self, annotation: &Annotation, data: &Value) -> Vec<String>;
}

/// Overlay texts of one annotation, anchored at its image-space centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationOverlayData {
    pub annotation_id: AnnotationId,
    pub x: f32,
    pub y: f32,
    pub overlays: Vec<String>,
}

/// Overlay texts of the annotations of one view.
///
/// Overlayers are keyed by sub-annotation name: an overlayer registered as
/// `text` is fed `annotation.data["text"]` when present.
pub struct OverlayManager {
    overlayers: Registry<dyn AnnotationOverlayer>,
    entries: RefCell<BTreeMap<AnnotationId, AnnotationOverlayData>>,
    pub overlays_changed: Subscribers<Vec<AnnotationOverlayData>>,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self {
            overlayers: Registry::new("annotation overlayer"),
            entries: RefCell::new(BTreeMap::new()),
            overlays_changed: Subscribers::new(),
        }
    }

    pub fn register_annotation_overlayer(&self, name: &str, overlayer: Rc<dyn AnnotationOverlayer>) {
        self.overlayers.register_unique(name, overlayer);
    }

    pub fn unregister_annotation_overlayer(&self, name: &str) {
        self.overlayers.unregister(name);
    }

    /// Recompute overlays for `annotations` and notify listeners.
    pub fn reset(&self, annotations: &[Annotation]) {
        let entries: BTreeMap<AnnotationId, AnnotationOverlayData> = annotations
            .iter()
            .filter_map(|a| self.overlay_for(a))
            .map(|o| (o.annotation_id.clone(), o))
            .collect();
        *self.entries.borrow_mut() = entries;
        self.notify();
    }

    pub fn update_overlay_for_annotation(&self, annotation: &Annotation) {
        let Some(overlay) = self.overlay_for(annotation) else {
            return;
        };
        self.entries
            .borrow_mut()
            .insert(overlay.annotation_id.clone(), overlay);
        self.notify();
    }

    pub fn remove_overlay_for_annotation(&self, id: &str) {
        if self.entries.borrow_mut().remove(id).is_some() {
            self.notify();
        }
    }

    pub fn overlays(&self) -> Vec<AnnotationOverlayData> {
        self.entries.borrow().values().cloned().collect()
    }

    pub fn cleanup(&self) {
        self.overlayers.clear();
        self.entries.borrow_mut().clear();
    }

    fn overlay_for(&self, annotation: &Annotation) -> Option<AnnotationOverlayData> {
        let centre = BoundingBox::enclosing(&annotation.vertices)?.centre();

        let mut overlays = Vec::new();
        for (name, overlayer) in self.overlayers.all() {
            if let Some(data) = annotation.data.get(&name) {
                overlays.extend(overlayer.render(annotation, data));
            }
        }

        Some(AnnotationOverlayData {
            annotation_id: annotation.id.clone(),
            x: centre.x,
            y: centre.y,
            overlays,
        })
    }

    fn notify(&self) {
        let overlays = self.overlays();
        self.overlays_changed.emit(&overlays);
    }
}

impl Default for OverlayManager {
    fn default() -> Self {
        Self::new()
    }
}

/// One measured quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measure {
    pub name: String,
    pub value: f64,
    pub unit: String,
}

/// Measurements of one annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureOverlayData {
    pub id: AnnotationId,
    pub label: String,
    pub measures: Vec<Measure>,
}

/// Computes measurements for one annotation type.
pub trait MeasureOverlayer {
    fn calculate(&self, camera: &Camera, annotation: &Annotation) -> Option<MeasureOverlayData>;
}

/// Measurements of the annotations of one view, keyed by annotation type.
pub struct MeasureManager {
    overlayers: Registry<dyn MeasureOverlayer>,
    entries: RefCell<BTreeMap<AnnotationId, MeasureOverlayData>>,
    pub measures_changed: Subscribers<Vec<MeasureOverlayData>>,
}

impl MeasureManager {
    /// Entry id used for the annotation currently being drawn.
    pub const DRAWING_ANNOTATION_ID: &'static str = "drawing-annotation";

    pub fn new() -> Self {
        Self {
            overlayers: Registry::new("measure overlayer"),
            entries: RefCell::new(BTreeMap::new()),
            measures_changed: Subscribers::new(),
        }
    }

    pub fn register_measure_overlayer(&self, name: &str, overlayer: Rc<dyn MeasureOverlayer>) {
        self.overlayers.register_unique(name, overlayer);
    }

    pub fn unregister_measure_overlayer(&self, name: &str) {
        self.overlayers.unregister(name);
    }

    pub fn measure_overlayer(&self, name: &str) -> Option<Rc<dyn MeasureOverlayer>> {
        self.overlayers.get(name)
    }

    pub fn reset(&self, camera: &Camera, annotations: &[Annotation]) {
        let entries = annotations
            .iter()
            .filter_map(|a| self.measure_for(camera, a))
            .map(|m| (m.id.clone(), m))
            .collect();
        *self.entries.borrow_mut() = entries;
        self.notify();
    }

    pub fn update_overlay_for_annotation(&self, camera: &Camera, annotation: &Annotation) {
        if let Some(measure) = self.measure_for(camera, annotation) {
            self.entries.borrow_mut().insert(measure.id.clone(), measure);
            self.notify();
        }
    }

    /// Show measurements of the annotation being drawn.
    pub fn update_overlay_for_drawing_annotation(&self, mut overlay: MeasureOverlayData) {
        overlay.id = Self::DRAWING_ANNOTATION_ID.to_string();
        self.entries.borrow_mut().insert(overlay.id.clone(), overlay);
        self.notify();
    }

    pub fn remove_overlay_for_annotation(&self, id: &str) {
        if self.entries.borrow_mut().remove(id).is_some() {
            self.notify();
        }
    }

    pub fn measure_data(&self) -> Vec<MeasureOverlayData> {
        self.entries.borrow().values().cloned().collect()
    }

    pub fn cleanup(&self) {
        self.overlayers.clear();
        self.entries.borrow_mut().clear();
    }

    fn measure_for(&self, camera: &Camera, annotation: &Annotation) -> Option<MeasureOverlayData> {
        self.overlayers
            .get(&annotation.annotation_type)?
            .calculate(camera, annotation)
    }

    fn notify(&self) {
        let data = self.measure_data();
        self.measures_changed.emit(&data);
    }
}

impl Default for MeasureManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use serde_json::json;
    use std::cell::Cell;

    struct TextOverlayer;

    impl AnnotationOverlayer for TextOverlayer {
        fn render(&self, _annotation: &Annotation, data: &Value) -> Vec<String> {
            data.get("text")
                .and_then(Value::as_str)
                .map(|t| vec![t.to_string()])
                .unwrap_or_default()
        }
    }

    struct AreaOverlayer;

    impl MeasureOverlayer for AreaOverlayer {
        fn calculate(&self, _camera: &Camera, annotation: &Annotation) -> Option<MeasureOverlayData> {
            let bbox = BoundingBox::enclosing(&annotation.vertices)?;
            Some(MeasureOverlayData {
                id: annotation.id.clone(),
                label: "area".to_string(),
                measures: vec![Measure {
                    name: "area".to_string(),
                    value: f64::from(bbox.width * bbox.height),
                    unit: "px".to_string(),
                }],
            })
        }
    }

    fn square(id: &str) -> Annotation {
        Annotation::new(id, "bounding_box").with_vertices(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 2.0),
        ])
    }

    #[test]
    fn test_overlays_from_sub_annotations() {
        let manager = OverlayManager::new();
        manager.register_annotation_overlayer("text", Rc::new(TextOverlayer));

        let mut labelled = square("a");
        labelled.data = json!({ "text": { "text": "car #1" } });
        let plain = square("b");
        let empty = Annotation::new("c", "tag");

        let changes = Rc::new(Cell::new(0));
        let c = Rc::clone(&changes);
        let _sub = manager.overlays_changed.subscribe(move |_| c.set(c.get() + 1));

        manager.reset(&[labelled, plain, empty]);
        let overlays = manager.overlays();
        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[0].overlays, vec!["car #1"]);
        assert_eq!((overlays[0].x, overlays[0].y), (2.0, 1.0));
        assert!(overlays[1].overlays.is_empty());

        manager.remove_overlay_for_annotation("a");
        manager.remove_overlay_for_annotation("missing");
        assert_eq!(manager.overlays().len(), 1);
        assert_eq!(changes.get(), 2);
    }

    #[test]
    fn test_measures_by_type() {
        let manager = MeasureManager::new();
        manager.register_measure_overlayer("bounding_box", Rc::new(AreaOverlayer));

        let camera = Camera::new();
        manager.reset(&camera, &[square("a"), Annotation::new("p", "polygon")]);
        let data = manager.measure_data();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].measures[0].value, 8.0);

        manager.update_overlay_for_drawing_annotation(data[0].clone());
        assert!(manager
            .measure_data()
            .iter()
            .any(|m| m.id == MeasureManager::DRAWING_ANNOTATION_ID));
    }
}
