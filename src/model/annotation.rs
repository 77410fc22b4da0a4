//! Annotation records and classes as seen by the engine.
//!
//! The engine never persists these itself; it reads them from and hands them
//! back to the annotation-manager collaborator.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Unique identifier for an annotation.
pub type AnnotationId = String;

/// Unique identifier for an annotation class.
pub type ClassId = u64;

/// An annotation on the current item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    /// Annotation type name (`polygon`, `bounding_box`, ...)
    pub annotation_type: String,
    pub class_id: Option<ClassId>,
    /// Flattened image-space vertices, when the type has any
    #[serde(default)]
    pub vertices: Vec<Point>,
    /// Type-specific payload
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub z_index: i32,
}

impl Annotation {
    pub fn new(id: impl Into<AnnotationId>, annotation_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            annotation_type: annotation_type.into(),
            class_id: None,
            vertices: Vec::new(),
            data: serde_json::Value::Null,
            z_index: 0,
        }
    }

    pub fn with_vertices(mut self, vertices: Vec<Point>) -> Self {
        self.vertices = vertices;
        self
    }

    pub fn with_class(mut self, class_id: ClassId) -> Self {
        self.class_id = Some(class_id);
        self
    }
}

/// An annotation class the user can draw with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationClass {
    pub id: ClassId,
    pub name: String,
    /// Main annotation type of the class (`polygon`, `cuboid`, ...)
    pub main_type: String,
}

impl AnnotationClass {
    pub fn new(id: ClassId, name: &str, main_type: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            main_type: main_type.to_string(),
        }
    }
}
