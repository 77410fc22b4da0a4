//! Annotation serializers contributed by plugins.

use std::rc::Rc;

use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::model::Annotation;

use super::Registry;

/// Converts the type-specific payload of one annotation type.
pub trait Serializer {
    fn serialize(&self, annotation: &Annotation) -> EngineResult<Value>;

    fn deserialize(&self, raw: &Value) -> EngineResult<Annotation>;
}

/// Editor-wide serializers keyed by annotation type name.
pub struct SerializerManager {
    serializers: Registry<dyn Serializer>,
}

impl SerializerManager {
    pub fn new() -> Self {
        Self {
            serializers: Registry::new("serializer"),
        }
    }

    pub fn register_serializer(&self, name: &str, serializer: Rc<dyn Serializer>) {
        self.serializers.register(name, serializer);
    }

    pub fn unregister_serializer(&self, name: &str) {
        self.serializers.unregister(name);
    }

    pub fn serializer(&self, name: &str) -> Option<Rc<dyn Serializer>> {
        self.serializers.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.serializers.names()
    }

    /// Serialize with the serializer of the annotation's type.
    pub fn serialize(&self, annotation: &Annotation) -> EngineResult<Value> {
        self.require(&annotation.annotation_type)?.serialize(annotation)
    }

    pub fn deserialize(&self, name: &str, raw: &Value) -> EngineResult<Annotation> {
        self.require(name)?.deserialize(raw)
    }

    fn require(&self, name: &str) -> EngineResult<Rc<dyn Serializer>> {
        self.serializers
            .get(name)
            .ok_or_else(|| EngineError::UnknownSerializer(name.to_string()))
    }
}

impl Default for SerializerManager {
    fn default() -> Self {
        Self::new()
    }
}
