//! Data models for the annotation engine.

mod annotation;
mod item;
mod media;

pub use annotation::{Annotation, AnnotationClass, AnnotationId, ClassId};
pub use item::{Item, ItemId, ItemLayout, ItemStatus, MediaKind};
pub use media::{
    ColorMap, FrameRecord, ImageSettings, LoadedImage, LoadedVideo, Quality, RenderableImage,
    WindowLevels,
};
