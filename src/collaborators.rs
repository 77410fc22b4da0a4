//! Boundary traits for the services the engine consumes but does not implement.
//!
//! Media resolution, frame decoding and annotation persistence are provided by
//! the embedding application. All calls are single-threaded; asynchronous calls
//! return [`LocalBoxFuture`]s that own everything they need.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::task::LocalSpawn;

use crate::error::EngineError;
use crate::index_map::ItemGroup;
use crate::model::{Annotation, Item, LoadedImage, LoadedVideo, RenderableImage};

/// Media an item resolves to. Exactly one of image or video.
#[derive(Debug, Clone)]
pub enum ResolvedMedia {
    Image(LoadedImage),
    Video(LoadedVideo),
}

impl ResolvedMedia {
    /// Id of the item the media belongs to.
    pub fn item_id(&self) -> u64 {
        match self {
            ResolvedMedia::Image(image) => image.id,
            ResolvedMedia::Video(video) => video.id,
        }
    }
}

/// Resolves an item to its media. Must fail as a whole, never partially.
pub trait MediaResolver {
    fn resolve_item(
        &self,
        item: &Item,
        group: Option<&ItemGroup>,
    ) -> LocalBoxFuture<'static, Result<ResolvedMedia, EngineError>>;
}

/// Decodes one quality tier of one frame.
pub trait FrameDecoder {
    fn decode_frame(&self, url: &str) -> LocalBoxFuture<'static, Result<RenderableImage, EngineError>>;
}

/// Per-view annotation state owned by the embedding application.
pub trait AnnotationManager {
    fn annotations(&self) -> Vec<Annotation>;

    fn selected_annotation(&self) -> Option<Annotation>;

    fn deselect_all_annotations(&self);

    /// Replace the in-memory annotation list (used when a view switches item).
    fn set_annotations(&self, annotations: Vec<Annotation>);

    fn persist_create_annotation(
        &self,
        annotation: Annotation,
    ) -> LocalBoxFuture<'static, Result<(), EngineError>>;

    fn persist_update_annotation(
        &self,
        annotation: Annotation,
    ) -> LocalBoxFuture<'static, Result<(), EngineError>>;
}

/// Creates the annotation manager of each new view.
pub trait AnnotationManagerFactory {
    fn create(&self, view_id: u64) -> Rc<dyn AnnotationManager>;
}

/// The collaborators an editor is built from.
#[derive(Clone)]
pub struct EngineServices {
    pub resolver: Rc<dyn MediaResolver>,
    pub decoder: Rc<dyn FrameDecoder>,
    /// Executor background frame loads run on
    pub spawner: Rc<dyn LocalSpawn>,
    pub annotation_managers: Rc<dyn AnnotationManagerFactory>,
}
