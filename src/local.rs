//! Filesystem-backed collaborators.
//!
//! An item's `source` is a path. An image file resolves to a single image; a
//! folder resolves to a multi-frame item whose frames are the folder's image
//! files sorted by name. Frame urls are file paths; the low-quality tier of a
//! frame is the same path with [`LQ_SUFFIX`] appended and decodes to a
//! thumbnail.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::collaborators::{
    AnnotationManager, AnnotationManagerFactory, FrameDecoder, MediaResolver, ResolvedMedia,
};
use crate::error::{EngineError, EngineResult};
use crate::frame_store::FrameStore;
use crate::index_map::{FrameIndex, ItemGroup};
use crate::model::{Annotation, FrameRecord, Item, ItemId, LoadedImage, LoadedVideo, MediaKind, RenderableImage};

/// Supported image extensions
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

/// Appended to a frame path to request its low-quality tier.
pub const LQ_SUFFIX: &str = "?quality=lq";

/// Edge length of low-quality thumbnails.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

/// Check if a path has a supported image extension
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Image files directly inside `folder`, sorted by file name.
pub fn image_files(folder: &Path) -> EngineResult<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image_file(path))
        .collect();
    images.sort();
    Ok(images)
}

/// Build an item for a path: folders become multi-frame items.
pub fn item_for_path(id: ItemId, path: &Path) -> Item {
    let kind = if path.is_dir() {
        MediaKind::Video
    } else {
        MediaKind::Image
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Item::new(id, name, kind, path.display().to_string())
}

/// Resolves items whose source is a local path.
#[derive(Debug, Clone, Default)]
pub struct LocalMediaResolver {
    /// Playback rate reported for folders
    pub fps: Option<f32>,
}

impl LocalMediaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = Some(fps);
        self
    }

    fn resolve(&self, item: &Item) -> EngineResult<ResolvedMedia> {
        let path = PathBuf::from(&item.source);
        if path.is_dir() {
            let files = image_files(&path)
                .map_err(|e| EngineError::media_resolution(item.id, e.to_string()))?;
            if files.is_empty() {
                return Err(EngineError::media_resolution(item.id, "no image files in folder"));
            }
            log::debug!("Item {}: {} frames in {:?}", item.id, files.len(), path);

            let store = FrameStore::from_records(files.iter().enumerate().map(|(i, file)| {
                let hq = file.display().to_string();
                (
                    FrameIndex(i),
                    FrameRecord::new(i as u64, format!("{hq}{LQ_SUFFIX}"), Some(hq)),
                )
            }));
            let mut video = LoadedVideo::new(item.id, store);
            video.fps = self.fps;
            return Ok(ResolvedMedia::Video(video));
        }

        let image = image::open(&path)
            .map_err(|e| EngineError::media_resolution(item.id, e.to_string()))?;
        Ok(ResolvedMedia::Image(LoadedImage::new(
            item.id,
            RenderableImage::from_dynamic(image),
        )))
    }
}

impl MediaResolver for LocalMediaResolver {
    fn resolve_item(
        &self,
        item: &Item,
        _group: Option<&ItemGroup>,
    ) -> LocalBoxFuture<'static, Result<ResolvedMedia, EngineError>> {
        let resolver = self.clone();
        let item = item.clone();
        async move { resolver.resolve(&item) }.boxed_local()
    }
}

/// Decodes frame files with the `image` crate.
#[derive(Debug, Clone)]
pub struct ImageFileDecoder {
    thumbnail_size: u32,
}

impl ImageFileDecoder {
    pub fn new(thumbnail_size: u32) -> Self {
        Self { thumbnail_size }
    }

    fn decode(&self, url: &str) -> EngineResult<RenderableImage> {
        let (path, low_quality) = match url.strip_suffix(LQ_SUFFIX) {
            Some(path) => (path, true),
            None => (url, false),
        };
        let image = image::open(path).map_err(|e| EngineError::frame_decode(url, e.to_string()))?;
        let image = if low_quality {
            image.thumbnail(self.thumbnail_size, self.thumbnail_size)
        } else {
            image
        };
        Ok(RenderableImage::from_dynamic(image))
    }
}

impl Default for ImageFileDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_SIZE)
    }
}

impl FrameDecoder for ImageFileDecoder {
    fn decode_frame(&self, url: &str) -> LocalBoxFuture<'static, Result<RenderableImage, EngineError>> {
        let decoder = self.clone();
        let url = url.to_string();
        async move { decoder.decode(&url) }.boxed_local()
    }
}

/// Annotations kept in memory only.
#[derive(Debug, Default)]
pub struct InMemoryAnnotations {
    annotations: RefCell<Vec<Annotation>>,
    selected: RefCell<Option<Annotation>>,
}

impl InMemoryAnnotations {
    pub fn select(&self, annotation: Option<Annotation>) {
        *self.selected.borrow_mut() = annotation;
    }
}

impl AnnotationManager for InMemoryAnnotations {
    fn annotations(&self) -> Vec<Annotation> {
        self.annotations.borrow().clone()
    }

    fn selected_annotation(&self) -> Option<Annotation> {
        self.selected.borrow().clone()
    }

    fn deselect_all_annotations(&self) {
        self.select(None);
    }

    fn set_annotations(&self, annotations: Vec<Annotation>) {
        *self.annotations.borrow_mut() = annotations;
    }

    fn persist_create_annotation(
        &self,
        annotation: Annotation,
    ) -> LocalBoxFuture<'static, Result<(), EngineError>> {
        self.annotations.borrow_mut().push(annotation);
        future::ready(Ok(())).boxed_local()
    }

    fn persist_update_annotation(
        &self,
        annotation: Annotation,
    ) -> LocalBoxFuture<'static, Result<(), EngineError>> {
        let mut annotations = self.annotations.borrow_mut();
        match annotations.iter_mut().find(|a| a.id == annotation.id) {
            Some(existing) => {
                *existing = annotation;
                future::ready(Ok(())).boxed_local()
            }
            None => future::ready(Err(EngineError::Persistence(format!(
                "annotation '{}' does not exist",
                annotation.id
            ))))
            .boxed_local(),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAnnotationFactory;

impl AnnotationManagerFactory for InMemoryAnnotationFactory {
    fn create(&self, _view_id: u64) -> Rc<dyn AnnotationManager> {
        Rc::new(InMemoryAnnotations::default())
    }
}
