//! Controllable collaborators shared by the unit and scenario tests.
//!
//! Resolvers and decoders hand out `oneshot` receivers so a test decides when
//! (and in which order) each request completes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::{FutureExt, LocalBoxFuture};
use image::RgbaImage;

use crate::collaborators::{
    AnnotationManager, AnnotationManagerFactory, EngineServices, FrameDecoder, MediaResolver,
    ResolvedMedia,
};
use crate::editor::{FrameCallback, FrameScheduler};
use crate::error::EngineError;
use crate::frame_store::FrameStore;
use crate::index_map::{FrameIndex, ItemGroup};
use crate::model::{Annotation, FrameRecord, Item, ItemId, LoadedImage, LoadedVideo, MediaKind, RenderableImage};

type MediaSender = oneshot::Sender<Result<ResolvedMedia, EngineError>>;
type FrameSender = oneshot::Sender<Result<RenderableImage, EngineError>>;

#[derive(Default)]
pub struct ChannelResolver {
    pending: RefCell<Vec<(ItemId, MediaSender)>>,
    calls: RefCell<Vec<ItemId>>,
}

impl ChannelResolver {
    /// Item ids of every resolve call, in call order.
    pub fn calls(&self) -> Vec<ItemId> {
        self.calls.borrow().clone()
    }

    /// Complete the oldest outstanding request for `item_id`.
    pub fn respond(&self, item_id: ItemId, media: ResolvedMedia) {
        if let Some(tx) = self.take(item_id) {
            let _ = tx.send(Ok(media));
        }
    }

    pub fn fail(&self, item_id: ItemId) {
        if let Some(tx) = self.take(item_id) {
            let _ = tx.send(Err(EngineError::media_resolution(item_id, "unreachable")));
        }
    }

    fn take(&self, item_id: ItemId) -> Option<MediaSender> {
        let mut pending = self.pending.borrow_mut();
        let position = pending.iter().position(|(id, _)| *id == item_id)?;
        Some(pending.remove(position).1)
    }
}

impl MediaResolver for ChannelResolver {
    fn resolve_item(
        &self,
        item: &Item,
        _group: Option<&ItemGroup>,
    ) -> LocalBoxFuture<'static, Result<ResolvedMedia, EngineError>> {
        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().push((item.id, tx));
        self.calls.borrow_mut().push(item.id);
        let id = item.id;
        async move {
            rx.await
                .unwrap_or_else(|_| Err(EngineError::media_resolution(id, "request dropped")))
        }
        .boxed_local()
    }
}

#[derive(Default)]
pub struct ManualDecoder {
    pending: RefCell<Vec<(String, FrameSender)>>,
    calls: RefCell<Vec<String>>,
}

impl ManualDecoder {
    /// Urls of every decode call, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Urls still waiting for a result.
    pub fn outstanding(&self) -> Vec<String> {
        self.pending.borrow().iter().map(|(u, _)| u.clone()).collect()
    }

    pub fn complete(&self, url: &str) -> bool {
        let sender = {
            let mut pending = self.pending.borrow_mut();
            pending
                .iter()
                .position(|(u, _)| u == url)
                .map(|position| pending.remove(position).1)
        };
        match sender {
            Some(tx) => tx.send(Ok(frame_image())).is_ok(),
            None => false,
        }
    }

    pub fn fail(&self, url: &str) -> bool {
        let sender = {
            let mut pending = self.pending.borrow_mut();
            pending
                .iter()
                .position(|(u, _)| u == url)
                .map(|position| pending.remove(position).1)
        };
        match sender {
            Some(tx) => tx.send(Err(EngineError::frame_decode(url, "corrupt"))).is_ok(),
            None => false,
        }
    }

    /// Complete every outstanding decode.
    pub fn complete_all(&self) {
        for url in self.outstanding() {
            self.complete(&url);
        }
    }
}

impl FrameDecoder for ManualDecoder {
    fn decode_frame(&self, url: &str) -> LocalBoxFuture<'static, Result<RenderableImage, EngineError>> {
        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().push((url.to_string(), tx));
        self.calls.borrow_mut().push(url.to_string());
        let url = url.to_string();
        async move {
            rx.await
                .unwrap_or_else(|_| Err(EngineError::frame_decode(url, "decode dropped")))
        }
        .boxed_local()
    }
}

#[derive(Default)]
pub struct MemoryAnnotations {
    pub annotations: RefCell<Vec<Annotation>>,
    pub selected: RefCell<Option<Annotation>>,
    pub deselections: Cell<usize>,
}

impl AnnotationManager for MemoryAnnotations {
    fn annotations(&self) -> Vec<Annotation> {
        self.annotations.borrow().clone()
    }

    fn selected_annotation(&self) -> Option<Annotation> {
        self.selected.borrow().clone()
    }

    fn deselect_all_annotations(&self) {
        self.deselections.set(self.deselections.get() + 1);
        *self.selected.borrow_mut() = None;
    }

    fn set_annotations(&self, annotations: Vec<Annotation>) {
        *self.annotations.borrow_mut() = annotations;
    }

    fn persist_create_annotation(
        &self,
        annotation: Annotation,
    ) -> LocalBoxFuture<'static, Result<(), EngineError>> {
        self.annotations.borrow_mut().push(annotation);
        futures::future::ready(Ok(())).boxed_local()
    }

    fn persist_update_annotation(
        &self,
        annotation: Annotation,
    ) -> LocalBoxFuture<'static, Result<(), EngineError>> {
        let mut annotations = self.annotations.borrow_mut();
        if let Some(existing) = annotations.iter_mut().find(|a| a.id == annotation.id) {
            *existing = annotation;
        }
        futures::future::ready(Ok(())).boxed_local()
    }
}

/// Hands out one [`MemoryAnnotations`] per view and keeps them for inspection.
#[derive(Default)]
pub struct MemoryAnnotationFactory {
    pub created: RefCell<Vec<(u64, Rc<MemoryAnnotations>)>>,
}

impl MemoryAnnotationFactory {
    pub fn for_view(&self, view_id: u64) -> Option<Rc<MemoryAnnotations>> {
        self.created
            .borrow()
            .iter()
            .find(|(id, _)| *id == view_id)
            .map(|(_, m)| Rc::clone(m))
    }
}

impl AnnotationManagerFactory for MemoryAnnotationFactory {
    fn create(&self, view_id: u64) -> Rc<dyn AnnotationManager> {
        let manager = Rc::new(MemoryAnnotations::default());
        self.created.borrow_mut().push((view_id, Rc::clone(&manager)));
        manager
    }
}

pub struct Harness {
    pub pool: LocalPool,
    pub resolver: Rc<ChannelResolver>,
    pub decoder: Rc<ManualDecoder>,
    pub annotations: Rc<MemoryAnnotationFactory>,
    pub services: EngineServices,
}

impl Harness {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let resolver = Rc::new(ChannelResolver::default());
        let decoder = Rc::new(ManualDecoder::default());
        let annotations = Rc::new(MemoryAnnotationFactory::default());
        let services = EngineServices {
            resolver: resolver.clone(),
            decoder: decoder.clone(),
            spawner: Rc::new(pool.spawner()),
            annotation_managers: annotations.clone(),
        };
        Self {
            pool,
            resolver,
            decoder,
            annotations,
            services,
        }
    }

    /// Run every ready task to completion.
    pub fn settle(&mut self) {
        self.pool.run_until_stalled();
    }
}

/// Frame scheduler fired by hand.
#[derive(Default)]
pub struct ManualScheduler {
    callbacks: RefCell<Vec<(u64, FrameCallback)>>,
    next_handle: Cell<u64>,
    pub cancelled: Cell<usize>,
}

impl ManualScheduler {
    pub fn pending(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Run every callback requested so far. Returns how many ran.
    pub fn fire(&self, now: web_time::Instant) -> usize {
        let callbacks: Vec<(u64, FrameCallback)> = self.callbacks.borrow_mut().drain(..).collect();
        let count = callbacks.len();
        for (_, callback) in callbacks {
            callback(now);
        }
        count
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: FrameCallback) -> u64 {
        let handle = self.next_handle.get();
        self.next_handle.set(handle + 1);
        self.callbacks.borrow_mut().push((handle, callback));
        handle
    }

    fn cancel_frame(&self, handle: u64) {
        self.callbacks.borrow_mut().retain(|(h, _)| *h != handle);
        self.cancelled.set(self.cancelled.get() + 1);
    }
}

/// 4x3 frame data.
pub fn frame_image() -> RenderableImage {
    RenderableImage::new(RgbaImage::new(4, 3))
}

pub fn image_item(id: ItemId) -> Item {
    Item::new(id, format!("image-{id}"), MediaKind::Image, format!("image-{id}.png"))
}

pub fn video_item(id: ItemId) -> Item {
    Item::new(id, format!("video-{id}"), MediaKind::Video, format!("video-{id}"))
}

pub fn loaded_image(id: ItemId, width: u32, height: u32) -> ResolvedMedia {
    ResolvedMedia::Image(LoadedImage::new(id, RenderableImage::new(RgbaImage::new(width, height))))
}

/// Video with `frames` unloaded frames at urls `v{id}/{index}/lq|hq`.
pub fn loaded_video(id: ItemId, frames: usize) -> ResolvedMedia {
    let store = FrameStore::from_records((0..frames).map(|i| {
        (
            FrameIndex(i),
            FrameRecord::new(i as u64, lq_url(id, i), Some(hq_url(id, i))),
        )
    }));
    ResolvedMedia::Video(LoadedVideo::new(id, store))
}

pub fn lq_url(id: ItemId, index: usize) -> String {
    format!("v{id}/{index}/lq")
}

pub fn hq_url(id: ItemId, index: usize) -> String {
    format!("v{id}/{index}/hq")
}
