//! A single viewport onto one item.
//!
//! A [`View`] owns the media of its item (one image or one video), the camera
//! and the loaders feeding them. It is a cheap handle: clones share the same
//! view.
//!
//! Item switches go through the item loader's tickets, so only the most
//! recently issued `set_item` ever changes what the view shows. Frames of a
//! video are merged one tier at a time and carry the token of the video they
//! were requested for; frames of a replaced video are dropped at merge time.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use futures::future::{self, FutureExt, LocalBoxFuture};
use web_time::Instant;

use crate::camera::{zoom_window, Camera};
use crate::collaborators::{AnnotationManager, EngineServices, MediaResolver, ResolvedMedia};
use crate::config::EngineConfig;
use crate::constants::ZOOM_TO_ANNOTATION_PADDING;
use crate::error::EngineResult;
use crate::events::Subscribers;
use crate::frame_loader::{FrameLoad, FrameLoader, FrameRequest, FrameTarget};
use crate::geometry::{Point, Size};
use crate::index_map::{self, FrameIndex, ItemGroup, ZeroBasedIndex};
use crate::item_loader::{Fetched, ItemLoader, LoadOutcome};
use crate::model::{
    Annotation, FrameRecord, ImageSettings, Item, ItemId, LoadedImage, LoadedVideo, Quality,
    RenderableImage,
};
use crate::playback::{Playback, PlaybackStep};
use crate::render::{Canvas, MeasureManager, OverlayManager, RenderManager};

/// The view tool input goes to, shared by the editor and every tool context.
pub type ActiveViewSlot = Rc<RefCell<Option<View>>>;

/// Every view of an editor, in layout order.
pub type ViewList = Rc<RefCell<Vec<View>>>;

#[derive(Default)]
struct Media {
    item: Option<Item>,
    group: Option<ItemGroup>,
    image: Option<LoadedImage>,
    video: Option<LoadedVideo>,
    /// Camera waiting for the first frame of a video; holds the reset-zoom flag
    pending_fit: Option<bool>,
}

struct ViewShared {
    id: u64,
    resolver: Rc<dyn MediaResolver>,
    annotation_manager: Rc<dyn AnnotationManager>,
    item_loader: ItemLoader,
    frame_loader: Rc<FrameLoader>,
    media: RefCell<Media>,
    /// Identity of the current video; bumped whenever the video is replaced
    video_token: Cell<u64>,
    camera: RefCell<Camera>,
    playback: RefCell<Playback>,
    image_settings: RefCell<ImageSettings>,
    readonly: Cell<bool>,
    reset_zoom_on_item_change: bool,
    fallback_fps: f32,
    render_manager: RenderManager,
    overlay_manager: OverlayManager,
    measure_manager: MeasureManager,
    item_loaded: Subscribers<ItemId>,
    frame_changed: Subscribers<FrameIndex>,
    frame_loaded: Subscribers<FrameIndex>,
}

/// Handle to one viewport.
#[derive(Clone)]
pub struct View {
    shared: Rc<ViewShared>,
}

impl View {
    pub fn new(id: u64, services: &EngineServices, config: &EngineConfig) -> Self {
        let shared = Rc::new_cyclic(|weak: &Weak<ViewShared>| {
            let target: Weak<dyn FrameTarget> = weak.clone();
            ViewShared {
                id,
                resolver: Rc::clone(&services.resolver),
                annotation_manager: services.annotation_managers.create(id),
                item_loader: ItemLoader::new(),
                frame_loader: FrameLoader::new(
                    Rc::clone(&services.decoder),
                    Rc::clone(&services.spawner),
                    config.frame_loading.clone(),
                    target,
                ),
                media: RefCell::new(Media::default()),
                video_token: Cell::new(0),
                camera: RefCell::new(Camera::new()),
                playback: RefCell::new(Playback::new(config.frame_loading.playback_lead())),
                image_settings: RefCell::new(ImageSettings::default()),
                readonly: Cell::new(false),
                reset_zoom_on_item_change: config.preferences.reset_zoom_on_item_change,
                fallback_fps: config.preferences.playback_fps,
                render_manager: RenderManager::new(),
                overlay_manager: OverlayManager::new(),
                measure_manager: MeasureManager::new(),
                item_loaded: Subscribers::new(),
                frame_changed: Subscribers::new(),
                frame_loaded: Subscribers::new(),
            }
        });
        Self { shared }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Whether both handles refer to the same view.
    pub fn same(&self, other: &View) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn annotation_manager(&self) -> Rc<dyn AnnotationManager> {
        Rc::clone(&self.shared.annotation_manager)
    }

    pub fn render_manager(&self) -> &RenderManager {
        &self.shared.render_manager
    }

    pub fn overlay_manager(&self) -> &OverlayManager {
        &self.shared.overlay_manager
    }

    pub fn measure_manager(&self) -> &MeasureManager {
        &self.shared.measure_manager
    }

    pub fn frame_loader(&self) -> &FrameLoader {
        &self.shared.frame_loader
    }

    /// Emitted with the item id after a `set_item` result was applied.
    pub fn item_loaded(&self) -> &Subscribers<ItemId> {
        &self.shared.item_loaded
    }

    /// Emitted whenever the current frame index changes.
    pub fn frame_changed(&self) -> &Subscribers<FrameIndex> {
        &self.shared.frame_changed
    }

    /// Emitted after a frame tier was merged into the current video.
    pub fn frame_loaded(&self) -> &Subscribers<FrameIndex> {
        &self.shared.frame_loaded
    }

    pub fn item(&self) -> Option<Item> {
        self.shared.media.borrow().item.clone()
    }

    pub fn group(&self) -> Option<ItemGroup> {
        self.shared.media.borrow().group.clone()
    }

    pub fn loaded_image(&self) -> Option<LoadedImage> {
        self.shared.media.borrow().image.clone()
    }

    pub fn loaded_video(&self) -> Option<LoadedVideo> {
        self.shared.media.borrow().video.clone()
    }

    /// Item of the request in flight, if any.
    pub fn pending_item(&self) -> Option<ItemId> {
        self.shared.item_loader.pending_item()
    }

    /// Whether an item request is in flight.
    pub fn is_loading(&self) -> bool {
        self.shared.item_loader.pending_item().is_some()
    }

    pub fn is_readonly(&self) -> bool {
        self.shared.readonly.get()
    }

    pub fn set_readonly(&self, readonly: bool) {
        self.shared.readonly.set(readonly);
    }

    pub fn camera(&self) -> Camera {
        *self.shared.camera.borrow()
    }

    /// Mutate the camera (pan, zoom, viewport changes).
    pub fn with_camera<R>(&self, f: impl FnOnce(&mut Camera) -> R) -> R {
        f(&mut self.shared.camera.borrow_mut())
    }

    pub fn set_viewport(&self, viewport: Size) {
        self.shared.camera.borrow_mut().set_viewport(viewport);
    }

    pub fn image_settings(&self) -> ImageSettings {
        self.shared.image_settings.borrow().clone()
    }

    pub fn set_image_settings(&self, settings: ImageSettings) {
        *self.shared.image_settings.borrow_mut() = settings;
    }

    /// Show `item`, optionally restricted to one group of its frames.
    ///
    /// The item becomes the pending target and the resolver is called before
    /// this returns; the returned future only waits for the result. The
    /// resolved media is applied only if no other `set_item` was issued in the
    /// meantime; otherwise the result is dropped and `Superseded` returned.
    /// A resolver failure leaves the previous media in place.
    ///
    /// Requesting the item that is already loading only retargets the group
    /// it will be shown with; requesting the shown item switches its group.
    pub fn set_item(
        &self,
        item: Item,
        group: Option<ItemGroup>,
    ) -> LocalBoxFuture<'static, EngineResult<LoadOutcome>> {
        let shared = &self.shared;

        let pending = shared.item_loader.pending_item();
        if pending == Some(item.id) {
            shared.item_loader.set_pending_group(group);
            return future::ready(Ok(LoadOutcome::Unchanged)).boxed_local();
        }
        let shown = shared.media.borrow().item.as_ref().map(|i| i.id);
        if pending.is_none() && shown == Some(item.id) {
            self.set_group(group);
            return future::ready(Ok(LoadOutcome::Unchanged)).boxed_local();
        }

        log::debug!("View {}: requesting item {}", shared.id, item.id);
        let (ticket, fetch) = shared
            .item_loader
            .request(shared.resolver.as_ref(), &item, group.as_ref());

        let view = self.clone();
        async move {
            let result = fetch.await;
            let shared = &view.shared;

            if !shared.item_loader.is_current(ticket) {
                log::debug!("View {}: discarding stale response for item {}", shared.id, item.id);
                return Ok(LoadOutcome::Superseded);
            }
            let group = shared.item_loader.finish(ticket);

            match result {
                Ok(Fetched::Media(media)) => {
                    view.apply_media(item, group, media);
                    Ok(LoadOutcome::Applied)
                }
                Ok(Fetched::Aborted) => Ok(LoadOutcome::Superseded),
                Err(e) => {
                    log::warn!("View {}: failed to load item {}: {}", shared.id, item.id, e);
                    Err(e)
                }
            }
        }
        .boxed_local()
    }

    fn apply_media(&self, item: Item, group: Option<ItemGroup>, media: ResolvedMedia) {
        let shared = &self.shared;
        let item_id = item.id;
        shared.playback.borrow_mut().stop();
        shared.frame_loader.clear_queue();
        shared.video_token.set(shared.video_token.get() + 1);

        let start = match media {
            ResolvedMedia::Image(image) => {
                let size = Size::new(image.width as f32, image.height as f32);
                {
                    let mut state = shared.media.borrow_mut();
                    state.item = Some(item);
                    state.group = group;
                    state.image = Some(image);
                    state.video = None;
                    state.pending_fit = None;
                }
                shared
                    .camera
                    .borrow_mut()
                    .set_image(size, shared.reset_zoom_on_item_change);
                None
            }
            ResolvedMedia::Video(mut video) => {
                let start = group
                    .as_ref()
                    .and_then(ItemGroup::first)
                    .or_else(|| video.frames.first_index())
                    .unwrap_or(FrameIndex(0));
                video.current_frame_index = start;
                let mut state = shared.media.borrow_mut();
                state.item = Some(item);
                state.group = group;
                state.image = None;
                state.video = Some(video);
                state.pending_fit = Some(shared.reset_zoom_on_item_change);
                Some(start)
            }
        };

        log::info!("View {}: loaded item {}", shared.id, item_id);
        if let Some(start) = start {
            self.fit_to_current_frame();
            shared.frame_loader.schedule_window(start);
            shared.frame_changed.emit(&start);
        }
        shared.item_loaded.emit(&item_id);
    }

    /// Switch the active group of the current item.
    ///
    /// For a video the view jumps to the first frame of the new group.
    pub fn set_group(&self, group: Option<ItemGroup>) {
        let target = {
            let mut media = self.shared.media.borrow_mut();
            media.group = group;
            let group = media.group.clone();
            media.video.as_ref().and_then(|video| {
                group
                    .as_ref()
                    .and_then(ItemGroup::first)
                    .or_else(|| video.frames.first_index())
            })
        };
        if let Some(target) = target {
            self.jump_to_frame(target, false);
        }
    }

    /// Load the low-quality tier of one frame of the current video.
    ///
    /// Resolves to whether the tier is loaded.
    pub fn load_frame(&self, index: FrameIndex) -> FrameLoad {
        self.shared.frame_loader.load_frame(index, Quality::Low)
    }

    /// Make `index` the current frame.
    ///
    /// In-flight loads are left alone; the prefetch window is re-centred on
    /// `index`, replacing the part of the old window that has not started.
    /// Returns false when `index` is outside the active frame set.
    pub fn jump_to_frame(&self, index: FrameIndex, reset_zoom: bool) -> bool {
        let shared = &self.shared;
        {
            let mut media = shared.media.borrow_mut();
            let group = media.group.clone();
            let Some(video) = media.video.as_mut() else {
                return false;
            };
            if !video.frames.active_indices(group.as_ref()).contains(&index) {
                return false;
            }
            video.current_frame_index = index;
            if reset_zoom {
                media.pending_fit = Some(true);
            }
        }

        self.fit_to_current_frame();
        shared.frame_loader.schedule_window(index);
        if !shared.playback.borrow().is_playing() {
            shared.frame_loader.prefetch(index, Quality::High);
        }
        shared.frame_changed.emit(&index);
        true
    }

    pub fn current_frame_index(&self) -> Option<FrameIndex> {
        self.shared
            .media
            .borrow()
            .video
            .as_ref()
            .map(|v| v.current_frame_index)
    }

    pub fn current_frame(&self) -> Option<FrameRecord> {
        let media = self.shared.media.borrow();
        let video = media.video.as_ref()?;
        video.frames.get(video.current_frame_index).cloned()
    }

    /// Frames of the active set keyed by absolute index.
    pub fn frames(&self) -> BTreeMap<FrameIndex, FrameRecord> {
        let media = self.shared.media.borrow();
        match media.video.as_ref() {
            Some(video) => video
                .frames
                .frames(media.group.as_ref())
                .into_iter()
                .map(|(i, f)| (i, f.clone()))
                .collect(),
            None => BTreeMap::new(),
        }
    }

    /// Frames of the active set re-keyed from zero.
    pub fn zero_based_frames(&self) -> BTreeMap<ZeroBasedIndex, FrameRecord> {
        let media = self.shared.media.borrow();
        match media.video.as_ref() {
            Some(video) => video
                .frames
                .zero_based_frames(media.group.as_ref())
                .into_iter()
                .map(|(i, f)| (i, f.clone()))
                .collect(),
            None => BTreeMap::new(),
        }
    }

    pub fn to_zero_based_index(&self, index: FrameIndex) -> Option<ZeroBasedIndex> {
        index_map::to_zero_based(self.shared.media.borrow().group.as_ref(), index)
    }

    pub fn to_origin_based_index(&self, index: ZeroBasedIndex) -> Option<FrameIndex> {
        index_map::to_origin_based(self.shared.media.borrow().group.as_ref(), index)
    }

    pub fn is_playing(&self) -> bool {
        self.shared.playback.borrow().is_playing()
    }

    /// Start playing the current video. Does nothing without a video.
    pub fn play(&self, now: Instant) {
        let fps = {
            let media = self.shared.media.borrow();
            let Some(video) = media.video.as_ref() else {
                return;
            };
            video.fps.unwrap_or(self.shared.fallback_fps)
        };
        self.shared.playback.borrow_mut().play(now, fps);
    }

    /// Stop playing and upgrade the frame it stopped on to high quality.
    pub fn stop(&self) {
        let was_playing = self.shared.playback.borrow_mut().stop();
        if was_playing {
            if let Some(index) = self.current_frame_index() {
                self.shared.frame_loader.prefetch(index, Quality::High);
            }
        }
    }

    pub fn toggle_playback(&self, now: Instant) {
        if self.is_playing() {
            self.stop();
        } else {
            self.play(now);
        }
    }

    /// Advance playback. Called once per render tick.
    ///
    /// The current frame is never left before its low-quality tier is loaded.
    pub fn tick(&self, now: Instant) -> PlaybackStep {
        let Some(current) = self.current_frame_index() else {
            return PlaybackStep::Idle;
        };
        let ready = self.is_frame_loaded(current, Quality::Low);
        let step = self.shared.playback.borrow_mut().poll(now, ready);

        match step {
            PlaybackStep::Idle => {}
            PlaybackStep::Prefetch => {
                if let Some(next) = self.next_frame_index() {
                    self.shared.frame_loader.prefetch(next, Quality::Low);
                }
            }
            PlaybackStep::Hold => {
                self.shared.frame_loader.prefetch(current, Quality::Low);
            }
            PlaybackStep::Advance => {
                if let Some(next) = self.next_frame_index() {
                    log::debug!("View {}: playback advancing to frame {}", self.shared.id, next);
                    self.jump_to_frame(next, false);
                }
            }
        }
        step
    }

    /// Frame after the current one in the active set, wrapping around.
    pub fn next_frame_index(&self) -> Option<FrameIndex> {
        self.step_frame_index(1)
    }

    pub fn previous_frame_index(&self) -> Option<FrameIndex> {
        self.step_frame_index(-1)
    }

    fn step_frame_index(&self, step: isize) -> Option<FrameIndex> {
        let media = self.shared.media.borrow();
        let video = media.video.as_ref()?;
        let active = video.frames.active_indices(media.group.as_ref());
        if active.is_empty() {
            return None;
        }
        let len = active.len() as isize;
        let position = match active.binary_search(&video.current_frame_index) {
            Ok(position) => (position as isize + step).rem_euclid(len),
            Err(_) => 0,
        };
        active.get(position as usize).copied()
    }

    fn is_frame_loaded(&self, index: FrameIndex, quality: Quality) -> bool {
        self.shared.is_frame_loaded(index, quality)
    }

    /// Image currently on screen, with the view's image settings applied.
    pub fn current_image(&self) -> Option<Rc<RenderableImage>> {
        let media = self.shared.media.borrow();
        if let Some(image) = media.image.as_ref() {
            return image.data.clone();
        }
        let video = media.video.as_ref()?;
        video.frames.get(video.current_frame_index)?.best().cloned()
    }

    /// Paint the latest available state. Never waits for loads.
    ///
    /// Returns whether an image was drawn; a video whose current frame is not
    /// loaded yet draws annotations only.
    pub fn render(&self, canvas: &mut dyn Canvas, visible: impl Fn(&Annotation) -> bool) -> bool {
        canvas.clear();
        let camera = self.camera();
        let settings = self.image_settings();

        let drawn = match self.current_image() {
            Some(image) => {
                let data = image.resolve(&settings);
                let size = Size::new(image.width() as f32, image.height() as f32);
                canvas.draw_image(&data, camera.draw_image_params(size));
                true
            }
            None => false,
        };

        let annotations = self.shared.annotation_manager.annotations();
        self.shared
            .render_manager
            .render_annotations(canvas, &camera, &annotations, visible);
        drawn
    }

    /// Recompute overlay texts and measurements of the visible annotations.
    pub fn refresh_overlays(&self, visible: impl Fn(&Annotation) -> bool) {
        let annotations: Vec<Annotation> = self
            .shared
            .annotation_manager
            .annotations()
            .into_iter()
            .filter(|a| visible(a))
            .collect();
        self.shared.overlay_manager.reset(&annotations);
        self.shared
            .measure_manager
            .reset(&self.camera(), &annotations);
    }

    /// Canvas-space box framing `annotation` with padding, for the current camera.
    pub fn zoom_box_for(&self, annotation: &Annotation) -> Option<(Point, Point)> {
        let vertices = self.shared.render_manager.vertices(annotation);
        let camera = self.camera();
        let (top_left, bottom_right) =
            zoom_window(&vertices, camera.image, ZOOM_TO_ANNOTATION_PADDING)?;
        let finite = |p: &Point| p.x.is_finite() && p.y.is_finite();
        if !finite(&top_left) || !finite(&bottom_right) {
            return None;
        }
        Some((camera.image_to_canvas(top_left), camera.image_to_canvas(bottom_right)))
    }

    /// Zoom the camera onto an annotation.
    pub fn zoom_to_annotation(&self, annotation: &Annotation) -> bool {
        let Some((p1, p2)) = self.zoom_box_for(annotation) else {
            return false;
        };
        self.shared.camera.borrow_mut().zoom_to_box(p1, p2);
        true
    }

    /// Drop the item and its media, invalidating every outstanding load.
    pub fn clear(&self) {
        let shared = &self.shared;
        shared.item_loader.cancel();
        shared.playback.borrow_mut().stop();
        shared.frame_loader.clear_queue();
        shared.video_token.set(shared.video_token.get() + 1);
        *shared.media.borrow_mut() = Media::default();
        shared.annotation_manager.set_annotations(Vec::new());
        shared.overlay_manager.reset(&[]);
        log::debug!("View {}: cleared", shared.id);
    }

    /// Release everything plugins registered into this view.
    pub fn cleanup(&self) {
        self.clear();
        self.shared.render_manager.cleanup();
        self.shared.overlay_manager.cleanup();
        self.shared.measure_manager.cleanup();
    }

    /// Fit the camera once the current frame's size is known.
    fn fit_to_current_frame(&self) {
        let Some(image) = self.current_image() else {
            return;
        };
        self.shared.fit_pending(Size::new(image.width() as f32, image.height() as f32));
    }
}

impl ViewShared {
    fn fit_pending(&self, size: Size) {
        let Some(reset_zoom) = self.media.borrow_mut().pending_fit.take() else {
            return;
        };
        self.camera.borrow_mut().set_image(size, reset_zoom);
    }

    fn current_frame_index(&self) -> Option<FrameIndex> {
        self.media
            .borrow()
            .video
            .as_ref()
            .map(|v| v.current_frame_index)
    }
}

impl FrameTarget for ViewShared {
    fn frame_request(&self, index: FrameIndex, quality: Quality) -> Option<FrameRequest> {
        let media = self.media.borrow();
        let frame = media.video.as_ref()?.frames.get(index)?;
        if frame.is_loaded(quality) {
            return None;
        }
        Some(FrameRequest {
            token: self.video_token.get(),
            index,
            quality,
            url: frame.url(quality)?.to_string(),
        })
    }

    fn is_frame_loaded(&self, index: FrameIndex, quality: Quality) -> bool {
        self.media
            .borrow()
            .video
            .as_ref()
            .is_some_and(|v| v.frames.is_loaded(index, quality))
    }

    fn merge_frame(&self, request: &FrameRequest, data: RenderableImage) -> bool {
        if request.token != self.video_token.get() {
            log::debug!(
                "View {}: dropping frame {} of a replaced video",
                self.id,
                request.index
            );
            return false;
        }

        let size = Size::new(data.width() as f32, data.height() as f32);
        let merged = match self.media.borrow_mut().video.as_mut() {
            Some(video) => video
                .frames
                .merge(request.index, request.quality, Rc::new(data)),
            None => false,
        };
        if !merged {
            return false;
        }
        log::debug!(
            "View {}: merged {} frame {}",
            self.id,
            request.quality.name(),
            request.index
        );

        if self.current_frame_index() == Some(request.index) {
            self.fit_pending(size);
            if request.quality == Quality::Low && !self.playback.borrow().is_playing() {
                self.frame_loader.prefetch(request.index, Quality::High);
            }
        }
        self.frame_loaded.emit(&request.index);
        true
    }

    fn active_indices(&self) -> Vec<FrameIndex> {
        let media = self.media.borrow();
        media
            .video
            .as_ref()
            .map(|v| v.frames.active_indices(media.group.as_ref()))
            .unwrap_or_default()
    }
}
