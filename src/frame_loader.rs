//! Asynchronous frame loading with a forward prefetch window.
//!
//! Every request is keyed by (video token, frame index, quality tier): a frame
//! already in flight is never requested twice and the caller receives the same
//! shared future. Results are merged into exactly one frame of the video that
//! issued them, so out-of-order completion is harmless and loads started for a
//! previous video are dropped at merge time.
//!
//! The prefetch window is pumped through a queue bounded by
//! `max_concurrent_loads`; re-centring the window replaces whatever part of the
//! previous window has not started yet.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use futures::future::{self, FutureExt, LocalBoxFuture, Shared};
use futures::task::{LocalSpawn, LocalSpawnExt};

use crate::collaborators::FrameDecoder;
use crate::config::FrameLoadingConfig;
use crate::index_map::FrameIndex;
use crate::model::{Quality, RenderableImage};

/// A decode the target wants performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRequest {
    /// Identity of the video the frame belongs to
    pub token: u64,
    pub index: FrameIndex,
    pub quality: Quality,
    pub url: String,
}

/// The owner of the frames being loaded (a view).
pub trait FrameTarget {
    /// Request for one tier of one frame, or `None` when there is nothing to
    /// load (no video, unknown frame, tier already loaded, no url).
    fn frame_request(&self, index: FrameIndex, quality: Quality) -> Option<FrameRequest>;

    /// Whether the tier is present in the current video.
    fn is_frame_loaded(&self, index: FrameIndex, quality: Quality) -> bool;

    /// Merge a decoded tier. Must drop results whose token is stale.
    fn merge_frame(&self, request: &FrameRequest, data: RenderableImage) -> bool;

    /// Absolute indices of the active frame set (group or full video).
    fn active_indices(&self) -> Vec<FrameIndex>;
}

/// Shared completion of one frame load; resolves to whether data was merged.
pub type FrameLoad = Shared<LocalBoxFuture<'static, bool>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FrameKey {
    token: u64,
    index: FrameIndex,
    quality: Quality,
}

#[derive(Default)]
struct LoaderState {
    in_flight: HashMap<FrameKey, FrameLoad>,
    /// Window entries waiting for a free slot
    queue: VecDeque<FrameIndex>,
}

/// Frame loader of one view.
pub struct FrameLoader {
    decoder: Rc<dyn FrameDecoder>,
    spawner: Rc<dyn LocalSpawn>,
    settings: FrameLoadingConfig,
    target: Weak<dyn FrameTarget>,
    weak_self: Weak<FrameLoader>,
    state: RefCell<LoaderState>,
}

impl FrameLoader {
    pub fn new(
        decoder: Rc<dyn FrameDecoder>,
        spawner: Rc<dyn LocalSpawn>,
        settings: FrameLoadingConfig,
        target: Weak<dyn FrameTarget>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|weak_self| Self {
            decoder,
            spawner,
            settings,
            target,
            weak_self: weak_self.clone(),
            state: RefCell::new(LoaderState::default()),
        })
    }

    pub fn settings(&self) -> &FrameLoadingConfig {
        &self.settings
    }

    /// Load one tier of one frame.
    ///
    /// Resolves to `true` once the tier is loaded (immediately if it already
    /// was), `false` if the frame is unknown, the decode failed or the result
    /// was stale.
    pub fn load_frame(&self, index: FrameIndex, quality: Quality) -> FrameLoad {
        match self.start_load(index, quality) {
            Some(load) => load,
            None => ready(
                self.target
                    .upgrade()
                    .is_some_and(|t| t.is_frame_loaded(index, quality)),
            ),
        }
    }

    /// Start loading a tier in the background, outside the window queue.
    ///
    /// Returns whether a load is now in flight.
    pub fn prefetch(&self, index: FrameIndex, quality: Quality) -> bool {
        self.start_load(index, quality).is_some()
    }

    /// Start (or join) a load. `None` when there is nothing to load.
    fn start_load(&self, index: FrameIndex, quality: Quality) -> Option<FrameLoad> {
        let target = self.target.upgrade()?;
        let request = target.frame_request(index, quality)?;

        let key = FrameKey {
            token: request.token,
            index,
            quality,
        };
        if let Some(existing) = self.state.borrow().in_flight.get(&key) {
            return Some(existing.clone());
        }

        log::debug!("Loading {} frame {} from '{}'", quality.name(), index, request.url);
        let decode = self.decoder.decode_frame(&request.url);
        let target = self.target.clone();
        let loader = self.weak_self.clone();
        let load: FrameLoad = async move {
            let merged = match decode.await {
                Ok(data) => target
                    .upgrade()
                    .is_some_and(|target| target.merge_frame(&request, data)),
                Err(e) => {
                    log::warn!("Failed to load {} frame {}: {}", quality.name(), index, e);
                    false
                }
            };
            if let Some(loader) = loader.upgrade() {
                loader.finish(key);
            }
            merged
        }
        .boxed_local()
        .shared();

        self.state
            .borrow_mut()
            .in_flight
            .insert(key, load.clone());
        if let Err(e) = self.spawner.spawn_local(load.clone().map(|_| ())) {
            log::warn!("Failed to spawn frame load: {}", e);
            self.state.borrow_mut().in_flight.remove(&key);
            return None;
        }
        Some(load)
    }

    /// Re-centre the prefetch window on `start`.
    ///
    /// Indices `start..start + prefetch_window` that belong to the active frame
    /// set and are neither loaded nor in flight replace the pending queue.
    pub fn schedule_window(&self, start: FrameIndex) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let active = target.active_indices();
        let window: VecDeque<FrameIndex> = (start.0..start.0 + self.settings.prefetch_window)
            .map(FrameIndex)
            .filter(|i| active.binary_search(i).is_ok())
            .filter(|i| !target.is_frame_loaded(*i, Quality::Low) && !self.is_in_flight(*i, Quality::Low))
            .collect();

        log::debug!("Prefetch window at {}: {:?}", start, window);
        self.state.borrow_mut().queue = window;
        self.pump();
    }

    /// Drop window entries that have not started yet.
    pub fn clear_queue(&self) {
        self.state.borrow_mut().queue.clear();
    }

    /// Whether a load of the tier is in flight for the current video.
    pub fn is_in_flight(&self, index: FrameIndex, quality: Quality) -> bool {
        let Some(token) = self
            .target
            .upgrade()
            .and_then(|t| t.frame_request(index, quality))
            .map(|r| r.token)
        else {
            return false;
        };
        self.state.borrow().in_flight.contains_key(&FrameKey {
            token,
            index,
            quality,
        })
    }

    /// The in-flight load of a tier, if any.
    pub fn pending_load(&self, index: FrameIndex, quality: Quality) -> Option<FrameLoad> {
        let token = self
            .target
            .upgrade()
            .and_then(|t| t.frame_request(index, quality))?
            .token;
        self.state
            .borrow()
            .in_flight
            .get(&FrameKey {
                token,
                index,
                quality,
            })
            .cloned()
    }

    pub fn in_flight_count(&self) -> usize {
        self.state.borrow().in_flight.len()
    }

    pub fn queued(&self) -> Vec<FrameIndex> {
        self.state.borrow().queue.iter().copied().collect()
    }

    fn finish(&self, key: FrameKey) {
        self.state.borrow_mut().in_flight.remove(&key);
        self.pump();
    }

    fn pump(&self) {
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                if state.in_flight.len() >= self.settings.max_concurrent_loads.max(1) {
                    return;
                }
                state.queue.pop_front()
            };
            match next {
                Some(index) => {
                    if self.start_load(index, Quality::Low).is_none() {
                        log::debug!("Frame {} needs no load", index);
                    }
                }
                None => return,
            }
        }
    }
}

fn ready(value: bool) -> FrameLoad {
    future::ready(value).boxed_local().shared()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use futures::channel::oneshot;
    use futures::executor::LocalPool;
    use image::RgbaImage;
    use std::collections::{BTreeMap, HashSet};

    /// Decoder whose results are released by the test.
    #[derive(Default)]
    struct ManualDecoder {
        pending: RefCell<Vec<(String, oneshot::Sender<Result<RenderableImage, EngineError>>)>>,
    }

    impl ManualDecoder {
        fn requested(&self) -> Vec<String> {
            self.pending.borrow().iter().map(|(u, _)| u.clone()).collect()
        }

        fn complete(&self, url: &str) {
            let pos = self.pending.borrow().iter().position(|(u, _)| u == url);
            if let Some(pos) = pos {
                let (_, tx) = self.pending.borrow_mut().remove(pos);
                let _ = tx.send(Ok(RenderableImage::new(RgbaImage::new(1, 1))));
            }
        }

        fn fail(&self, url: &str) {
            let pos = self.pending.borrow().iter().position(|(u, _)| u == url);
            if let Some(pos) = pos {
                let (_, tx) = self.pending.borrow_mut().remove(pos);
                let _ = tx.send(Err(EngineError::frame_decode(url, "broken")));
            }
        }
    }

    impl FrameDecoder for ManualDecoder {
        fn decode_frame(&self, url: &str) -> LocalBoxFuture<'static, Result<RenderableImage, EngineError>> {
            let (tx, rx) = oneshot::channel();
            self.pending.borrow_mut().push((url.to_string(), tx));
            let url = url.to_string();
            async move {
                rx.await
                    .unwrap_or_else(|_| Err(EngineError::frame_decode(url, "cancelled")))
            }
            .boxed_local()
        }
    }

    struct Target {
        token: u64,
        frames: usize,
        loaded: RefCell<HashSet<(FrameIndex, Quality)>>,
        merges: RefCell<Vec<FrameIndex>>,
        active: Option<Vec<FrameIndex>>,
    }

    impl Target {
        fn new(frames: usize) -> Self {
            Self {
                token: 1,
                frames,
                loaded: RefCell::new(HashSet::new()),
                merges: RefCell::new(Vec::new()),
                active: None,
            }
        }
    }

    impl FrameTarget for Target {
        fn frame_request(&self, index: FrameIndex, quality: Quality) -> Option<FrameRequest> {
            if index.0 >= self.frames || self.is_frame_loaded(index, quality) {
                return None;
            }
            Some(FrameRequest {
                token: self.token,
                index,
                quality,
                url: format!("{}/{}", index, quality.name()),
            })
        }

        fn is_frame_loaded(&self, index: FrameIndex, quality: Quality) -> bool {
            self.loaded.borrow().contains(&(index, quality))
        }

        fn merge_frame(&self, request: &FrameRequest, _data: RenderableImage) -> bool {
            if request.token != self.token {
                return false;
            }
            self.merges.borrow_mut().push(request.index);
            self.loaded.borrow_mut().insert((request.index, request.quality))
        }

        fn active_indices(&self) -> Vec<FrameIndex> {
            self.active
                .clone()
                .unwrap_or_else(|| (0..self.frames).map(FrameIndex).collect())
        }
    }

    struct Fixture {
        pool: LocalPool,
        decoder: Rc<ManualDecoder>,
        target: Rc<Target>,
        loader: Rc<FrameLoader>,
    }

    fn fixture(target: Target, max_concurrent_loads: usize) -> Fixture {
        let pool = LocalPool::new();
        let decoder = Rc::new(ManualDecoder::default());
        let target = Rc::new(target);
        let weak: Weak<dyn FrameTarget> = {
            let dyn_target: Rc<dyn FrameTarget> = target.clone();
            Rc::downgrade(&dyn_target)
        };
        let settings = FrameLoadingConfig {
            max_concurrent_loads,
            ..FrameLoadingConfig::default()
        };
        let loader = FrameLoader::new(decoder.clone(), Rc::new(pool.spawner()), settings, weak);
        Fixture {
            pool,
            decoder,
            target,
            loader,
        }
    }

    #[test]
    fn test_concurrent_loads_share_one_request() {
        let mut f = fixture(Target::new(4), 4);
        let first = f.loader.load_frame(FrameIndex(1), Quality::Low);
        let second = f.loader.load_frame(FrameIndex(1), Quality::Low);
        f.pool.run_until_stalled();
        assert_eq!(f.decoder.requested(), vec!["1/lq".to_string()]);

        f.decoder.complete("1/lq");
        let results = f.pool.run_until(future::join(first, second));
        assert_eq!(results, (true, true));
        assert_eq!(*f.target.merges.borrow(), vec![FrameIndex(1)]);
        assert_eq!(f.loader.in_flight_count(), 0);
    }

    #[test]
    fn test_loaded_frame_resolves_immediately() {
        let mut f = fixture(Target::new(2), 4);
        f.target.loaded.borrow_mut().insert((FrameIndex(0), Quality::Low));
        assert!(f.pool.run_until(f.loader.load_frame(FrameIndex(0), Quality::Low)));
        assert!(!f.pool.run_until(f.loader.load_frame(FrameIndex(9), Quality::Low)));
        assert!(f.decoder.requested().is_empty());
    }

    #[test]
    fn test_window_is_forward_only() {
        let mut f = fixture(Target::new(10), 4);
        f.loader.schedule_window(FrameIndex(4));
        f.pool.run_until_stalled();
        assert_eq!(f.decoder.requested(), vec!["4/lq", "5/lq", "6/lq"]);
    }

    #[test]
    fn test_window_respects_active_set() {
        let mut target = Target::new(6);
        target.active = Some(vec![FrameIndex(2), FrameIndex(3)]);
        let mut f = fixture(target, 4);
        f.loader.schedule_window(FrameIndex(2));
        f.pool.run_until_stalled();
        assert_eq!(f.decoder.requested(), vec!["2/lq", "3/lq"]);
    }

    #[test]
    fn test_cap_queues_and_rescheduling_replaces_queue() {
        let mut f = fixture(Target::new(20), 1);
        f.loader.schedule_window(FrameIndex(0));
        f.pool.run_until_stalled();
        assert_eq!(f.decoder.requested(), vec!["0/lq"]);
        assert_eq!(f.loader.queued(), vec![FrameIndex(1), FrameIndex(2)]);

        f.loader.schedule_window(FrameIndex(10));
        assert_eq!(f.loader.queued(), vec![FrameIndex(10), FrameIndex(11), FrameIndex(12)]);

        f.decoder.complete("0/lq");
        f.pool.run_until_stalled();
        assert_eq!(f.decoder.requested(), vec!["10/lq"]);
        assert_eq!(f.loader.queued(), vec![FrameIndex(11), FrameIndex(12)]);
    }

    #[test]
    fn test_failed_decode_resolves_false_and_frees_slot() {
        let mut f = fixture(Target::new(3), 4);
        let load = f.loader.load_frame(FrameIndex(2), Quality::Low);
        f.pool.run_until_stalled();
        f.decoder.fail("2/lq");
        assert!(!f.pool.run_until(load));
        assert_eq!(f.loader.in_flight_count(), 0);
        assert!(f.target.merges.borrow().is_empty());
    }

    #[test]
    fn test_out_of_order_completion_merges_each_frame() {
        let mut f = fixture(Target::new(5), 4);
        f.loader.schedule_window(FrameIndex(0));
        f.pool.run_until_stalled();
        for url in ["2/lq", "0/lq", "1/lq"] {
            f.decoder.complete(url);
        }
        f.pool.run_until_stalled();
        let merged: BTreeMap<_, _> = f.target.merges.borrow().iter().map(|i| (*i, ())).collect();
        assert_eq!(merged.len(), 3);
        assert!(!f.loader.is_in_flight(FrameIndex(0), Quality::Low));
    }
}
