//! `workview-replay`: play a local image or image folder through the editor
//! without a window.
//!
//! Usage: `workview-replay <path> [frames]`
//!
//! The item is loaded exactly as an interactive editor would load it; every
//! animation frame is painted into a recording canvas and a summary is
//! printed at the end.

#[cfg(not(target_arch = "wasm32"))]
mod replay {
    use std::cell::{Cell, RefCell};
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::time::Duration;

    use futures::executor::LocalPool;
    use web_time::Instant;
    use workview_engine::editor::{FrameCallback, FrameScheduler};
    use workview_engine::geometry::Size;
    use workview_engine::layout::LayoutConfig;
    use workview_engine::local::{
        ImageFileDecoder, InMemoryAnnotationFactory, LocalMediaResolver, item_for_path,
    };
    use workview_engine::plugins::builtin_plugins;
    use workview_engine::render::RecordingCanvas;
    use workview_engine::{Editor, EngineConfig, EngineResult, EngineServices};

    /// Default number of animation frames to replay.
    pub const DEFAULT_FRAMES: usize = 120;

    const FRAME_INTERVAL: Duration = Duration::from_millis(16);

    const VIEWPORT: Size = Size {
        width: 1280.0,
        height: 720.0,
    };

    /// Animation frames driven by the replay loop.
    #[derive(Default)]
    struct LoopScheduler {
        callbacks: RefCell<Vec<(u64, FrameCallback)>>,
        next_handle: Cell<u64>,
    }

    impl LoopScheduler {
        fn fire(&self, now: Instant) {
            let callbacks: Vec<(u64, FrameCallback)> = self.callbacks.borrow_mut().drain(..).collect();
            for (_, callback) in callbacks {
                callback(now);
            }
        }
    }

    impl FrameScheduler for LoopScheduler {
        fn request_frame(&self, callback: FrameCallback) -> u64 {
            let handle = self.next_handle.get();
            self.next_handle.set(handle + 1);
            self.callbacks.borrow_mut().push((handle, callback));
            handle
        }

        fn cancel_frame(&self, handle: u64) {
            self.callbacks.borrow_mut().retain(|(h, _)| *h != handle);
        }
    }

    pub fn run(path: PathBuf, frames: usize) -> EngineResult<()> {
        let config = EngineConfig::load_from_default_path().unwrap_or_default();
        env_logger::Builder::new()
            .filter_level(config.preferences.log_level.to_level_filter())
            .parse_default_env()
            .init();

        let mut pool = LocalPool::new();
        let services = EngineServices {
            resolver: Rc::new(LocalMediaResolver::new()),
            decoder: Rc::new(ImageFileDecoder::default()),
            spawner: Rc::new(pool.spawner()),
            annotation_managers: Rc::new(InMemoryAnnotationFactory),
        };
        let scheduler = Rc::new(LoopScheduler::default());
        let editor = Editor::new(config, services, scheduler.clone());

        editor.install_all_plugins(builtin_plugins())?;
        editor.init(LayoutConfig::single(item_for_path(0, &path)))?;
        let Some(view) = editor.active_view() else {
            return Ok(());
        };
        view.set_viewport(VIEWPORT);
        pool.run_until_stalled();

        if view.item().is_none() {
            log::error!("Could not load {:?}", path);
            return Ok(());
        }

        let shown = Rc::new(Cell::new(0usize));
        let s = Rc::clone(&shown);
        let subscription = view.frame_changed().subscribe(move |_| s.set(s.get() + 1));

        let canvas = Rc::new(RefCell::new(RecordingCanvas::new()));
        editor.attach_canvas(view.id(), canvas.clone());
        editor.call_command("video.play", &[]);
        editor.start();

        let started = Instant::now();
        let mut painted_images = 0;
        for _ in 0..frames {
            scheduler.fire(Instant::now());
            pool.run_until_stalled();
            painted_images += canvas.borrow().images.len();
            std::thread::sleep(FRAME_INTERVAL);
        }
        editor.stop();
        subscription.release();

        println!(
            "Replayed {:?}: {} animation frames in {:.2?}, {} painted with an image, {} frame changes",
            path,
            frames,
            started.elapsed(),
            painted_images,
            shown.get()
        );
        editor.cleanup();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("Usage: workview-replay <path> [frames]");
        std::process::exit(2);
    };
    let frames = args
        .next()
        .and_then(|f| f.parse().ok())
        .unwrap_or(replay::DEFAULT_FRAMES);

    if let Err(e) = replay::run(path.into(), frames) {
        eprintln!("Replay error: {}", e);
        std::process::exit(1);
    }
}

// WASM has no filesystem to replay from
#[cfg(target_arch = "wasm32")]
fn main() {}
