//! The editor: composition root of views, tools, plugins and the render loop.
//!
//! An [`Editor`] owns every manager that is global to one editing session
//! (commands, tools, plugins, serializers) plus the views of the current
//! layout. A single loop driven by a [`FrameScheduler`] ticks and paints all
//! views; it never waits for loads.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use serde_json::Value;
use web_time::Instant;

use crate::collaborators::EngineServices;
use crate::commands::CommandBus;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::Subscribers;
use crate::index_map::{FrameIndex, ItemGroup};
use crate::item_loader::LoadOutcome;
use crate::keybinding::KeyEvent;
use crate::layout::{LayoutConfig, ViewConfig};
use crate::model::{Annotation, Item};
use crate::plugin::{PluginConfig, PluginHost, PluginManager};
use crate::render::{Canvas, SerializerManager};
use crate::state::{AccessContext, EditorState};
use crate::tool::{Tool, ToolManager};
use crate::view::{ActiveViewSlot, View, ViewList};

/// Callback run on the next animation frame with the frame timestamp.
pub type FrameCallback = Box<dyn FnOnce(Instant)>;

/// Source of animation frames (`requestAnimationFrame`, a vsync timer, a test clock).
pub trait FrameScheduler {
    /// Run `callback` once on the next frame. Returns a handle for cancellation.
    fn request_frame(&self, callback: FrameCallback) -> u64;

    fn cancel_frame(&self, handle: u64);
}

/// Canvas a view paints into.
pub type SharedCanvas = Rc<RefCell<dyn Canvas>>;

pub struct Editor {
    config: EngineConfig,
    services: EngineServices,
    state: Rc<EditorState>,
    commands: Rc<CommandBus>,
    tools: Rc<ToolManager>,
    plugins: PluginManager,
    serializers: Rc<SerializerManager>,
    views: ViewList,
    active_view: ActiveViewSlot,
    layout: RefCell<LayoutConfig>,
    canvases: RefCell<HashMap<u64, SharedCanvas>>,
    scheduler: Rc<dyn FrameScheduler>,
    frame_handle: Cell<Option<u64>>,
    running: Cell<bool>,
    next_view_id: Cell<u64>,
    weak_self: Weak<Editor>,
    /// Emitted after `init` built the views of a new layout
    pub layout_changed: Subscribers<LayoutConfig>,
    /// Emitted with the id of the newly active view
    pub active_view_changed: Subscribers<u64>,
}

impl Editor {
    pub fn new(
        config: EngineConfig,
        services: EngineServices,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Rc<Self> {
        let state = Rc::new(EditorState::new(
            config.feature_flags.clone(),
            config.tool_access.clone(),
        ));
        let commands = Rc::new(CommandBus::new());
        let active_view: ActiveViewSlot = Rc::new(RefCell::new(None));
        let views: ViewList = Rc::new(RefCell::new(Vec::new()));
        let tools = ToolManager::new(Rc::clone(&commands), Rc::clone(&state), Rc::clone(&active_view));
        let serializers = Rc::new(SerializerManager::new());
        let plugins = PluginManager::new(PluginHost {
            commands: Rc::clone(&commands),
            tools: Rc::clone(&tools),
            serializers: Rc::clone(&serializers),
            views: Rc::clone(&views),
            active_view: Rc::clone(&active_view),
        });

        Rc::new_cyclic(|weak_self| Self {
            config,
            services,
            state,
            commands,
            tools,
            plugins,
            serializers,
            views,
            active_view,
            layout: RefCell::new(LayoutConfig::default()),
            canvases: RefCell::new(HashMap::new()),
            scheduler,
            frame_handle: Cell::new(None),
            running: Cell::new(false),
            next_view_id: Cell::new(0),
            weak_self: weak_self.clone(),
            layout_changed: Subscribers::new(),
            active_view_changed: Subscribers::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &Rc<EditorState> {
        &self.state
    }

    pub fn commands(&self) -> &Rc<CommandBus> {
        &self.commands
    }

    pub fn tools(&self) -> &Rc<ToolManager> {
        &self.tools
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn serializers(&self) -> &Rc<SerializerManager> {
        &self.serializers
    }

    pub fn views(&self) -> Vec<View> {
        self.views.borrow().clone()
    }

    pub fn view(&self, id: u64) -> Option<View> {
        self.views.borrow().iter().find(|v| v.id() == id).cloned()
    }

    pub fn active_view(&self) -> Option<View> {
        self.active_view.borrow().clone()
    }

    pub fn layout(&self) -> LayoutConfig {
        self.layout.borrow().clone()
    }

    /// Replace the views with one view per layout entry.
    ///
    /// The first view becomes active. Installed plugins are reinstalled so the
    /// new views receive their renderers, tool availability is recomputed and
    /// each view starts loading its item in the background.
    pub fn init(&self, layout: LayoutConfig) -> EngineResult<()> {
        self.release_views();

        let views: Vec<View> = layout
            .views
            .iter()
            .map(|_| {
                let id = self.next_view_id.get();
                self.next_view_id.set(id + 1);
                View::new(id, &self.services, &self.config)
            })
            .collect();
        *self.views.borrow_mut() = views.clone();
        *self.active_view.borrow_mut() = views.first().cloned();
        *self.layout.borrow_mut() = layout.clone();

        self.plugins.reinstall()?;
        self.refresh_access();
        log::info!("Initialised layout {:?} with {} views", layout.kind, views.len());

        for (view, view_config) in views.iter().zip(&layout.views) {
            if let Some(item) = view_config.item.clone() {
                let load = view.set_item(item, view_config.frames_group.clone());
                self.spawn_load(view.id(), load);
            }
        }

        self.layout_changed.emit(&layout);
        if let Some(view) = views.first() {
            self.active_view_changed.emit(&view.id());
        }
        Ok(())
    }

    /// Install `plugins`, replacing every installed plugin.
    pub fn install_all_plugins(&self, plugins: Vec<PluginConfig>) -> EngineResult<()> {
        self.plugins.install_all(plugins)?;
        self.tools.define_available_tools();
        Ok(())
    }

    pub fn register_command(&self, name: &str, handler: impl Fn(&[Value]) + 'static) {
        self.commands.register(name, handler);
    }

    /// Run a command on the editor's bus. Unknown commands are logged and ignored.
    pub fn call_command(&self, name: &str, args: &[Value]) -> bool {
        self.commands.call(name, args)
    }

    /// Show `item` in one view.
    ///
    /// The request is issued before this returns; the future resolves once
    /// the media is applied, superseded or failed.
    pub fn set_view_item(
        &self,
        view_id: u64,
        item: Item,
        group: Option<ItemGroup>,
    ) -> LocalBoxFuture<'static, EngineResult<LoadOutcome>> {
        let Some(view) = self.view(view_id) else {
            return future::ready(Err(EngineError::ViewNotFound(view_id))).boxed_local();
        };
        let load = view.set_item(item, group);
        let editor = self.weak_self.clone();
        async move {
            let outcome = load.await?;
            if outcome == LoadOutcome::Applied {
                if let Some(editor) = editor.upgrade() {
                    editor.refresh_access();
                }
            }
            Ok(outcome)
        }
        .boxed_local()
    }

    /// Reconfigure one view of the layout.
    ///
    /// Keeping the same item, shown or still loading, only changes the
    /// group. A different item resets
    /// the active tool and clears the view's annotations before loading.
    pub fn set_view_config(
        &self,
        view_id: u64,
        view_config: ViewConfig,
    ) -> LocalBoxFuture<'static, EngineResult<LoadOutcome>> {
        let Some(view) = self.view(view_id) else {
            return future::ready(Err(EngineError::ViewNotFound(view_id))).boxed_local();
        };
        self.store_view_config(view_id, &view_config);

        let Some(item) = view_config.item else {
            view.clear();
            return future::ready(Ok(LoadOutcome::Applied)).boxed_local();
        };

        let target = view.pending_item().or_else(|| view.item().map(|i| i.id));
        if target == Some(item.id) {
            return view.set_item(item, view_config.frames_group);
        }

        self.tools.reset_current_tool();
        let annotations = view.annotation_manager();
        annotations.deselect_all_annotations();
        annotations.set_annotations(Vec::new());
        self.set_view_item(view_id, item, view_config.frames_group)
    }

    /// Make another view receive tool input. The active tool is reset first.
    pub fn set_active_view(&self, view_id: u64) -> EngineResult<()> {
        let view = self.view(view_id).ok_or(EngineError::ViewNotFound(view_id))?;
        if self.active_view().is_some_and(|active| active.same(&view)) {
            return Ok(());
        }

        self.tools.reset_current_tool();
        *self.active_view.borrow_mut() = Some(view);
        self.refresh_access();
        log::debug!("Active view is now {}", view_id);
        self.active_view_changed.emit(&view_id);
        Ok(())
    }

    /// Dispatch a key event to tool bindings, then to plugin bindings.
    pub fn handle_key_event(&self, event: &mut KeyEvent) {
        self.tools.handle_keybindings(event);
        self.plugins.handle_keybindings(event);
    }

    /// Update the permission context and recompute the available tools.
    pub fn set_access(&self, access: AccessContext) {
        self.state.set_access(access);
        self.tools.define_available_tools();
    }

    pub fn attach_canvas(&self, view_id: u64, canvas: SharedCanvas) {
        self.canvases.borrow_mut().insert(view_id, canvas);
    }

    pub fn detach_canvas(&self, view_id: u64) {
        self.canvases.borrow_mut().remove(&view_id);
    }

    /// Start the render loop. Does nothing if it already runs.
    pub fn start(&self) {
        if self.running.replace(true) {
            return;
        }
        self.schedule_frame();
    }

    /// Stop the render loop by cancelling the scheduled frame.
    pub fn stop(&self) {
        self.running.set(false);
        if let Some(handle) = self.frame_handle.take() {
            self.scheduler.cancel_frame(handle);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// One iteration of the render loop: paint, then re-schedule.
    pub fn on_animation_frame(&self, now: Instant) {
        self.frame_handle.set(None);
        self.render_frame(now);
        if self.running.get() {
            self.schedule_frame();
        }
    }

    /// Tick playback of every view and paint the views that have a canvas.
    ///
    /// Annotations the active tool hides are skipped. Returns the number of
    /// views painted.
    pub fn render_frame(&self, now: Instant) -> usize {
        let filter = self.render_filter();
        let mut painted = 0;
        for view in self.views() {
            view.tick(now);
            let canvas = self.canvases.borrow().get(&view.id()).cloned();
            if let Some(canvas) = canvas {
                view.render(&mut *canvas.borrow_mut(), |a| {
                    filter.as_ref().is_none_or(|tool| tool.should_render(a))
                });
                painted += 1;
            }
        }
        painted
    }

    /// Recompute overlays and measures of every view.
    pub fn refresh_overlays(&self) {
        let filter = self.render_filter();
        for view in self.views() {
            view.refresh_overlays(|a| filter.as_ref().is_none_or(|tool| tool.should_render(a)));
        }
    }

    /// Zoom the active view onto an annotation.
    pub fn zoom_to_annotation(&self, annotation: &Annotation) -> bool {
        self.active_view()
            .is_some_and(|view| view.zoom_to_annotation(annotation))
    }

    /// Jump the active view to a frame.
    pub fn jump_to_frame(&self, index: FrameIndex) -> bool {
        self.active_view()
            .is_some_and(|view| view.jump_to_frame(index, false))
    }

    /// Stop rendering, uninstall plugins and drop every view.
    pub fn cleanup(&self) {
        self.stop();
        self.plugins.cleanup();
        self.tools.cleanup();
        self.release_views();
        *self.layout.borrow_mut() = LayoutConfig::default();
        log::debug!("Editor cleaned up");
    }

    fn release_views(&self) {
        let views: Vec<View> = self.views.borrow_mut().drain(..).collect();
        for view in &views {
            view.cleanup();
        }
        *self.active_view.borrow_mut() = None;
        self.canvases.borrow_mut().clear();
    }

    fn render_filter(&self) -> Option<Rc<dyn Tool>> {
        self.tools
            .current_tool()
            .and_then(|name| self.tools.tool(&name))
    }

    fn schedule_frame(&self) {
        let editor = self.weak_self.clone();
        let handle = self.scheduler.request_frame(Box::new(move |now| {
            if let Some(editor) = editor.upgrade() {
                editor.on_animation_frame(now);
            }
        }));
        self.frame_handle.set(Some(handle));
    }

    fn spawn_load(&self, view_id: u64, load: LocalBoxFuture<'static, EngineResult<LoadOutcome>>) {
        let editor = self.weak_self.clone();
        let task = async move {
            if let Ok(LoadOutcome::Applied) = load.await {
                if let Some(editor) = editor.upgrade() {
                    editor.refresh_access();
                }
            }
        };
        if let Err(e) = self.services.spawner.spawn_local(task) {
            log::warn!("Failed to start loading view {}: {}", view_id, e);
        }
    }

    fn store_view_config(&self, view_id: u64, view_config: &ViewConfig) {
        let position = self.views.borrow().iter().position(|v| v.id() == view_id);
        if let Some(position) = position {
            if let Some(slot) = self.layout.borrow_mut().views.get_mut(position) {
                *slot = view_config.clone();
            }
        }
    }

    /// Derive the read-only parts of the access context from the active view.
    fn refresh_access(&self) {
        let (item_complete, view_readonly) = match self.active_view() {
            Some(view) => (
                view.item().is_some_and(|item| item.is_complete()),
                view.is_readonly(),
            ),
            None => (false, false),
        };
        let mut access = self.state.access();
        access.item_complete = item_complete;
        access.view_readonly = view_readonly;
        self.state.set_access(access);
        self.tools.define_available_tools();
    }
}
