//! Plugins: bundles of tools, commands and renderers installed into an editor.
//!
//! A plugin only talks to the editor through the [`PluginContext`] it is
//! handed on activation. The context forwards each registration to the
//! manager owning that capability; renderer and overlay registrations apply to
//! every view of the editor.

mod context;
mod manager;

use std::fmt;
use std::rc::Rc;

use crate::commands::{CommandBus, CommandHandler};
use crate::keybinding::Keybinding;
use crate::render::{AnnotationOverlayer, AnnotationRenderer, MeasureOverlayer, RasterRenderer, Serializer};
use crate::tool::{Tool, ToolConfig};
use crate::view::{ActiveViewSlot, View};

pub use context::{PluginHost, PluginRegistrar};
pub use manager::PluginManager;

/// Behaviour of one plugin.
pub trait Plugin {
    fn activate(&self, context: &dyn PluginContext);

    fn deactivate(&self, context: &dyn PluginContext);
}

/// Registration surface handed to a plugin.
pub trait PluginContext {
    /// Register a tool declared in the plugin's `tools`. Undeclared tools are ignored.
    fn register_tool(&self, name: &str, tool: Rc<dyn Tool>);
    fn unregister_tool(&self, name: &str);

    fn register_command(&self, name: &str, handler: CommandHandler);
    fn unregister_command(&self, name: &str);

    fn register_annotation_renderer(&self, name: &str, renderer: Rc<dyn AnnotationRenderer>);
    fn unregister_annotation_renderer(&self, name: &str);

    fn register_raster_renderer(&self, name: &str, renderer: Rc<dyn RasterRenderer>);
    fn unregister_raster_renderer(&self, name: &str);

    fn register_serializer(&self, name: &str, serializer: Rc<dyn Serializer>);
    fn unregister_serializer(&self, name: &str);

    fn register_annotation_overlayer(&self, name: &str, overlayer: Rc<dyn AnnotationOverlayer>);
    fn unregister_annotation_overlayer(&self, name: &str);

    fn register_measure_overlayer(&self, name: &str, overlayer: Rc<dyn MeasureOverlayer>);
    fn unregister_measure_overlayer(&self, name: &str);

    /// The editor's command bus, for handlers that call other commands.
    fn commands(&self) -> Rc<CommandBus>;

    /// Slot holding the active view. Read it when a command runs, not at registration.
    fn active_view_slot(&self) -> ActiveViewSlot;

    fn views(&self) -> Vec<View>;
}

/// Declarative descriptor of a plugin.
#[derive(Clone)]
pub struct PluginConfig {
    /// The implementation; installing a descriptor without one is an error
    pub plugin: Option<Rc<dyn Plugin>>,
    pub name: String,
    pub version: String,
    pub active: bool,
    /// Plugin-level bindings, dispatched independently of tool bindings
    pub keybindings: Vec<Keybinding>,
    /// Configs of the tools the plugin may register
    pub tools: Vec<ToolConfig>,
}

impl PluginConfig {
    pub fn new(name: &str, plugin: Rc<dyn Plugin>) -> Self {
        Self {
            plugin: Some(plugin),
            name: name.to_string(),
            version: "1.0.0".to_string(),
            active: false,
            keybindings: Vec::new(),
            tools: Vec::new(),
        }
    }

    pub fn with_keybinding(mut self, keybinding: Keybinding) -> Self {
        self.keybindings.push(keybinding);
        self
    }

    pub fn with_tool(mut self, tool: ToolConfig) -> Self {
        self.tools.push(tool);
        self
    }

    /// Same plugin with its tools replaced (e.g. `vec![]` for render-only installs).
    pub fn with_tools(mut self, tools: Vec<ToolConfig>) -> Self {
        self.tools = tools;
        self
    }
}

impl fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConfig")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("active", &self.active)
            .field("has_plugin", &self.plugin.is_some())
            .field("keybindings", &self.keybindings)
            .field("tools", &self.tools)
            .finish()
    }
}
