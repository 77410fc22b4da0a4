//! The registration context handed to each installed plugin.

use std::rc::Rc;

use crate::commands::{CommandBus, CommandHandler};
use crate::render::{
    AnnotationOverlayer, AnnotationRenderer, MeasureOverlayer, RasterRenderer, Serializer,
    SerializerManager,
};
use crate::tool::{Tool, ToolConfig, ToolManager};
use crate::view::{ActiveViewSlot, View, ViewList};

use super::PluginContext;

/// The editor-owned managers plugin registrations land in.
#[derive(Clone)]
pub struct PluginHost {
    pub commands: Rc<CommandBus>,
    pub tools: Rc<ToolManager>,
    pub serializers: Rc<SerializerManager>,
    pub views: ViewList,
    pub active_view: ActiveViewSlot,
}

/// [`PluginContext`] of one installed plugin.
///
/// Built fresh on every install; it knows the tool configs of its plugin so
/// `register_tool` can pair an implementation with its descriptor.
pub struct PluginRegistrar {
    host: PluginHost,
    tool_configs: Vec<ToolConfig>,
}

impl PluginRegistrar {
    pub fn new(host: PluginHost, tool_configs: Vec<ToolConfig>) -> Self {
        Self { host, tool_configs }
    }

    fn each_view(&self, f: impl Fn(&View)) {
        let views = self.views();
        for view in &views {
            f(view);
        }
    }
}

impl PluginContext for PluginRegistrar {
    fn register_tool(&self, name: &str, tool: Rc<dyn Tool>) {
        let Some(config) = self.tool_configs.iter().find(|c| c.name == name).cloned() else {
            log::debug!("Tool '{}' is not part of this plugin install; skipped", name);
            return;
        };
        self.host.tools.register_tool(name, tool, config);
    }

    fn unregister_tool(&self, name: &str) {
        self.host.tools.unregister_tool(name);
    }

    fn register_command(&self, name: &str, handler: CommandHandler) {
        self.host.commands.register(name, move |args| handler(args));
    }

    fn unregister_command(&self, name: &str) {
        self.host.commands.unregister(name);
    }

    fn register_annotation_renderer(&self, name: &str, renderer: Rc<dyn AnnotationRenderer>) {
        self.each_view(|view| {
            view.render_manager()
                .register_annotation_renderer(name, Rc::clone(&renderer))
        });
    }

    fn unregister_annotation_renderer(&self, name: &str) {
        self.each_view(|view| view.render_manager().unregister_annotation_renderer(name));
    }

    fn register_raster_renderer(&self, name: &str, renderer: Rc<dyn RasterRenderer>) {
        self.each_view(|view| {
            view.render_manager()
                .register_raster_renderer(name, Rc::clone(&renderer))
        });
    }

    fn unregister_raster_renderer(&self, name: &str) {
        self.each_view(|view| view.render_manager().unregister_raster_renderer(name));
    }

    fn register_serializer(&self, name: &str, serializer: Rc<dyn Serializer>) {
        self.host.serializers.register_serializer(name, serializer);
    }

    fn unregister_serializer(&self, name: &str) {
        self.host.serializers.unregister_serializer(name);
    }

    fn register_annotation_overlayer(&self, name: &str, overlayer: Rc<dyn AnnotationOverlayer>) {
        self.each_view(|view| {
            view.overlay_manager()
                .register_annotation_overlayer(name, Rc::clone(&overlayer))
        });
    }

    fn unregister_annotation_overlayer(&self, name: &str) {
        self.each_view(|view| view.overlay_manager().unregister_annotation_overlayer(name));
    }

    fn register_measure_overlayer(&self, name: &str, overlayer: Rc<dyn MeasureOverlayer>) {
        self.each_view(|view| {
            view.measure_manager()
                .register_measure_overlayer(name, Rc::clone(&overlayer))
        });
    }

    fn unregister_measure_overlayer(&self, name: &str) {
        self.each_view(|view| view.measure_manager().unregister_measure_overlayer(name));
    }

    fn commands(&self) -> Rc<CommandBus> {
        Rc::clone(&self.host.commands)
    }

    fn active_view_slot(&self) -> ActiveViewSlot {
        Rc::clone(&self.host.active_view)
    }

    fn views(&self) -> Vec<View> {
        self.host.views.borrow().clone()
    }
}
