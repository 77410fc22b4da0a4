//! Zoom tool and camera commands.

use std::cell::Cell;
use std::rc::Rc;

use crate::keybinding::Keybinding;
use crate::plugin::{Plugin, PluginConfig, PluginContext};
use crate::state::Cursor;
use crate::tool::{Tool, ToolConfig, ToolContext};

use super::active_view_command;

pub const ZOOM_TOOL: &str = "zoom_tool";

pub const ZOOM_COMMANDS: &[&str] = &["zoom.in", "zoom.out", "zoom.fit", "zoom.to_selected"];

/// Switches the cursor to the zoom cursor while active.
#[derive(Default)]
pub struct ZoomTool {
    previous_cursor: Cell<Cursor>,
}

impl Tool for ZoomTool {
    fn activate(&self, context: &ToolContext) {
        self.previous_cursor.set(context.state.cursor());
        context.state.select_cursor(Cursor::ZoomIn);
    }

    fn deactivate(&self, context: &ToolContext) {
        context.state.select_cursor(self.previous_cursor.get());
    }

    fn reset(&self, _context: &ToolContext) {}
}

pub struct ZoomPlugin;

impl Plugin for ZoomPlugin {
    fn activate(&self, context: &dyn PluginContext) {
        context.register_tool(ZOOM_TOOL, Rc::new(ZoomTool::default()));

        let slot = context.active_view_slot();
        context.register_command(
            "zoom.in",
            active_view_command(&slot, |view, _| view.with_camera(|camera| camera.step_in())),
        );
        context.register_command(
            "zoom.out",
            active_view_command(&slot, |view, _| view.with_camera(|camera| camera.step_out())),
        );
        context.register_command(
            "zoom.fit",
            active_view_command(&slot, |view, _| view.with_camera(|camera| camera.scale_to_fit())),
        );
        context.register_command(
            "zoom.to_selected",
            active_view_command(&slot, |view, _| {
                let Some(selected) = view.annotation_manager().selected_annotation() else {
                    return;
                };
                if !view.zoom_to_annotation(&selected) {
                    log::debug!("Annotation '{}' has no extent to zoom to", selected.id);
                }
            }),
        );
    }

    fn deactivate(&self, context: &dyn PluginContext) {
        context.unregister_tool(ZOOM_TOOL);
        for name in ZOOM_COMMANDS {
            context.unregister_command(name);
        }
    }
}

pub fn zoom_plugin() -> PluginConfig {
    PluginConfig::new("zoom", Rc::new(ZoomPlugin))
        .with_tool(
            ToolConfig::new(ZOOM_TOOL)
                .with_priority(90)
                .with_keybinding(Keybinding::new(&["z"], "zoom_tool.activate")),
        )
        .with_keybinding(Keybinding::new(&["ctrl", "="], "zoom.in"))
        .with_keybinding(Keybinding::new(&["ctrl", "-"], "zoom.out"))
        .with_keybinding(Keybinding::new(&["ctrl", "0"], "zoom.fit"))
}
