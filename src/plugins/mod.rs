//! Plugins shipped with the engine.
//!
//! They cover editor infrastructure only (playback and zoom); annotation
//! tools come from the embedding application.

mod video_player;
mod zoom;

use std::rc::Rc;

use serde_json::Value;

use crate::commands::CommandHandler;
use crate::plugin::PluginConfig;
use crate::view::{ActiveViewSlot, View};

pub use video_player::{video_player_plugin, VideoPlayerPlugin, VIDEO_PLAYER_COMMANDS};
pub use zoom::{zoom_plugin, ZoomPlugin, ZoomTool, ZOOM_COMMANDS, ZOOM_TOOL};

/// Every built-in plugin, in install order.
pub fn builtin_plugins() -> Vec<PluginConfig> {
    vec![video_player_plugin(), zoom_plugin()]
}

/// Command running `action` on whatever view is active when it is called.
fn active_view_command(slot: &ActiveViewSlot, action: impl Fn(&View, &[Value]) + 'static) -> CommandHandler {
    let slot = Rc::clone(slot);
    Rc::new(move |args: &[Value]| {
        let view = slot.borrow().clone();
        match view {
            Some(view) => action(&view, args),
            None => log::debug!("No active view for command"),
        }
    })
}
