//! Playback controls for multi-frame items.

use std::rc::Rc;

use web_time::Instant;

use crate::index_map::FrameIndex;
use crate::keybinding::Keybinding;
use crate::plugin::{Plugin, PluginConfig, PluginContext};

use super::active_view_command;

pub const VIDEO_PLAYER_COMMANDS: &[&str] = &[
    "video.toggle",
    "video.play",
    "video.stop",
    "video.next_frame",
    "video.prev_frame",
    "video.jump",
];

pub struct VideoPlayerPlugin;

impl Plugin for VideoPlayerPlugin {
    fn activate(&self, context: &dyn PluginContext) {
        let slot = context.active_view_slot();

        context.register_command(
            "video.toggle",
            active_view_command(&slot, |view, _| view.toggle_playback(Instant::now())),
        );
        context.register_command(
            "video.play",
            active_view_command(&slot, |view, _| view.play(Instant::now())),
        );
        context.register_command("video.stop", active_view_command(&slot, |view, _| view.stop()));
        context.register_command(
            "video.next_frame",
            active_view_command(&slot, |view, _| {
                view.stop();
                if let Some(next) = view.next_frame_index() {
                    view.jump_to_frame(next, false);
                }
            }),
        );
        context.register_command(
            "video.prev_frame",
            active_view_command(&slot, |view, _| {
                view.stop();
                if let Some(previous) = view.previous_frame_index() {
                    view.jump_to_frame(previous, false);
                }
            }),
        );
        // args: [absolute frame index]
        context.register_command(
            "video.jump",
            active_view_command(&slot, |view, args| {
                let Some(index) = args.first().and_then(|v| v.as_u64()) else {
                    log::warn!("video.jump expects a frame index");
                    return;
                };
                view.stop();
                if !view.jump_to_frame(FrameIndex(index as usize), false) {
                    log::debug!("Frame {} is not in the active set", index);
                }
            }),
        );
    }

    fn deactivate(&self, context: &dyn PluginContext) {
        for view in context.views() {
            view.stop();
        }
        for name in VIDEO_PLAYER_COMMANDS {
            context.unregister_command(name);
        }
    }
}

pub fn video_player_plugin() -> PluginConfig {
    PluginConfig::new("video_player", Rc::new(VideoPlayerPlugin))
        .with_keybinding(Keybinding::new(&["space"], "video.toggle"))
        .with_keybinding(Keybinding::new(&["."], "video.next_frame"))
        .with_keybinding(Keybinding::new(&[","], "video.prev_frame"))
}
