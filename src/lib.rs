//! Workview engine - the runtime core of an annotation workspace.
//!
//! The engine shows items (images and multi-frame studies) in one or more
//! [`view::View`]s, switches items without letting late responses overwrite
//! newer ones, prefetches frames ahead of the playhead, and hosts the tools
//! and plugins that operate on the active view. Media resolution, frame
//! decoding and annotation persistence are supplied by the embedding
//! application through the traits in [`collaborators`].
//!
//! Everything runs on one thread; asynchronous work is spawned on the
//! [`futures::task::LocalSpawn`] passed in [`collaborators::EngineServices`].

pub mod camera;
pub mod collaborators;
pub mod commands;
pub mod config;
pub mod constants;
pub mod editor;
pub mod error;
pub mod events;
pub mod frame_loader;
pub mod frame_store;
pub mod geometry;
pub mod index_map;
pub mod item_loader;
pub mod keybinding;
pub mod layout;
pub mod local;
pub mod model;
pub mod playback;
pub mod plugin;
pub mod plugins;
pub mod render;
pub mod state;
pub mod tool;
pub mod view;

#[cfg(test)]
mod engine_tests;
#[cfg(test)]
mod test_support;

pub use collaborators::EngineServices;
pub use config::EngineConfig;
pub use editor::{Editor, FrameScheduler};
pub use error::{EngineError, EngineResult};
pub use view::View;
