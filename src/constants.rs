//! Global constants for the annotation engine.
//!
//! The frame-loading and playback numbers are empirical; every one of them can
//! be overridden through [`crate::config::EngineConfig`].

use std::time::Duration;

/// Number of frames scheduled ahead of the requested index (forward only).
pub const DEFAULT_PREFETCH_WINDOW: usize = 3;

/// Maximum number of frame decodes in flight per view.
pub const DEFAULT_MAX_CONCURRENT_LOADS: usize = 4;

/// How long before a frame is due the player starts fetching it.
pub const DEFAULT_PLAYBACK_LEAD: Duration = Duration::from_millis(100);

/// Playback rate used when the loaded video does not report one.
pub const DEFAULT_PLAYBACK_FPS: f32 = 24.0;

/// Upper bound for the camera scale.
pub const MAX_SCALE: f32 = 50.0;

/// Zoom factor used by a single zoom-in / zoom-out step.
pub const DEFAULT_ZOOM_FACTOR: f32 = 1.25;

/// Margin (canvas pixels) of image content that always stays visible when scrolling.
pub const CANVAS_CONTENT_VISIBILITY_MARGIN: f32 = 20.0;

/// Distance (canvas pixels) under which the cursor closes a path on its first vertex.
pub const CURSOR_FIRST_VERTEX_MAX_DISTANCE: f32 = 8.0;

/// Padding added on each side of an annotation when zooming to it,
/// as a fraction of the image size.
pub const ZOOM_TO_ANNOTATION_PADDING: f32 = 0.1;

/// Tool whose activation keeps the current annotation selection.
pub const SELECTION_PRESERVING_TOOL: &str = "brush_tool";

/// Tool that reports the selected annotation's type instead of its own list.
pub const EDIT_TOOL: &str = "edit_tool";

/// Tools left available when the item is read-only or consensus-locked.
pub const READONLY_TOOLS: &[&str] = &["select_tool", "commentator", "zoom_tool"];

/// Tools available while the user is inside a consensus stage.
pub const CONSENSUS_TOOLS: &[&str] = &[
    "bounding_box_tool",
    "polygon_tool",
    "auto_annotate_tool",
    "brush_tool",
    "commentator",
    "edit_tool",
];

/// Tools that additionally produce `mask` annotations when rasters are enabled.
pub const RASTER_CAPABLE_TOOLS: &[&str] = &["polygon_tool", "brush_tool"];
