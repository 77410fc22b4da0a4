//! Error types for engine operations.

use thiserror::Error;

/// Errors surfaced by the annotation engine.
///
/// Only media failures and fatal programmer errors travel as `Err`; stale
/// responses, unknown commands and unregistered tools are logged and ignored.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A plugin descriptor was installed without an implementation
    #[error("Plugin '{name}' has no implementation")]
    PluginMissing {
        /// Name from the plugin descriptor
        name: String,
    },

    /// The media collaborator rejected an item
    #[error("Failed to resolve item {item_id}: {message}")]
    MediaResolution {
        /// Item that could not be resolved
        item_id: u64,
        /// Description of the failure
        message: String,
    },

    /// The decode collaborator rejected a frame
    #[error("Failed to decode frame '{url}': {message}")]
    FrameDecode {
        /// Source of the frame
        url: String,
        /// Description of the failure
        message: String,
    },

    /// Image decoding or processing error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No serializer is registered for an annotation type
    #[error("No serializer registered for annotation type '{0}'")]
    UnknownSerializer(String),

    /// The annotation collaborator failed to persist a change
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A view id did not match any view of the editor
    #[error("View not found: {0}")]
    ViewNotFound(u64),
}

impl EngineError {
    /// Create a media resolution error.
    pub fn media_resolution(item_id: u64, message: impl Into<String>) -> Self {
        Self::MediaResolution {
            item_id,
            message: message.into(),
        }
    }

    /// Create a frame decode error.
    pub fn frame_decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FrameDecode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the fatal (programmer error) class.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PluginMissing { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;
