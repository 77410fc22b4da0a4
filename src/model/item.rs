//! Items: the logical units a view can display.

use serde::{Deserialize, Serialize};

use crate::index_map::ItemGroup;

/// Opaque item identifier.
pub type ItemId = u64;

/// Media kind of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    /// Multi-frame study (DICOM-like), optionally split into groups
    Study,
}

impl MediaKind {
    /// Whether items of this kind resolve to frames rather than a single image.
    pub fn is_multi_frame(&self) -> bool {
        !matches!(self, MediaKind::Image)
    }
}

/// Workflow status of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    New,
    Annotate,
    Review,
    Complete,
}

/// Named partition of a multi-frame item into frame groups (e.g. DICOM series).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLayout {
    pub name: String,
    pub groups: Vec<Vec<usize>>,
}

impl ItemLayout {
    /// Group at `position` of the layout, if any.
    pub fn group(&self, position: usize) -> Option<ItemGroup> {
        self.groups.get(position).map(|g| ItemGroup::new(g.iter().copied()))
    }
}

/// A logical annotatable unit. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub kind: MediaKind,
    /// Location understood by the media resolver (URL, path)
    pub source: String,
    #[serde(default)]
    pub layout: Option<ItemLayout>,
    #[serde(default)]
    pub status: ItemStatus,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, kind: MediaKind, source: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            source: source.into(),
            layout: None,
            status: ItemStatus::default(),
        }
    }

    pub fn with_layout(mut self, layout: ItemLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.status == ItemStatus::Complete
    }
}
