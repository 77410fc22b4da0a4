//! Multi-view layouts.

use serde::{Deserialize, Serialize};

use crate::index_map::ItemGroup;
use crate::model::Item;

/// How the views of a layout are arranged on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Single,
    Vertical,
    Horizontal,
    Grid,
}

/// Content of one view of a layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    #[serde(default)]
    pub item: Option<Item>,
    /// Restricts a multi-frame item to one group of frames
    #[serde(default)]
    pub frames_group: Option<ItemGroup>,
}

impl ViewConfig {
    pub fn new(item: Item) -> Self {
        Self {
            item: Some(item),
            frames_group: None,
        }
    }

    pub fn with_group(mut self, group: ItemGroup) -> Self {
        self.frames_group = Some(group);
        self
    }
}

/// Views an editor shows, in order. The first view starts active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub kind: LayoutKind,
    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

impl LayoutConfig {
    /// One view showing `item`.
    pub fn single(item: Item) -> Self {
        Self {
            kind: LayoutKind::Single,
            views: vec![ViewConfig::new(item)],
        }
    }

    /// One view per group of the item's layout, arranged in a grid.
    ///
    /// Items without groups get a single unrestricted view.
    pub fn grouped(item: Item) -> Self {
        let groups: Vec<ItemGroup> = item
            .layout
            .as_ref()
            .map(|layout| (0..layout.groups.len()).filter_map(|i| layout.group(i)).collect())
            .unwrap_or_default();

        if groups.is_empty() {
            return Self::single(item);
        }

        let kind = if groups.len() == 2 {
            LayoutKind::Horizontal
        } else {
            LayoutKind::Grid
        };
        let views = groups
            .into_iter()
            .map(|group| ViewConfig::new(item.clone()).with_group(group))
            .collect();
        Self { kind, views }
    }
}
