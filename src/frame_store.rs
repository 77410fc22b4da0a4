//! Sparse per-video frame map with targeted, monotonic merges.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::index_map::{FrameIndex, ItemGroup, ZeroBasedIndex};
use crate::model::{FrameRecord, Quality, RenderableImage};

/// Frames of one multi-frame item keyed by absolute index.
///
/// Absent entries mean "not known yet". Existing entries are never replaced:
/// decoded tiers are merged into the record in place.
#[derive(Debug, Clone, Default)]
pub struct FrameStore {
    frames: BTreeMap<FrameIndex, FrameRecord>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from frame records keyed by absolute index.
    pub fn from_records(records: impl IntoIterator<Item = (FrameIndex, FrameRecord)>) -> Self {
        let mut store = Self::new();
        for (index, record) in records {
            store.insert(index, record);
        }
        store
    }

    /// Add a record unless one already exists at `index`.
    pub fn insert(&mut self, index: FrameIndex, record: FrameRecord) -> bool {
        if self.frames.contains_key(&index) {
            return false;
        }
        self.frames.insert(index, record);
        true
    }

    pub fn get(&self, index: FrameIndex) -> Option<&FrameRecord> {
        self.frames.get(&index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first_index(&self) -> Option<FrameIndex> {
        self.frames.keys().next().copied()
    }

    pub fn is_loaded(&self, index: FrameIndex, quality: Quality) -> bool {
        self.frames
            .get(&index)
            .is_some_and(|frame| frame.is_loaded(quality))
    }

    pub fn is_lq_loaded(&self, index: FrameIndex) -> bool {
        self.is_loaded(index, Quality::Low)
    }

    /// Merge decoded data into exactly one frame tier.
    ///
    /// Returns false when the frame is unknown or the tier is already loaded;
    /// other frames and the other tier are never touched.
    pub fn merge(&mut self, index: FrameIndex, quality: Quality, data: Rc<RenderableImage>) -> bool {
        match self.frames.get_mut(&index) {
            Some(frame) => frame.set_data(quality, data),
            None => false,
        }
    }

    /// Absolute indices of the active frame set, ascending.
    ///
    /// With a group this is the group's members that exist in the store.
    pub fn active_indices(&self, group: Option<&ItemGroup>) -> Vec<FrameIndex> {
        match group {
            Some(group) => group
                .indices()
                .iter()
                .copied()
                .filter(|i| self.frames.contains_key(i))
                .collect(),
            None => self.frames.keys().copied().collect(),
        }
    }

    /// Frames of the active set, keyed by absolute index.
    pub fn frames(&self, group: Option<&ItemGroup>) -> BTreeMap<FrameIndex, &FrameRecord> {
        self.frames
            .iter()
            .filter(|(index, _)| group.is_none_or(|g| g.contains(**index)))
            .map(|(index, frame)| (*index, frame))
            .collect()
    }

    /// Frames of the active set, re-keyed from zero in index order.
    pub fn zero_based_frames(
        &self,
        group: Option<&ItemGroup>,
    ) -> BTreeMap<ZeroBasedIndex, &FrameRecord> {
        match group {
            // identity over the full set
            None => self
                .frames
                .iter()
                .map(|(index, frame)| (ZeroBasedIndex(index.0), frame))
                .collect(),
            Some(_) => self
                .frames(group)
                .into_values()
                .enumerate()
                .map(|(position, frame)| (ZeroBasedIndex(position), frame))
                .collect(),
        }
    }
}
