//! Index-space mapping for grouped multi-frame items.
//!
//! Frames are always stored under their absolute (origin-based) index. A
//! dense zero-based index only exists for presentation (scrubbers, counters)
//! and is derived on demand from the active [`ItemGroup`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Absolute frame index within a multi-frame item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameIndex(pub usize);

/// Position of a frame within the active group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZeroBasedIndex(pub usize);

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ZeroBasedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered subset of absolute frame indices forming the active sub-group.
///
/// Indices are kept sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<usize>", into = "Vec<usize>")]
pub struct ItemGroup {
    indices: Vec<FrameIndex>,
}

impl ItemGroup {
    pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut indices: Vec<FrameIndex> = indices.into_iter().map(FrameIndex).collect();
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    pub fn indices(&self) -> &[FrameIndex] {
        &self.indices
    }

    pub fn first(&self) -> Option<FrameIndex> {
        self.indices.first().copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: FrameIndex) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// Position of `index` within the group.
    pub fn position(&self, index: FrameIndex) -> Option<usize> {
        self.indices.binary_search(&index).ok()
    }

    pub fn get(&self, position: usize) -> Option<FrameIndex> {
        self.indices.get(position).copied()
    }
}

impl From<Vec<usize>> for ItemGroup {
    fn from(indices: Vec<usize>) -> Self {
        Self::new(indices)
    }
}

impl From<ItemGroup> for Vec<usize> {
    fn from(group: ItemGroup) -> Self {
        group.indices.into_iter().map(|i| i.0).collect()
    }
}

/// Map an absolute index to its position in the active group.
///
/// Identity when no group is active; `None` when the index is outside the group.
pub fn to_zero_based(group: Option<&ItemGroup>, index: FrameIndex) -> Option<ZeroBasedIndex> {
    match group {
        None => Some(ZeroBasedIndex(index.0)),
        Some(group) => group.position(index).map(ZeroBasedIndex),
    }
}

/// Map a position in the active group back to its absolute index.
///
/// Identity when no group is active; `None` past the end of the group.
pub fn to_origin_based(group: Option<&ItemGroup>, index: ZeroBasedIndex) -> Option<FrameIndex> {
    match group {
        None => Some(FrameIndex(index.0)),
        Some(group) => group.get(index.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_is_sorted_and_deduplicated() {
        let group = ItemGroup::new([5, 2, 5, 3]);
        assert_eq!(group.indices(), &[FrameIndex(2), FrameIndex(3), FrameIndex(5)]);
        assert_eq!(group.first(), Some(FrameIndex(2)));
    }

    #[test]
    fn test_identity_without_group() {
        assert_eq!(to_zero_based(None, FrameIndex(7)), Some(ZeroBasedIndex(7)));
        assert_eq!(to_origin_based(None, ZeroBasedIndex(7)), Some(FrameIndex(7)));
    }

    #[test]
    fn test_mapping_within_group() {
        let group = ItemGroup::new([2, 3]);
        assert_eq!(to_zero_based(Some(&group), FrameIndex(3)), Some(ZeroBasedIndex(1)));
        assert_eq!(to_zero_based(Some(&group), FrameIndex(0)), None);
        assert_eq!(to_origin_based(Some(&group), ZeroBasedIndex(0)), Some(FrameIndex(2)));
        assert_eq!(to_origin_based(Some(&group), ZeroBasedIndex(2)), None);
    }

    #[test]
    fn test_round_trip_for_every_member() {
        let group = ItemGroup::new([4, 9, 10, 17, 40]);
        for &a in group.indices() {
            let z = to_zero_based(Some(&group), a).unwrap();
            assert_eq!(to_origin_based(Some(&group), z), Some(a));
        }
    }

    #[test]
    fn test_serde_as_plain_list() {
        let group: ItemGroup = serde_json::from_str("[3, 1]").unwrap();
        assert_eq!(serde_json::to_string(&group).unwrap(), "[1,3]");
    }
}
