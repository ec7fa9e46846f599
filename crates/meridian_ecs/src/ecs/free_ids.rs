//! # Free Entity Ids
//!
//! Recyclable ids kept as disjoint half-open ranges keyed by their start.
//! A spawn on an explicit id far past the high-water mark frees the whole
//! gap as one range instead of one entry per id.

use std::collections::BTreeMap;

use super::entity::EntityId;

/// Ordered set of free ids, lowest handed out first.
#[derive(Debug, Default)]
pub(crate) struct FreeIds {
    /// `start -> end` (exclusive). Ranges never touch or overlap.
    ranges: BTreeMap<EntityId, EntityId>,
}

impl FreeIds {
    /// Takes the lowest free id.
    pub(crate) fn pop_lowest(&mut self) -> Option<EntityId> {
        let (start, end) = self.ranges.pop_first()?;
        if start + 1 < end {
            self.ranges.insert(start + 1, end);
        }
        Some(start)
    }

    /// Frees a single id that is not currently free.
    pub(crate) fn insert(&mut self, id: EntityId) {
        self.insert_range(id, id.saturating_add(1));
    }

    /// Frees `start..end`; none of it may be free already.
    pub(crate) fn insert_range(&mut self, mut start: EntityId, mut end: EntityId) {
        if start >= end {
            return;
        }
        if let Some((&prev_start, &prev_end)) = self.ranges.range(..start).next_back() {
            if prev_end == start {
                self.ranges.remove(&prev_start);
                start = prev_start;
            }
        }
        if let Some(next_end) = self.ranges.remove(&end) {
            end = next_end;
        }
        self.ranges.insert(start, end);
    }

    /// Claims `id`. Returns false if it was not free.
    pub(crate) fn remove(&mut self, id: EntityId) -> bool {
        let Some((&start, &end)) = self.ranges.range(..=id).next_back() else {
            return false;
        };
        if id >= end {
            return false;
        }
        self.ranges.remove(&start);
        if start < id {
            self.ranges.insert(start, id);
        }
        if id + 1 < end {
            self.ranges.insert(id + 1, end);
        }
        true
    }
}
