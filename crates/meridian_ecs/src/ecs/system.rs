//! # Systems
//!
//! A system is a behavior that runs against every entity whose signature
//! contains the system's required signature.
//!
//! ## Lifecycle
//!
//! ```text
//!  on_create ──► Idle ──(first entity)──► Running ──(last entity)──► Idle ──► on_destroy
//!                          on_start_running      on_stop_running
//! ```
//!
//! `on_update(dt)` is called once per tick, and only while Running.

use std::any::Any;

use super::entity::{Entity, EntityId};
use crate::coordinator::Coordinator;

/// Behavior hooks of a system.
///
/// Only [`on_update`](System::on_update) is required.
pub trait System: Any {
    /// Called once, when the world creates its systems.
    fn on_create(&mut self) {}

    /// Called when the tracked set goes from 0 to 1 entity.
    fn on_start_running(&mut self) {}

    /// Called once per tick while at least one entity is tracked.
    ///
    /// `entities` is the tracked set as it was when the update began. The
    /// system may spawn, kill and restructure entities through `world`;
    /// entities killed during this call stay in the slice, so check
    /// [`Coordinator::is_alive`] before acting on one that may be gone.
    fn on_update(&mut self, world: &mut Coordinator, entities: &[Entity], dt: f32);

    /// Called when the tracked set goes from 1 to 0 entities.
    fn on_stop_running(&mut self) {}

    /// Called once, when the world destroys its systems.
    fn on_destroy(&mut self) {}
}

/// Object-safe upcasts for stored systems.
pub(crate) trait AnySystem: System {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: System> AnySystem for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Running/idle transition produced by a membership change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RunEdge {
    /// Tracked set went from empty to non-empty.
    Started,
    /// Tracked set went from non-empty to empty.
    Stopped,
}

const ABSENT: u32 = u32::MAX;

/// The entities a system currently tracks, and whether it is running.
///
/// Sparse-set layout: `dense` holds the handles contiguously, `sparse` maps an
/// entity id to its position in `dense`.
#[derive(Debug, Default)]
pub struct Membership {
    dense: Vec<Entity>,
    sparse: Vec<u32>,
    running: bool,
}

impl Membership {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Tracked entities, in no particular order.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.dense
    }

    /// Number of tracked entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.dense.len()
    }

    /// True when nothing is tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// True while at least one entity is tracked.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True when this exact handle is tracked.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.position(entity.id())
            .is_some_and(|pos| self.dense[pos] == entity)
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        match self.sparse.get(id as usize) {
            Some(&pos) if pos != ABSENT => Some(pos as usize),
            _ => None,
        }
    }

    /// Starts tracking `entity`. No-op if its id is already tracked.
    pub(crate) fn insert(&mut self, entity: Entity) -> Option<RunEdge> {
        if self.position(entity.id()).is_some() {
            return None;
        }
        let index = entity.id() as usize;
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, ABSENT);
        }
        #[allow(clippy::cast_possible_truncation)]
        let pos = self.dense.len() as u32;
        self.sparse[index] = pos;
        self.dense.push(entity);
        self.sync_running()
    }

    /// Stops tracking `id`. No-op if it is not tracked.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<RunEdge> {
        let pos = self.position(id)?;
        self.dense.swap_remove(pos);
        self.sparse[id as usize] = ABSENT;
        if let Some(moved) = self.dense.get(pos) {
            #[allow(clippy::cast_possible_truncation)]
            let new_pos = pos as u32;
            self.sparse[moved.id() as usize] = new_pos;
        }
        self.sync_running()
    }

    /// Replaces the tracked set, reporting only the net transition.
    pub(crate) fn rebuild<I>(&mut self, entities: I) -> Option<RunEdge>
    where
        I: IntoIterator<Item = Entity>,
    {
        for entity in self.dense.drain(..) {
            self.sparse[entity.id() as usize] = ABSENT;
        }
        for entity in entities {
            let index = entity.id() as usize;
            if index >= self.sparse.len() {
                self.sparse.resize(index + 1, ABSENT);
            }
            if self.sparse[index] == ABSENT {
                #[allow(clippy::cast_possible_truncation)]
                let pos = self.dense.len() as u32;
                self.sparse[index] = pos;
                self.dense.push(entity);
            }
        }
        self.sync_running()
    }

    fn sync_running(&mut self) -> Option<RunEdge> {
        let running = !self.dense.is_empty();
        if running == self.running {
            return None;
        }
        self.running = running;
        Some(if running {
            RunEdge::Started
        } else {
            RunEdge::Stopped
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(id: EntityId) -> Entity {
        Entity::new(id, 0)
    }

    #[test]
    fn test_edges_only_on_empty_boundary() {
        let mut members = Membership::new();
        assert!(!members.is_running());

        assert_eq!(members.insert(e(3)), Some(RunEdge::Started));
        assert_eq!(members.insert(e(7)), None);
        assert_eq!(members.insert(e(3)), None);
        assert_eq!(members.entity_count(), 2);
        assert!(members.is_running());

        assert_eq!(members.remove(3), None);
        assert_eq!(members.remove(3), None);
        assert_eq!(members.remove(7), Some(RunEdge::Stopped));
        assert!(!members.is_running());
        assert!(members.is_empty());
    }

    #[test]
    fn test_swap_remove_keeps_index_consistent() {
        let mut members = Membership::new();
        for id in 0..5 {
            members.insert(e(id));
        }
        members.remove(1);
        members.remove(4);

        for id in [0, 2, 3] {
            assert!(members.contains(e(id)), "lost entity {id}");
        }
        assert!(!members.contains(e(1)));
        assert!(!members.contains(e(4)));
        assert!(!members.contains(Entity::new(2, 9)));
        assert_eq!(members.entity_count(), 3);
    }

    #[test]
    fn test_rebuild_reports_net_transition() {
        let mut members = Membership::new();
        members.insert(e(1));

        assert_eq!(members.rebuild([e(2), e(5), e(2)]), None);
        assert_eq!(members.entity_count(), 2);
        assert!(!members.contains(e(1)));

        assert_eq!(members.rebuild(std::iter::empty()), Some(RunEdge::Stopped));
        assert_eq!(members.rebuild([e(0)]), Some(RunEdge::Started));
    }
}
