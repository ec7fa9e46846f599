//! # Entity Handles
//!
//! Entities are opaque handles made of:
//! - An index into entity records and component stores (the wire id)
//! - A generation counter that is bumped every time the slot is killed
//!
//! Handles are minted only by the [`EntityManager`](super::EntityManager).
//! A handle kept across a kill no longer matches its slot, so it can never
//! read or mutate whatever later reuses that index.

use std::fmt;

use super::signature::Signature;

/// Index of an entity; also the id used on the wire.
pub type EntityId = u32;

/// Generation counter of an entity slot.
pub type Generation = u32;

/// Handle to a simulation object. Carries no data itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: EntityId,
    generation: Generation,
}

impl Entity {
    #[inline]
    pub(crate) const fn new(id: EntityId, generation: Generation) -> Self {
        Self { id, generation }
    }

    /// Returns the entity index.
    #[inline]
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// Returns the slot generation this handle was minted for.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> Generation {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.id, self.generation)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Per-slot bookkeeping owned by the entity manager.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntityRecord {
    /// Debug name given at spawn.
    pub(crate) name: String,
    /// Whether the slot currently holds a live entity.
    pub(crate) alive: bool,
    /// Bumped on every kill.
    pub(crate) generation: Generation,
    /// Component types currently attached.
    pub(crate) signature: Signature,
}

impl EntityRecord {
    /// Brings a never-used or recycled slot to life.
    pub(crate) fn revive(&mut self, name: String) {
        self.name = name;
        self.alive = true;
        self.signature.clear();
    }

    /// Marks the slot dead and invalidates outstanding handles.
    pub(crate) fn kill(&mut self) {
        self.alive = false;
        self.signature.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// True when `entity` refers to the current life of this slot.
    #[inline]
    pub(crate) fn matches(&self, entity: Entity) -> bool {
        self.alive && self.generation == entity.generation
    }
}
