//! # Component Storage
//!
//! One store per registered component type, indexed directly by entity id:
//! - Slot `i` holds `Some(value)` when entity `i` has the component
//! - Empty slots cover entities without it, dead entities and unused ids
//! - The store grows on demand and never shrinks
//!
//! The entity manager keeps every store behind a type-erased interface so it
//! can hold one heterogeneous list and still clear an entity's slots by
//! numeric id. Attaching and detaching goes through the manager only, which
//! keeps entity signatures exact; callers get read and in-place write access.

use std::any::Any;

use super::entity::EntityId;

/// Marker for component types.
///
/// Any `'static` type can be attached to an entity.
pub trait Component: 'static {}

impl<T: 'static> Component for T {}

/// Dense store of optional component values for a single type.
pub struct ComponentStore<T> {
    slots: Vec<Option<T>>,
    /// Number of occupied slots.
    occupied: usize,
}

impl<T> ComponentStore<T> {
    /// Creates an empty store with room for `capacity` entity ids.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            occupied: 0,
        }
    }

    /// Stores `value` for `id`, growing the store if needed.
    ///
    /// Returns the previous value, if any.
    pub(crate) fn insert(&mut self, id: EntityId, value: T) -> Option<T> {
        let index = id as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        let previous = self.slots[index].replace(value);
        if previous.is_none() {
            self.occupied += 1;
        }
        previous
    }

    /// Removes and returns the value for `id`.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<T> {
        let removed = self.slots.get_mut(id as usize).and_then(Option::take);
        if removed.is_some() {
            self.occupied -= 1;
        }
        removed
    }

    /// Value for `id`; `None` when absent or out of range.
    #[inline]
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    /// Mutable value for `id`; `None` when absent or out of range.
    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.slots.get_mut(id as usize).and_then(Option::as_mut)
    }

    /// True when `id` has a value.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Number of slots, occupied or not.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no slot exists yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots holding a value.
    #[inline]
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Raw slots, including empty ones.
    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[Option<T>] {
        &self.slots
    }

    /// Iterates over occupied slots with their entity ids.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (to_id(index), value)))
    }

    /// Iterates mutably over occupied slots with their entity ids.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|value| (to_id(index), value)))
    }
}

#[inline]
fn to_id(index: usize) -> EntityId {
    // Slots are only created through `insert`/`resize`, both keyed by EntityId.
    EntityId::try_from(index).unwrap_or(EntityId::MAX)
}

/// Type-erased view of a [`ComponentStore`].
pub(crate) trait ErasedStore {
    /// Grows the store to at least `len` slots. Never shrinks.
    fn resize(&mut self, len: usize);

    /// Clears the slot for `id`. Returns true if a value was dropped.
    fn erase(&mut self, id: EntityId) -> bool;

    /// Number of slots, occupied or not.
    fn size(&self) -> usize;

    /// Name of the stored component type.
    fn type_name(&self) -> &'static str;

    /// Upcast for typed access.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStore for ComponentStore<T> {
    fn resize(&mut self, len: usize) {
        if len > self.slots.len() {
            self.slots.resize_with(len, || None);
        }
    }

    fn erase(&mut self, id: EntityId) -> bool {
        self.remove(id).is_some()
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Hull(u32);

    #[test]
    fn test_store_grows_on_demand() {
        let mut store: ComponentStore<Hull> = ComponentStore::with_capacity(0);
        assert!(store.is_empty());

        assert!(store.insert(9, Hull(100)).is_none());
        assert_eq!(store.len(), 10);
        assert_eq!(store.occupied(), 1);
        assert_eq!(store.get(9), Some(&Hull(100)));
        assert_eq!(store.get(3), None);
        assert_eq!(store.get(500), None);
    }

    #[test]
    fn test_insert_replaces_and_remove_never_shrinks() {
        let mut store = ComponentStore::with_capacity(4);
        store.insert(2, Hull(1));
        assert_eq!(store.insert(2, Hull(2)), Some(Hull(1)));
        assert_eq!(store.occupied(), 1);

        assert_eq!(store.remove(2), Some(Hull(2)));
        assert_eq!(store.remove(2), None);
        assert_eq!(store.occupied(), 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_iter_skips_empty_slots() {
        let mut store = ComponentStore::with_capacity(0);
        store.insert(0, Hull(10));
        store.insert(4, Hull(40));

        let seen: Vec<_> = store.iter().map(|(id, hull)| (id, hull.0)).collect();
        assert_eq!(seen, vec![(0, 10), (4, 40)]);
        assert_eq!(store.slots().len(), 5);

        for (_, hull) in store.iter_mut() {
            hull.0 += 1;
        }
        assert_eq!(store.get(4), Some(&Hull(41)));
    }

    #[test]
    fn test_erased_interface() {
        let mut boxed: Box<dyn ErasedStore> = Box::new(ComponentStore::<Hull>::with_capacity(0));
        boxed.resize(8);
        assert_eq!(boxed.size(), 8);
        boxed.resize(2);
        assert_eq!(boxed.size(), 8);
        assert!(boxed.type_name().ends_with("Hull"));

        let typed = boxed
            .as_any_mut()
            .downcast_mut::<ComponentStore<Hull>>()
            .unwrap();
        typed.insert(1, Hull(5));

        assert!(boxed.erase(1));
        assert!(!boxed.erase(1));
        assert!(!boxed.erase(1000));
    }
}
