//! # Entity Manager
//!
//! Owns entity records (alive flag, debug name, signature), the free set of
//! recyclable ids, and one component store per registered type.
//!
//! ## Entity states
//!
//! ```text
//! never-used ──spawn──► alive ──kill──► dead-recyclable ──spawn──► alive ...
//! ```
//!
//! Killing an entity erases its slot in every store, so a recycled id never
//! starts with the previous occupant's components.
//!
//! Every structural change is reported to a [`SignatureObserver`] before the
//! call returns.

use std::any::TypeId;
use std::collections::HashMap;

use super::entity::{Entity, EntityId, EntityRecord};
use super::free_ids::FreeIds;
use super::signature::{ComponentTypeId, Signature, MAX_COMPONENTS};
use super::storage::{Component, ComponentStore, ErasedStore};
use crate::config::DEFAULT_MAX_ENTITIES;
use crate::error::{EcsError, EcsResult};

/// Receives entity signature changes.
///
/// The system manager implements this to keep membership current; `()`
/// implements it as a no-op for standalone use.
pub trait SignatureObserver {
    /// `entity` now holds exactly the component types in `signature`.
    fn entity_signature_changed(&mut self, entity: Entity, signature: Signature);

    /// `entity` was killed.
    fn entity_destroyed(&mut self, entity: Entity);
}

impl SignatureObserver for () {
    fn entity_signature_changed(&mut self, _entity: Entity, _signature: Signature) {}

    fn entity_destroyed(&mut self, _entity: Entity) {}
}

/// Allocates entities and owns all component stores.
pub struct EntityManager {
    /// One record per id ever used.
    records: Vec<EntityRecord>,
    /// Dead or skipped ids available for reuse, lowest first.
    free: FreeIds,
    /// Every id is below this.
    max_entities: EntityId,
    /// Number of currently alive entities.
    alive_count: usize,
    /// Stores indexed by component type id.
    stores: Vec<Box<dyn ErasedStore>>,
    /// Component type -> assigned id.
    type_ids: HashMap<TypeId, ComponentTypeId>,
}

impl EntityManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty manager with room for `entity_capacity` records.
    #[must_use]
    pub fn with_capacity(entity_capacity: usize) -> Self {
        Self::with_limits(entity_capacity, DEFAULT_MAX_ENTITIES)
    }

    /// Creates an empty manager whose ids all stay below `max_entities`.
    #[must_use]
    pub fn with_limits(entity_capacity: usize, max_entities: EntityId) -> Self {
        Self {
            records: Vec::with_capacity(entity_capacity),
            free: FreeIds::default(),
            max_entities,
            alive_count: 0,
            stores: Vec::with_capacity(MAX_COMPONENTS),
            type_ids: HashMap::new(),
        }
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Exclusive upper bound on entity ids.
    #[inline]
    #[must_use]
    pub fn max_entities(&self) -> EntityId {
        self.max_entities
    }

    /// Spawns an entity on the lowest free id, growing if none is free.
    pub fn spawn_entity(
        &mut self,
        name: impl Into<String>,
        observer: &mut impl SignatureObserver,
    ) -> Entity {
        let id = self.free.pop_lowest().unwrap_or_else(|| self.grow());
        self.revive(id, name.into(), observer)
    }

    /// Spawns an entity on an explicit id, e.g. one chosen by a server.
    ///
    /// Ids skipped between the current high-water mark and `id` become free
    /// for local spawns.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityIdOutOfRange`] if `id` is not below
    /// [`max_entities`](Self::max_entities),
    /// [`EcsError::EntityAlreadyAlive`] if `id` is alive.
    pub fn spawn_entity_with_id(
        &mut self,
        id: EntityId,
        name: impl Into<String>,
        observer: &mut impl SignatureObserver,
    ) -> EcsResult<Entity> {
        if id >= self.max_entities {
            return Err(EcsError::EntityIdOutOfRange {
                id,
                max: self.max_entities,
            });
        }
        let index = id as usize;
        if let Some(record) = self.records.get(index) {
            if record.alive {
                return Err(EcsError::EntityAlreadyAlive(id));
            }
            self.free.remove(id);
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let high_water = self.records.len() as EntityId;
            self.records.resize_with(index + 1, EntityRecord::default);
            self.free.insert_range(high_water, id);
        }
        Ok(self.revive(id, name.into(), observer))
    }

    fn grow(&mut self) -> EntityId {
        #[allow(clippy::cast_possible_truncation)]
        let id = self.records.len() as EntityId;
        self.records.push(EntityRecord::default());
        id
    }

    fn revive(
        &mut self,
        id: EntityId,
        name: String,
        observer: &mut impl SignatureObserver,
    ) -> Entity {
        let record = &mut self.records[id as usize];
        record.revive(name);
        let entity = Entity::new(id, record.generation);
        self.alive_count += 1;

        tracing::trace!("spawned entity {} ({})", id, record.name);
        observer.entity_signature_changed(entity, Signature::EMPTY);
        entity
    }

    /// Kills `entity`, erasing its components and freeing its id.
    ///
    /// Killing a dead, stale or unknown handle is a no-op, so independent
    /// systems may destroy the same entity in one tick.
    ///
    /// Returns true if the entity was alive.
    pub fn kill_entity(&mut self, entity: Entity, observer: &mut impl SignatureObserver) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let id = entity.id();

        observer.entity_destroyed(entity);
        for store in &mut self.stores {
            store.erase(id);
        }
        self.records[id as usize].kill();
        self.free.insert(id);
        self.alive_count -= 1;

        tracing::trace!("killed entity {}", id);
        true
    }

    /// True when `entity` is alive and not stale.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.record(entity).is_some()
    }

    #[inline]
    fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.records
            .get(entity.id() as usize)
            .filter(|record| record.matches(entity))
    }

    fn check_alive(&self, entity: Entity) -> EcsResult<()> {
        if self.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::InvalidEntity(entity.id()))
        }
    }

    /// Resolves a bare id received over the network to its live handle.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`] if no live entity has that id.
    pub fn entity_from_network_id(&self, id: EntityId) -> EcsResult<Entity> {
        match self.records.get(id as usize) {
            Some(record) if record.alive => Ok(Entity::new(id, record.generation)),
            _ => Err(EcsError::InvalidEntity(id)),
        }
    }

    /// Debug name of a live entity.
    #[must_use]
    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.record(entity).map(|record| record.name.as_str())
    }

    /// Renames a live entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`] if `entity` is not alive.
    pub fn set_name(&mut self, entity: Entity, name: impl Into<String>) -> EcsResult<()> {
        self.check_alive(entity)?;
        self.records[entity.id() as usize].name = name.into();
        Ok(())
    }

    /// Current signature of a live entity.
    #[must_use]
    pub fn signature(&self, entity: Entity) -> Option<Signature> {
        self.record(entity).map(|record| record.signature)
    }

    /// Number of alive entities.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Iterates over alive entities in id order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.population().map(|(entity, _)| entity)
    }

    /// Iterates over alive entities with their signatures.
    pub fn population(&self) -> impl Iterator<Item = (Entity, Signature)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.alive)
            .map(|(index, record)| {
                #[allow(clippy::cast_possible_truncation)]
                let id = index as EntityId;
                (Entity::new(id, record.generation), record.signature)
            })
    }

    // =========================================================================
    // Component registration
    // =========================================================================

    /// Registers `T`, assigning it the next component type id.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateComponent`] if `T` is already registered,
    /// [`EcsError::ComponentLimitReached`] if all ids are taken.
    pub fn register_component<T: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        let name = std::any::type_name::<T>();
        if self.type_ids.contains_key(&TypeId::of::<T>()) {
            return Err(EcsError::DuplicateComponent { name });
        }
        if self.stores.len() >= MAX_COMPONENTS {
            return Err(EcsError::ComponentLimitReached {
                name,
                max: MAX_COMPONENTS,
            });
        }

        #[allow(clippy::cast_possible_truncation)]
        let id = self.stores.len() as ComponentTypeId;
        let mut store = ComponentStore::<T>::with_capacity(self.records.capacity());
        store.resize(self.records.len());

        self.stores.push(Box::new(store));
        self.type_ids.insert(TypeId::of::<T>(), id);

        tracing::debug!("registered component {} as type id {}", name, id);
        Ok(id)
    }

    /// Type id assigned to `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn component_type_id<T: Component>(&self) -> EcsResult<ComponentTypeId> {
        self.type_ids
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::UnregisteredComponent {
                name: std::any::type_name::<T>(),
            })
    }

    /// Type name registered under `id`.
    #[must_use]
    pub fn component_name(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.stores.get(id as usize).map(|store| store.type_name())
    }

    /// Slot count of the store registered under `id`.
    ///
    /// Always covers every entity id that ever held that component.
    #[must_use]
    pub fn store_size(&self, id: ComponentTypeId) -> Option<usize> {
        self.stores.get(id as usize).map(|store| store.size())
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.stores.len()
    }

    // =========================================================================
    // Component access
    // =========================================================================

    /// Store for `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn get_components<T: Component>(&self) -> EcsResult<&ComponentStore<T>> {
        let id = self.component_type_id::<T>()?;
        self.stores[id as usize]
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
            .ok_or(EcsError::UnregisteredComponent {
                name: std::any::type_name::<T>(),
            })
    }

    /// Mutable store for `T`.
    ///
    /// Values may be edited in place; attach and detach through
    /// [`add_component`](Self::add_component) and
    /// [`remove_component`](Self::remove_component) so signatures stay exact.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn get_components_mut<T: Component>(&mut self) -> EcsResult<&mut ComponentStore<T>> {
        self.store_mut::<T>().map(|(_, store)| store)
    }

    fn store_mut<T: Component>(&mut self) -> EcsResult<(ComponentTypeId, &mut ComponentStore<T>)> {
        let id = self.component_type_id::<T>()?;
        let store = self.stores[id as usize]
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .ok_or(EcsError::UnregisteredComponent {
                name: std::any::type_name::<T>(),
            })?;
        Ok((id, store))
    }

    /// Attaches `value` to `entity`, replacing any previous `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`] if `entity` is not alive,
    /// [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
        observer: &mut impl SignatureObserver,
    ) -> EcsResult<()> {
        self.check_alive(entity)?;
        let (type_id, store) = self.store_mut::<T>()?;
        store.insert(entity.id(), value);

        let record = &mut self.records[entity.id() as usize];
        if !record.signature.test(type_id) {
            record.signature.set(type_id);
            observer.entity_signature_changed(entity, record.signature);
        }
        Ok(())
    }

    /// Builds a `T` from `args` and attaches it to `entity`.
    ///
    /// # Errors
    ///
    /// Same as [`add_component`](Self::add_component).
    pub fn emplace_component<T, A>(
        &mut self,
        entity: Entity,
        args: A,
        observer: &mut impl SignatureObserver,
    ) -> EcsResult<()>
    where
        T: Component + From<A>,
    {
        self.add_component(entity, T::from(args), observer)
    }

    /// The `T` attached to `entity`, if any.
    ///
    /// Dead and stale handles read as absent.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn get_component<T: Component>(&self, entity: Entity) -> EcsResult<Option<&T>> {
        let store = self.get_components::<T>()?;
        if !self.is_alive(entity) {
            return Ok(None);
        }
        Ok(store.get(entity.id()))
    }

    /// Mutable access to the `T` attached to `entity`, if any.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<Option<&mut T>> {
        let alive = self.is_alive(entity);
        let (_, store) = self.store_mut::<T>()?;
        if !alive {
            return Ok(None);
        }
        Ok(store.get_mut(entity.id()))
    }

    /// True when `entity` is alive and holds a registered `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        match (self.signature(entity), self.component_type_id::<T>()) {
            (Some(signature), Ok(type_id)) => signature.test(type_id),
            _ => false,
        }
    }

    /// Detaches `T` from `entity` and returns it.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`] if `entity` is not alive,
    /// [`EcsError::UnregisteredComponent`] if `T` was never registered.
    pub fn remove_component<T: Component>(
        &mut self,
        entity: Entity,
        observer: &mut impl SignatureObserver,
    ) -> EcsResult<Option<T>> {
        self.check_alive(entity)?;
        let (type_id, store) = self.store_mut::<T>()?;
        let removed = store.remove(entity.id());
        self.clear_bit(entity, type_id, observer);
        Ok(removed)
    }

    /// Detaches the component registered under a numeric type id.
    ///
    /// Used when only a wire id is known. Unknown type ids are ignored, since
    /// a newer peer may send ids this build does not have.
    ///
    /// Returns true if a component was removed.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`] if `entity` is not alive.
    pub fn remove_component_by_type(
        &mut self,
        type_id: ComponentTypeId,
        entity: Entity,
        observer: &mut impl SignatureObserver,
    ) -> EcsResult<bool> {
        self.check_alive(entity)?;
        let Some(store) = self.stores.get_mut(type_id as usize) else {
            tracing::debug!("ignoring removal of unknown component type id {}", type_id);
            return Ok(false);
        };
        let removed = store.erase(entity.id());
        self.clear_bit(entity, type_id, observer);
        Ok(removed)
    }

    fn clear_bit(
        &mut self,
        entity: Entity,
        type_id: ComponentTypeId,
        observer: &mut impl SignatureObserver,
    ) {
        let record = &mut self.records[entity.id() as usize];
        if record.signature.test(type_id) {
            record.signature.reset(type_id);
            observer.entity_signature_changed(entity, record.signature);
        }
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}
