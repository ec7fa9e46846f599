//! # System Manager
//!
//! Owns every system instance together with its required signature and
//! membership. Membership is recomputed synchronously on every entity
//! signature change, so systems always see a consistent world.
//!
//! Systems are stored in registration order; that order drives the
//! create/update/destroy passes. Deleting a system closes its slot as soon
//! as no update is in flight.

use std::any::TypeId;
use std::collections::HashMap;

use super::entity::Entity;
use super::entity_manager::SignatureObserver;
use super::signature::Signature;
use super::system::{AnySystem, Membership, RunEdge, System};
use crate::error::{EcsError, EcsResult};

/// Where the manager is in the create/destroy lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifecycle {
    /// `on_create_all` has not run yet.
    Pending,
    /// Systems are created; new registrations are created on arrival.
    Created,
    /// `on_destroy_all` has run.
    Destroyed,
}

struct SystemSlot {
    name: &'static str,
    type_id: TypeId,
    /// `None` while the instance is checked out for its update.
    instance: Option<Box<dyn AnySystem>>,
    signature: Option<Signature>,
    membership: Membership,
    /// Edges that happened while the instance was checked out.
    deferred: Vec<RunEdge>,
}

impl SystemSlot {
    fn apply(&mut self, edge: Option<RunEdge>) {
        let Some(edge) = edge else {
            return;
        };
        tracing::debug!(
            "system {} {}",
            self.name,
            match edge {
                RunEdge::Started => "started running",
                RunEdge::Stopped => "went idle",
            }
        );
        match self.instance.as_deref_mut() {
            Some(system) => fire(system, edge),
            None => self.deferred.push(edge),
        }
    }
}

fn fire(system: &mut dyn AnySystem, edge: RunEdge) {
    match edge {
        RunEdge::Started => system.on_start_running(),
        RunEdge::Stopped => system.on_stop_running(),
    }
}

/// Registry and dispatcher for systems.
pub struct SystemManager {
    /// Registration order. Holes exist only while an update is in flight.
    slots: Vec<Option<SystemSlot>>,
    /// System type -> slot index.
    index: HashMap<TypeId, usize>,
    lifecycle: Lifecycle,
    /// Instances currently checked out by `begin_update`.
    checked_out: usize,
}

impl SystemManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty manager with room for `capacity` systems.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            lifecycle: Lifecycle::Pending,
            checked_out: 0,
        }
    }

    /// Registers `system`.
    ///
    /// If the manager has already created its systems, `system` is created
    /// immediately.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateSystem`] if a system of type `S` is registered.
    pub fn add_system<S: System>(&mut self, system: S) -> EcsResult<()> {
        let name = std::any::type_name::<S>();
        if self.index.contains_key(&TypeId::of::<S>()) {
            return Err(EcsError::DuplicateSystem { name });
        }

        let mut instance: Box<dyn AnySystem> = Box::new(system);
        if self.lifecycle == Lifecycle::Created {
            instance.on_create();
        }

        self.index.insert(TypeId::of::<S>(), self.slots.len());
        self.slots.push(Some(SystemSlot {
            name,
            type_id: TypeId::of::<S>(),
            instance: Some(instance),
            signature: None,
            membership: Membership::new(),
            deferred: Vec::new(),
        }));

        tracing::debug!("registered system {}", name);
        Ok(())
    }

    /// Removes the system of type `S`. No-op if it is not registered.
    ///
    /// A system removed after creation receives `on_destroy` first.
    ///
    /// Returns true if a system was removed.
    pub fn delete_system<S: System>(&mut self) -> bool {
        let Some(index) = self.index.remove(&TypeId::of::<S>()) else {
            return false;
        };
        let Some(slot) = self.slots.get_mut(index).and_then(Option::take) else {
            return false;
        };
        if let Some(mut instance) = slot.instance {
            if self.lifecycle == Lifecycle::Created {
                instance.on_destroy();
            }
        }
        tracing::debug!("deleted system {}", slot.name);
        self.compact();
        true
    }

    /// True when a system of type `S` is registered.
    #[must_use]
    pub fn contains<S: System>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<S>())
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn slot<S: System>(&self) -> EcsResult<&SystemSlot> {
        self.index
            .get(&TypeId::of::<S>())
            .and_then(|&index| self.slots.get(index))
            .and_then(Option::as_ref)
            .ok_or(EcsError::InvalidSystem {
                name: std::any::type_name::<S>(),
            })
    }

    fn slot_mut<S: System>(&mut self) -> EcsResult<&mut SystemSlot> {
        self.index
            .get(&TypeId::of::<S>())
            .and_then(|&index| self.slots.get_mut(index))
            .and_then(Option::as_mut)
            .ok_or(EcsError::InvalidSystem {
                name: std::any::type_name::<S>(),
            })
    }

    /// The system of type `S`.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidSystem`] if `S` is not registered,
    /// [`EcsError::SystemInUse`] if `S` is running its own update.
    pub fn get_system<S: System>(&self) -> EcsResult<&S> {
        let slot = self.slot::<S>()?;
        slot.instance
            .as_deref()
            .and_then(|system| system.as_any().downcast_ref::<S>())
            .ok_or(EcsError::SystemInUse { name: slot.name })
    }

    /// Mutable access to the system of type `S`.
    ///
    /// # Errors
    ///
    /// Same as [`get_system`](Self::get_system).
    pub fn get_system_mut<S: System>(&mut self) -> EcsResult<&mut S> {
        let slot = self.slot_mut::<S>()?;
        let name = slot.name;
        slot.instance
            .as_deref_mut()
            .and_then(|system| system.as_any_mut().downcast_mut::<S>())
            .ok_or(EcsError::SystemInUse { name })
    }

    /// Sets the signature `S` requires and rebuilds its membership from
    /// `population` (every live entity with its current signature).
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingSignature`] if `S` is not registered yet; the
    /// signature can only be set after [`add_system`](Self::add_system).
    pub fn set_signature<S, I>(&mut self, signature: Signature, population: I) -> EcsResult<()>
    where
        S: System,
        I: IntoIterator<Item = (Entity, Signature)>,
    {
        let slot = self
            .slot_mut::<S>()
            .map_err(|_| EcsError::MissingSignature {
                name: std::any::type_name::<S>(),
            })?;
        slot.signature = Some(signature);
        let edge = slot.membership.rebuild(
            population
                .into_iter()
                .filter(|(_, current)| current.contains(signature))
                .map(|(entity, _)| entity),
        );
        tracing::debug!(
            "system {} requires {:?}, tracking {} entities",
            slot.name,
            signature,
            slot.membership.entity_count()
        );
        slot.apply(edge);
        Ok(())
    }

    /// The signature `S` requires.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidSystem`] if `S` is not registered,
    /// [`EcsError::MissingSignature`] if none was set.
    pub fn signature<S: System>(&self) -> EcsResult<Signature> {
        let slot = self.slot::<S>()?;
        slot.signature
            .ok_or(EcsError::MissingSignature { name: slot.name })
    }

    /// Entities tracked by `S` and its running state.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidSystem`] if `S` is not registered.
    pub fn membership<S: System>(&self) -> EcsResult<&Membership> {
        self.slot::<S>().map(|slot| &slot.membership)
    }

    /// Calls `on_create` on every system, in registration order. Runs once.
    pub fn on_create_all(&mut self) {
        if self.lifecycle != Lifecycle::Pending {
            tracing::warn!("systems already created, ignoring on_create_all");
            return;
        }
        for slot in self.slots.iter_mut().flatten() {
            if let Some(system) = slot.instance.as_deref_mut() {
                system.on_create();
            }
        }
        self.lifecycle = Lifecycle::Created;
    }

    /// Calls `on_destroy` on every system, in registration order. Runs once.
    pub fn on_destroy_all(&mut self) {
        if self.lifecycle == Lifecycle::Destroyed {
            return;
        }
        for slot in self.slots.iter_mut().flatten() {
            if let Some(system) = slot.instance.as_deref_mut() {
                system.on_destroy();
            }
        }
        self.lifecycle = Lifecycle::Destroyed;
    }

    /// Number of registration slots, including holes left by deletions
    /// during an update.
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Drops the holes left by deletions and reindexes, keeping
    /// registration order. Does nothing while an instance is checked out,
    /// since slot indices must stay put until it is returned.
    pub(crate) fn compact(&mut self) {
        if self.checked_out > 0 || self.index.len() == self.slots.len() {
            return;
        }
        self.slots.retain(Option::is_some);
        self.index.clear();
        for (position, slot) in self.slots.iter().flatten().enumerate() {
            self.index.insert(slot.type_id, position);
        }
    }

    /// Checks out the system in slot `index` if it has entities to update.
    ///
    /// Its tracked entities are copied into `entities`.
    pub(crate) fn begin_update(
        &mut self,
        index: usize,
        entities: &mut Vec<Entity>,
    ) -> Option<Box<dyn AnySystem>> {
        let slot = self.slots.get_mut(index)?.as_mut()?;
        if slot.membership.is_empty() {
            return None;
        }
        let instance = slot.instance.take()?;
        self.checked_out += 1;
        entities.clear();
        entities.extend_from_slice(slot.membership.entities());
        Some(instance)
    }

    /// Returns a checked-out system and fires the edges it missed.
    pub(crate) fn end_update(&mut self, index: usize, mut instance: Box<dyn AnySystem>) {
        self.checked_out = self.checked_out.saturating_sub(1);
        match self.slots.get_mut(index).and_then(Option::as_mut) {
            Some(slot) if slot.instance.is_none() => {
                for edge in slot.deferred.drain(..) {
                    fire(instance.as_mut(), edge);
                }
                slot.instance = Some(instance);
            }
            _ => {
                // Deleted during its own update.
                if self.lifecycle == Lifecycle::Created {
                    instance.on_destroy();
                }
            }
        }
    }
}

impl SignatureObserver for SystemManager {
    fn entity_signature_changed(&mut self, entity: Entity, signature: Signature) {
        for slot in self.slots.iter_mut().flatten() {
            let Some(required) = slot.signature else {
                tracing::debug!("system {} has no signature yet, skipping", slot.name);
                continue;
            };
            let edge = if signature.contains(required) {
                slot.membership.insert(entity)
            } else {
                slot.membership.remove(entity.id())
            };
            slot.apply(edge);
        }
        tracing::trace!("entity {} signature now {:?}", entity, signature);
    }

    fn entity_destroyed(&mut self, entity: Entity) {
        for slot in self.slots.iter_mut().flatten() {
            let edge = slot.membership.remove(entity.id());
            slot.apply(edge);
        }
    }
}

impl Default for SystemManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SystemManager {
    fn drop(&mut self) {
        if self.lifecycle == Lifecycle::Created {
            self.on_destroy_all();
        }
    }
}
