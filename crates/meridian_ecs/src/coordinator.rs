//! # Coordinator
//!
//! The world facade used by gameplay code. Composes the
//! [`EntityManager`] and the [`SystemManager`] so that every structural
//! change is forwarded to system membership before the call returns.
//!
//! ## Tick
//!
//! ```text
//! drain_inbox ──► run_due_ticks ──► update_all(dt) per due step
//!                  └─ on_update for every running system, registration order
//! ```
//!
//! A Coordinator is an owned value; create one per simulation thread.

use crate::config::EcsConfig;
use crate::ecs::{
    Component, ComponentStore, ComponentTypeId, Entity, EntityId, EntityManager, Signature,
    System, SystemManager,
};
use crate::error::EcsResult;
use crate::replication::{ReplayStats, ReplicationCommand, ReplicationInbox};
use crate::tick::TickLoop;

// ============================================================================
// COMPONENT SETS
// ============================================================================

/// A tuple of component types, used to build a required signature.
///
/// Implemented for `()` and tuples of up to eight component types.
pub trait ComponentSet {
    /// ORs the type id of every member into one signature.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// if a member was never registered.
    fn signature(entities: &EntityManager) -> EcsResult<Signature>;
}

impl ComponentSet for () {
    fn signature(_entities: &EntityManager) -> EcsResult<Signature> {
        Ok(Signature::EMPTY)
    }
}

macro_rules! impl_component_set {
    ($($member:ident),+) => {
        impl<$($member: Component),+> ComponentSet for ($($member,)+) {
            fn signature(entities: &EntityManager) -> EcsResult<Signature> {
                let mut signature = Signature::EMPTY;
                $(signature.set(entities.component_type_id::<$member>()?);)+
                Ok(signature)
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

// ============================================================================
// COORDINATOR
// ============================================================================

/// One simulation world.
pub struct Coordinator {
    entities: EntityManager,
    systems: SystemManager,
    /// Reused copy of the tracked set handed to `on_update`.
    update_buffer: Vec<Entity>,
}

impl Coordinator {
    /// Creates a world with default sizing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&EcsConfig::default())
    }

    /// Creates a world sized by `config`.
    #[must_use]
    pub fn with_config(config: &EcsConfig) -> Self {
        tracing::debug!(
            "creating world: {} entities, {} systems reserved, ids below {}",
            config.entity_capacity,
            config.system_capacity,
            config.max_entities
        );
        Self {
            entities: EntityManager::with_limits(config.entity_capacity, config.max_entities),
            systems: SystemManager::with_capacity(config.system_capacity),
            update_buffer: Vec::with_capacity(config.entity_capacity),
        }
    }

    /// Read access to the entity manager.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    /// Write access to the entity manager.
    ///
    /// Structural calls made here must be handed [`systems_mut`](Self::systems_mut)
    /// as their observer, or system membership goes stale. Prefer the
    /// forwarding methods on the Coordinator.
    #[inline]
    pub fn entities_mut(&mut self) -> &mut EntityManager {
        &mut self.entities
    }

    /// Read access to the system manager.
    #[inline]
    #[must_use]
    pub fn systems(&self) -> &SystemManager {
        &self.systems
    }

    /// Write access to the system manager.
    #[inline]
    pub fn systems_mut(&mut self) -> &mut SystemManager {
        &mut self.systems
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Spawns an entity on the lowest free id.
    pub fn spawn_entity(&mut self, name: impl Into<String>) -> Entity {
        self.entities.spawn_entity(name, &mut self.systems)
    }

    /// Spawns an entity on an id chosen by a remote authority.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityAlreadyAlive`](crate::EcsError::EntityAlreadyAlive)
    /// if `id` is alive.
    pub fn spawn_entity_with_id(
        &mut self,
        id: EntityId,
        name: impl Into<String>,
    ) -> EcsResult<Entity> {
        self.entities.spawn_entity_with_id(id, name, &mut self.systems)
    }

    /// Kills `entity`. No-op on dead or stale handles.
    ///
    /// Returns true if the entity was alive.
    pub fn kill_entity(&mut self, entity: Entity) -> bool {
        self.entities.kill_entity(entity, &mut self.systems)
    }

    /// True when `entity` is alive and not stale.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Resolves an id received over the network.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidEntity`](crate::EcsError::InvalidEntity) if no
    /// live entity has that id.
    pub fn entity_from_network_id(&self, id: EntityId) -> EcsResult<Entity> {
        self.entities.entity_from_network_id(id)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers component type `T`.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::register_component`].
    pub fn register_component<T: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        self.entities.register_component::<T>()
    }

    /// Attaches `value` to `entity`.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::add_component`].
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        self.entities.add_component(entity, value, &mut self.systems)
    }

    /// Builds a `T` from `args` and attaches it.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::add_component`].
    pub fn emplace_component<T, A>(&mut self, entity: Entity, args: A) -> EcsResult<()>
    where
        T: Component + From<A>,
    {
        self.entities
            .emplace_component::<T, A>(entity, args, &mut self.systems)
    }

    /// The `T` attached to `entity`, if any.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::get_component`].
    pub fn get_component<T: Component>(&self, entity: Entity) -> EcsResult<Option<&T>> {
        self.entities.get_component(entity)
    }

    /// Mutable access to the `T` attached to `entity`, if any.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::get_component`].
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<Option<&mut T>> {
        self.entities.get_component_mut(entity)
    }

    /// True when `entity` holds a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.entities.has_component::<T>(entity)
    }

    /// Detaches `T` from `entity` and returns it.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::remove_component`].
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> EcsResult<Option<T>> {
        self.entities.remove_component(entity, &mut self.systems)
    }

    /// Detaches a component known only by its wire type id.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::remove_component_by_type`].
    pub fn remove_component_by_type(
        &mut self,
        type_id: ComponentTypeId,
        entity: Entity,
    ) -> EcsResult<bool> {
        self.entities
            .remove_component_by_type(type_id, entity, &mut self.systems)
    }

    /// Store for `T`.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::get_components`].
    pub fn get_components<T: Component>(&self) -> EcsResult<&ComponentStore<T>> {
        self.entities.get_components()
    }

    /// Mutable store for `T`.
    ///
    /// # Errors
    ///
    /// See [`EntityManager::get_components`].
    pub fn get_components_mut<T: Component>(&mut self) -> EcsResult<&mut ComponentStore<T>> {
        self.entities.get_components_mut()
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Registers `system`.
    ///
    /// # Errors
    ///
    /// See [`SystemManager::add_system`].
    pub fn add_system<S: System>(&mut self, system: S) -> EcsResult<()> {
        self.systems.add_system(system)
    }

    /// The system of type `S`.
    ///
    /// # Errors
    ///
    /// See [`SystemManager::get_system`].
    pub fn get_system<S: System>(&self) -> EcsResult<&S> {
        self.systems.get_system()
    }

    /// Mutable access to the system of type `S`.
    ///
    /// # Errors
    ///
    /// See [`SystemManager::get_system`].
    pub fn get_system_mut<S: System>(&mut self) -> EcsResult<&mut S> {
        self.systems.get_system_mut()
    }

    /// Removes the system of type `S`. Returns true if one was removed.
    pub fn delete_system<S: System>(&mut self) -> bool {
        self.systems.delete_system::<S>()
    }

    /// Requires `signature` for `S` and matches it against live entities.
    ///
    /// # Errors
    ///
    /// See [`SystemManager::set_signature`].
    pub fn set_signature<S: System>(&mut self, signature: Signature) -> EcsResult<()> {
        self.systems
            .set_signature::<S, _>(signature, self.entities.population())
    }

    /// Requires the component types in `C` for `S`.
    ///
    /// ```rust,ignore
    /// world.set_system_signature::<MoverSystem, (Position, Velocity)>()?;
    /// ```
    ///
    /// # Errors
    ///
    /// [`EcsError::UnregisteredComponent`](crate::EcsError::UnregisteredComponent)
    /// if a member of `C` is unknown, otherwise as
    /// [`set_signature`](Self::set_signature).
    pub fn set_system_signature<S: System, C: ComponentSet>(&mut self) -> EcsResult<()> {
        let signature = C::signature(&self.entities)?;
        self.set_signature::<S>(signature)
    }

    /// Runs `on_create` on every registered system. Runs once.
    pub fn create_systems(&mut self) {
        self.systems.on_create_all();
    }

    /// Runs `on_destroy` on every registered system. Runs once.
    pub fn destroy_systems(&mut self) {
        self.systems.on_destroy_all();
    }

    /// Calls `on_update(dt)` once on every system tracking at least one
    /// entity, in registration order.
    ///
    /// Systems registered during this call are first updated next tick.
    ///
    /// Returns the number of systems updated.
    pub fn update_all(&mut self, dt: f32) -> usize {
        let mut entities = std::mem::take(&mut self.update_buffer);
        let mut updated = 0;

        for index in 0..self.systems.slot_count() {
            let Some(mut system) = self.systems.begin_update(index, &mut entities) else {
                continue;
            };
            system.on_update(self, &entities, dt);
            self.systems.end_update(index, system);
            updated += 1;
        }

        entities.clear();
        self.update_buffer = entities;
        self.systems.compact();
        tracing::trace!("updated {} systems (dt = {})", updated, dt);
        updated
    }

    /// Runs one fixed step of `clock`.
    ///
    /// Returns the number of systems updated.
    pub fn run_tick(&mut self, clock: &mut TickLoop) -> usize {
        let start = clock.begin_tick();
        let updated = self.update_all(clock.delta_seconds());
        clock.end_tick(start);
        updated
    }

    /// Runs every step `clock` reports as due.
    ///
    /// Returns the number of steps run.
    pub fn run_due_ticks(&mut self, clock: &mut TickLoop) -> u32 {
        let due = clock.due_ticks();
        for _ in 0..due {
            self.run_tick(clock);
        }
        due
    }

    // =========================================================================
    // Replication
    // =========================================================================

    /// Replays one command received from a remote authority.
    ///
    /// Killing an id that is not alive is a no-op.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityAlreadyAlive`](crate::EcsError::EntityAlreadyAlive)
    /// for a spawn on a live id,
    /// [`EcsError::EntityIdOutOfRange`](crate::EcsError::EntityIdOutOfRange)
    /// for a spawn past the configured ceiling,
    /// [`EcsError::InvalidEntity`](crate::EcsError::InvalidEntity) for a
    /// component removal on a dead id.
    pub fn apply_replicated(&mut self, command: ReplicationCommand) -> EcsResult<()> {
        match command {
            ReplicationCommand::Spawn { id, name } => {
                self.spawn_entity_with_id(id, name)?;
            }
            ReplicationCommand::Kill { id } => {
                if let Ok(entity) = self.entities.entity_from_network_id(id) {
                    self.kill_entity(entity);
                }
            }
            ReplicationCommand::RemoveComponent { id, type_id } => {
                let entity = self.entities.entity_from_network_id(id)?;
                self.remove_component_by_type(type_id, entity)?;
            }
        }
        Ok(())
    }

    /// Replays every command pending in `inbox` when the call starts.
    ///
    /// A rejected command is logged and dropped; the drain continues.
    pub fn drain_inbox(&mut self, inbox: &ReplicationInbox) -> ReplayStats {
        let mut stats = ReplayStats::default();

        for _ in 0..inbox.len() {
            let Some(command) = inbox.try_next() else {
                break;
            };
            match self.apply_replicated(command) {
                Ok(()) => stats.applied += 1,
                Err(err) => {
                    tracing::warn!("rejected replicated command: {}", err);
                    stats.rejected += 1;
                }
            }
        }

        if stats.total() > 0 {
            tracing::trace!(
                "replayed {} commands ({} rejected)",
                stats.applied,
                stats.rejected
            );
        }
        stats
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}
