//! # MERIDIAN ECS
//!
//! Signature-based Entity Component System core:
//! - Entities are generation-checked handles with lowest-first id reuse
//! - Components live in per-type stores indexed by entity id
//! - Systems track every entity whose signature contains their own
//!
//! ## Architecture Rules
//!
//! 1. **Synchronous consistency** - every structural change updates system
//!    membership before the call returns
//! 2. **Single owner** - a world is driven by one simulation thread; remote
//!    changes arrive through the [`ReplicationInbox`]
//! 3. **No globals** - a [`Coordinator`] is an owned value
//!
//! ## Example
//!
//! ```rust,ignore
//! use meridian_ecs::{Coordinator, Entity, System};
//!
//! struct Position { x: f32, y: f32 }
//! #[derive(Clone, Copy)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! struct MoverSystem;
//!
//! impl System for MoverSystem {
//!     fn on_update(&mut self, world: &mut Coordinator, entities: &[Entity], dt: f32) {
//!         for &e in entities {
//!             let Ok(Some(&Velocity { dx, dy })) = world.get_component::<Velocity>(e) else {
//!                 continue;
//!             };
//!             if let Ok(Some(p)) = world.get_component_mut::<Position>(e) {
//!                 p.x += dx * dt;
//!                 p.y += dy * dt;
//!             }
//!         }
//!     }
//! }
//!
//! let mut world = Coordinator::new();
//! world.register_component::<Position>()?;
//! world.register_component::<Velocity>()?;
//! world.add_system(MoverSystem)?;
//! world.set_system_signature::<MoverSystem, (Position, Velocity)>()?;
//!
//! let ship = world.spawn_entity("ship");
//! world.add_component(ship, Position { x: 0.0, y: 0.0 })?;
//! world.add_component(ship, Velocity { dx: 1.0, dy: 0.0 })?;
//! world.update_all(1.0 / 60.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod coordinator;
pub mod ecs;
pub mod error;
pub mod replication;
pub mod tick;

pub use config::EcsConfig;
pub use coordinator::{ComponentSet, Coordinator};
pub use ecs::{
    Component, ComponentStore, ComponentTypeId, Entity, EntityId, EntityManager, Generation,
    Membership, Signature, SignatureObserver, System, SystemManager, MAX_COMPONENTS,
};
pub use error::{ConfigError, EcsError, EcsResult};
pub use replication::{ReplayStats, ReplicationCommand, ReplicationInbox, ReplicationSender};
pub use tick::{TickLoop, TickStats, MAX_CATCH_UP_TICKS};
