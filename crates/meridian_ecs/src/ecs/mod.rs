//! # Entity Component System
//!
//! Signature-based ECS core.
//!
//! ## Design Philosophy
//!
//! - Entities are generation-checked indices; ids are recycled lowest first
//! - Each component type owns one store indexed directly by entity id
//! - An entity's signature is a 64-bit set of its component types
//! - A system tracks every entity whose signature contains its own
//! - Membership is updated synchronously on every signature change

mod entity;
mod entity_manager;
mod free_ids;
mod signature;
mod storage;
mod system;
mod system_manager;

pub use entity::{Entity, EntityId, Generation};
pub use entity_manager::{EntityManager, SignatureObserver};
pub use signature::{ComponentTypeId, Signature, MAX_COMPONENTS};
pub use storage::{Component, ComponentStore};
pub use system::{Membership, System};
pub use system_manager::SystemManager;
