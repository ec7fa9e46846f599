//! # ECS Error Types
//!
//! Every failure in this crate is a programming error: registering something
//! twice, touching something that was never registered, or mutating an entity
//! that is not alive. They are reported immediately and never retried.

use std::path::PathBuf;

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors raised by the entity, component and system managers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Operation on a system type that was never registered.
    #[error("system not registered: {name}")]
    InvalidSystem {
        /// Type name of the system.
        name: &'static str,
    },

    /// The same system type was registered twice.
    #[error("system already registered: {name}")]
    DuplicateSystem {
        /// Type name of the system.
        name: &'static str,
    },

    /// A signature was requested for a system that has none yet.
    #[error("system {name} has no required signature")]
    MissingSignature {
        /// Type name of the system.
        name: &'static str,
    },

    /// The system instance is checked out for its own update.
    #[error("system {name} is currently running its update")]
    SystemInUse {
        /// Type name of the system.
        name: &'static str,
    },

    /// Structural operation on a dead, stale or never-spawned entity.
    #[error("invalid entity: {0}")]
    InvalidEntity(EntityId),

    /// Explicit-id spawn at or past the configured entity ceiling.
    #[error("entity id {id} is outside the world (ids must be below {max})")]
    EntityIdOutOfRange {
        /// Requested id.
        id: EntityId,
        /// Exclusive ceiling.
        max: EntityId,
    },

    /// Explicit-id spawn of an id that is already alive.
    #[error("entity {0} is already alive")]
    EntityAlreadyAlive(EntityId),

    /// Access to a component type that was never registered.
    #[error("component not registered: {name}")]
    UnregisteredComponent {
        /// Type name of the component.
        name: &'static str,
    },

    /// The same component type was registered twice.
    #[error("component already registered: {name}")]
    DuplicateComponent {
        /// Type name of the component.
        name: &'static str,
    },

    /// Every signature bit is already assigned to a component type.
    #[error("cannot register {name}: all {max} component type ids are in use")]
    ComponentLimitReached {
        /// Type name of the component.
        name: &'static str,
        /// Signature width.
        max: usize,
    },
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors raised while loading an [`EcsConfig`](crate::EcsConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The config is not valid TOML or has unknown keys.
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}
