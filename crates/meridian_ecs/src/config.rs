//! # World Configuration
//!
//! Sizing and timing knobs for a [`Coordinator`](crate::Coordinator),
//! loadable from TOML:
//!
//! ```toml
//! entity_capacity = 4096
//! max_entities = 65536
//! system_capacity = 16
//! inbox_capacity = 1024
//! tick_rate = 60
//! ```
//!
//! Missing keys fall back to [`EcsConfig::default`]; unknown keys are
//! rejected.

use std::path::Path;

use serde::Deserialize;

use crate::ecs::EntityId;
use crate::error::ConfigError;

/// Default number of pre-reserved entity records.
pub const DEFAULT_ENTITY_CAPACITY: usize = 1024;

/// Default bound on entity ids: every id is below it.
pub const DEFAULT_MAX_ENTITIES: EntityId = 1 << 20;

/// Default number of pre-reserved system slots.
pub const DEFAULT_SYSTEM_CAPACITY: usize = 32;

/// Default bound of the replication inbox.
pub const DEFAULT_INBOX_CAPACITY: usize = 4096;

/// Default simulation rate in Hz.
pub const DEFAULT_TICK_RATE: u32 = 60;

/// World sizing and timing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EcsConfig {
    /// Entity records reserved up front.
    pub entity_capacity: usize,
    /// Exclusive upper bound on ids a remote authority may spawn on.
    pub max_entities: EntityId,
    /// System slots reserved up front.
    pub system_capacity: usize,
    /// Maximum queued replication commands before senders block.
    pub inbox_capacity: usize,
    /// Fixed simulation rate in Hz.
    pub tick_rate: u32,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            entity_capacity: DEFAULT_ENTITY_CAPACITY,
            max_entities: DEFAULT_MAX_ENTITIES,
            system_capacity: DEFAULT_SYSTEM_CAPACITY,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}

impl EcsConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed TOML or unknown keys,
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!("loaded ECS config from {}", path.display());
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first zero value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const POSITIVE: &str = "must be greater than zero";
        if self.entity_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "entity_capacity",
                reason: POSITIVE,
            });
        }
        if self.max_entities == 0 {
            return Err(ConfigError::Invalid {
                field: "max_entities",
                reason: POSITIVE,
            });
        }
        if self.system_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "system_capacity",
                reason: POSITIVE,
            });
        }
        if self.inbox_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "inbox_capacity",
                reason: POSITIVE,
            });
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_rate",
                reason: POSITIVE,
            });
        }
        Ok(())
    }
}
