//! Connection Module
//!
//! Records never own a connection. Every time one needs to run a statement it asks the
//! process-wide [`ConnectionResolver`] for an executor by name (`None` = default).
//!
//! The resolver must be installed once, before the first persistence call, with
//! [`set_connection_resolver`]. Resolving without one is a configuration error.

use crate::config::DatabaseConfig;
use crate::error::ModelError;
use crate::executor::LifeExecutor;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Hands out executors by connection name.
pub trait ConnectionResolver: Send + Sync {
    /// Resolve `name`, or the default connection when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ConnectionNotFound` for unknown names.
    fn connection(&self, name: Option<&str>) -> Result<Arc<dyn LifeExecutor>, ModelError>;

    /// Name used when a record does not pick a connection.
    fn default_connection(&self) -> &str;
}

static RESOLVER: Lazy<RwLock<Option<Arc<dyn ConnectionResolver>>>> =
    Lazy::new(|| RwLock::new(None));

/// Install the process-wide resolver, replacing any previous one.
pub fn set_connection_resolver(resolver: Arc<dyn ConnectionResolver>) {
    let mut slot = match RESOLVER.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *slot = Some(resolver);
}

/// Remove the process-wide resolver.
pub fn unset_connection_resolver() {
    let mut slot = match RESOLVER.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *slot = None;
}

#[must_use]
pub fn connection_resolver() -> Option<Arc<dyn ConnectionResolver>> {
    let slot = match RESOLVER.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    slot.clone()
}

/// Resolve a connection through the installed resolver.
///
/// # Errors
///
/// Returns `ModelError::ResolverNotSet` if no resolver is installed, or whatever the
/// resolver reports for the name.
pub fn resolve_connection(name: Option<&str>) -> Result<Arc<dyn LifeExecutor>, ModelError> {
    connection_resolver()
        .ok_or(ModelError::ResolverNotSet)?
        .connection(name)
}

/// Stock resolver: a set of named executors plus a default name.
pub struct DatabaseManager {
    default: String,
    connections: RwLock<HashMap<String, Arc<dyn LifeExecutor>>>,
}

impl DatabaseManager {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            connections: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(config.default_connection.clone())
    }

    /// Register (or replace) the executor for `name`.
    pub fn add_connection(&self, name: impl Into<String>, executor: Arc<dyn LifeExecutor>) {
        let name = name.into();
        log::debug!("registering connection `{}`", name);
        let mut connections = match self.connections.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        connections.insert(name, executor);
    }

    /// Builder-style [`DatabaseManager::add_connection`].
    #[must_use]
    pub fn with_connection(self, name: impl Into<String>, executor: Arc<dyn LifeExecutor>) -> Self {
        self.add_connection(name, executor);
        self
    }
}

impl ConnectionResolver for DatabaseManager {
    fn connection(&self, name: Option<&str>) -> Result<Arc<dyn LifeExecutor>, ModelError> {
        let name = name.unwrap_or(&self.default);
        let connections = match self.connections.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        connections
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::ConnectionNotFound(name.to_string()))
    }

    fn default_connection(&self) -> &str {
        &self.default
    }
}
