//! Name-keyed connection registry with uniqueness enforcement
//!
//! This module owns the authoritative mapping from lowercased broker name to
//! connection. Check-then-insert and identity removal go through the map's
//! entry API, which holds the shard lock across the check and the write, so
//! concurrent writers can never register two connections under one name.
//! Observers are notified after the map guard has been released.

use std::fmt;
use std::sync::Arc;

use broker_config::BrokerConfig;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::connection::{same_connection, ConnectionFactory, SharedConnection};
use crate::error::Result;
use crate::observer::{BrokersObserver, ObserverHub};

/// Thread-safe registry of named broker connections
///
/// Names are compared case-insensitively; the map key is always the
/// connection's own name lowercased.
pub struct ConnectionRegistry {
    /// Lowercased name -> connection
    connections: DashMap<String, SharedConnection>,

    /// Builds connections for `create_and_add`
    factory: Arc<dyn ConnectionFactory>,

    /// Add/remove observers
    observers: ObserverHub,
}

impl ConnectionRegistry {
    /// Create an empty registry that builds connections with `factory`
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            connections: DashMap::new(),
            factory,
            observers: ObserverHub::new(),
        }
    }

    /// Look up a connection by name, ignoring case
    pub fn lookup(&self, name: &str) -> Option<SharedConnection> {
        self.connections
            .get(&name.to_lowercase())
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connections.contains_key(&name.to_lowercase())
    }

    /// Register a pre-built connection under its own name
    ///
    /// The connection is not started or stopped. Returns `false` and leaves
    /// the registry unchanged if the name is already taken.
    pub fn add_if_absent(&self, connection: SharedConnection) -> bool {
        let key = connection.name().to_lowercase();

        match self.connections.entry(key) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&connection));
            }
        }

        tracing::debug!(broker = connection.name(), "Broker connection added");
        self.observers.notify_added(&connection);
        true
    }

    /// Build, register and configure a configuration-derived connection
    ///
    /// Fails with a configuration error when `name` or `url` is missing.
    /// Returns `Ok(None)` when a connection with the same name already
    /// exists. The connection is constructed only after the name has been
    /// reserved, so a lost race never leaves a stray connection behind.
    /// The factory must not call back into this registry. Settings are
    /// applied after the map guard is released and before observers run.
    pub fn create_and_add(&self, config: &BrokerConfig) -> Result<Option<SharedConnection>> {
        config.validate()?;
        let key = config.registry_key();
        let url = config.url.as_deref().unwrap_or_default();

        let connection = match self.connections.entry(key.clone()) {
            Entry::Occupied(_) => return Ok(None),
            Entry::Vacant(vacant) => {
                let connection = self.factory.create(&key, url, true)?;
                vacant.insert(Arc::clone(&connection));
                connection
            }
        };

        apply_config(&connection, config);

        tracing::debug!(broker = %key, url, "Broker connection created from configuration");
        self.observers.notify_added(&connection);
        Ok(Some(connection))
    }

    /// Remove the connection registered under `name`
    pub fn remove(&self, name: &str) -> Option<SharedConnection> {
        let (_, connection) = self.connections.remove(&name.to_lowercase())?;

        tracing::debug!(broker = connection.name(), "Broker connection removed");
        self.observers.notify_removed(&connection);
        Some(connection)
    }

    /// Remove `connection` only if it is still the one registered under its name
    ///
    /// Returns `false` when the name is unknown or maps to a different
    /// connection object.
    pub fn remove_connection(&self, connection: &SharedConnection) -> bool {
        let removed = self
            .connections
            .remove_if(&connection.name().to_lowercase(), |_, stored| {
                same_connection(stored, connection)
            });

        match removed {
            Some((_, stored)) => {
                tracing::debug!(broker = stored.name(), "Broker connection removed");
                self.observers.notify_removed(&stored);
                true
            }
            None => false,
        }
    }

    /// Point-in-time snapshot of all registered connections
    pub fn enumerate(&self) -> Vec<SharedConnection> {
        self.connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Registered (lowercased) names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn subscribe(&self, observer: Arc<dyn BrokersObserver>) {
        self.observers.subscribe(observer);
    }

    pub fn unsubscribe(&self, observer: &Arc<dyn BrokersObserver>) -> bool {
        self.observers.unsubscribe(observer)
    }

    pub fn has_subscribers(&self) -> bool {
        self.observers.has_subscribers()
    }

    /// Get statistics about the registry
    pub fn stats(&self) -> RegistryStats {
        let connections = self.enumerate();
        let configuration_derived = connections
            .iter()
            .filter(|c| c.is_configuration_derived())
            .count();

        RegistryStats {
            total_connections: connections.len(),
            configuration_derived,
            programmatic: connections.len() - configuration_derived,
            observers: self.observers.len(),
        }
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("names", &self.names())
            .field("observers", &self.observers)
            .finish()
    }
}

/// Push the optional settings of `config` into a fresh connection
fn apply_config(connection: &SharedConnection, config: &BrokerConfig) {
    connection.set_credentials(config.user.as_deref(), config.password.as_deref());
    connection.set_client_id(config.client_id.as_deref());
    if let Some(keep_alive) = config.keep_alive {
        connection.set_keep_alive_interval(keep_alive);
    }
    if let Some(qos) = config.qos {
        connection.set_qos(qos);
    }
    if let Some(retain) = config.retain {
        connection.set_retain(retain);
    }
    if let Some(will) = config.resolved_last_will() {
        tracing::debug!(broker = connection.name(), "Setting last will: {}", will);
        connection.set_last_will(will);
    }
}

/// Statistics about the registry state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_connections: usize,
    pub configuration_derived: usize,
    pub programmatic: usize,
    pub observers: usize,
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Registry Stats:")?;
        writeln!(f, "  Total: {}", self.total_connections)?;
        writeln!(f, "  Configuration-derived: {}", self.configuration_derived)?;
        writeln!(f, "  Programmatic: {}", self.programmatic)?;
        write!(f, "  Observers: {}", self.observers)
    }
}
