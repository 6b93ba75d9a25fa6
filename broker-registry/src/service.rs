//! Broker service lifecycle
//!
//! `BrokerService` is the entry point the hosting application drives. It
//! turns each configuration it receives into configuration-derived
//! connections and keeps programmatically added connections alive across
//! reconfigurations.
//!
//! # Reconciliation
//!
//! Every `reconfigure` call tears down *all* configuration-derived
//! connections and rebuilds them from the new configuration. There is no
//! diffing: an unchanged broker is closed and started again.
//!
//! ```rust,ignore
//! use broker_registry::{BrokerService, parse_properties};
//!
//! let service = BrokerService::new(factory);
//! service.activate(Some(&parse_properties("home.url=tcp://10.0.0.5")));
//!
//! // later, when the host configuration changes
//! let report = service.reconfigure(Some(&parse_properties("cloud.url=ssl://broker.example.com")));
//! assert_eq!(report.removed, vec!["home"]);
//! assert_eq!(report.added, vec!["cloud"]);
//!
//! service.deactivate();
//! ```

use std::fmt;
use std::sync::Arc;

use broker_config::{BrokerConfig, ConfigExtractor, Properties};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::connection::{ConnectionFactory, EventPublisher, SharedConnection};
use crate::error::{RegistryError, Result};
use crate::observer::BrokersObserver;
use crate::registry::ConnectionRegistry;

/// Lifecycle state of a [`BrokerService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceState {
    #[default]
    Inactive,
    Active,
}

/// A broker that could not be created during reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedBroker {
    pub name: String,
    pub reason: String,
}

/// Outcome of one reconciliation pass, by broker name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Configuration-derived connections closed and removed
    pub removed: Vec<String>,

    /// Connections created and registered
    pub added: Vec<String>,

    /// Brokers skipped because the name was already registered
    pub duplicates: Vec<String>,

    /// Brokers skipped because of faulty configuration or factory errors
    pub rejected: Vec<RejectedBroker>,

    /// Registered connections whose `start()` failed; they stay registered
    pub failed_to_start: Vec<String>,
}

impl ReconcileReport {
    /// True when every configured broker was added and started
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty() && self.rejected.is_empty() && self.failed_to_start.is_empty()
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "removed={} added={} duplicates={} rejected={} failed_to_start={}",
            self.removed.len(),
            self.added.len(),
            self.duplicates.len(),
            self.rejected.len(),
            self.failed_to_start.len()
        )
    }
}

/// Provisioning and lifecycle service for named broker connections
///
/// Lifecycle calls (`activate`, `reconfigure`, `deactivate`) are serialized
/// with each other. Registry operations and state queries can run
/// concurrently with them. Observers are notified while a lifecycle call is
/// in progress and must not call `activate`, `reconfigure` or `deactivate`
/// from their callbacks.
pub struct BrokerService {
    /// Authoritative name -> connection mapping
    registry: Arc<ConnectionRegistry>,

    /// Service settings
    config: ServiceConfig,

    /// Extractor built from the settings
    extractor: ConfigExtractor,

    /// Held for the duration of each lifecycle call
    lifecycle: Mutex<()>,

    /// Current lifecycle state, written only at transitions
    state: RwLock<ServiceState>,

    /// Publisher handed to consumers registered through the legacy API
    pub(crate) event_publisher: RwLock<Option<Arc<dyn EventPublisher>>>,
}

impl BrokerService {
    /// Create an inactive service with default settings
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        let config = ServiceConfig::default();
        Self {
            registry: Arc::new(ConnectionRegistry::new(factory)),
            extractor: config.extractor(),
            config,
            lifecycle: Mutex::new(()),
            state: RwLock::new(ServiceState::Inactive),
            event_publisher: RwLock::new(None),
        }
    }

    /// Create an inactive service with custom settings
    pub fn with_config(factory: Arc<dyn ConnectionFactory>, config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: Arc::new(ConnectionRegistry::new(factory)),
            extractor: config.extractor(),
            config,
            lifecycle: Mutex::new(()),
            state: RwLock::new(ServiceState::Inactive),
            event_publisher: RwLock::new(None),
        })
    }

    /// Shared handle to the registry for collaborators
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn state(&self) -> ServiceState {
        *self.state.read()
    }

    pub fn is_active(&self) -> bool {
        self.state() == ServiceState::Active
    }

    /// Start the service with its initial configuration
    pub fn activate(&self, properties: Option<&Properties>) -> ReconcileReport {
        let _lifecycle = self.lifecycle.lock();
        info!("Starting MQTT broker service");
        if self.is_active() {
            debug!("Service already active, applying configuration as a reconfiguration");
        }
        self.reconcile(properties)
    }

    /// Replace all configuration-derived connections
    ///
    /// Programmatically added connections are left untouched. A missing or
    /// empty configuration only removes the configuration-derived ones.
    /// Called on an inactive service this behaves like [`activate`](Self::activate).
    pub fn reconfigure(&self, properties: Option<&Properties>) -> ReconcileReport {
        let _lifecycle = self.lifecycle.lock();
        if !self.is_active() {
            debug!("Reconfigure received while inactive, activating");
        }
        self.reconcile(properties)
    }

    /// Close and remove every connection, programmatic ones included
    pub fn deactivate(&self) {
        let _lifecycle = self.lifecycle.lock();
        info!("Stopping MQTT broker service");
        self.close_all();
        *self.state.write() = ServiceState::Inactive;
    }

    /// Caller holds the lifecycle lock
    fn reconcile(&self, properties: Option<&Properties>) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        // Disconnect and discard existing configuration-derived brokers
        for connection in self.registry.enumerate() {
            if !connection.is_configuration_derived() {
                continue;
            }
            debug!(
                broker = connection.name(),
                "Received new MQTT configuration: closing connection"
            );
            connection.close();
            if self.registry.remove_connection(&connection) {
                report.removed.push(connection.name().to_string());
            }
        }
        *self.state.write() = ServiceState::Active;

        let Some(properties) = properties.filter(|p| !p.is_empty()) else {
            debug!("No broker configuration given");
            return report;
        };

        for (name, broker) in self.extractor.extract(properties) {
            let connection = match self.registry.create_and_add(&broker) {
                Ok(Some(connection)) => connection,
                Ok(None) => {
                    warn!(broker = %name, "MQTT broker connection name already present");
                    report.duplicates.push(name);
                    continue;
                }
                Err(RegistryError::Configuration(e)) => {
                    warn!(broker = %name, "MQTT broker connection configuration faulty: {}", e);
                    report.rejected.push(RejectedBroker {
                        name,
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => {
                    warn!(broker = %name, "MQTT broker connection could not be created: {}", e);
                    report.rejected.push(RejectedBroker {
                        name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            report.added.push(name.clone());

            if !self.config.auto_start {
                continue;
            }
            // A connection that fails to start stays registered
            if let Err(e) = connection.start() {
                warn!(broker = %name, "MQTT broker start failed: {}", e);
                report.failed_to_start.push(name);
            }
        }

        debug!(%report, "Broker configuration applied");
        report
    }

    fn close_all(&self) {
        for connection in self.registry.enumerate() {
            connection.close();
            self.registry.remove_connection(&connection);
        }
    }

    /// Look up a connection by name, ignoring case
    pub fn broker_connection(&self, name: &str) -> Option<SharedConnection> {
        self.registry.lookup(name)
    }

    /// All registered connections, configuration-derived and programmatic
    pub fn broker_connections(&self) -> Vec<SharedConnection> {
        self.registry.enumerate()
    }

    /// Add a pre-built connection; it is neither started nor stopped
    ///
    /// Returns `false` if a connection with the same name exists.
    pub fn add_broker_connection(&self, connection: SharedConnection) -> bool {
        self.registry.add_if_absent(connection)
    }

    /// Create and register a connection from a configuration
    ///
    /// Returns `Ok(None)` if the name is already taken. The connection is not
    /// started.
    pub fn add_broker_connection_from_config(
        &self,
        config: &BrokerConfig,
    ) -> Result<Option<SharedConnection>> {
        self.registry.create_and_add(config)
    }

    /// Remove a connection by name without closing it
    pub fn remove_broker_connection(&self, name: &str) -> Option<SharedConnection> {
        self.registry.remove(name)
    }

    /// Remove `connection` if it is still the registered one
    pub fn remove_broker_connection_ref(&self, connection: &SharedConnection) -> bool {
        self.registry.remove_connection(connection)
    }

    pub fn add_brokers_observer(&self, observer: Arc<dyn BrokersObserver>) {
        self.registry.subscribe(observer);
    }

    pub fn remove_brokers_observer(&self, observer: &Arc<dyn BrokersObserver>) -> bool {
        self.registry.unsubscribe(observer)
    }

    pub fn has_brokers_observers(&self) -> bool {
        self.registry.has_subscribers()
    }
}

impl Drop for BrokerService {
    fn drop(&mut self) {
        if *self.state.get_mut() == ServiceState::Active {
            debug!(
                connections = self.registry.len(),
                "BrokerService dropping while active, closing connections"
            );
            self.close_all();
        }
    }
}

impl fmt::Debug for BrokerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerService")
            .field("state", &self.state())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}
