//! # Broker Registry
//!
//! Provisioning and lifecycle management for named MQTT broker connections.
//!
//! The service keeps one registry of connections keyed by case-insensitive
//! name. Connections come from two sources:
//!
//! - **Configuration-derived**: built from the host configuration on every
//!   [`BrokerService::reconfigure`] and replaced wholesale by the next one
//! - **Programmatic**: added by application code through
//!   [`BrokerService::add_broker_connection`] and never touched by
//!   reconfiguration
//!
//! Observers registered with [`BrokerService::add_brokers_observer`] hear
//! about every addition and removal, whatever its source.
//!
//! # Architecture
//!
//! ```text
//! host properties → ConfigExtractor → BrokerService → ConnectionRegistry → BrokersObserver
//!                   (broker_config)   (lifecycle)     (name -> connection)  (fan-out)
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use broker_registry::prelude::*;
//!
//! let factory = |name: &str, url: &str, configuration_derived: bool| {
//!     Ok::<_, ConnectionError>(Arc::new(MyConnection::new(name, url, configuration_derived)) as SharedConnection)
//! };
//!
//! let service = BrokerService::new(Arc::new(factory));
//! service.add_brokers_observer(Arc::new(MyObserver));
//!
//! let report = service.activate(Some(&parse_properties("home.url=tcp://10.0.0.5")));
//! if !report.is_clean() {
//!     eprintln!("broker configuration applied with problems: {report}");
//! }
//!
//! let home = service.broker_connection("Home");
//! ```

// Connection contract implemented by the host
pub mod connection;

// Name-keyed registry and its observers
pub mod observer;
pub mod registry;

// Lifecycle controller
pub mod config;
pub mod service;

// Name-based convenience API on the service
mod legacy;

// Error types
pub mod error;

// Logging infrastructure
pub mod logging;

// Mocks for tests and demos
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::ServiceConfig;
pub use connection::{
    same_connection, BrokerConnection, ConnectionFactory, ConnectionObserver, ConnectionState,
    EventPublisher, MessageConsumer, MessageProducer, SharedConnection,
};
pub use error::{ConnectionError, RegistryError, Result};
pub use observer::{BrokersObserver, ObserverHub};
pub use registry::{ConnectionRegistry, RegistryStats};
pub use service::{BrokerService, ReconcileReport, RejectedBroker, ServiceState};

// Configuration types callers need to drive the service
pub use broker_config::{
    load_properties, parse_properties, properties_from_json, BrokerConfig, ConfigError, LastWill,
    Properties,
};

pub use logging::{init_logging, init_logging_from_env, init_silent, LoggingError, LoggingMode};

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::connection::{
        BrokerConnection, ConnectionFactory, ConnectionState, SharedConnection,
    };
    pub use crate::error::{ConnectionError, RegistryError};
    pub use crate::observer::BrokersObserver;
    pub use crate::service::{BrokerService, ReconcileReport};
    pub use crate::ServiceConfig;
    pub use broker_config::{parse_properties, BrokerConfig, Properties};
}
