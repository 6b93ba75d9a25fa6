//! Error types for the broker registry

use thiserror::Error;

/// Errors reported by a broker connection
///
/// The registry never raises these itself; they come from the external
/// connection implementation and its factory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// The connection could not be started
    #[error("Failed to start connection to {broker}: {reason}")]
    StartFailed { broker: String, reason: String },

    /// The broker URL was rejected by the connection implementation
    #[error("Invalid broker URL: {0}")]
    InvalidUrl(String),

    /// The connection has already been closed
    #[error("Connection {0} is closed")]
    Closed(String),

    /// Any other failure reported by the connection
    #[error("Connection error: {0}")]
    Other(String),
}

/// Errors from registry operations that build connections from configuration
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Mandatory name or url missing
    #[error("Broker configuration faulty: {0}")]
    Configuration(#[from] broker_config::ConfigError),

    /// The connection factory failed
    #[error("Broker connection failed: {0}")]
    Connection(#[from] ConnectionError),

    /// Invalid service settings provided
    #[error("Invalid service settings: {0}")]
    Settings(String),
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
