//! Error types for broker configuration parsing.

use thiserror::Error;

/// Errors raised while loading or validating broker configuration.
///
/// Malformed entries inside a property map are never reported through this
/// type; the extractor skips and logs them instead.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A mandatory broker property is missing or empty
    #[error("MQTT Broker property '{property}' is not provided for broker '{broker}'")]
    MissingProperty {
        broker: String,
        property: &'static str,
    },

    /// The configuration source could not be read
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration source is not a JSON object of properties
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
