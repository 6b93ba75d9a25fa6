//! Service settings
//!
//! These settings shape how the service treats the broker configuration it
//! receives; the broker configuration itself is parsed by `broker_config`.

use broker_config::{ConfigExtractor, RESERVED_KEYS};

use crate::error::{RegistryError, Result};

/// Settings for [`BrokerService`](crate::BrokerService)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Start configuration-derived connections right after creating them
    /// Default: true
    pub auto_start: bool,

    /// Keys the host adds to every configuration and that never describe a broker
    /// Default: `service.pid`, `objectClass`, `component.name`, `component.id`
    pub reserved_keys: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            reserved_keys: RESERVED_KEYS.iter().map(|key| key.to_string()).collect(),
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.reserved_keys.iter().any(|key| key.trim().is_empty()) {
            return Err(RegistryError::Settings(
                "Reserved keys must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Extractor honoring the configured reserved keys
    pub fn extractor(&self) -> ConfigExtractor {
        ConfigExtractor::new().with_reserved_keys(self.reserved_keys.iter().cloned())
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    pub fn with_reserved_key(mut self, key: impl Into<String>) -> Self {
        self.reserved_keys.push(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert!(config.auto_start);
        assert_eq!(config.reserved_keys.len(), RESERVED_KEYS.len());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServiceConfig::new()
            .with_auto_start(false)
            .with_reserved_key("felix.fileinstall.filename");

        assert!(!config.auto_start);
        assert!(config.extractor().is_reserved("felix.fileinstall.filename"));
        assert!(config.extractor().is_reserved("service.pid"));
    }

    #[test]
    fn test_config_validation() {
        let invalid = ServiceConfig::new().with_reserved_key("  ");
        assert!(matches!(
            invalid.validate(),
            Err(RegistryError::Settings(_))
        ));
    }
}
