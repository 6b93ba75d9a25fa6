//! Grouping of flat dotted properties into broker configurations
//!
//! The expected service configuration looks like this:
//!
//! ```text
//! broker1.name=Some name
//! broker1.url=tcp://123.123.123.132
//!
//! broker2.qos=2
//! broker2.url=ssl://111.222.333.444
//! ```
//!
//! Every key is `<broker>.<property>`. Entries that do not fit this shape are
//! skipped and logged; extraction never fails.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::{debug, warn};

use crate::broker::{keys, BrokerConfig};
use crate::properties::Properties;

/// Keys the hosting component system adds to every configuration
pub const RESERVED_KEYS: [&str; 4] = ["service.pid", "objectClass", "component.name", "component.id"];

/// Turns a flat property map into per-broker configurations
#[derive(Debug, Clone)]
pub struct ConfigExtractor {
    reserved_keys: HashSet<String>,
}

impl ConfigExtractor {
    /// Create an extractor that ignores the default reserved keys
    pub fn new() -> Self {
        Self {
            reserved_keys: RESERVED_KEYS.iter().map(|key| key.to_string()).collect(),
        }
    }

    /// Ignore additional host-specific keys
    pub fn with_reserved_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn is_reserved(&self, key: &str) -> bool {
        self.reserved_keys.contains(key)
    }

    /// Group the properties by lowercased broker name
    ///
    /// Each group is seeded with `name` set to the lowercased broker name.
    /// An explicit `<broker>.name` property becomes the display name and does
    /// not change the identity.
    pub fn extract(&self, properties: &Properties) -> BTreeMap<String, BrokerConfig> {
        let mut per_broker: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut display_names: BTreeMap<String, String> = BTreeMap::new();

        for (key, value) in properties {
            if self.is_reserved(key) {
                continue;
            }

            let Value::String(value) = value else {
                warn!("Unexpected value in broker configuration {}:{}", key, value);
                continue;
            };

            let Some((broker, property)) = split_key(key) else {
                debug!(
                    "MQTT Broker property '{}={}' should have the format 'broker.propertykey=value'",
                    key, value
                );
                continue;
            };

            if value.trim().is_empty() {
                debug!("MQTT Broker property '{}' has a blank value", key);
                continue;
            }

            let broker_name = broker.to_lowercase();
            let group = per_broker.entry(broker_name.clone()).or_insert_with(|| {
                let mut group = BTreeMap::new();
                group.insert(keys::NAME.to_string(), broker_name.clone());
                group
            });

            if property == keys::NAME {
                display_names.insert(broker_name, value.clone());
            } else {
                group.insert(property.to_string(), value.clone());
            }
        }

        per_broker
            .into_iter()
            .map(|(broker_name, group)| {
                let mut config = BrokerConfig::from_properties(&group);
                config.display_name = display_names.remove(&broker_name);
                (broker_name, config)
            })
            .collect()
    }
}

impl Default for ConfigExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract broker configurations using the default reserved keys
pub fn extract_broker_configurations(properties: &Properties) -> BTreeMap<String, BrokerConfig> {
    ConfigExtractor::new().extract(properties)
}

/// Split `broker.property` into its two non-empty segments
fn split_key(key: &str) -> Option<(&str, &str)> {
    let (broker, property) = key.split_once('.')?;
    if broker.is_empty() || property.is_empty() || property.contains('.') {
        return None;
    }
    Some((broker, property))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn string_props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn test_extract_groups_by_broker() {
        let properties = string_props(&[
            ("broker1.name", "Some name"),
            ("broker1.url", "tcp://123.123.123.132"),
            ("broker2.qos", "2"),
            ("broker2.url", "ssl://111.222.333.444"),
        ]);

        let configs = extract_broker_configurations(&properties);
        assert_eq!(configs.len(), 2);

        let broker1 = &configs["broker1"];
        assert_eq!(broker1.name, "broker1");
        assert_eq!(broker1.display_name.as_deref(), Some("Some name"));
        assert_eq!(broker1.url.as_deref(), Some("tcp://123.123.123.132"));

        let broker2 = &configs["broker2"];
        assert_eq!(broker2.name, "broker2");
        assert_eq!(broker2.qos, Some(2));
        assert!(broker2.display_name.is_none());
    }

    #[test]
    fn test_extract_lowercases_and_merges() {
        let properties = string_props(&[("Home.url", "tcp://10.0.0.5"), ("HOME.qos", "1")]);

        let configs = extract_broker_configurations(&properties);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs["home"].name, "home");
        assert_eq!(configs["home"].url.as_deref(), Some("tcp://10.0.0.5"));
        assert_eq!(configs["home"].qos, Some(1));
    }

    #[test]
    fn test_extract_skips_reserved_keys() {
        let mut properties = string_props(&[("home.url", "tcp://10.0.0.5")]);
        properties.insert("service.pid".into(), Value::String("org.mqtt".into()));
        properties.insert("component.name".into(), Value::String("mqtt".into()));
        properties.insert("objectClass".into(), Value::from(vec!["MqttService"]));

        let configs = extract_broker_configurations(&properties);
        assert_eq!(configs.len(), 1);
        assert!(configs.contains_key("home"));
        assert!(!configs.contains_key("service"));
        assert!(!configs.contains_key("component"));
    }

    #[test]
    fn test_extract_custom_reserved_keys() {
        let properties = string_props(&[("home.url", "tcp://10.0.0.5"), ("felix.fileinstall", "x")]);

        let configs = ConfigExtractor::new()
            .with_reserved_keys(["felix.fileinstall"])
            .extract(&properties);
        assert_eq!(configs.keys().collect::<Vec<_>>(), vec!["home"]);
    }

    #[test]
    fn test_extract_skips_non_string_values() {
        let mut properties = string_props(&[("home.url", "tcp://10.0.0.5")]);
        properties.insert("home.qos".into(), Value::from(2));
        properties.insert("home.retain".into(), Value::Bool(true));

        let configs = extract_broker_configurations(&properties);
        assert_eq!(configs["home"].qos, None);
        assert_eq!(configs["home"].retain, None);
    }

    #[rstest]
    #[case("url")]
    #[case("home.lwt.topic")]
    #[case(".url")]
    #[case("home.")]
    #[case("home..url")]
    fn test_extract_skips_malformed_keys(#[case] key: &str) {
        let properties = string_props(&[(key, "tcp://10.0.0.5")]);
        assert!(extract_broker_configurations(&properties).is_empty());
    }

    #[test]
    fn test_extract_skips_blank_values() {
        let properties = string_props(&[("home.url", "   "), ("home.qos", "")]);
        assert!(extract_broker_configurations(&properties).is_empty());
    }

    #[test]
    fn test_extract_empty_input() {
        assert!(extract_broker_configurations(&Properties::new()).is_empty());
    }

    #[test]
    fn test_extract_out_of_range_qos_is_kept() {
        let properties = string_props(&[("mybroker.url", "tcp://10.0.0.5"), ("mybroker.qos", "9")]);

        let configs = extract_broker_configurations(&properties);
        let config = &configs["mybroker"];
        assert_eq!(config.url.as_deref(), Some("tcp://10.0.0.5"));
        assert_eq!(config.qos, Some(9));
    }

    #[test]
    fn test_extract_non_numeric_qos_is_absent() {
        let properties = string_props(&[("mybroker.url", "tcp://10.0.0.5"), ("mybroker.qos", "high")]);

        let configs = extract_broker_configurations(&properties);
        assert_eq!(configs["mybroker"].qos, None);
    }
}
