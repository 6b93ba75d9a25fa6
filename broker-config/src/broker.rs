//! Per-broker connection configuration
//!
//! A `BrokerConfig` is built fresh from the grouped properties of one broker
//! on every reconfiguration and discarded afterwards. Numeric and boolean
//! fields that fail to parse are treated as not configured.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ConfigError, Result};
use crate::last_will::{parse_bool, parse_will_qos, LastWill, LastWillConfig};

/// Property names recognized inside a broker group
pub mod keys {
    pub const NAME: &str = "name";
    pub const URL: &str = "url";
    pub const USER: &str = "user";
    pub const PASSWORD: &str = "pwd";
    pub const CLIENT_ID: &str = "clientId";
    pub const KEEP_ALIVE: &str = "keepAlive";
    pub const QOS: &str = "qos";
    pub const RETAIN: &str = "retain";
    pub const LWT: &str = "lwt";
    pub const LWT_TOPIC: &str = "lwtTopic";
    pub const LWT_MESSAGE: &str = "lwtMessage";
    pub const LWT_QOS: &str = "lwtQos";
    pub const LWT_RETAIN: &str = "lwtRetain";

    pub(crate) const ALL: [&str; 13] = [
        NAME, URL, USER, PASSWORD, CLIENT_ID, KEEP_ALIVE, QOS, RETAIN, LWT, LWT_TOPIC,
        LWT_MESSAGE, LWT_QOS, LWT_RETAIN,
    ];
}

/// Configuration for a single named broker connection
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Identity of the connection, compared case-insensitively
    pub name: String,

    /// Label given through an explicit `<broker>.name` property
    pub display_name: Option<String>,

    /// Connection endpoint, e.g. `tcp://10.0.0.5:1883`
    pub url: Option<String>,

    pub user: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,

    /// Keep-alive interval in seconds
    pub keep_alive: Option<u32>,

    /// Default quality of service; range checks belong to the connection
    pub qos: Option<i32>,

    pub retain: Option<bool>,

    pub last_will: Option<LastWillConfig>,

    /// Properties this crate does not interpret
    pub extra: BTreeMap<String, String>,
}

impl BrokerConfig {
    /// Create a configuration with the two mandatory fields
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Build a configuration from one broker's grouped properties
    pub fn from_properties(properties: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| properties.get(key).cloned();

        let last_will = LastWillConfig {
            spec: get(keys::LWT),
            topic: get(keys::LWT_TOPIC),
            message: get(keys::LWT_MESSAGE).map(String::into_bytes),
            qos: properties.get(keys::LWT_QOS).and_then(|v| parse_will_qos(v)),
            retain: properties.get(keys::LWT_RETAIN).and_then(|v| parse_bool(v)),
        };

        let extra = properties
            .iter()
            .filter(|(key, _)| !keys::ALL.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            name: get(keys::NAME).unwrap_or_default(),
            display_name: None,
            url: get(keys::URL),
            user: get(keys::USER),
            password: get(keys::PASSWORD),
            client_id: get(keys::CLIENT_ID),
            keep_alive: properties.get(keys::KEEP_ALIVE).and_then(|v| parse_keep_alive(v)),
            qos: properties.get(keys::QOS).and_then(|v| parse_int(v)),
            retain: properties.get(keys::RETAIN).and_then(|v| parse_bool(v)),
            last_will: (!last_will.is_empty()).then_some(last_will),
            extra,
        }
    }

    /// Lowercased name used as the registry key
    pub fn registry_key(&self) -> String {
        self.name.to_lowercase()
    }

    /// The resolved last will, if the raw fields describe a usable one
    pub fn resolved_last_will(&self) -> Option<LastWill> {
        self.last_will.as_ref().and_then(LastWillConfig::resolve)
    }

    /// Check that `name` and `url` are present and non-empty
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ConfigError::MissingProperty {
                broker: self.name.clone(),
                property: keys::NAME,
            });
        }

        if self.url.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingProperty {
                broker: self.name.clone(),
                property: keys::URL,
            });
        }

        Ok(())
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_keep_alive(mut self, seconds: u32) -> Self {
        self.keep_alive = Some(seconds);
        self
    }

    pub fn with_qos(mut self, qos: i32) -> Self {
        self.qos = Some(qos);
        self
    }

    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = Some(retain);
        self
    }

    pub fn with_last_will(mut self, will: LastWill) -> Self {
        self.last_will = Some(LastWillConfig {
            spec: None,
            topic: Some(will.topic),
            message: Some(will.payload),
            qos: Some(will.qos),
            retain: Some(will.retain),
        });
        self
    }
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("keep_alive", &self.keep_alive)
            .field("qos", &self.qos)
            .field("retain", &self.retain)
            .field("last_will", &self.last_will)
            .field("extra", &self.extra)
            .finish()
    }
}

fn parse_int(value: &str) -> Option<i32> {
    value.trim().parse().ok()
}

fn parse_keep_alive(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|seconds| *seconds > 0)
}
