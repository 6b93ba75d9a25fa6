//! Last will and testament records
//!
//! A broker configuration may describe the message the broker publishes on
//! the client's behalf when the connection drops. It can be given either as a
//! compact `lwt` string or through the explicit `lwtTopic`, `lwtMessage`,
//! `lwtQos` and `lwtRetain` properties; explicit properties win.

use std::fmt;

/// Highest quality of service level a last will may request
pub const MAX_WILL_QOS: u8 = 2;

/// Raw last-will fields as read from a broker configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastWillConfig {
    /// Compact form, e.g. `topic:home/status,message:offline,qos:1,retain:true`
    pub spec: Option<String>,
    pub topic: Option<String>,
    pub message: Option<Vec<u8>>,
    /// Only values in `0..=2` are kept
    pub qos: Option<u8>,
    pub retain: Option<bool>,
}

impl LastWillConfig {
    /// Check whether any last-will field was configured
    pub fn is_empty(&self) -> bool {
        self.spec.is_none()
            && self.topic.is_none()
            && self.message.is_none()
            && self.qos.is_none()
            && self.retain.is_none()
    }

    /// Combine the compact form with the explicit overrides
    ///
    /// Returns `None` unless the resulting topic is non-blank.
    pub fn resolve(&self) -> Option<LastWill> {
        let mut will = self
            .spec
            .as_deref()
            .map(LastWill::parse_partial)
            .unwrap_or_default();

        if let Some(topic) = &self.topic {
            will.topic = topic.trim().to_string();
        }
        if let Some(message) = &self.message {
            will.payload = message.clone();
        }
        if let Some(qos) = self.qos {
            will.qos = qos;
        }
        if let Some(retain) = self.retain {
            will.retain = retain;
        }

        if will.topic.trim().is_empty() {
            None
        } else {
            Some(will)
        }
    }
}

/// A resolved last will handed to the broker connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastWill {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    pub retain: bool,
}

impl LastWill {
    /// Create a last will with qos 0 and no retain flag
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: 0,
            retain: false,
        }
    }

    pub fn with_qos(mut self, qos: u8) -> Self {
        self.qos = qos.min(MAX_WILL_QOS);
        self
    }

    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Parse the compact `lwt` form
    ///
    /// Pairs are separated by `,` and split on the first `:`. Recognized keys
    /// are `topic`, `message`, `qos` and `retain`. Returns `None` when no
    /// usable topic is present.
    pub fn parse(spec: &str) -> Option<Self> {
        let will = Self::parse_partial(spec);
        if will.topic.is_empty() {
            None
        } else {
            Some(will)
        }
    }

    fn parse_partial(spec: &str) -> Self {
        let mut will = LastWill::default();

        for component in spec.split(',') {
            let Some((key, value)) = component.split_once(':') else {
                tracing::debug!("Ignoring last will component without value: '{}'", component);
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "topic" => will.topic = value.to_string(),
                "message" => will.payload = value.as_bytes().to_vec(),
                "qos" => match parse_will_qos(value) {
                    Some(qos) => will.qos = qos,
                    None => tracing::debug!("Ignoring invalid last will qos '{}'", value),
                },
                "retain" => match parse_bool(value) {
                    Some(retain) => will.retain = retain,
                    None => tracing::debug!("Ignoring invalid last will retain '{}'", value),
                },
                other => tracing::debug!("Ignoring unknown last will key '{}'", other),
            }
        }

        will
    }
}

impl fmt::Display for LastWill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "topic={} qos={} retain={} payload={} bytes",
            self.topic,
            self.qos,
            self.retain,
            self.payload.len()
        )
    }
}

/// Parse a last-will qos, keeping only `0..=2`
pub(crate) fn parse_will_qos(value: &str) -> Option<u8> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|qos| *qos <= MAX_WILL_QOS)
}

/// Parse `true` / `false` case-insensitively
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
