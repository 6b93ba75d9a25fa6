//! Flat property maps and the text formats they are loaded from
//!
//! The hosting application hands the registry a flat map of dotted keys to
//! arbitrary values. This module defines that map and offers loaders for the
//! two formats hosts commonly keep it in:
//!
//! ```text
//! # services/mqtt.cfg
//! broker1.name=Some name
//! broker1.url=tcp://123.123.123.132
//!
//! broker2.qos=2
//! broker2.url=ssl://111.222.333.444
//! ```
//!
//! and a JSON object with the same keys.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::Result;

/// Flat configuration map as supplied by the host
///
/// Only string values are meaningful to the extractor; other value kinds are
/// kept so that they can be reported and skipped there.
pub type Properties = HashMap<String, Value>;

/// Parse properties-style text into a property map
///
/// Each non-blank line holds `key=value` or `key:value`. Lines starting with
/// `#` or `!` are comments. Keys and values are trimmed. Lines without a
/// separator or with an empty key are skipped, so parsing never fails.
pub fn parse_properties(text: &str) -> Properties {
    let mut properties = Properties::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let Some(split_at) = line.find(['=', ':']) else {
            tracing::debug!(line = index + 1, "Skipping property line without separator: '{}'", line);
            continue;
        };

        let key = line[..split_at].trim();
        let value = line[split_at + 1..].trim();
        if key.is_empty() {
            tracing::debug!(line = index + 1, "Skipping property line with empty key");
            continue;
        }

        properties.insert(key.to_string(), Value::String(value.to_string()));
    }

    properties
}

/// Read a properties file from disk
pub fn load_properties(path: impl AsRef<Path>) -> Result<Properties> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let properties = parse_properties(&text);
    tracing::debug!(
        path = %path.display(),
        count = properties.len(),
        "Loaded broker properties"
    );
    Ok(properties)
}

/// Parse a JSON object into a property map
///
/// Values are kept as-is; nested or non-string values are rejected later by
/// the extractor rather than here.
pub fn properties_from_json(text: &str) -> Result<Properties> {
    let properties: Properties = serde_json::from_str(text)?;
    Ok(properties)
}
