//! # Broker Configuration
//!
//! Parses the flat, dotted key-value configuration supplied by a host
//! application into one structured [`BrokerConfig`] per named MQTT broker.
//!
//! ## Quick Start
//!
//! ```rust
//! use broker_config::{extract_broker_configurations, parse_properties};
//!
//! let properties = parse_properties(
//!     "home.url=tcp://10.0.0.5\n\
//!      home.qos=1\n\
//!      Cloud.url=ssl://broker.example.com\n",
//! );
//!
//! let brokers = extract_broker_configurations(&properties);
//! assert_eq!(brokers.len(), 2);
//! assert_eq!(brokers["home"].qos, Some(1));
//! assert_eq!(brokers["cloud"].name, "cloud");
//! ```
//!
//! ## Tolerance
//!
//! Malformed input degrades to "not configured": keys without a
//! `broker.property` shape, blank values and non-string values are skipped
//! and logged, and numeric or boolean fields that do not parse are `None`.

pub mod broker;
pub mod error;
pub mod extract;
pub mod last_will;
pub mod properties;

pub use broker::BrokerConfig;
pub use error::{ConfigError, Result};
pub use extract::{extract_broker_configurations, ConfigExtractor, RESERVED_KEYS};
pub use last_will::{LastWill, LastWillConfig};
pub use properties::{load_properties, parse_properties, properties_from_json, Properties};
