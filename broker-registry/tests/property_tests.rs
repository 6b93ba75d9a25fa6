//! Property-based tests for registry and reconciliation invariants

use std::collections::BTreeSet;
use std::sync::Arc;

use broker_registry::testing::{MockConnection, MockFactory, ObserverEvent, RecordingObserver};
use broker_registry::{BrokerConnection, BrokerService, ConnectionRegistry, Properties};
use proptest::prelude::*;
use serde_json::Value;

fn broker_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,7}"
}

/// Mixed-case name sets for configurations
fn configuration_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z][a-zA-Z0-9]{0,5}", 0..6)
}

fn to_properties(brokers: &[String]) -> Properties {
    brokers
        .iter()
        .map(|b| (format!("{}.url", b), Value::String("tcp://10.0.0.1".into())))
        .collect()
}

fn lowercased_set(brokers: &[String]) -> BTreeSet<String> {
    brokers.iter().map(|b| b.to_lowercase()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// N distinct adds and N removes produce 2N notifications in order.
    #[test]
    fn prop_add_remove_notifications_match(
        names in prop::collection::btree_set(broker_name_strategy(), 1..10),
    ) {
        let registry = ConnectionRegistry::new(MockFactory::new());
        let recorder = Arc::new(RecordingObserver::new());
        registry.subscribe(recorder.clone());

        for name in &names {
            prop_assert!(registry.add_if_absent(MockConnection::programmatic(name)));
        }
        for name in &names {
            prop_assert!(registry.remove(name).is_some());
        }

        let expected: Vec<ObserverEvent> = names
            .iter()
            .map(|n| ObserverEvent::Added(n.clone()))
            .chain(names.iter().map(|n| ObserverEvent::Removed(n.clone())))
            .collect();
        prop_assert_eq!(recorder.events(), expected);
    }

    /// Registry names are always unique after lowercasing.
    #[test]
    fn prop_names_unique_case_insensitive(
        names in prop::collection::vec("[A-Za-z]{1,4}", 0..20),
    ) {
        let registry = ConnectionRegistry::new(MockFactory::new());
        for name in &names {
            registry.add_if_absent(MockConnection::programmatic(name));
        }

        let expected = lowercased_set(&names);
        prop_assert_eq!(registry.len(), expected.len());
        for name in &names {
            prop_assert!(registry.lookup(&name.to_uppercase()).is_some());
        }
    }

    /// After any reconfiguration the configuration-derived set is exactly
    /// the configured brokers, and programmatic connections are untouched.
    #[test]
    fn prop_reconfigure_matches_configuration(
        configurations in prop::collection::vec(configuration_strategy(), 1..5),
        manual in prop::collection::btree_set("manual_[0-9]{1,3}", 0..4),
    ) {
        let service = BrokerService::new(MockFactory::new());
        let mut manual_connections = Vec::new();
        for name in &manual {
            let connection = MockConnection::programmatic(name);
            service.add_broker_connection(connection.clone());
            manual_connections.push(connection);
        }

        for brokers in &configurations {
            service.reconfigure(Some(&to_properties(brokers)));

            let derived: BTreeSet<String> = service
                .broker_connections()
                .iter()
                .filter(|c| c.is_configuration_derived())
                .map(|c| c.name().to_string())
                .collect();
            prop_assert_eq!(derived, lowercased_set(brokers));

            for connection in &manual_connections {
                prop_assert!(service.broker_connection(connection.name()).is_some());
            }
        }

        for connection in &manual_connections {
            prop_assert_eq!(connection.close_count(), 0);
            prop_assert_eq!(connection.start_count(), 0);
        }
    }

    /// Each reconfiguration starts every configured broker exactly once.
    #[test]
    fn prop_each_reconfigure_starts_once(
        brokers in prop::collection::btree_set(broker_name_strategy(), 1..5),
        rounds in 1usize..4,
    ) {
        let factory = MockFactory::new();
        let service = BrokerService::new(factory.clone());
        let brokers: Vec<String> = brokers.into_iter().collect();
        let properties = to_properties(&brokers);

        for _ in 0..rounds {
            service.reconfigure(Some(&properties));
        }

        for broker in &brokers {
            prop_assert_eq!(factory.start_count_for(broker), rounds as u32);
            prop_assert_eq!(factory.created_named(broker).len(), rounds);
        }
    }
}
