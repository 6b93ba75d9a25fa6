//! Concurrency tests for the connection registry
//!
//! Many threads race to register the same names. Uniqueness must hold and
//! every successful registration must produce exactly one notification.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use broker_registry::testing::{MockConnection, MockFactory, RecordingObserver};
use broker_registry::{BrokerConfig, BrokerService, ConnectionRegistry, SharedConnection};

const THREADS: usize = 16;

#[test]
fn test_racing_add_if_absent_registers_once() {
    let registry = Arc::new(ConnectionRegistry::new(MockFactory::new()));
    let recorder = Arc::new(RecordingObserver::new());
    registry.subscribe(recorder.clone());

    let barrier = Arc::new(Barrier::new(THREADS));
    let winners = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            let winners = Arc::clone(&winners);
            thread::spawn(move || {
                // Alternate case so lookups must normalize
                let name = if i % 2 == 0 { "home" } else { "HOME" };
                let connection: SharedConnection = MockConnection::programmatic(name);
                barrier.wait();
                if registry.add_if_absent(connection) {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
    assert_eq!(recorder.added_count(), 1);
}

#[test]
fn test_racing_create_and_add_constructs_once() {
    let factory = MockFactory::new();
    let registry = Arc::new(ConnectionRegistry::new(factory.clone()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry
                    .create_and_add(&BrokerConfig::new("home", "tcp://10.0.0.5"))
                    .unwrap()
                    .is_some()
            })
        })
        .collect();

    let created: usize = handles
        .into_iter()
        .map(|h| h.join().unwrap() as usize)
        .sum();

    assert_eq!(created, 1);
    assert_eq!(factory.creation_count(), 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_mixed_writers_keep_names_unique() {
    let factory = MockFactory::new();
    let registry = Arc::new(ConnectionRegistry::new(factory.clone()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let name = format!("broker{}", i % 4);
                barrier.wait();
                if i % 2 == 0 {
                    registry.add_if_absent(MockConnection::programmatic(&name));
                } else {
                    registry
                        .create_and_add(&BrokerConfig::new(name, "tcp://10.0.0.5"))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        registry.names(),
        vec!["broker0", "broker1", "broker2", "broker3"]
    );
}

#[test]
fn test_add_remove_cycles_notify_in_pairs() {
    let registry = Arc::new(ConnectionRegistry::new(MockFactory::new()));
    let recorder = Arc::new(RecordingObserver::new());
    registry.subscribe(recorder.clone());

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let name = format!("worker{}", i);
                for _ in 0..50 {
                    let connection: SharedConnection = MockConnection::programmatic(&name);
                    assert!(registry.add_if_absent(Arc::clone(&connection)));
                    assert!(registry.remove_connection(&connection));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(registry.is_empty());
    assert_eq!(recorder.added_count(), THREADS * 50);
    assert_eq!(recorder.removed_count(), THREADS * 50);
}

#[test]
fn test_reconfigure_concurrent_with_programmatic_adds() {
    let factory = MockFactory::new();
    let service = Arc::new(BrokerService::new(factory.clone()));
    let properties = broker_registry::parse_properties("a.url=tcp://10.0.0.1\nb.url=tcp://10.0.0.2");

    let reconfigurer = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            for _ in 0..20 {
                service.reconfigure(Some(&properties));
            }
        })
    };
    let adder = {
        let service = Arc::clone(&service);
        thread::spawn(move || {
            for i in 0..20 {
                service.add_broker_connection(MockConnection::programmatic(&format!("manual{}", i)));
            }
        })
    };

    reconfigurer.join().unwrap();
    adder.join().unwrap();

    // Reconfiguration never touches programmatic connections
    let manual = service
        .broker_connections()
        .iter()
        .filter(|c| !c.is_configuration_derived())
        .count();
    assert_eq!(manual, 20);
    assert!(service.broker_connection("a").is_some());
    assert!(service.broker_connection("b").is_some());
}
