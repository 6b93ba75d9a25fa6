//! Name-based convenience API
//!
//! Older callers address connections by broker name instead of holding a
//! connection handle. Every call here resolves the name through the registry
//! and forwards to the connection. An unknown name is a logged no-op.

use std::sync::Arc;

use tracing::debug;

use crate::connection::{
    ConnectionObserver, EventPublisher, MessageConsumer, MessageProducer, SharedConnection,
};
use crate::service::BrokerService;

impl BrokerService {
    fn resolve(&self, broker: &str, operation: &'static str) -> Option<SharedConnection> {
        let connection = self.broker_connection(broker);
        if connection.is_none() {
            debug!(broker, operation, "No MQTT broker connection with this name");
        }
        connection
    }

    pub fn register_connection_observer(&self, broker: &str, observer: Arc<dyn ConnectionObserver>) {
        if let Some(connection) = self.resolve(broker, "register_connection_observer") {
            connection.add_connection_observer(observer);
        }
    }

    pub fn unregister_connection_observer(&self, broker: &str, observer: &Arc<dyn ConnectionObserver>) {
        if let Some(connection) = self.resolve(broker, "unregister_connection_observer") {
            connection.remove_connection_observer(observer);
        }
    }

    /// Attach a consumer and hand it the current event publisher
    ///
    /// The publisher is only handed over once the connection accepted the
    /// consumer. Failures are logged and otherwise ignored.
    pub fn register_message_consumer(&self, broker: &str, consumer: Arc<dyn MessageConsumer>) {
        let Some(connection) = self.resolve(broker, "register_message_consumer") else {
            return;
        };

        match connection.add_consumer(Arc::clone(&consumer)) {
            Ok(()) => consumer.set_event_publisher(self.event_publisher.read().clone()),
            Err(e) => debug!(
                broker,
                topic = consumer.topic(),
                "Failed to add message consumer: {}",
                e
            ),
        }
    }

    pub fn unregister_message_consumer(&self, broker: &str, consumer: &Arc<dyn MessageConsumer>) {
        if let Some(connection) = self.resolve(broker, "unregister_message_consumer") {
            connection.remove_consumer(consumer);
        }
    }

    pub fn register_message_producer(&self, broker: &str, producer: Arc<dyn MessageProducer>) {
        if let Some(connection) = self.resolve(broker, "register_message_producer") {
            connection.add_producer(producer);
        }
    }

    pub fn unregister_message_producer(&self, broker: &str, producer: &Arc<dyn MessageProducer>) {
        if let Some(connection) = self.resolve(broker, "unregister_message_producer") {
            connection.remove_producer(producer);
        }
    }

    /// Publisher handed to consumers registered after this call
    pub fn set_event_publisher(&self, publisher: Arc<dyn EventPublisher>) {
        *self.event_publisher.write() = Some(publisher);
    }

    pub fn unset_event_publisher(&self) {
        *self.event_publisher.write() = None;
    }

    pub fn has_event_publisher(&self) -> bool {
        self.event_publisher.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{BrokerConnection, ConnectionState};
    use crate::error::ConnectionError;
    use crate::testing::{MockConnection, MockFactory};
    use parking_lot::Mutex;

    struct NullObserver;

    impl ConnectionObserver for NullObserver {
        fn connection_state_changed(&self, _state: ConnectionState, _error: Option<&ConnectionError>) {}
    }

    struct NullPublisher;

    impl EventPublisher for NullPublisher {
        fn post(&self, _topic: &str, _payload: &str) {}
    }

    #[derive(Default)]
    struct TopicConsumer {
        publisher_set: Mutex<Option<bool>>,
    }

    impl MessageConsumer for TopicConsumer {
        fn topic(&self) -> &str {
            "home/+/state"
        }

        fn process_message(&self, _topic: &str, _payload: &[u8]) {}

        fn set_event_publisher(&self, publisher: Option<Arc<dyn EventPublisher>>) {
            *self.publisher_set.lock() = Some(publisher.is_some());
        }
    }

    struct TopicProducer;

    impl MessageProducer for TopicProducer {
        fn topic(&self) -> &str {
            "home/light/set"
        }
    }

    fn service_with(name: &str) -> (BrokerService, Arc<MockConnection>) {
        let service = BrokerService::new(MockFactory::new());
        let connection = MockConnection::programmatic(name);
        service.add_broker_connection(connection.clone());
        (service, connection)
    }

    #[test]
    fn test_connection_observer_forwarding() {
        let (service, connection) = service_with("home");
        let observer: Arc<dyn ConnectionObserver> = Arc::new(NullObserver);

        service.register_connection_observer("HOME", Arc::clone(&observer));
        assert_eq!(connection.connection_observer_count(), 1);

        service.unregister_connection_observer("home", &observer);
        assert_eq!(connection.connection_observer_count(), 0);
    }

    #[test]
    fn test_consumer_receives_event_publisher() {
        let (service, connection) = service_with("home");
        service.set_event_publisher(Arc::new(NullPublisher));
        assert!(service.has_event_publisher());

        let consumer = Arc::new(TopicConsumer::default());
        service.register_message_consumer("home", consumer.clone());

        assert_eq!(*consumer.publisher_set.lock(), Some(true));
        assert_eq!(connection.consumer_count(), 1);

        let consumer: Arc<dyn MessageConsumer> = consumer;
        service.unregister_message_consumer("home", &consumer);
        assert_eq!(connection.consumer_count(), 0);
    }

    #[test]
    fn test_consumer_without_publisher() {
        let (service, _) = service_with("home");
        service.set_event_publisher(Arc::new(NullPublisher));
        service.unset_event_publisher();

        let consumer = Arc::new(TopicConsumer::default());
        service.register_message_consumer("home", consumer.clone());
        assert_eq!(*consumer.publisher_set.lock(), Some(false));
    }

    #[test]
    fn test_consumer_rejected_by_closed_connection() {
        let (service, connection) = service_with("home");
        service.set_event_publisher(Arc::new(NullPublisher));
        connection.close();

        // Logged, not propagated
        let consumer = Arc::new(TopicConsumer::default());
        service.register_message_consumer("home", consumer.clone());
        assert_eq!(connection.consumer_count(), 0);

        // A rejected consumer never receives the publisher
        assert_eq!(*consumer.publisher_set.lock(), None);
    }

    #[test]
    fn test_producer_forwarding() {
        let (service, connection) = service_with("home");
        let producer: Arc<dyn MessageProducer> = Arc::new(TopicProducer);

        service.register_message_producer("home", Arc::clone(&producer));
        assert_eq!(connection.producer_count(), 1);

        service.unregister_message_producer("home", &producer);
        assert_eq!(connection.producer_count(), 0);
    }

    #[test]
    fn test_unknown_broker_is_noop() {
        let (service, connection) = service_with("home");
        let consumer = Arc::new(TopicConsumer::default());

        service.register_message_consumer("cloud", consumer.clone());
        service.register_message_producer("cloud", Arc::new(TopicProducer));
        service.register_connection_observer("cloud", Arc::new(NullObserver));

        // Consumer never touched, existing connection unaffected
        assert_eq!(*consumer.publisher_set.lock(), None);
        assert_eq!(connection.consumer_count(), 0);
        assert_eq!(connection.producer_count(), 0);
    }
}
