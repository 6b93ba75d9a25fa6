//! Broker connection contract
//!
//! The registry manages connection *objects*; the wire protocol, reconnect
//! strategy and message delivery live behind [`BrokerConnection`] and are
//! supplied by the embedding application.

use std::sync::Arc;

use broker_config::LastWill;

use crate::error::ConnectionError;

/// Connection state reported to [`ConnectionObserver`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Observer of a single connection's state
pub trait ConnectionObserver: Send + Sync {
    fn connection_state_changed(&self, state: ConnectionState, error: Option<&ConnectionError>);
}

/// Publishes host events on behalf of message consumers
pub trait EventPublisher: Send + Sync {
    fn post(&self, topic: &str, payload: &str);
}

/// Receives messages for a topic on a broker connection
pub trait MessageConsumer: Send + Sync {
    fn topic(&self) -> &str;

    fn process_message(&self, topic: &str, payload: &[u8]);

    /// Hand the consumer the publisher it should forward host events to
    fn set_event_publisher(&self, _publisher: Option<Arc<dyn EventPublisher>>) {}
}

/// Publishes messages through a broker connection
pub trait MessageProducer: Send + Sync {
    fn topic(&self) -> &str;
}

/// A single named link to a message broker
///
/// The name and the configuration-derived flag are fixed at creation.
/// Setters take `&self`; implementations are shared between threads and use
/// interior mutability.
pub trait BrokerConnection: Send + Sync {
    fn name(&self) -> &str;

    fn url(&self) -> &str;

    /// `true` for connections created from the service configuration
    fn is_configuration_derived(&self) -> bool;

    fn start(&self) -> Result<(), ConnectionError>;

    /// Release all resources; calling it again has no effect
    fn close(&self);

    fn set_credentials(&self, user: Option<&str>, password: Option<&str>);

    fn set_client_id(&self, client_id: Option<&str>);

    fn set_keep_alive_interval(&self, seconds: u32);

    fn set_qos(&self, qos: i32);

    fn set_retain(&self, retain: bool);

    fn set_last_will(&self, will: LastWill);

    fn add_connection_observer(&self, observer: Arc<dyn ConnectionObserver>);

    fn remove_connection_observer(&self, observer: &Arc<dyn ConnectionObserver>);

    fn add_consumer(&self, consumer: Arc<dyn MessageConsumer>) -> Result<(), ConnectionError>;

    fn remove_consumer(&self, consumer: &Arc<dyn MessageConsumer>);

    fn add_producer(&self, producer: Arc<dyn MessageProducer>);

    fn remove_producer(&self, producer: &Arc<dyn MessageProducer>);
}

/// Shared handle to a registered connection
pub type SharedConnection = Arc<dyn BrokerConnection>;

/// Check whether two handles refer to the same connection object
pub fn same_connection(a: &SharedConnection, b: &SharedConnection) -> bool {
    same_object(a, b)
}

/// Pointer identity for trait objects, ignoring vtable addresses
pub(crate) fn same_object<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Creates connections for the registry
///
/// Implemented for closures with the matching signature:
///
/// ```rust,ignore
/// let factory = |name: &str, url: &str, configuration_derived: bool| {
///     Ok::<_, ConnectionError>(Arc::new(MyConnection::new(name, url, configuration_derived)) as SharedConnection)
/// };
/// ```
pub trait ConnectionFactory: Send + Sync {
    fn create(
        &self,
        name: &str,
        url: &str,
        configuration_derived: bool,
    ) -> Result<SharedConnection, ConnectionError>;
}

impl<F> ConnectionFactory for F
where
    F: Fn(&str, &str, bool) -> Result<SharedConnection, ConnectionError> + Send + Sync,
{
    fn create(
        &self,
        name: &str,
        url: &str,
        configuration_derived: bool,
    ) -> Result<SharedConnection, ConnectionError> {
        self(name, url, configuration_derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConnection;

    #[test]
    fn test_same_connection_identity() {
        let a: SharedConnection = Arc::new(MockConnection::new("home", "tcp://10.0.0.5", false));
        let b: SharedConnection = Arc::new(MockConnection::new("home", "tcp://10.0.0.5", false));
        let a_again = Arc::clone(&a);

        assert!(same_connection(&a, &a_again));
        assert!(!same_connection(&a, &b));
    }

    #[test]
    fn test_closure_factory() {
        let factory = |name: &str, url: &str, derived: bool| {
            Ok::<_, ConnectionError>(Arc::new(MockConnection::new(name, url, derived)) as SharedConnection)
        };

        let connection = factory.create("home", "tcp://10.0.0.5", true).unwrap();
        assert_eq!(connection.name(), "home");
        assert_eq!(connection.url(), "tcp://10.0.0.5");
        assert!(connection.is_configuration_derived());
    }
}
