//! Mock connections, factories and observers for tests
//!
//! These mocks never touch the network. They count lifecycle calls, record
//! the settings applied to them and can be switched into failure modes to
//! exercise the error paths of the registry and the service.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use broker_config::LastWill;
use parking_lot::Mutex;

use crate::connection::{
    BrokerConnection, ConnectionFactory, ConnectionObserver, MessageConsumer, MessageProducer,
    SharedConnection,
};
use crate::error::ConnectionError;
use crate::observer::BrokersObserver;

/// Settings applied to a [`MockConnection`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockSettings {
    pub user: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub keep_alive: Option<u32>,
    pub qos: Option<i32>,
    pub retain: Option<bool>,
    pub last_will: Option<LastWill>,
}

/// Called with the connection name whenever credentials are applied
pub type ConfigureHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Broker connection that records what happens to it
pub struct MockConnection {
    name: String,
    url: String,
    configuration_derived: bool,
    fail_start: AtomicBool,
    closed: AtomicBool,
    start_count: AtomicU32,
    close_count: AtomicU32,
    settings: Mutex<MockSettings>,
    connection_observers: Mutex<Vec<Arc<dyn ConnectionObserver>>>,
    consumers: Mutex<Vec<Arc<dyn MessageConsumer>>>,
    producers: Mutex<Vec<Arc<dyn MessageProducer>>>,
    on_configure: Option<ConfigureHook>,
}

impl MockConnection {
    pub fn new(name: &str, url: &str, configuration_derived: bool) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            configuration_derived,
            fail_start: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            start_count: AtomicU32::new(0),
            close_count: AtomicU32::new(0),
            settings: Mutex::new(MockSettings::default()),
            connection_observers: Mutex::new(Vec::new()),
            consumers: Mutex::new(Vec::new()),
            producers: Mutex::new(Vec::new()),
            on_configure: None,
        }
    }

    /// Run `hook` each time `set_credentials` is called
    pub fn with_configure_hook(mut self, hook: ConfigureHook) -> Self {
        self.on_configure = Some(hook);
        self
    }

    /// Create a programmatic connection wrapped for registration
    pub fn programmatic(name: &str) -> Arc<Self> {
        Arc::new(Self::new(name, "tcp://127.0.0.1:1883", false))
    }

    /// Make subsequent `start()` calls fail
    pub fn set_fail_start(&self, should_fail: bool) {
        self.fail_start.store(should_fail, Ordering::Relaxed);
    }

    pub fn start_count(&self) -> u32 {
        self.start_count.load(Ordering::Relaxed)
    }

    pub fn close_count(&self) -> u32 {
        self.close_count.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    pub fn settings(&self) -> MockSettings {
        self.settings.lock().clone()
    }

    pub fn connection_observer_count(&self) -> usize {
        self.connection_observers.lock().len()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.lock().len()
    }

    pub fn producer_count(&self) -> usize {
        self.producers.lock().len()
    }
}

impl BrokerConnection for MockConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn is_configuration_derived(&self) -> bool {
        self.configuration_derived
    }

    fn start(&self) -> Result<(), ConnectionError> {
        self.start_count.fetch_add(1, Ordering::Relaxed);
        if self.fail_start.load(Ordering::Relaxed) {
            return Err(ConnectionError::StartFailed {
                broker: self.name.clone(),
                reason: "mock start failure".to_string(),
            });
        }
        Ok(())
    }

    fn close(&self) {
        self.close_count.fetch_add(1, Ordering::Relaxed);
        self.closed.store(true, Ordering::Relaxed);
    }

    fn set_credentials(&self, user: Option<&str>, password: Option<&str>) {
        {
            let mut settings = self.settings.lock();
            settings.user = user.map(str::to_string);
            settings.password = password.map(str::to_string);
        }
        if let Some(hook) = &self.on_configure {
            (hook.as_ref())(self.name.as_str());
        }
    }

    fn set_client_id(&self, client_id: Option<&str>) {
        self.settings.lock().client_id = client_id.map(str::to_string);
    }

    fn set_keep_alive_interval(&self, seconds: u32) {
        self.settings.lock().keep_alive = Some(seconds);
    }

    fn set_qos(&self, qos: i32) {
        self.settings.lock().qos = Some(qos);
    }

    fn set_retain(&self, retain: bool) {
        self.settings.lock().retain = Some(retain);
    }

    fn set_last_will(&self, will: LastWill) {
        self.settings.lock().last_will = Some(will);
    }

    fn add_connection_observer(&self, observer: Arc<dyn ConnectionObserver>) {
        self.connection_observers.lock().push(observer);
    }

    fn remove_connection_observer(&self, observer: &Arc<dyn ConnectionObserver>) {
        self.connection_observers
            .lock()
            .retain(|o| !crate::connection::same_object(o, observer));
    }

    fn add_consumer(&self, consumer: Arc<dyn MessageConsumer>) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed(self.name.clone()));
        }
        self.consumers.lock().push(consumer);
        Ok(())
    }

    fn remove_consumer(&self, consumer: &Arc<dyn MessageConsumer>) {
        self.consumers
            .lock()
            .retain(|c| !crate::connection::same_object(c, consumer));
    }

    fn add_producer(&self, producer: Arc<dyn MessageProducer>) {
        self.producers.lock().push(producer);
    }

    fn remove_producer(&self, producer: &Arc<dyn MessageProducer>) {
        self.producers
            .lock()
            .retain(|p| !crate::connection::same_object(p, producer));
    }
}

/// Factory that builds [`MockConnection`]s and keeps them for inspection
#[derive(Default)]
pub struct MockFactory {
    created: Mutex<Vec<Arc<MockConnection>>>,
    fail_start_for: Mutex<HashSet<String>>,
    fail_creation: AtomicBool,
    on_configure: Mutex<Option<ConfigureHook>>,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connections created for `name` will fail to start
    pub fn fail_start_for(&self, name: &str) {
        self.fail_start_for.lock().insert(name.to_lowercase());
    }

    /// Make `create` return an error
    pub fn set_fail_creation(&self, should_fail: bool) {
        self.fail_creation.store(should_fail, Ordering::Relaxed);
    }

    /// Install a hook on every connection created from now on
    pub fn on_configure(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_configure.lock() = Some(Arc::new(hook));
    }

    /// Every connection created so far, oldest first
    pub fn created(&self) -> Vec<Arc<MockConnection>> {
        self.created.lock().clone()
    }

    pub fn creation_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Connections created for `name`, oldest first
    pub fn created_named(&self, name: &str) -> Vec<Arc<MockConnection>> {
        self.created
            .lock()
            .iter()
            .filter(|c| c.name() == name)
            .cloned()
            .collect()
    }

    /// Total `start()` calls across connections created for `name`
    pub fn start_count_for(&self, name: &str) -> u32 {
        self.created_named(name).iter().map(|c| c.start_count()).sum()
    }
}

impl ConnectionFactory for MockFactory {
    fn create(
        &self,
        name: &str,
        url: &str,
        configuration_derived: bool,
    ) -> Result<SharedConnection, ConnectionError> {
        if self.fail_creation.load(Ordering::Relaxed) {
            return Err(ConnectionError::InvalidUrl(url.to_string()));
        }

        let mut connection = MockConnection::new(name, url, configuration_derived);
        if let Some(hook) = self.on_configure.lock().clone() {
            connection = connection.with_configure_hook(hook);
        }
        let connection = Arc::new(connection);
        if self.fail_start_for.lock().contains(&name.to_lowercase()) {
            connection.set_fail_start(true);
        }
        self.created.lock().push(Arc::clone(&connection));
        Ok(connection as SharedConnection)
    }
}

/// One observed registry event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    Added(String),
    Removed(String),
}

/// Observer that records every event it receives
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().clone()
    }

    pub fn added_count(&self) -> usize {
        self.count(|e| matches!(e, ObserverEvent::Added(_)))
    }

    pub fn removed_count(&self) -> usize {
        self.count(|e| matches!(e, ObserverEvent::Removed(_)))
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn count(&self, predicate: impl Fn(&ObserverEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl BrokersObserver for RecordingObserver {
    fn broker_added(&self, connection: &SharedConnection) {
        self.events
            .lock()
            .push(ObserverEvent::Added(connection.name().to_string()));
    }

    fn broker_removed(&self, connection: &SharedConnection) {
        self.events
            .lock()
            .push(ObserverEvent::Removed(connection.name().to_string()));
    }
}
