//! Reconfiguration walkthrough for the broker service
//!
//! This example wires a printing connection into the service and walks
//! through the lifecycle a host drives:
//! - activate with an initial configuration
//! - add a connection from application code
//! - reconfigure, replacing only the configuration-derived connections
//! - deactivate
//!
//! Run with: BROKER_LOG_MODE=development cargo run -p broker-registry --example reconfigure

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use broker_registry::prelude::*;
use broker_registry::{
    init_logging_from_env, ConnectionObserver, LastWill, MessageConsumer, MessageProducer,
};

/// Connection that prints what is done to it instead of talking to a broker
struct PrintingConnection {
    name: String,
    url: String,
    configuration_derived: bool,
    closed: AtomicBool,
}

impl PrintingConnection {
    fn new(name: &str, url: &str, configuration_derived: bool) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            configuration_derived,
            closed: AtomicBool::new(false),
        }
    }
}

impl BrokerConnection for PrintingConnection {
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
        if self.url.starts_with("ssl://") {
            return Err(ConnectionError::StartFailed {
                broker: self.name.clone(),
                reason: "TLS is not available in this example".to_string(),
            });
        }
        println!("   [{}] connecting to {}", self.name, self.url);
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            println!("   [{}] closed", self.name);
        }
    }

    fn set_credentials(&self, user: Option<&str>, _password: Option<&str>) {
        if let Some(user) = user {
            println!("   [{}] user = {}", self.name, user);
        }
    }

    fn set_client_id(&self, client_id: Option<&str>) {
        if let Some(client_id) = client_id {
            println!("   [{}] client id = {}", self.name, client_id);
        }
    }

    fn set_keep_alive_interval(&self, seconds: u32) {
        println!("   [{}] keep alive = {}s", self.name, seconds);
    }

    fn set_qos(&self, qos: i32) {
        println!("   [{}] qos = {}", self.name, qos);
    }

    fn set_retain(&self, retain: bool) {
        println!("   [{}] retain = {}", self.name, retain);
    }

    fn set_last_will(&self, will: LastWill) {
        println!("   [{}] last will: {}", self.name, will);
    }

    fn add_connection_observer(&self, _observer: Arc<dyn ConnectionObserver>) {}

    fn remove_connection_observer(&self, _observer: &Arc<dyn ConnectionObserver>) {}

    fn add_consumer(&self, _consumer: Arc<dyn MessageConsumer>) -> Result<(), ConnectionError> {
        Ok(())
    }

    fn remove_consumer(&self, _consumer: &Arc<dyn MessageConsumer>) {}

    fn add_producer(&self, _producer: Arc<dyn MessageProducer>) {}

    fn remove_producer(&self, _producer: &Arc<dyn MessageProducer>) {}
}

struct PrintingObserver;

impl BrokersObserver for PrintingObserver {
    fn broker_added(&self, connection: &SharedConnection) {
        println!("   + {} ({})", connection.name(), connection.url());
    }

    fn broker_removed(&self, connection: &SharedConnection) {
        println!("   - {}", connection.name());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    println!("Broker Registry - Reconfiguration Example");
    println!("=========================================");

    let factory = |name: &str, url: &str, configuration_derived: bool| {
        Ok::<_, ConnectionError>(
            Arc::new(PrintingConnection::new(name, url, configuration_derived)) as SharedConnection,
        )
    };
    let service = BrokerService::new(Arc::new(factory));
    service.add_brokers_observer(Arc::new(PrintingObserver));

    println!("\nActivating with two brokers:");
    let report = service.activate(Some(&parse_properties(
        "home.url=tcp://10.0.0.5:1883\n\
         home.clientId=hub-01\n\
         home.lwt=topic:hub/status,message:offline,retain:true\n\
         cloud.url=ssl://broker.example.com:8883\n\
         cloud.user=hub\n",
    )));
    println!("   report: {}", report);
    for name in &report.failed_to_start {
        println!("   {} is registered but not started", name);
    }

    println!("\nAdding a connection from application code:");
    service.add_broker_connection(Arc::new(PrintingConnection::new(
        "local",
        "tcp://127.0.0.1:1883",
        false,
    )));

    println!("\nReconfiguring with one broker:");
    let report = service.reconfigure(Some(&parse_properties("office.url=tcp://10.0.1.5:1883")));
    println!("   report: {}", report);

    println!("\nRegistered connections:");
    for connection in service.broker_connections() {
        let source = if connection.is_configuration_derived() {
            "configuration"
        } else {
            "programmatic"
        };
        println!("   {} -> {} ({})", connection.name(), connection.url(), source);
    }
    println!("\n{}", service.registry().stats());

    println!("\nDeactivating:");
    service.deactivate();

    Ok(())
}
