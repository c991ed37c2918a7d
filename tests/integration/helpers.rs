//! Helper functions for integration tests

use std::time::Duration;

use gpio_monitoring::actors::bridge::BridgeHandle;
use gpio_monitoring::bus::memory::{MemoryBroker, MemoryBusClient};
use gpio_monitoring::bus::{BusClient, BusDelivery, BusError};
use gpio_monitoring::gpio::SimulatedGpio;
use gpio_monitoring::registry::{RegistryHandle, SensorRegistry};
use gpio_monitoring::{SensorRecord, SensorState};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const ENDPOINT: &str = "inproc://integration-test";
pub const METRICS_STREAM: &str = "_METRICS_SENSOR";
pub const AGENT_NAME: &str = "sensor-gpio";

/// A bridge actor wired to a fresh broker, registry and simulated pin table.
pub struct TestAgent {
    pub broker: MemoryBroker,
    pub gpio: SimulatedGpio,
    pub registry: RegistryHandle,
    pub shutdown: CancellationToken,
    pub bridge: BridgeHandle,
    pub task: JoinHandle<()>,
}

pub fn spawn_agent() -> TestAgent {
    let broker = MemoryBroker::new();
    let gpio = SimulatedGpio::new();
    let registry = SensorRegistry::shared();
    let shutdown = CancellationToken::new();

    let (bridge, task) = BridgeHandle::spawn(
        AGENT_NAME.to_string(),
        300,
        Box::new(broker.client()),
        Box::new(gpio.clone()),
        registry.clone(),
        shutdown.clone(),
    );

    TestAgent {
        broker,
        gpio,
        registry,
        shutdown,
        bridge,
        task,
    }
}

/// Spawn an agent and drive it through `CONNECT` and `PRODUCER`.
pub async fn spawn_connected_agent() -> TestAgent {
    let agent = spawn_agent();
    agent.bridge.connect(ENDPOINT).await.unwrap();
    agent.bridge.producer(METRICS_STREAM).await.unwrap();
    agent
}

/// Fresh broker client connected under `name`.
pub async fn connect_client(broker: &MemoryBroker, name: &str) -> MemoryBusClient {
    let mut client = broker.client();
    client.connect(ENDPOINT, name).await.unwrap();
    client
}

/// Client subscribed to everything on the metrics stream.
pub async fn attach_watcher(broker: &MemoryBroker, name: &str) -> MemoryBusClient {
    let mut watcher = connect_client(broker, name).await;
    watcher.set_consumer(METRICS_STREAM, ".*").await.unwrap();
    watcher
}

/// Register a door-contact sensor and set the state of its line.
pub async fn add_sensor(agent: &TestAgent, gpx: u16, asset: &str, state: SensorState) {
    agent
        .registry
        .write()
        .await
        .upsert(SensorRecord::new(gpx, asset, format!("Door contact {gpx}")));
    agent.gpio.set_pin(gpx, state);
}

/// Deliver a mailbox request, waiting out the bridge's queued `CONNECT`.
pub async fn send_request(client: &mut MemoryBusClient, peer: &str, frames: &[&str]) {
    let frames: Vec<String> = frames.iter().map(|s| s.to_string()).collect();
    let mut attempts = 0;
    loop {
        let sent = client
            .send_to(peer, "gpio", Duration::from_secs(1), frames.clone())
            .await;
        match sent {
            Ok(()) => return,
            Err(BusError::UnknownPeer(_)) if attempts < 100 => {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Err(err) => panic!("mailbox send to {peer} failed: {err}"),
        }
    }
}

/// Receive the next delivery or panic after a second.
pub async fn recv_within(client: &mut MemoryBusClient, what: &str) -> BusDelivery {
    match tokio::time::timeout(Duration::from_secs(1), client.recv()).await {
        Ok(Some(delivery)) => delivery,
        Ok(None) => panic!("inbox closed while waiting for {what}"),
        Err(_) => panic!("timed out waiting for {what}"),
    }
}

/// Assert that nothing is delivered for a while.
pub async fn expect_silence(client: &mut MemoryBusClient, what: &str) {
    let outcome = tokio::time::timeout(Duration::from_millis(100), client.recv()).await;
    assert!(outcome.is_err(), "unexpected delivery while expecting {what}");
}

/// Wait until the registry holds `state` for `gpx`, or panic after a second.
pub async fn wait_for_state(agent: &TestAgent, gpx: u16, state: SensorState) {
    for _ in 0..100 {
        let current = agent
            .registry
            .read()
            .await
            .get(gpx)
            .map(|sensor| sensor.current_state);
        if current == Some(state) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("sensor {gpx} never reached {state:?}");
}
