//! SensorBridgeActor - bridges GPIO sensor states onto the message bus
//!
//! ## Message Flow
//!
//! ```text
//! UPDATE frame → read pins → store states → publish metrics → bus stream
//!     ↑
//!     └─── control frames (CONNECT, PRODUCER, CONSUMER, VERBOSE,
//!          GPIO_CHIP_ADDRESS, $TERM, ...)
//!
//! mailbox request (GPIO, GPIO-TEST) → manifest reply to sender
//! ```
//!
//! The actor multiplexes the control channel, the bus inbox and a shutdown
//! token in one `select!` loop. It never polls on its own; the supervisor
//! decides the pace by sending `UPDATE`.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, trace, warn};

use crate::bus::{BusClient, BusDelivery, DeliveryKind, Metric};
use crate::gpio::GpioReader;
use crate::manifest;
use crate::registry::RegistryHandle;
use crate::{SensorRecord, SensorState};

use super::messages::{self, AgentCommand};

/// Bound on one stream publish.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(1);

/// Bound on one mailbox reply.
const REPLY_TIMEOUT: Duration = Duration::from_millis(1000);

/// Actor that reads GPIO sensors and publishes their states as metrics
///
/// One actor serves one agent process. It owns its bus connection and GPIO
/// access; the sensor registry is shared with the external maintainer.
pub struct SensorBridgeActor {
    /// Bus name of the agent, also its mailbox address
    name: String,

    /// Seconds a published state stays valid for consumers
    ttl: u32,

    /// Message bus connection
    bus: Box<dyn BusClient>,

    /// Pin access
    gpio: Box<dyn GpioReader>,

    /// Shared sensor registry, maintained by an external process
    registry: RegistryHandle,

    /// Control frame receiver
    control_rx: mpsc::Receiver<Vec<String>>,

    /// Cooperative shutdown signal from the supervisor
    shutdown: CancellationToken,

    /// Log each publish at debug level
    verbose: bool,
}

impl SensorBridgeActor {
    /// Create a new bridge actor
    pub fn new(
        name: String,
        ttl: u32,
        bus: Box<dyn BusClient>,
        gpio: Box<dyn GpioReader>,
        registry: RegistryHandle,
        control_rx: mpsc::Receiver<Vec<String>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            name,
            ttl,
            bus,
            gpio,
            registry,
            control_rx,
            shutdown,
            verbose: false,
        }
    }

    /// Run the actor's main loop
    ///
    /// This is the entry point for the actor. It runs until:
    /// - A `$TERM` control frame arrives
    /// - The shutdown token is cancelled
    /// - The control channel is closed
    ///
    /// A closed bus inbox only marks the connection gone; the loop keeps
    /// serving control commands.
    #[instrument(skip(self), fields(agent = %self.name))]
    pub async fn run(mut self) {
        debug!("starting sensor bridge actor");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("shutdown requested, stopping");
                    break;
                }

                frames = self.control_rx.recv() => {
                    let Some(frames) = frames else {
                        warn!("control channel closed, shutting down");
                        break;
                    };
                    trace!(?frames, "received control frames");

                    match AgentCommand::parse(&frames) {
                        Ok(AgentCommand::Terminate) => {
                            debug!("received $TERM, shutting down");
                            break;
                        }
                        Ok(AgentCommand::Connect { endpoint }) => self.connect(&endpoint).await,
                        Ok(AgentCommand::Producer { stream }) => self.set_producer(&stream).await,
                        Ok(AgentCommand::Consumer { stream, pattern }) => {
                            self.set_consumer(&stream, &pattern).await
                        }
                        Ok(AgentCommand::Verbose) => {
                            debug!("verbose publish logging enabled");
                            self.verbose = true;
                        }
                        Ok(AgentCommand::Update) => self.poll_and_publish().await,
                        Ok(AgentCommand::GpioChipAddress { base }) => {
                            debug!(base, "setting gpio chip base index");
                            self.gpio.set_base_index(base);
                        }
                        Ok(AgentCommand::Unknown(token)) => {
                            warn!(command = %token, "unknown control command, ignoring");
                        }
                        Err(err) => error!("dropping control command: {err}"),
                    }
                }

                delivery = self.bus.recv() => {
                    match delivery {
                        Some(delivery) => self.handle_delivery(delivery).await,
                        None => {
                            warn!("bus inbox closed, treating as disconnected");
                            self.bus.close();
                        }
                    }
                }
            }
        }

        self.bus.close();
        debug!("sensor bridge actor stopped");
    }

    async fn connect(&mut self, endpoint: &str) {
        match self.bus.connect(endpoint, &self.name).await {
            Ok(()) => debug!(%endpoint, name = %self.name, "connected to bus"),
            Err(err) => error!(%endpoint, "connection to endpoint failed: {err}"),
        }
    }

    async fn set_producer(&mut self, stream: &str) {
        match self.bus.set_producer(stream).await {
            Ok(()) => debug!(%stream, "producing on stream"),
            Err(err) => error!(%stream, "can't set producer on stream: {err}"),
        }
    }

    async fn set_consumer(&mut self, stream: &str, pattern: &str) {
        match self.bus.set_consumer(stream, pattern).await {
            Ok(()) => debug!(%stream, %pattern, "consuming stream"),
            Err(err) => error!(%stream, %pattern, "can't set consumer on stream: {err}"),
        }
    }

    /// Run one poll+publish cycle
    ///
    /// This method:
    /// 1. Snapshots the registry, then reads every pin without holding the lock
    /// 2. Writes the states back, including failed reads
    /// 3. While connected, publishes one metric per readable sensor
    ///
    /// Errors are logged but do not crash the actor (the next `UPDATE`
    /// simply tries again).
    #[instrument(skip(self), fields(agent = %self.name))]
    async fn poll_and_publish(&mut self) {
        let sensors = self.registry.read().await.snapshot();
        if sensors.is_empty() {
            trace!("no sensors registered, nothing to poll");
            return;
        }

        // Hardware reads happen outside any registry lock.
        let readings: Vec<SensorState> = sensors
            .iter()
            .map(|sensor| self.gpio.read(sensor.gpx_number))
            .collect();

        // Write the states back, skipping sensors removed since the snapshot.
        let mut still_registered = Vec::with_capacity(sensors.len());
        {
            let mut registry = self.registry.write().await;
            for (sensor, state) in sensors.iter().zip(&readings) {
                still_registered.push(registry.set_state(sensor.gpx_number, *state));
            }
        }

        if !self.bus.is_connected() {
            debug!("not connected to the bus, skipping publish");
            return;
        }

        for ((sensor, state), registered) in
            sensors.iter().zip(&readings).zip(still_registered)
        {
            if !registered {
                trace!(port = %sensor.port(), "sensor deregistered during poll");
                continue;
            }
            if *state == SensorState::Unknown {
                warn!(
                    port = %sensor.port(),
                    asset = %sensor.asset_name,
                    "could not read sensor, skipping publish"
                );
                continue;
            }
            self.publish_state(sensor, *state).await;
        }
    }

    async fn publish_state(&mut self, sensor: &SensorRecord, state: SensorState) {
        let port = sensor.port();
        let metric = Metric::new(
            format!("status.{port}"),
            sensor.asset_name.as_str(),
            state.as_str(),
            "",
            self.ttl,
        )
        .aux("port", port.as_str());
        let topic = metric.topic();

        if self.verbose {
            debug!(%topic, value = %state, "publishing sensor state");
        }

        match tokio::time::timeout(PUBLISH_TIMEOUT, self.bus.send(&topic, metric.encode())).await
        {
            Ok(Ok(())) => trace!(%topic, "published"),
            Ok(Err(err)) => error!(%topic, "failed to publish metric: {err}"),
            Err(_) => error!(%topic, "publish timed out"),
        }
    }

    async fn handle_delivery(&mut self, delivery: BusDelivery) {
        match delivery.kind {
            DeliveryKind::Stream { ref stream } => {
                // The registry is maintained out of band, so stream traffic
                // carries nothing for us.
                debug!(%stream, subject = %delivery.subject, "ignoring stream delivery");
            }
            DeliveryKind::Mailbox => self.handle_mailbox(delivery).await,
        }
    }

    /// Answer one mailbox request
    ///
    /// `GPIO` replies with a manifest of the live registry, `GPIO-TEST`
    /// with the built-in test manifest. Anything else gets
    /// `["ERROR", "unexpected command"]`.
    async fn handle_mailbox(&mut self, request: BusDelivery) {
        let Some(command) = request.frames.first() else {
            warn!(sender = %request.sender, "dropping empty mailbox request");
            return;
        };

        let reply = match command.as_str() {
            "GPIO" => {
                let sensors = self.registry.read().await.snapshot();
                manifest::reply_frames(&self.name, request_uuid(&request), &sensors)
            }
            "GPIO-TEST" => {
                let sensors = manifest::test_sensors();
                manifest::reply_frames(&self.name, request_uuid(&request), &sensors)
            }
            other => {
                warn!(sender = %request.sender, command = %other, "unexpected mailbox command");
                vec!["ERROR".to_string(), "unexpected command".to_string()]
            }
        };

        if let Err(err) = self
            .bus
            .send_to(&request.sender, "info", REPLY_TIMEOUT, reply)
            .await
        {
            error!(sender = %request.sender, "failed to send mailbox reply: {err}");
        }
    }
}

/// Second frame of a manifest request, empty when the asker sent none.
fn request_uuid(request: &BusDelivery) -> &str {
    match request.frames.get(1) {
        Some(uuid) => uuid.as_str(),
        None => {
            debug!(sender = %request.sender, "manifest request carried no uuid");
            ""
        }
    }
}

/// Handle for controlling a SensorBridgeActor
///
/// The handle provides a typed API that builds the control frames for each
/// command. It can be cloned and shared across tasks.
#[derive(Clone)]
pub struct BridgeHandle {
    /// Control frame sender
    sender: mpsc::Sender<Vec<String>>,

    /// Agent name, also the actor's mailbox address
    pub name: String,
}

impl BridgeHandle {
    /// Spawn a new sensor bridge actor
    ///
    /// Creates the actor, spawns it as a tokio task, and returns a handle
    /// plus the task's join handle so a supervisor can await orderly exit.
    pub fn spawn(
        name: String,
        ttl: u32,
        bus: Box<dyn BusClient>,
        gpio: Box<dyn GpioReader>,
        registry: RegistryHandle,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (control_tx, control_rx) = mpsc::channel(32);

        let actor = SensorBridgeActor::new(
            name.clone(),
            ttl,
            bus,
            gpio,
            registry,
            control_rx,
            shutdown,
        );
        let task = tokio::spawn(actor.run());

        (
            Self {
                sender: control_tx,
                name,
            },
            task,
        )
    }

    /// Connect to the broker at `endpoint`.
    pub async fn connect(&self, endpoint: &str) -> Result<()> {
        self.send_frames(vec![messages::CONNECT.to_string(), endpoint.to_string()])
            .await
    }

    /// Declare the stream metrics are published on.
    pub async fn producer(&self, stream: &str) -> Result<()> {
        self.send_frames(vec![messages::PRODUCER.to_string(), stream.to_string()])
            .await
    }

    /// Subscribe to `stream` with a subject `pattern`.
    pub async fn consumer(&self, stream: &str, pattern: &str) -> Result<()> {
        self.send_frames(vec![
            messages::CONSUMER.to_string(),
            stream.to_string(),
            pattern.to_string(),
        ])
        .await
    }

    /// Enable verbose publish logging.
    pub async fn verbose(&self) -> Result<()> {
        self.send_frames(vec![messages::VERBOSE.to_string()]).await
    }

    /// Trigger one poll+publish cycle.
    pub async fn update(&self) -> Result<()> {
        self.send_frames(vec![messages::UPDATE.to_string()]).await
    }

    /// Set the GPIO chip base index.
    pub async fn gpio_chip_address(&self, base: u16) -> Result<()> {
        self.send_frames(vec![
            messages::GPIO_CHIP_ADDRESS.to_string(),
            base.to_string(),
        ])
        .await
    }

    /// Ask the actor to stop.
    pub async fn terminate(&self) -> Result<()> {
        self.send_frames(vec![messages::TERMINATE.to_string()]).await
    }

    /// Send raw control frames, the way an external supervisor would.
    pub async fn send_frames(&self, frames: Vec<String>) -> Result<()> {
        self.sender
            .send(frames)
            .await
            .context("failed to send control frames")?;
        Ok(())
    }
}
