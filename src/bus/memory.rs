//! In-process message bus
//!
//! A broker backed by channels instead of sockets. Every client gets an
//! inbox; stream publishes fan out to all matching subscriptions, mailbox
//! sends go straight to the named peer. The agent binary runs one broker
//! per process, tests run one per test.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::mpsc;
use tracing::debug;

use super::client::{BusClient, BusDelivery, DeliveryKind};
use super::error::{BusError, BusResult};

const INBOX_CAPACITY: usize = 32;

struct Subscription {
    stream: String,
    pattern: Regex,
    client: String,
}

#[derive(Default)]
struct BrokerState {
    clients: HashMap<String, mpsc::Sender<BusDelivery>>,
    subscriptions: Vec<Subscription>,
    shut_down: bool,
}

/// Shared broker handle. Cloning yields another handle to the same broker.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new, not yet connected client of this broker.
    pub fn client(&self) -> MemoryBusClient {
        MemoryBusClient {
            state: Arc::clone(&self.state),
            connection: None,
        }
    }

    /// Close every client inbox and refuse further connections.
    pub fn shut_down(&self) {
        let mut state = lock(&self.state);
        state.shut_down = true;
        state.clients.clear();
        state.subscriptions.clear();
    }
}

fn lock(state: &Arc<Mutex<BrokerState>>) -> MutexGuard<'_, BrokerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Connection {
    name: String,
    inbox: mpsc::Receiver<BusDelivery>,
    producer: Option<String>,
}

/// [`BusClient`] implementation talking to a [`MemoryBroker`].
pub struct MemoryBusClient {
    state: Arc<Mutex<BrokerState>>,
    connection: Option<Connection>,
}

impl MemoryBusClient {
    fn connected(&mut self) -> BusResult<&mut Connection> {
        self.connection.as_mut().ok_or(BusError::NotConnected)
    }
}

#[async_trait]
impl BusClient for MemoryBusClient {
    async fn connect(&mut self, endpoint: &str, name: &str) -> BusResult<()> {
        if self.connection.is_some() {
            self.close();
        }

        let inbox = {
            let mut state = lock(&self.state);
            if state.shut_down {
                return Err(BusError::ConnectFailed(format!(
                    "broker at {endpoint} is shut down"
                )));
            }
            if state.clients.contains_key(name) {
                return Err(BusError::ConnectFailed(format!(
                    "name {name} already taken"
                )));
            }
            let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
            state.clients.insert(name.to_string(), tx);
            rx
        };

        debug!(endpoint, name, "connected to bus");
        self.connection = Some(Connection {
            name: name.to_string(),
            inbox,
            producer: None,
        });
        Ok(())
    }

    async fn set_producer(&mut self, stream: &str) -> BusResult<()> {
        let connection = self.connected()?;
        connection.producer = Some(stream.to_string());
        Ok(())
    }

    async fn set_consumer(&mut self, stream: &str, pattern: &str) -> BusResult<()> {
        let name = self.connected()?.name.clone();
        let pattern = Regex::new(pattern)?;

        let mut state = lock(&self.state);
        state.subscriptions.push(Subscription {
            stream: stream.to_string(),
            pattern,
            client: name,
        });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    async fn send(&mut self, subject: &str, frames: Vec<String>) -> BusResult<()> {
        let connection = self.connected()?;
        let stream = connection.producer.clone().ok_or(BusError::NoProducer)?;
        let sender = connection.name.clone();

        let targets: Vec<mpsc::Sender<BusDelivery>> = {
            let state = lock(&self.state);
            state
                .subscriptions
                .iter()
                .filter(|sub| sub.stream == stream && sub.pattern.is_match(subject))
                .filter_map(|sub| state.clients.get(&sub.client).cloned())
                .collect()
        };

        for target in targets {
            let delivery = BusDelivery {
                kind: DeliveryKind::Stream {
                    stream: stream.clone(),
                },
                sender: sender.clone(),
                subject: subject.to_string(),
                frames: frames.clone(),
            };
            if target.send(delivery).await.is_err() {
                debug!(subject, "dropping delivery to a gone consumer");
            }
        }
        Ok(())
    }

    async fn send_to(
        &mut self,
        peer: &str,
        subject: &str,
        timeout: Duration,
        frames: Vec<String>,
    ) -> BusResult<()> {
        let sender = self.connected()?.name.clone();

        let target = {
            let state = lock(&self.state);
            state
                .clients
                .get(peer)
                .cloned()
                .ok_or_else(|| BusError::UnknownPeer(peer.to_string()))?
        };

        let delivery = BusDelivery {
            kind: DeliveryKind::Mailbox,
            sender,
            subject: subject.to_string(),
            frames,
        };
        match tokio::time::timeout(timeout, target.send(delivery)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(BusError::Closed),
            Err(_) => Err(BusError::Timeout),
        }
    }

    async fn recv(&mut self) -> Option<BusDelivery> {
        match &mut self.connection {
            Some(connection) => connection.inbox.recv().await,
            // Disconnected clients park instead of spinning in select loops.
            None => std::future::pending().await,
        }
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            let mut state = lock(&self.state);
            state.clients.remove(&connection.name);
            state
                .subscriptions
                .retain(|sub| sub.client != connection.name);
        }
    }
}
