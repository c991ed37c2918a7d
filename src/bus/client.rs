//! Bus client trait definition
//!
//! This module defines the `BusClient` trait the bridge actor is written
//! against. The actor never names a concrete bus; tests and the agent
//! binary decide which implementation to hand it.

use std::time::Duration;

use async_trait::async_trait;

use super::error::BusResult;

/// How a delivery reached this client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryKind {
    /// Addressed to this client's mailbox by name.
    Mailbox,

    /// Published on a stream this client consumes.
    Stream { stream: String },
}

/// One message handed to a client by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusDelivery {
    pub kind: DeliveryKind,

    /// Bus name of the sending client, usable as a mailbox reply target.
    pub sender: String,

    pub subject: String,

    pub frames: Vec<String>,
}

/// Client-side view of the message bus
///
/// ## Connection lifecycle
///
/// A client starts disconnected. `connect` registers it with the broker
/// under a unique name; `set_producer` and `set_consumer` only work while
/// connected. `close` tears the registration down again.
///
/// ## Receiving
///
/// `recv` yields mailbox and subscribed-stream deliveries in arrival
/// order. While the client is disconnected it pends forever instead of
/// spinning, so it is safe to park in a `select!` arm. `None` means the
/// inbox is gone for good (broker dropped the client or shut down).
#[async_trait]
pub trait BusClient: Send {
    /// Register with the broker at `endpoint` under `name`.
    async fn connect(&mut self, endpoint: &str, name: &str) -> BusResult<()>;

    /// Declare the stream this client publishes metrics on.
    async fn set_producer(&mut self, stream: &str) -> BusResult<()>;

    /// Subscribe to `stream`, receiving subjects matching `pattern`.
    async fn set_consumer(&mut self, stream: &str, pattern: &str) -> BusResult<()>;

    fn is_connected(&self) -> bool;

    /// Publish `frames` under `subject` on the producer stream.
    async fn send(&mut self, subject: &str, frames: Vec<String>) -> BusResult<()>;

    /// Deliver `frames` to the mailbox of `peer`, bounded by `timeout`.
    async fn send_to(
        &mut self,
        peer: &str,
        subject: &str,
        timeout: Duration,
        frames: Vec<String>,
    ) -> BusResult<()>;

    /// Next delivery for this client. See the trait docs for semantics.
    async fn recv(&mut self) -> Option<BusDelivery>;

    /// Drop the broker registration. Safe to call when not connected.
    fn close(&mut self);
}
