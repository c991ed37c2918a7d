//! Message bus abstraction for metric publishing and mailbox requests
//!
//! This module provides a trait-based abstraction over the message bus the
//! bridge actor talks to, plus an in-process implementation for the agent
//! binary and tests.
//!
//! ## Design
//!
//! - **Trait-based**: `BusClient` allows swapping bus implementations
//! - **Async**: All operations are async for compatibility with Tokio actors
//! - **Two delivery paths**: stream publish/subscribe for metrics, named
//!   mailboxes for request/reply
//!
//! ## Implementations
//!
//! - **In-memory** (default): broker backed by channels, no sockets
//!
//! ## Usage
//!
//! ```no_run
//! use gpio_monitoring::bus::{BusClient, memory::MemoryBroker};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let broker = MemoryBroker::new();
//!     let mut client = broker.client();
//!     client.connect("inproc://bus", "sensor-gpio").await?;
//!     client.set_producer("_METRICS_SENSOR").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod memory;
pub mod proto;

pub use client::{BusClient, BusDelivery, DeliveryKind};
pub use error::{BusError, BusResult};
pub use proto::Metric;
