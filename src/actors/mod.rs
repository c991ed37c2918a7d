//! Actor-based GPIO bridge
//!
//! This module implements the agent core as an actor: one independent async
//! task multiplexing a control channel, a bus inbox and a shutdown token.
//!
//! ## Architecture Overview
//!
//! ```text
//!  Supervisor (agent binary / test)
//!      │ control frames (CONNECT, UPDATE, $TERM, ...)
//!      ▼
//!  SensorBridgeActor ──publish──▶ metric stream ──▶ consumers
//!      │        ▲
//!      │        └── mailbox requests (GPIO, GPIO-TEST)
//!      ▼
//!  GPIO pins + shared sensor registry
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: string frame sequences on an mpsc channel, parsed into
//!    [`messages::AgentCommand`] at the channel boundary
//! 2. **Bus traffic**: stream publishes out, mailbox request/reply in
//! 3. **Shutdown**: a `CancellationToken` cancelled by the supervisor, or a
//!    `$TERM` control frame
pub mod bridge;
pub mod messages;
