//! Error types for bus operations

use std::fmt;

/// Result type alias for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Errors that can occur while talking to the message bus
#[derive(Debug)]
pub enum BusError {
    /// Connecting to the broker endpoint failed
    ConnectFailed(String),

    /// The operation needs a connection that is not established
    NotConnected,

    /// Publishing was attempted without a producer stream
    NoProducer,

    /// Mailbox target is not connected to the broker
    UnknownPeer(String),

    /// The peer inbox or the broker itself is gone
    Closed,

    /// The send did not complete within its deadline
    Timeout,

    /// A frame sequence does not decode
    Malformed(String),

    /// Consumer subscription pattern does not compile
    InvalidPattern(regex::Error),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::ConnectFailed(msg) => {
                write!(f, "failed to connect to message bus: {}", msg)
            }
            BusError::NotConnected => write!(f, "not connected to the message bus"),
            BusError::NoProducer => write!(f, "no producer stream configured"),
            BusError::UnknownPeer(name) => write!(f, "no such peer on the bus: {}", name),
            BusError::Closed => write!(f, "bus connection closed"),
            BusError::Timeout => write!(f, "bus send timed out"),
            BusError::Malformed(msg) => write!(f, "malformed bus message: {}", msg),
            BusError::InvalidPattern(err) => {
                write!(f, "invalid subscription pattern: {}", err)
            }
        }
    }
}

impl std::error::Error for BusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BusError::InvalidPattern(err) => Some(err),
            _ => None,
        }
    }
}

impl From<regex::Error> for BusError {
    fn from(err: regex::Error) -> Self {
        BusError::InvalidPattern(err)
    }
}
