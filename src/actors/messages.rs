//! Control messages for the sensor bridge actor
//!
//! Commands arrive on the control channel as flat string frame sequences,
//! the way an external supervisor writes them. They are parsed into
//! [`AgentCommand`] exactly once, at the channel boundary in the actor
//! loop; everything behind the boundary dispatches on the enum.

use std::fmt;

pub const TERMINATE: &str = "$TERM";
pub const CONNECT: &str = "CONNECT";
pub const PRODUCER: &str = "PRODUCER";
pub const CONSUMER: &str = "CONSUMER";
pub const VERBOSE: &str = "VERBOSE";
pub const UPDATE: &str = "UPDATE";
pub const GPIO_CHIP_ADDRESS: &str = "GPIO_CHIP_ADDRESS";

/// Commands understood by the sensor bridge actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentCommand {
    /// Stop the actor loop
    Terminate,

    /// Connect to the broker at the given endpoint
    Connect { endpoint: String },

    /// Declare the stream metrics are published on
    Producer { stream: String },

    /// Subscribe to a stream, with a subject pattern
    Consumer { stream: String, pattern: String },

    /// Enable verbose publish logging
    Verbose,

    /// Run one poll+publish cycle
    Update,

    /// Set the GPIO chip base index
    GpioChipAddress { base: u16 },

    /// Unrecognized command token, kept so the loop can log it and carry on
    Unknown(String),
}

/// Why a frame sequence did not parse into a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The frame sequence was empty
    Empty,

    /// A required argument frame is missing
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    /// An argument frame did not parse
    BadArgument {
        command: &'static str,
        value: String,
    },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command frames"),
            CommandError::MissingArgument { command, argument } => {
                write!(f, "{command} is missing its {argument} argument")
            }
            CommandError::BadArgument { command, value } => {
                write!(f, "{command} argument {value:?} does not parse")
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl AgentCommand {
    /// Parse a control frame sequence.
    ///
    /// Unrecognized first frames are not an error; they parse into
    /// [`AgentCommand::Unknown`]. Known commands with missing or broken
    /// arguments are errors, so the caller can log and skip them.
    pub fn parse(frames: &[String]) -> Result<Self, CommandError> {
        let mut frames = frames.iter();
        let Some(token) = frames.next() else {
            return Err(CommandError::Empty);
        };

        let mut require = |command: &'static str, argument: &'static str| {
            frames
                .next()
                .cloned()
                .ok_or(CommandError::MissingArgument { command, argument })
        };

        match token.as_str() {
            TERMINATE => Ok(Self::Terminate),
            VERBOSE => Ok(Self::Verbose),
            UPDATE => Ok(Self::Update),
            CONNECT => Ok(Self::Connect {
                endpoint: require(CONNECT, "endpoint")?,
            }),
            PRODUCER => Ok(Self::Producer {
                stream: require(PRODUCER, "stream")?,
            }),
            CONSUMER => Ok(Self::Consumer {
                stream: require(CONSUMER, "stream")?,
                pattern: require(CONSUMER, "pattern")?,
            }),
            GPIO_CHIP_ADDRESS => {
                let raw = require(GPIO_CHIP_ADDRESS, "base index")?;
                let base = raw.parse().map_err(|_| CommandError::BadArgument {
                    command: GPIO_CHIP_ADDRESS,
                    value: raw,
                })?;
                Ok(Self::GpioChipAddress { base })
            }
            other => Ok(Self::Unknown(other.to_string())),
        }
    }
}
