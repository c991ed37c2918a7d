pub mod actors;
pub mod bus;
pub mod config;
pub mod gpio;
pub mod manifest;
pub mod registry;
pub mod util;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical state of a binary GPIO sensor.
///
/// The lowercase renderings (`open`, `closed`, `unknown`) are the string
/// vocabulary consumers of the metric stream match on, so they must not
/// change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorState {
    Open,
    Closed,
    #[default]
    Unknown,
}

impl SensorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorState::Open => "open",
            SensorState::Closed => "closed",
            SensorState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One monitored sensor as kept in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Logical pin/channel number, unique per physical sensor.
    pub gpx_number: u16,

    /// Asset the sensor is attached to; used as the publish-topic suffix.
    pub asset_name: String,

    /// Human-readable label, diagnostics only.
    pub ext_name: String,

    /// Last state seen by the poller; `Unknown` until first read.
    #[serde(default)]
    pub current_state: SensorState,
}

impl SensorRecord {
    pub fn new(
        gpx_number: u16,
        asset_name: impl Into<String>,
        ext_name: impl Into<String>,
    ) -> Self {
        Self {
            gpx_number,
            asset_name: asset_name.into(),
            ext_name: ext_name.into(),
            current_state: SensorState::Unknown,
        }
    }

    /// Port label used in metric aux data and manifest replies, e.g. `GPI3`.
    pub fn port(&self) -> String {
        format!("GPI{}", self.gpx_number)
    }
}
