//! Manifest replies for mailbox requests
//!
//! A manifest describes the sensors an agent currently monitors. Replies
//! are five frames: the echoed request UUID, the agent name, the service
//! type and subtype, and a JSON object keyed by port label.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{SensorRecord, SensorState};

pub const SERVICE_TYPE: &str = "sensor";
pub const SERVICE_SUBTYPE: &str = "gpio";

#[derive(Debug, Serialize)]
struct SensorInfo<'a> {
    gpx_number: u16,
    asset_name: &'a str,
    ext_name: &'a str,
    state: SensorState,
}

impl<'a> From<&'a SensorRecord> for SensorInfo<'a> {
    fn from(record: &'a SensorRecord) -> Self {
        Self {
            gpx_number: record.gpx_number,
            asset_name: &record.asset_name,
            ext_name: &record.ext_name,
            state: record.current_state,
        }
    }
}

/// Build the reply frames for a manifest request.
///
/// `uuid` is echoed back verbatim; pass an empty string when the request
/// carried none.
pub fn reply_frames(agent_name: &str, uuid: &str, sensors: &[SensorRecord]) -> Vec<String> {
    let info: BTreeMap<String, SensorInfo> = sensors
        .iter()
        .map(|record| (record.port(), SensorInfo::from(record)))
        .collect();

    vec![
        uuid.to_string(),
        agent_name.to_string(),
        SERVICE_TYPE.to_string(),
        SERVICE_SUBTYPE.to_string(),
        serde_json::to_string(&info).unwrap_or_else(|_| String::from("{}")),
    ]
}

/// Fixed sensor set answering `GPIO-TEST` requests, so the reply path can
/// be exercised without hardware or registry contents.
pub fn test_sensors() -> Vec<SensorRecord> {
    let mut door = SensorRecord::new(1, "rackcontroller-0", "GPIO-Sensor-Door1");
    door.current_state = SensorState::Closed;
    let mut smoke = SensorRecord::new(2, "rackcontroller-0", "GPIO-Sensor-Smoke1");
    smoke.current_state = SensorState::Open;
    vec![door, smoke]
}
