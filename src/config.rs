use tracing::trace;

use crate::SensorState;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AgentConfig {
    /// Bus name of the agent; falls back to `AGENT_NAME` / the built-in
    /// default when absent.
    pub name: Option<String>,

    /// Broker endpoint; falls back to `BUS_ENDPOINT` / the built-in default.
    pub endpoint: Option<String>,

    /// Stream metrics are published on.
    #[serde(default = "default_metrics_stream")]
    pub metrics_stream: String,

    /// Streams to consume, with a subject pattern each.
    #[serde(default)]
    pub consumers: Vec<ConsumerConfig>,

    /// Seconds between poll+publish cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Seconds a published state stays valid for consumers.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Base index of the GPIO chip the sensors hang off.
    #[serde(default)]
    pub base_index: u16,

    #[serde(default)]
    pub verbose: bool,

    /// Sensors to register at startup.
    #[serde(default)]
    pub sensors: Vec<SensorSeed>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConsumerConfig {
    pub stream: String,
    #[serde(default = "default_consumer_pattern")]
    pub pattern: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SensorSeed {
    pub gpx_number: u16,
    pub asset_name: String,
    pub ext_name: Option<String>,

    /// Initial state of the simulated line the sensor reads.
    #[serde(default)]
    pub pin_state: SensorState,
}

fn default_metrics_stream() -> String {
    "_METRICS_SENSOR".to_string()
}

fn default_consumer_pattern() -> String {
    ".*".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_ttl() -> u32 {
    300
}

pub fn read_config_file(path: &str) -> anyhow::Result<AgentConfig> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
