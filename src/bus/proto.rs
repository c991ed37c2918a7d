//! Metric wire format
//!
//! Metrics travel as flat string frame sequences:
//!
//! ```text
//! ["METRIC", type, name, value, unit, ttl, time, key1, val1, key2, val2, ...]
//! ```
//!
//! `ttl` and `time` are decimal; auxiliary data is flattened into trailing
//! key/value pairs. The first frame is a fixed tag so consumers can reject
//! foreign traffic on a shared stream.

use std::collections::BTreeMap;

use chrono::Utc;

use super::error::{BusError, BusResult};

/// Tag frame identifying a metric message.
pub const METRIC_TAG: &str = "METRIC";

/// One measurement about one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    /// Quantity being reported, e.g. `status.GPI3`.
    pub metric_type: String,

    /// Asset the measurement is about.
    pub name: String,

    pub value: String,

    /// Unit of the value; empty for unit-less states.
    pub unit: String,

    /// Seconds the value stays valid for consumers.
    pub ttl: u32,

    /// Unix timestamp (seconds) of the measurement.
    pub time: i64,

    /// Auxiliary key/value data, ordered for a stable encoding.
    pub aux: BTreeMap<String, String>,
}

impl Metric {
    /// Create a metric stamped with the current wall-clock time.
    pub fn new(
        metric_type: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
        unit: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            metric_type: metric_type.into(),
            name: name.into(),
            value: value.into(),
            unit: unit.into(),
            ttl,
            time: Utc::now().timestamp(),
            aux: BTreeMap::new(),
        }
    }

    /// Attach one auxiliary key/value pair.
    pub fn aux(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.aux.insert(key.into(), value.into());
        self
    }

    /// Publish topic for this metric, `type@name`.
    pub fn topic(&self) -> String {
        format!("{}@{}", self.metric_type, self.name)
    }

    pub fn encode(&self) -> Vec<String> {
        let mut frames = vec![
            METRIC_TAG.to_string(),
            self.metric_type.clone(),
            self.name.clone(),
            self.value.clone(),
            self.unit.clone(),
            self.ttl.to_string(),
            self.time.to_string(),
        ];
        for (key, value) in &self.aux {
            frames.push(key.clone());
            frames.push(value.clone());
        }
        frames
    }

    pub fn decode(frames: &[String]) -> BusResult<Self> {
        match frames.first().map(String::as_str) {
            Some(METRIC_TAG) => {}
            Some(other) => {
                return Err(BusError::Malformed(format!(
                    "expected {METRIC_TAG} tag, got {other:?}"
                )));
            }
            None => return Err(BusError::Malformed("empty frame sequence".into())),
        }
        if frames.len() < 7 {
            return Err(BusError::Malformed(format!(
                "metric needs 7 frames, got {}",
                frames.len()
            )));
        }

        let ttl = frames[5]
            .parse::<u32>()
            .map_err(|_| BusError::Malformed(format!("bad ttl frame {:?}", frames[5])))?;
        let time = frames[6]
            .parse::<i64>()
            .map_err(|_| BusError::Malformed(format!("bad time frame {:?}", frames[6])))?;

        let trailing = &frames[7..];
        if trailing.len() % 2 != 0 {
            return Err(BusError::Malformed(format!(
                "dangling aux key {:?}",
                trailing[trailing.len() - 1]
            )));
        }
        let aux = trailing
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();

        Ok(Self {
            metric_type: frames[1].clone(),
            name: frames[2].clone(),
            value: frames[3].clone(),
            unit: frames[4].clone(),
            ttl,
            time,
            aux,
        })
    }
}
