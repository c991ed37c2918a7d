//! Registry of monitored sensors
//!
//! The registry is maintained by an external inventory/asset process; the
//! bridge actor only iterates it and writes back the states it reads. Both
//! sides share it through [`RegistryHandle`] and keep their lock windows
//! short:
//!
//! 1. maintainer: write lock for upsert/remove
//! 2. poller: read lock to snapshot, write lock to store states
//!
//! Neither side holds the lock across hardware reads or bus sends.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{SensorRecord, SensorState};

/// Shared handle to the sensor registry.
pub type RegistryHandle = Arc<RwLock<SensorRegistry>>;

/// Insertion-ordered collection of monitored sensors, unique per
/// `gpx_number`.
#[derive(Debug, Default)]
pub struct SensorRegistry {
    sensors: Vec<SensorRecord>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared handle around an empty registry.
    pub fn shared() -> RegistryHandle {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Insert a sensor, or replace the existing entry with the same
    /// `gpx_number` in place. Iteration order is insertion order, so a
    /// replaced sensor keeps its position.
    pub fn upsert(&mut self, record: SensorRecord) {
        match self
            .sensors
            .iter_mut()
            .find(|existing| existing.gpx_number == record.gpx_number)
        {
            Some(existing) => *existing = record,
            None => self.sensors.push(record),
        }
    }

    /// Remove a sensor by pin number. Returns the removed record, if any.
    pub fn remove(&mut self, gpx_number: u16) -> Option<SensorRecord> {
        let index = self
            .sensors
            .iter()
            .position(|sensor| sensor.gpx_number == gpx_number)?;
        Some(self.sensors.remove(index))
    }

    pub fn get(&self, gpx_number: u16) -> Option<&SensorRecord> {
        self.sensors
            .iter()
            .find(|sensor| sensor.gpx_number == gpx_number)
    }

    /// Store a freshly read state. Returns `false` when the sensor is no
    /// longer registered.
    pub fn set_state(&mut self, gpx_number: u16, state: SensorState) -> bool {
        match self
            .sensors
            .iter_mut()
            .find(|sensor| sensor.gpx_number == gpx_number)
        {
            Some(sensor) => {
                sensor.current_state = state;
                true
            }
            None => false,
        }
    }

    /// Sensors in insertion order.
    pub fn sensors(&self) -> &[SensorRecord] {
        &self.sensors
    }

    /// Owned copy of the current sensor list, for iteration without holding
    /// the lock.
    pub fn snapshot(&self) -> Vec<SensorRecord> {
        self.sensors.clone()
    }
}
