//! GPIO pin access
//!
//! [`GpioReader`] is the seam between the bridge actor and the hardware, so
//! tests can drive the poll cycle with a [`SimulatedGpio`] instead of real
//! pins. Reads are synchronous and cheap; the poller calls them outside any
//! registry lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::SensorState;

/// Read access to GPIO input pins.
///
/// `pin` is the logical offset of a sensor (its `gpx_number`); the reader
/// adds the chip base index to find the physical line. A failed or
/// unconfigured read yields [`SensorState::Unknown`].
pub trait GpioReader: Send {
    fn read(&self, pin: u16) -> SensorState;

    /// Set the base index of the GPIO chip. Subsequent reads of pin `n`
    /// target physical line `base + n`.
    fn set_base_index(&mut self, base: u16);
}

/// In-memory pin table, cloneable so tests can flip pins while the bridge
/// actor owns the reader.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGpio {
    pins: Arc<Mutex<HashMap<u16, SensorState>>>,
    base_index: u16,
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state of a physical line.
    pub fn set_pin(&self, line: u16, state: SensorState) {
        let mut pins = self.pins.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        pins.insert(line, state);
    }

    /// Drop a physical line, so that reads of it fail.
    pub fn clear_pin(&self, line: u16) {
        let mut pins = self.pins.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        pins.remove(&line);
    }
}

impl GpioReader for SimulatedGpio {
    fn read(&self, pin: u16) -> SensorState {
        let pins = self.pins.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        pins.get(&self.base_index.saturating_add(pin))
            .copied()
            .unwrap_or(SensorState::Unknown)
    }

    fn set_base_index(&mut self, base: u16) {
        self.base_index = base;
    }
}
