//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the door sensor and the lock driver, exposing them through
//! [`DoorSensorPort`] and [`LockPort`].  This is the only module besides
//! the drivers that touches actual hardware.  On non-espidf targets the
//! underlying drivers use cfg-gated simulation stubs.

use crate::app::ports::{DoorSensorPort, LockPort};
use crate::app::state::DoorState;
use crate::drivers::lock::LockDriver;
use crate::sensors::door::DoorSensor;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    door: DoorSensor,
    lock: LockDriver,
}

impl HardwareAdapter {
    pub fn new(door: DoorSensor, lock: LockDriver) -> Self {
        Self { door, lock }
    }
}

// ── DoorSensorPort implementation ─────────────────────────────

impl DoorSensorPort for HardwareAdapter {
    fn door_state(&mut self) -> DoorState {
        self.door.read()
    }
}

// ── LockPort implementation ───────────────────────────────────

impl LockPort for HardwareAdapter {
    fn engage(&mut self) {
        self.lock.engage();
    }

    fn release(&mut self) {
        self.lock.release();
    }
}
