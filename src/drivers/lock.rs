//! Lock relay actuator.
//!
//! Drives the relay that holds the electromechanical lock open.  HIGH on
//! the relay line = lock held open, LOW = lock closed.
//!
//! ## Contract
//!
//! `engage()` and `release()` are idempotent and side-effect-free when the
//! output is already at the requested level — a digital output write to the
//! level already present is a safe no-op at the hardware level.  The driver
//! deliberately tracks no output state of its own; the reconciliation
//! engine owns all belief about the cell.

use log::debug;

use crate::drivers::hw_init;
use crate::pins;

pub struct LockDriver;

impl LockDriver {
    pub fn new() -> Self {
        Self
    }

    /// Drive the lock open (relay line HIGH).
    pub fn engage(&mut self) {
        debug!("Lock: engage");
        hw_init::gpio_write(pins::LOCK_RELAY_GPIO, true);
    }

    /// Drive the lock closed (relay line LOW).
    pub fn release(&mut self) {
        debug!("Lock: release");
        hw_init::gpio_write(pins::LOCK_RELAY_GPIO, false);
    }
}
