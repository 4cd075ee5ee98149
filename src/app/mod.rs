//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for the locker cell: the
//! reconciliation engine that mediates between debounced sensor readings,
//! remote commands, and the locally held door-state belief.  All
//! interaction with hardware and the broker happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without real
//! peripherals or a network.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod state;
