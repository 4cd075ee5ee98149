//! Sensor subsystem.
//!
//! A single sensor on this board: the Hall-effect door switch, debounced
//! at the ISR boundary in [`door`].

pub mod door;
