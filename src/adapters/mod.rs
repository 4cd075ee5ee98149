//! Adapters — the outer hexagonal ring.
//!
//! Each adapter bridges one external concern (peripherals, WiFi, the MQTT
//! broker, the monotonic clock) to the port traits the domain consumes.

pub mod hardware;
pub mod mqtt;
pub mod time;
pub mod wifi;
