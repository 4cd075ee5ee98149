//! Unified error types for the locker cell firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level control loop's error handling uniform.  All variants are `Copy`
//! so they can be passed around without allocation.  Runtime faults
//! (transport loss, malformed payloads, sensor noise) are recovered locally
//! and never travel through these types — they exist for the fallible
//! initialisation paths.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A communication subsystem failed.
    Comms(CommsError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WifiConnectFailed,
    WifiDisconnected,
    MqttConnectFailed,
    MqttSubscribeFailed,
    MqttPublishFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::WifiDisconnected => write!(f, "WiFi disconnected"),
            Self::MqttConnectFailed => write!(f, "MQTT connect failed"),
            Self::MqttSubscribeFailed => write!(f, "MQTT subscribe failed"),
            Self::MqttPublishFailed => write!(f, "MQTT publish failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
