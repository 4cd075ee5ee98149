//! Cell state model.
//!
//! [`CellState`] is the authoritative belief the reconciliation engine
//! holds about its single cell: the last debounced sensor reading, the
//! last state reported to the backend, the deferred-close flag, and the
//! user attributed to the most recent command.

/// Logical door state as seen through the debounced Hall sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DoorState {
    /// No debounced reading has settled yet (boot, before first edge/seed).
    #[default]
    Unknown = 0,
    Open = 1,
    Closed = 2,
}

impl DoorState {
    /// Wire representation used in status payloads.
    pub fn as_status_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// The full per-cell reconciliation state.
#[derive(Debug, Clone, Copy)]
pub struct CellState {
    /// Last debounced sensor reading, updated only from the sensor port.
    pub physical: DoorState,
    /// Last state this process has published; suppresses duplicates.
    pub reported: DoorState,
    /// A close command arrived while the door was not confirmed closed;
    /// actuation is deferred until the sensor confirms closure.
    pub pending_close: bool,
    /// User attributed to outbound events, command- or sensor-driven alike.
    pub last_user_id: u32,
}

impl CellState {
    /// Boot-time state: everything unknown, nothing pending, user 0.
    pub const fn new() -> Self {
        Self {
            physical: DoorState::Unknown,
            reported: DoorState::Unknown,
            pending_close: false,
            last_user_id: 0,
        }
    }
}

impl Default for CellState {
    fn default() -> Self {
        Self::new()
    }
}
