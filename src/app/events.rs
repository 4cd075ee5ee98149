//! Outbound notifications.
//!
//! The [`CellService`](super::service::CellService) emits these through the
//! [`NotificationPort`](super::ports::NotificationPort).  The adapter on
//! the other side decides where they go — the MQTT status/event topics in
//! production, a recording sink in tests.

use super::state::DoorState;

/// A confirmed door transition, as announced on the event topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Opened,
    Closed,
}

impl TransitionKind {
    /// Wire representation used in event payloads.
    pub fn as_event_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
        }
    }

    /// The door state this transition lands in.
    pub fn door_state(self) -> DoorState {
        match self {
            Self::Opened => DoorState::Open,
            Self::Closed => DoorState::Closed,
        }
    }
}
