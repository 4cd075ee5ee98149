//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CellService (domain)
//! ```
//!
//! Driven adapters (door sensor, lock relay, MQTT channel) implement these
//! traits.  The [`CellService`](super::service::CellService) consumes them
//! via generics, so the domain core never touches hardware or the network
//! directly.

use super::events::TransitionKind;
use super::state::DoorState;

// ───────────────────────────────────────────────────────────────
// Door sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the engine samples the debounced door state each poll.
pub trait DoorSensorPort {
    /// Current debounced reading.  `Unknown` until the first level settles.
    fn door_state(&mut self) -> DoorState;
}

// ───────────────────────────────────────────────────────────────
// Lock port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the engine commands the relay through this.
///
/// Both operations are idempotent — repeated calls are safe no-ops at the
/// hardware level (a digital output write to the level already present).
/// The engine does not track relay output state separately.
pub trait LockPort {
    /// Drive the lock open (relay line HIGH).
    fn engage(&mut self);

    /// Drive the lock closed (relay line LOW).
    fn release(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Notification port (driven adapter: domain → backend)
// ───────────────────────────────────────────────────────────────

/// Outbound side of the command channel.
///
/// Both calls are fire-and-forget: delivery beyond the local publish is the
/// transport's responsibility, and publish failures are logged by the
/// adapter rather than surfaced to the engine.
pub trait NotificationPort {
    /// Publish `{"status": "<open|closed>"}` to the cell's status topic.
    fn publish_status(&mut self, state: DoorState);

    /// Publish `{"event_type": "<opened|closed>", "user_id": <int>}` to the
    /// cell's event topic.
    fn publish_event(&mut self, kind: TransitionKind, user_id: u32);
}
