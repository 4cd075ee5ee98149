//! Reconciliation engine — the hexagonal core.
//!
//! [`CellService`] owns the authoritative [`CellState`] and mediates
//! between three asynchronous sources of truth: debounced sensor readings,
//! remotely issued commands, and the locally held belief about the door.
//! It decides when the relay may be pulsed and guarantees every confirmed
//! transition is reported exactly once.
//!
//! ```text
//! DoorSensorPort ──▶ ┌──────────────────────┐ ──▶ NotificationPort
//!                    │     CellService       │
//!       LockPort ◀── │  reconciliation rules │
//!                    └──────────────────────┘
//! ```
//!
//! Commands are handled on the inbound message path (low latency); sensor
//! driven confirmation happens only on the poll tick (bounded latency,
//! debounced).  The deferred-close rule exists because actuating the relay
//! while the door is mechanically open has no physical effect and could
//! mask a true close event.

use log::{debug, info};

use crate::config::CellConfig;

use super::commands::CellCommand;
use super::events::TransitionKind;
use super::ports::{DoorSensorPort, LockPort, NotificationPort};
use super::state::{CellState, DoorState};

/// The reconciliation engine for a single locker cell.
pub struct CellService {
    state: CellState,
    /// Policy for a `close` command while already physically closed:
    /// strict no-op (false) or defensive re-announcement (true).
    republish_when_closed: bool,
    poll_count: u64,
}

impl CellService {
    /// Construct the engine from configuration.
    ///
    /// Does **not** read the sensor — call [`start`](Self::start) next.
    pub fn new(config: &CellConfig) -> Self {
        Self {
            state: CellState::new(),
            republish_when_closed: config.republish_when_closed,
            poll_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Seed `physical` from the first sensor read.
    ///
    /// This is a settle, not a transition: nothing is published and
    /// `reported` stays `Unknown` until the first poll cycle tracks it.
    pub fn start(&mut self, sensor: &mut impl DoorSensorPort) {
        self.state.physical = sensor.door_state();
        info!(
            "CellService started (initial door state: {:?})",
            self.state.physical
        );
    }

    // ── Command intake ────────────────────────────────────────

    /// Process a remote command, immediately (not deferred to the poll).
    pub fn handle_command(
        &mut self,
        cmd: CellCommand,
        hw: &mut impl LockPort,
        channel: &mut impl NotificationPort,
    ) {
        match cmd {
            CellCommand::Open { user_id } => {
                // Unconditional: does not wait for or depend on the sensor.
                info!("Command: open (user {})", user_id);
                self.state.last_user_id = user_id;
                self.state.pending_close = false;
                hw.engage();
                self.announce(TransitionKind::Opened, channel);
            }

            CellCommand::Close { user_id } => {
                if self.state.physical == DoorState::Closed {
                    if self.republish_when_closed {
                        info!("Command: close while closed (user {}) — re-announcing", user_id);
                        self.state.last_user_id = user_id;
                        hw.release();
                        self.announce(TransitionKind::Closed, channel);
                    } else {
                        debug!("Command: close while already closed — no-op");
                    }
                } else {
                    // Deferred: the relay is only released once the sensor
                    // confirms the door is mechanically closed.
                    info!("Command: close (user {}) — deferred until sensor confirms", user_id);
                    self.state.last_user_id = user_id;
                    self.state.pending_close = true;
                }
            }
        }
    }

    // ── Poll cycle ────────────────────────────────────────────

    /// Run one reconciliation cycle: sample the sensor, resolve any pending
    /// close, report sensor-driven closures, and track silent changes.
    ///
    /// The `hw` parameter satisfies **both** [`DoorSensorPort`] and
    /// [`LockPort`] — this avoids a double mutable borrow while keeping the
    /// port boundary explicit.
    pub fn poll(
        &mut self,
        hw: &mut (impl DoorSensorPort + LockPort),
        channel: &mut impl NotificationPort,
    ) {
        self.poll_count += 1;
        let prev = self.state.physical;
        let physical = hw.door_state();
        self.state.physical = physical;

        if self.state.pending_close {
            if physical == DoorState::Closed {
                // Confirmation path for a deferred close: release and clear
                // the flag in the same step.
                info!("Deferred close confirmed by sensor (user {})", self.state.last_user_id);
                hw.release();
                self.state.pending_close = false;
                self.announce(TransitionKind::Closed, channel);
            }
            // Door still open (or unreadable): keep waiting, no actuation.
            return;
        }

        if self.state.reported == DoorState::Open
            && physical == DoorState::Closed
            && prev != DoorState::Closed
        {
            // Direct physical closure with no prior close command (manual /
            // forced shut).  The sensor must actually have transitioned —
            // a door that never opened after an `open` command is tracked
            // silently below, not re-announced.  Release defensively and
            // attribute the last known user.
            info!("Door closed directly (attributing user {})", self.state.last_user_id);
            hw.release();
            self.announce(TransitionKind::Closed, channel);
            return;
        }

        if physical != DoorState::Unknown && physical != self.state.reported {
            // Uncovered change (e.g. Unknown→Open at boot, or the door
            // swinging open without a command): track silently.
            debug!(
                "Tracking {:?} -> {:?} silently",
                self.state.reported, physical
            );
            self.state.reported = physical;
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Snapshot of the current cell state.
    pub fn state(&self) -> CellState {
        self.state
    }

    /// Whether a deferred close is awaiting sensor confirmation.
    pub fn pending_close(&self) -> bool {
        self.state.pending_close
    }

    /// Total poll cycles executed since startup.
    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    // ── Internal ──────────────────────────────────────────────

    /// Publish the status+event pair for a confirmed transition and move
    /// `reported` to the transition's landing state.  The single exit point
    /// for all publications keeps the pair atomic and exactly-once.
    fn announce(&mut self, kind: TransitionKind, channel: &mut impl NotificationPort) {
        let state = kind.door_state();
        channel.publish_status(state);
        channel.publish_event(kind, self.state.last_user_id);
        self.state.reported = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockHw {
        door: DoorState,
        engages: u32,
        releases: u32,
    }

    impl MockHw {
        fn new(door: DoorState) -> Self {
            Self {
                door,
                engages: 0,
                releases: 0,
            }
        }
    }

    impl DoorSensorPort for MockHw {
        fn door_state(&mut self) -> DoorState {
            self.door
        }
    }

    impl LockPort for MockHw {
        fn engage(&mut self) {
            self.engages += 1;
        }
        fn release(&mut self) {
            self.releases += 1;
        }
    }

    #[derive(Default)]
    struct MockChannel {
        statuses: Vec<DoorState>,
        events: Vec<(TransitionKind, u32)>,
    }

    impl NotificationPort for MockChannel {
        fn publish_status(&mut self, state: DoorState) {
            self.statuses.push(state);
        }
        fn publish_event(&mut self, kind: TransitionKind, user_id: u32) {
            self.events.push((kind, user_id));
        }
    }

    fn make_service() -> CellService {
        CellService::new(&CellConfig::default())
    }

    #[test]
    fn open_command_engages_and_publishes_immediately() {
        let mut svc = make_service();
        let mut hw = MockHw::new(DoorState::Closed);
        let mut ch = MockChannel::default();
        svc.start(&mut hw);

        svc.handle_command(CellCommand::Open { user_id: 7 }, &mut hw, &mut ch);

        assert_eq!(hw.engages, 1);
        assert_eq!(ch.statuses, vec![DoorState::Open]);
        assert_eq!(ch.events, vec![(TransitionKind::Opened, 7)]);
        assert_eq!(svc.state().reported, DoorState::Open);
    }

    #[test]
    fn close_command_while_open_defers_actuation() {
        let mut svc = make_service();
        let mut hw = MockHw::new(DoorState::Open);
        let mut ch = MockChannel::default();
        svc.start(&mut hw);

        svc.handle_command(CellCommand::Close { user_id: 3 }, &mut hw, &mut ch);

        assert_eq!(hw.releases, 0, "no actuation before sensor confirms");
        assert!(ch.statuses.is_empty());
        assert!(svc.pending_close());
        assert_eq!(svc.state().last_user_id, 3);
    }

    #[test]
    fn pending_close_resolves_when_sensor_confirms() {
        let mut svc = make_service();
        let mut hw = MockHw::new(DoorState::Open);
        let mut ch = MockChannel::default();
        svc.start(&mut hw);
        svc.handle_command(CellCommand::Close { user_id: 3 }, &mut hw, &mut ch);

        // Door still open: waiting.
        svc.poll(&mut hw, &mut ch);
        assert_eq!(hw.releases, 0);
        assert!(svc.pending_close());

        // Sensor confirms closure.
        hw.door = DoorState::Closed;
        svc.poll(&mut hw, &mut ch);
        assert_eq!(hw.releases, 1);
        assert!(!svc.pending_close());
        assert_eq!(ch.statuses, vec![DoorState::Closed]);
        assert_eq!(ch.events, vec![(TransitionKind::Closed, 3)]);
    }

    #[test]
    fn close_while_already_closed_is_noop_by_default() {
        let mut svc = make_service();
        let mut hw = MockHw::new(DoorState::Closed);
        let mut ch = MockChannel::default();
        svc.start(&mut hw);

        svc.handle_command(CellCommand::Close { user_id: 9 }, &mut hw, &mut ch);

        assert_eq!(hw.releases, 0);
        assert!(ch.statuses.is_empty());
        assert!(!svc.pending_close());
        assert_eq!(svc.state().last_user_id, 0, "no state change on a no-op");
    }

    #[test]
    fn close_while_closed_republishes_under_policy() {
        let cfg = CellConfig {
            republish_when_closed: true,
            ..CellConfig::default()
        };
        let mut svc = CellService::new(&cfg);
        let mut hw = MockHw::new(DoorState::Closed);
        let mut ch = MockChannel::default();
        svc.start(&mut hw);

        svc.handle_command(CellCommand::Close { user_id: 9 }, &mut hw, &mut ch);

        assert_eq!(hw.releases, 1);
        assert_eq!(ch.statuses, vec![DoorState::Closed]);
        assert_eq!(ch.events, vec![(TransitionKind::Closed, 9)]);
    }

    #[test]
    fn close_while_unknown_defers_like_open() {
        let mut svc = make_service();
        let mut hw = MockHw::new(DoorState::Unknown);
        let mut ch = MockChannel::default();
        svc.start(&mut hw);

        svc.handle_command(CellCommand::Close { user_id: 5 }, &mut hw, &mut ch);
        assert!(svc.pending_close());
        assert_eq!(hw.releases, 0);

        hw.door = DoorState::Closed;
        svc.poll(&mut hw, &mut ch);
        assert!(!svc.pending_close());
        assert_eq!(hw.releases, 1);
        assert_eq!(ch.events, vec![(TransitionKind::Closed, 5)]);
    }

    #[test]
    fn direct_closure_attributes_last_user() {
        let mut svc = make_service();
        let mut hw = MockHw::new(DoorState::Closed);
        let mut ch = MockChannel::default();
        svc.start(&mut hw);

        svc.handle_command(CellCommand::Open { user_id: 7 }, &mut hw, &mut ch);
        hw.door = DoorState::Open;
        svc.poll(&mut hw, &mut ch);

        // Manual shut, no close command.
        hw.door = DoorState::Closed;
        ch.statuses.clear();
        ch.events.clear();
        svc.poll(&mut hw, &mut ch);

        assert_eq!(hw.releases, 1, "defensive release");
        assert_eq!(ch.statuses, vec![DoorState::Closed]);
        assert_eq!(ch.events, vec![(TransitionKind::Closed, 7)]);
    }

    #[test]
    fn unchanged_polls_publish_nothing() {
        let mut svc = make_service();
        let mut hw = MockHw::new(DoorState::Closed);
        let mut ch = MockChannel::default();
        svc.start(&mut hw);

        for _ in 0..10 {
            svc.poll(&mut hw, &mut ch);
        }
        assert!(ch.statuses.is_empty());
        assert!(ch.events.is_empty());
        assert_eq!(svc.poll_count(), 10);
    }

    #[test]
    fn boot_settle_tracks_silently() {
        let mut svc = make_service();
        let mut hw = MockHw::new(DoorState::Closed);
        let mut ch = MockChannel::default();
        svc.start(&mut hw);
        assert_eq!(svc.state().physical, DoorState::Closed);

        svc.poll(&mut hw, &mut ch);
        assert_eq!(svc.state().reported, DoorState::Closed);
        assert!(ch.statuses.is_empty(), "first settle is not a transition");
    }

    #[test]
    fn open_with_door_never_opened_tracks_silently() {
        let mut svc = make_service();
        let mut hw = MockHw::new(DoorState::Closed);
        let mut ch = MockChannel::default();
        svc.start(&mut hw);
        svc.poll(&mut hw, &mut ch);

        svc.handle_command(CellCommand::Open { user_id: 2 }, &mut hw, &mut ch);
        ch.statuses.clear();
        ch.events.clear();

        // The door is never pulled open; the sensor keeps reading Closed.
        // No Open->Closed transition happened, so nothing is published.
        svc.poll(&mut hw, &mut ch);
        assert!(ch.statuses.is_empty());
        assert!(ch.events.is_empty());
        assert_eq!(svc.state().reported, DoorState::Closed);
    }

    #[test]
    fn open_command_resets_pending_close() {
        let mut svc = make_service();
        let mut hw = MockHw::new(DoorState::Open);
        let mut ch = MockChannel::default();
        svc.start(&mut hw);

        svc.handle_command(CellCommand::Close { user_id: 3 }, &mut hw, &mut ch);
        assert!(svc.pending_close());
        svc.handle_command(CellCommand::Open { user_id: 4 }, &mut hw, &mut ch);
        assert!(!svc.pending_close());
        assert_eq!(svc.state().last_user_id, 4);
    }
}
