//! Property and fuzz-style tests for robustness of the core logic.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use lockercell::app::commands::CellCommand;
use lockercell::app::events::TransitionKind;
use lockercell::app::ports::{DoorSensorPort, LockPort, NotificationPort};
use lockercell::app::service::CellService;
use lockercell::app::state::DoorState;
use lockercell::config::CellConfig;
use lockercell::sensors::door::DoorDebounce;
use proptest::prelude::*;

// ── Debounce quiet-window invariants ──────────────────────────

proptest! {
    /// Edges spaced at or beyond the quiet window are always accepted, and
    /// the debounced state always lands on the last edge's level.
    #[test]
    fn spaced_edges_always_accepted(
        window in 1u32..=500,
        edges in proptest::collection::vec((0u32..=1000, any::<bool>()), 1..=30),
    ) {
        let d = DoorDebounce::new(window);
        let mut now: u32 = 0;

        for (extra, closed) in &edges {
            now = now.wrapping_add(window + extra);
            prop_assert!(d.record_edge(now, *closed));
        }

        let (_, last_closed) = edges[edges.len() - 1];
        let expected = if last_closed { DoorState::Closed } else { DoorState::Open };
        prop_assert_eq!(d.state(), expected);
    }

    /// Once a level has settled, a burst of edges inside the window is
    /// discarded wholesale — the state never moves off the accepted level.
    #[test]
    fn bounce_bursts_never_change_state(
        window in 2u32..=500,
        settle_closed in any::<bool>(),
        burst in proptest::collection::vec((any::<u32>(), any::<bool>()), 1..=50),
    ) {
        let d = DoorDebounce::new(window);
        prop_assert!(d.record_edge(1000, settle_closed));
        let settled = d.state();

        for (jitter, closed) in &burst {
            // Every burst edge lands strictly inside the quiet window.
            let t = 1000 + (jitter % (window - 1)) + 1;
            prop_assert!(!d.record_edge(t, *closed));
            prop_assert_eq!(d.state(), settled);
        }
    }

    /// The very first edge is accepted regardless of its timestamp.
    #[test]
    fn first_edge_always_accepted(now in any::<u32>(), closed in any::<bool>()) {
        let d = DoorDebounce::new(100);
        prop_assert!(d.record_edge(now, closed));
    }
}

// ── Reconciliation engine invariants ──────────────────────────

#[derive(Debug, Clone)]
enum CellOp {
    Open(u32),
    Close(u32),
    Poll(DoorState),
}

fn arb_cell_op() -> impl Strategy<Value = CellOp> {
    prop_oneof![
        (0u32..=100).prop_map(CellOp::Open),
        (0u32..=100).prop_map(CellOp::Close),
        prop_oneof![
            Just(DoorState::Open),
            Just(DoorState::Closed),
            Just(DoorState::Unknown),
        ]
        .prop_map(CellOp::Poll),
    ]
}

struct ScriptedHw {
    door: DoorState,
    releases_while_open: u32,
}

impl DoorSensorPort for ScriptedHw {
    fn door_state(&mut self) -> DoorState {
        self.door
    }
}

impl LockPort for ScriptedHw {
    fn engage(&mut self) {}
    fn release(&mut self) {
        if self.door == DoorState::Open {
            self.releases_while_open += 1;
        }
    }
}

#[derive(Default)]
struct RecordingChannel {
    statuses: Vec<DoorState>,
    events: Vec<(TransitionKind, u32)>,
}

impl NotificationPort for RecordingChannel {
    fn publish_status(&mut self, state: DoorState) {
        self.statuses.push(state);
    }
    fn publish_event(&mut self, kind: TransitionKind, user_id: u32) {
        self.events.push((kind, user_id));
    }
}

fn run_ops(ops: &[CellOp]) -> (CellService, ScriptedHw, RecordingChannel) {
    let mut svc = CellService::new(&CellConfig::default());
    let mut hw = ScriptedHw {
        door: DoorState::Closed,
        releases_while_open: 0,
    };
    let mut ch = RecordingChannel::default();
    svc.start(&mut hw);

    for op in ops {
        match op {
            CellOp::Open(user) => {
                svc.handle_command(CellCommand::Open { user_id: *user }, &mut hw, &mut ch);
            }
            CellOp::Close(user) => {
                svc.handle_command(CellCommand::Close { user_id: *user }, &mut hw, &mut ch);
            }
            CellOp::Poll(door) => {
                hw.door = *door;
                svc.poll(&mut hw, &mut ch);
            }
        }
    }
    (svc, hw, ch)
}

proptest! {
    /// Every publication is an atomic status+event pair, and the status
    /// value always matches the event kind's landing state.
    #[test]
    fn status_and_event_always_paired(
        ops in proptest::collection::vec(arb_cell_op(), 0..=40),
    ) {
        let (_, _, ch) = run_ops(&ops);

        prop_assert_eq!(ch.statuses.len(), ch.events.len());
        for (status, (kind, _)) in ch.statuses.iter().zip(ch.events.iter()) {
            prop_assert_eq!(*status, kind.door_state());
        }
    }

    /// Polling an unchanged sensor is idempotent: after any history, a
    /// second poll with the same reading publishes nothing.
    #[test]
    fn repeated_polls_publish_at_most_once(
        ops in proptest::collection::vec(arb_cell_op(), 0..=40),
        door in prop_oneof![Just(DoorState::Open), Just(DoorState::Closed)],
    ) {
        let (mut svc, mut hw, mut ch) = run_ops(&ops);

        hw.door = door;
        svc.poll(&mut hw, &mut ch);
        let after_first = ch.statuses.len();

        svc.poll(&mut hw, &mut ch);
        svc.poll(&mut hw, &mut ch);
        prop_assert_eq!(ch.statuses.len(), after_first);
    }

    /// The relay is never released while the sensor still reads the door
    /// as open from a deferred close — confirmation gates actuation.
    #[test]
    fn deferred_close_never_releases_early(
        users in proptest::collection::vec(0u32..=100, 1..=10),
    ) {
        let mut svc = CellService::new(&CellConfig::default());
        let mut hw = ScriptedHw { door: DoorState::Open, releases_while_open: 0 };
        let mut ch = RecordingChannel::default();
        svc.start(&mut hw);

        for user in &users {
            svc.handle_command(CellCommand::Close { user_id: *user }, &mut hw, &mut ch);
            svc.poll(&mut hw, &mut ch);
        }

        prop_assert_eq!(hw.releases_while_open, 0);
        prop_assert!(svc.pending_close());
    }
}
