//! Hall-effect door sensor with ISR-side debouncing.
//!
//! ## Hardware
//!
//! A3144 Hall switch on the door frame, magnet on the door.  GPIO input
//! with pull-up, interrupt on any edge.  LOW = magnet present = closed.
//!
//! ## Debounce policy
//!
//! On each raw edge the ISR reads the monotonic clock; the raw level is
//! accepted as the new logical level only if the elapsed time since the
//! last *accepted* edge exceeds the quiet window (100 ms default).  Edges
//! inside the window are discarded as mechanical/electrical bounce.  No
//! double-debounce, no hysteresis band — a single global quiet window is
//! the whole policy.  A transient misread simply persists until corrected
//! by a later accepted edge; the engine re-polls every cycle.
//!
//! ## Concurrency
//!
//! Single writer (the ISR, plus the boot-time seed before interrupts are
//! enabled), single reader (the main loop).  The fields are independently
//! atomic-sized; no locks.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::app::state::DoorState;

/// Default quiet window between accepted edges.
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u32 = 100;

const LEVEL_UNKNOWN: u8 = 0;
const LEVEL_OPEN: u8 = 1;
const LEVEL_CLOSED: u8 = 2;

/// Shared debounce state between the ISR and the main loop.
///
/// A static instance backs the real GPIO ISR; tests construct their own.
pub struct DoorDebounce {
    /// Logical level: 0 = unknown, 1 = open, 2 = closed.
    level: AtomicU8,
    /// Timestamp (ms since boot) of the last accepted edge.
    last_edge_ms: AtomicU32,
    /// Quiet window, set once at init from config.
    window_ms: AtomicU32,
}

impl DoorDebounce {
    pub const fn new(window_ms: u32) -> Self {
        Self {
            level: AtomicU8::new(LEVEL_UNKNOWN),
            last_edge_ms: AtomicU32::new(0),
            window_ms: AtomicU32::new(window_ms),
        }
    }

    /// Record a raw edge observed at `now_ms`.
    ///
    /// Returns `true` if the edge was accepted as a logical level change,
    /// `false` if it was discarded as bounce.  Safe to call from interrupt
    /// context: bounded time, no allocation, atomics only.
    pub fn record_edge(&self, now_ms: u32, raw_closed: bool) -> bool {
        let last = self.last_edge_ms.load(Ordering::Relaxed);
        let window = self.window_ms.load(Ordering::Relaxed);

        // First edge ever is accepted unconditionally (level still unknown).
        let settled = self.level.load(Ordering::Relaxed) != LEVEL_UNKNOWN;
        if settled && now_ms.wrapping_sub(last) < window {
            return false;
        }

        self.level.store(
            if raw_closed { LEVEL_CLOSED } else { LEVEL_OPEN },
            Ordering::Release,
        );
        self.last_edge_ms.store(now_ms, Ordering::Release);
        true
    }

    /// Install the boot-time level before interrupts are enabled, so the
    /// engine has a valid reading before the first edge fires.
    pub fn seed(&self, raw_closed: bool) {
        self.level.store(
            if raw_closed { LEVEL_CLOSED } else { LEVEL_OPEN },
            Ordering::Release,
        );
    }

    /// Override the quiet window (called once at init from config).
    pub fn set_window_ms(&self, window_ms: u32) {
        self.window_ms.store(window_ms, Ordering::Relaxed);
    }

    /// Current debounced reading.
    pub fn state(&self) -> DoorState {
        match self.level.load(Ordering::Acquire) {
            LEVEL_OPEN => DoorState::Open,
            LEVEL_CLOSED => DoorState::Closed,
            _ => DoorState::Unknown,
        }
    }
}

/// The single shared instance wired to the GPIO ISR.
pub static DOOR_DEBOUNCE: DoorDebounce = DoorDebounce::new(DEFAULT_DEBOUNCE_WINDOW_MS);

/// ISR handler — register this on the Hall sensor GPIO, any edge.
/// Safe to call from interrupt context (lock-free atomic stores).
pub fn door_isr_handler(now_ms: u32, raw_closed: bool) {
    DOOR_DEBOUNCE.record_edge(now_ms, raw_closed);
}

/// Door sensor driver — the main-loop read side of [`DOOR_DEBOUNCE`].
pub struct DoorSensor {
    /// GPIO pin number (stored for diagnostics / re-init).
    _gpio: i32,
}

impl DoorSensor {
    pub fn new(gpio: i32) -> Self {
        Self { _gpio: gpio }
    }

    /// Current debounced door state.
    pub fn read(&self) -> DoorState {
        DOOR_DEBOUNCE.state()
    }
}
