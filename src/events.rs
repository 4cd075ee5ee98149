//! Interrupt-driven event system.
//!
//! Events are produced by:
//! - the MQTT client task (inbound commands, link state changes)
//! - software (startup, diagnostics)
//!
//! Events are consumed by the main control loop, which processes them one
//! at a time.  The queue is a lock-free SPSC ring: producer is the MQTT
//! callback task, consumer is the main loop.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ MQTT task    │────▶│  Event Queue │────▶│  Main Loop   │
//! │ Software     │────▶│  (lock-free) │     │  (consumer)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! The Hall-sensor ISR does **not** go through this queue — debounced door
//! state is only sampled on the poll tick, so the ISR writes straight into
//! the [`DoorDebounce`](crate::sensors::door::DoorDebounce) atomics.

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const EVENT_QUEUE_CAP: usize = 16;

/// System event types.  Only signals the main loop acts on live here;
/// successful (re)connects are synchronous on the loop itself and need no
/// event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// The broker connection dropped; the main loop must block-reconnect.
    LinkDown = 0,
    /// One or more commands arrived on the command topic.
    CommandReceived = 10,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// MQTT task writes (produce), main loop reads (consume).
// Uses atomic head/tail indices.  The buffer is intentionally kept in a
// static so the client callback can access it without captures.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: EVENT_BUFFER slots are written only by the single producer
// (between reserving a head index and publishing it with the Release
// store) and read only by the single consumer after an Acquire load of
// head.  The atomics enforce the SPSC discipline.
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Push an event into the queue.
/// Safe to call from the MQTT callback task (lock-free).
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: single producer; the slot at `head` is not visible to the
    // consumer until the Release store below.
    unsafe {
        EVENT_BUFFER[head as usize] = event as u8;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event from the queue.
/// Called from the main loop (single consumer).
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    // SAFETY: single consumer; the producer published this slot before the
    // head store we just observed.
    let raw = unsafe { EVENT_BUFFER[tail as usize] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback, in FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        0 => Some(Event::LinkDown),
        10 => Some(Event::CommandReceived),
        _ => None,
    }
}
