//! GPIO pin assignments for the locker cell controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Lock relay (opto-isolated relay module, active HIGH)
// ---------------------------------------------------------------------------

/// Digital output: HIGH = relay energised = lock held open.
pub const LOCK_RELAY_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Door sensor (A3144 Hall-effect switch on the door frame)
// ---------------------------------------------------------------------------

/// Digital input with pull-up, interrupt on any edge.
/// LOW = magnet present = door closed; HIGH = door open.
pub const HALL_SENSOR_GPIO: i32 = 5;
