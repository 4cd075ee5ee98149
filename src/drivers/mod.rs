//! Hardware drivers.
//!
//! Each driver is dumb: it owns one actuator or init concern and performs
//! GPIO access through [`hw_init`]'s helpers, which are cfg-gated between
//! real ESP-IDF calls and host-side simulation stubs.

pub mod hw_init;
pub mod lock;
