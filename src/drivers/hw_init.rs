//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions and installs the Hall-sensor edge interrupt
//! using raw ESP-IDF sys calls.  Called once from `main()` before the
//! control loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

// ── Peripheral init ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // Hall sensor: input, pull-up, interrupt type set later in
    // init_isr_service().
    let hall_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::HALL_SENSOR_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: Called once from main() before the control loop; single-threaded.
    let ret = unsafe { gpio_config(&hall_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    // Lock relay: output, initialised LOW (lock closed) so a reboot never
    // leaves a cell unlocked.
    let relay_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::LOCK_RELAY_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: single-threaded init path, as above.
    let ret = unsafe { gpio_config(&relay_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    // SAFETY: pin was just configured as an output.
    unsafe { gpio_set_level(pins::LOCK_RELAY_GPIO, 0) };

    info!("hw_init: GPIO configured (hall=in/pullup, relay=out/low)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO access helpers ───────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe from main context and ISRs.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // main-loop only.
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── GPIO ISR service ──────────────────────────────────────────

/// Raw Hall level is active-low: LOW = magnet present = door closed.
#[cfg(target_os = "espidf")]
fn hall_raw_closed() -> bool {
    !gpio_read(pins::HALL_SENSOR_GPIO)
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn hall_gpio_isr(_arg: *mut core::ffi::c_void) {
    // SAFETY: esp_timer_get_time is an RTC counter read; gpio_get_level is
    // a register read.  Both are safe in ISR context.
    let now_ms = ((unsafe { esp_timer_get_time() }) / 1_000) as u32;
    crate::sensors::door::door_isr_handler(now_ms, hall_raw_closed());
}

/// Install the GPIO ISR service, register the Hall any-edge interrupt, and
/// seed the debounce state with the current level so the engine has a valid
/// reading before the first edge fires.
///
/// Call after [`init_peripherals`] and before the control loop.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable).  The handler registered
    // below only touches the lock-free debounce atomics.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        gpio_set_intr_type(pins::HALL_SENSOR_GPIO, gpio_int_type_t_GPIO_INTR_ANYEDGE);
        gpio_isr_handler_add(
            pins::HALL_SENSOR_GPIO,
            Some(hall_gpio_isr),
            core::ptr::null_mut(),
        );

        crate::sensors::door::DOOR_DEBOUNCE.seed(hall_raw_closed());

        gpio_intr_enable(pins::HALL_SENSOR_GPIO);
    }

    info!("hw_init: ISR service installed (hall any-edge, level seeded)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
