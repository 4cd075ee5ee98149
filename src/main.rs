//! Locker Cell Controller — Main Entry Point
//!
//! Hexagonal architecture with an event-driven control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter       MqttChannel          Esp32TimeAdapter   │
//! │  (DoorSensor+Lock)     (Commands+Notify)    (poll scheduling)  │
//! │  WifiAdapter                                                   │
//! │  (Connectivity)                                                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              CellService (pure logic)                  │    │
//! │  │  command handling · sensor reconciliation              │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod error;
mod events;
mod pins;

pub mod app;
mod adapters;
mod drivers;
mod sensors;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::hardware::HardwareAdapter;
use adapters::mqtt::{CommandChannelPort, MqttChannel};
use adapters::time::Esp32TimeAdapter;
use adapters::wifi::{ConnectivityPort, WifiAdapter};
use app::service::CellService;
use config::CellConfig;
use drivers::lock::LockDriver;
use events::Event;
use sensors::door::DoorSensor;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  LockerCell v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config (flash-time provisioning) ───────────────────
    let config = CellConfig::from_env();
    if let Err(e) = config.validate() {
        log::error!("Config invalid: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    info!(
        "Cell {} — broker {}:{}, poll {} ms, debounce {} ms",
        config.cell_id,
        config.broker_host,
        config.broker_port,
        config.poll_interval_ms,
        config.debounce_window_ms
    );

    // ── 3. Initialise hardware peripherals ────────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    sensors::door::DOOR_DEBOUNCE.set_window_ms(config.debounce_window_ms);
    if let Err(e) = drivers::hw_init::init_isr_service() {
        log::error!("ISR service init failed: {} — continuing without edge capture", e);
    }

    // ── 4. Construct adapters ─────────────────────────────────
    let mut hw = HardwareAdapter::new(
        DoorSensor::new(pins::HALL_SENSOR_GPIO),
        LockDriver::new(),
    );
    let time_adapter = Esp32TimeAdapter::new();

    // ── 5. WiFi station ───────────────────────────────────────
    let mut wifi = WifiAdapter::new();
    if let Err(e) = wifi.set_credentials(config.wifi_ssid.as_str(), config.wifi_password.as_str())
    {
        // Without valid credentials the cell can still actuate locally,
        // so keep running; the backlog of status updates is lost.
        warn!("WiFi credentials invalid ({}), running offline", e);
    } else if let Err(e) = wifi.connect() {
        warn!("WiFi connect failed ({}), will retry with backoff", e);
    }

    // ── 6. Command channel + cell service ─────────────────────
    let mut channel = MqttChannel::new(&config);
    let mut service = CellService::new(&config);
    service.start(&mut hw);

    info!("System ready. Entering control loop.");

    // ── 7. Control loop ───────────────────────────────────────
    let mut last_poll_ms = time_adapter.uptime_ms();

    loop {
        // WiFi reconnection poll (exponential backoff).
        wifi.poll();

        // Broker link: block here until (re)connected — nothing else is
        // meaningful while the cell cannot hear commands.
        if wifi.is_connected() && !channel.is_connected() {
            channel.ensure_connected();
        }

        // Process all pending events from the MQTT client task.
        events::drain_events(|event| match event {
            Event::LinkDown => {
                channel.mark_disconnected();
            }
            Event::CommandReceived => {
                // Commands are drained below; the event only wakes the loop.
            }
        });

        // Apply every queued command in arrival order.
        while let Some(cmd) = channel.take_command() {
            service.handle_command(cmd, &mut hw, &mut channel);
        }

        // Reconciliation tick.
        let now_ms = time_adapter.uptime_ms();
        if now_ms.wrapping_sub(last_poll_ms) >= u64::from(config.poll_interval_ms) {
            service.poll(&mut hw, &mut channel);
            last_poll_ms = now_ms;
        }

        std::thread::sleep(std::time::Duration::from_millis(10));
    }
}
