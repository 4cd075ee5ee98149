//! MQTT command channel adapter.
//!
//! Bridges the cell's topic namespace to the domain:
//!
//! - `locker/cell/{id}/command` — inbound, subscribed at connect time,
//!   payload `{"action": "open"|"close", "user_id": <int>}`.
//! - `locker/cell/{id}/status` — outbound, `{"status": "open"|"closed"}`.
//! - `locker/cell/{id}/event` — outbound,
//!   `{"event_type": "opened"|"closed", "user_id": <int>}`.
//!
//! The underlying `esp-idf-svc` MQTT client runs its receive path on its
//! own task; its callback is restricted to parsing and the lock-free
//! inbound command ring (single producer) plus the event queue.  The main
//! loop is the single consumer.  Malformed payloads are logged and
//! dropped; unrecognized actions are silently ignored; publish failures
//! are logged, never propagated (at-most-once from this process's
//! perspective).
//!
//! Link state is an explicit machine: whenever the channel reports
//! `Disconnected`, [`ensure_connected`](CommandChannelPort::ensure_connected)
//! blocks the main loop in a fixed-delay retry until connect + subscribe
//! succeed.  No other work is meaningful while disconnected.

use core::fmt::Write as _;
use core::sync::atomic::{AtomicU8, Ordering};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::commands::CellCommand;
use crate::app::events::TransitionKind;
use crate::app::ports::NotificationPort;
use crate::app::state::DoorState;
use crate::config::CellConfig;
use crate::error::CommsError;
use crate::events::{push_event, Event};

// ───────────────────────────────────────────────────────────────
// Topics
// ───────────────────────────────────────────────────────────────

/// Fixed-capacity topic string ("locker/cell/65535/command" fits).
pub type TopicString = heapless::String<32>;

pub fn command_topic(cell_id: u16) -> TopicString {
    let mut s = TopicString::new();
    let _ = write!(s, "locker/cell/{}/command", cell_id);
    s
}

pub fn status_topic(cell_id: u16) -> TopicString {
    let mut s = TopicString::new();
    let _ = write!(s, "locker/cell/{}/status", cell_id);
    s
}

pub fn event_topic(cell_id: u16) -> TopicString {
    let mut s = TopicString::new();
    let _ = write!(s, "locker/cell/{}/event", cell_id);
    s
}

// ───────────────────────────────────────────────────────────────
// Wire payloads
// ───────────────────────────────────────────────────────────────

/// Inbound command payload.  Missing fields take the wire defaults
/// (empty action, user 0), matching the backend contract.
#[derive(Debug, Deserialize)]
struct CommandPayload {
    #[serde(default)]
    action: heapless::String<16>,
    #[serde(default)]
    user_id: u32,
}

#[derive(Debug, Serialize)]
struct StatusPayload<'a> {
    status: &'a str,
}

#[derive(Debug, Serialize)]
struct EventPayload<'a> {
    event_type: &'a str,
    user_id: u32,
}

/// Parse a raw command-topic payload into a domain command.
///
/// Returns `None` both for malformed JSON (logged, dropped) and for
/// unrecognized or empty actions (silently ignored) — neither produces a
/// state change or an error for the caller.
pub fn parse_command(data: &[u8]) -> Option<CellCommand> {
    let payload: CommandPayload = match serde_json::from_slice(data) {
        Ok(p) => p,
        Err(e) => {
            warn!("Command payload parse failed: {}", e);
            return None;
        }
    };

    match payload.action.as_str() {
        "open" => Some(CellCommand::Open {
            user_id: payload.user_id,
        }),
        "close" => Some(CellCommand::Close {
            user_id: payload.user_id,
        }),
        other => {
            debug!("Ignoring unrecognized action '{}'", other);
            None
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Inbound command ring (lock-free SPSC)
// ───────────────────────────────────────────────────────────────
//
// Producer: the MQTT client callback task.  Consumer: the main loop.
// Same head/tail atomics discipline as the event queue in `events.rs`;
// each slot is an (action, user_id) pair.

const CMD_QUEUE_CAP: usize = 8;

const CMD_OPEN: u8 = 1;
const CMD_CLOSE: u8 = 2;

static CMD_HEAD: AtomicU8 = AtomicU8::new(0);
static CMD_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: slots are written only by the single producer between reserving
// a head index and publishing it with the Release store, and read only by
// the single consumer after an Acquire load of head.
static mut CMD_BUFFER: [(u8, u32); CMD_QUEUE_CAP] = [(0, 0); CMD_QUEUE_CAP];

/// Push a parsed command onto the inbound ring.
/// Safe to call from the MQTT callback task (lock-free).
/// Returns `false` if the ring is full (command dropped, logged by caller).
pub fn push_inbound(cmd: CellCommand) -> bool {
    let head = CMD_HEAD.load(Ordering::Relaxed);
    let tail = CMD_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % CMD_QUEUE_CAP as u8;

    if next_head == tail {
        return false;
    }

    let slot = match cmd {
        CellCommand::Open { user_id } => (CMD_OPEN, user_id),
        CellCommand::Close { user_id } => (CMD_CLOSE, user_id),
    };
    // SAFETY: single producer; slot not visible until the Release store.
    unsafe {
        CMD_BUFFER[head as usize] = slot;
    }

    CMD_HEAD.store(next_head, Ordering::Release);
    true
}

fn pop_inbound() -> Option<CellCommand> {
    let tail = CMD_TAIL.load(Ordering::Relaxed);
    let head = CMD_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None;
    }

    // SAFETY: single consumer; the producer published this slot before the
    // head store we just observed.
    let (code, user_id) = unsafe { CMD_BUFFER[tail as usize] };
    CMD_TAIL.store((tail + 1) % CMD_QUEUE_CAP as u8, Ordering::Release);

    match code {
        CMD_OPEN => Some(CellCommand::Open { user_id }),
        CMD_CLOSE => Some(CellCommand::Close { user_id }),
        _ => None,
    }
}

/// Full inbound path for a received publish: topic filter, parse, enqueue.
/// Called from the MQTT client callback; host tests drive it directly.
pub fn handle_inbound(cell_id: u16, topic: &str, data: &[u8]) {
    if topic != command_topic(cell_id).as_str() {
        debug!("Ignoring message on unrelated topic '{}'", topic);
        return;
    }
    if let Some(cmd) = parse_command(data) {
        if push_inbound(cmd) {
            push_event(Event::CommandReceived);
        } else {
            warn!("Inbound command ring full — dropping {:?}", cmd);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Channel state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// Broker session liveness, raised and cleared by the client task's
/// `Connected`/`Disconnected` callbacks.  Single writer (the callback),
/// single reader (the main loop inside `ensure_connected`).
#[cfg(target_os = "espidf")]
static BROKER_SESSION_UP: core::sync::atomic::AtomicBool =
    core::sync::atomic::AtomicBool::new(false);

/// Session-wait budget per connect attempt: 50 × 100 ms = 5 s.
#[cfg(target_os = "espidf")]
const SESSION_WAIT_SLOTS: u32 = 50;
#[cfg(target_os = "espidf")]
const SESSION_WAIT_SLOT_MS: u64 = 100;

/// Poll `ready` up to `slots` times, sleeping `slot_ms` between polls.
/// Returns `true` as soon as `ready` does, `false` once the budget is
/// exhausted.  Used to wait for state owned by the MQTT client task.
pub fn wait_until(mut ready: impl FnMut() -> bool, slots: u32, slot_ms: u64) -> bool {
    for _ in 0..slots {
        if ready() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(slot_ms));
    }
    ready()
}

/// The command channel as the main loop sees it.
pub trait CommandChannelPort {
    /// Block in a fixed-delay retry loop until connected and subscribed.
    /// All other work is suspended while this runs.
    fn ensure_connected(&mut self);

    fn is_connected(&self) -> bool;

    /// Note a transport-reported disconnect; the next loop iteration will
    /// re-enter the blocking reconnect.
    fn mark_disconnected(&mut self);

    /// Pop the next inbound command, if any.
    fn take_command(&mut self) -> Option<CellCommand>;
}

// ───────────────────────────────────────────────────────────────
// MQTT channel
// ───────────────────────────────────────────────────────────────

pub struct MqttChannel {
    cell_id: u16,
    state: ChannelState,
    client_id: heapless::String<32>,
    broker_host: heapless::String<64>,
    broker_port: u16,
    reconnect_delay_ms: u32,

    #[cfg(target_os = "espidf")]
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,

    /// Host-side capture of outbound publishes, inspected by tests.
    #[cfg(not(target_os = "espidf"))]
    pub outbox: Vec<(String, String)>,
}

impl MqttChannel {
    pub fn new(config: &CellConfig) -> Self {
        Self {
            cell_id: config.cell_id,
            state: ChannelState::Disconnected,
            client_id: config.client_id.clone(),
            broker_host: config.broker_host.clone(),
            broker_port: config.broker_port,
            reconnect_delay_ms: config.reconnect_delay_ms,

            #[cfg(target_os = "espidf")]
            client: None,

            #[cfg(not(target_os = "espidf"))]
            outbox: Vec::new(),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::{
            EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
        };

        // Build the client once and keep it across attempts — the broker
        // handshake runs on the client's own task, so dropping and
        // recreating it on every retry would restart the handshake and
        // never leave a window in which subscribing can succeed.
        if self.client.is_none() {
            BROKER_SESSION_UP.store(false, Ordering::Release);

            let url = format!("mqtt://{}:{}", self.broker_host, self.broker_port);
            let conf = MqttClientConfiguration {
                client_id: Some(self.client_id.as_str()),
                ..Default::default()
            };

            let cell_id = self.cell_id;
            let client = EspMqttClient::new_cb(&url, &conf, move |event| {
                match event.payload() {
                    EventPayload::Received { topic, data, .. } => {
                        if let Some(topic) = topic {
                            handle_inbound(cell_id, topic, data);
                        }
                    }
                    EventPayload::Connected(_) => {
                        BROKER_SESSION_UP.store(true, Ordering::Release);
                    }
                    EventPayload::Disconnected => {
                        BROKER_SESSION_UP.store(false, Ordering::Release);
                        push_event(Event::LinkDown);
                    }
                    _ => {}
                }
            })
            .map_err(|_| CommsError::MqttConnectFailed)?;

            self.client = Some(client);
        }

        // Subscribing before MQTT_EVENT_CONNECTED fails, so wait for the
        // session flag the callback raises.  On timeout the client stays
        // alive and the next attempt picks up wherever the handshake is.
        if !wait_until(
            || BROKER_SESSION_UP.load(Ordering::Acquire),
            SESSION_WAIT_SLOTS,
            SESSION_WAIT_SLOT_MS,
        ) {
            return Err(CommsError::MqttConnectFailed);
        }

        let client = self.client.as_mut().ok_or(CommsError::MqttConnectFailed)?;
        client
            .subscribe(command_topic(self.cell_id).as_str(), QoS::AtLeastOnce)
            .map_err(|_| CommsError::MqttSubscribeFailed)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), CommsError> {
        info!(
            "MQTT(sim): connected to {}:{} as '{}', subscribed to '{}'",
            self.broker_host,
            self.broker_port,
            self.client_id,
            command_topic(self.cell_id)
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.client.as_mut().ok_or(CommsError::MqttPublishFailed)?;
        client
            .enqueue(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .map(|_| ())
            .map_err(|_| CommsError::MqttPublishFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        debug!("MQTT(sim): publish {} {}", topic, payload);
        self.outbox.push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    fn retry_delay(&self) {
        std::thread::sleep(std::time::Duration::from_millis(
            self.reconnect_delay_ms as u64,
        ));
    }

    /// Serialize and publish, logging (never propagating) failures.
    fn publish_json(&mut self, topic: &TopicString, json: serde_json::Result<String>) {
        let payload = match json {
            Ok(p) => p,
            Err(e) => {
                warn!("Payload serialization failed: {}", e);
                return;
            }
        };
        if let Err(e) = self.platform_publish(topic.as_str(), &payload) {
            warn!("Publish to '{}' failed: {}", topic, e);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// CommandChannelPort
// ───────────────────────────────────────────────────────────────

impl CommandChannelPort for MqttChannel {
    fn ensure_connected(&mut self) {
        while self.state != ChannelState::Connected {
            self.state = ChannelState::Connecting;
            info!(
                "MQTT: connecting to {}:{} ...",
                self.broker_host, self.broker_port
            );
            match self.platform_connect() {
                Ok(()) => {
                    self.state = ChannelState::Connected;
                    info!("MQTT: connected, subscribed to '{}'", command_topic(self.cell_id));
                }
                Err(e) => {
                    warn!(
                        "MQTT: connect failed ({}), retrying in {} ms",
                        e, self.reconnect_delay_ms
                    );
                    self.state = ChannelState::Disconnected;
                    self.retry_delay();
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.state == ChannelState::Connected
    }

    fn mark_disconnected(&mut self) {
        if self.state == ChannelState::Connected {
            warn!("MQTT: link lost");
        }
        self.state = ChannelState::Disconnected;
    }

    fn take_command(&mut self) -> Option<CellCommand> {
        pop_inbound()
    }
}

// ───────────────────────────────────────────────────────────────
// NotificationPort
// ───────────────────────────────────────────────────────────────

impl NotificationPort for MqttChannel {
    fn publish_status(&mut self, state: DoorState) {
        let topic = status_topic(self.cell_id);
        let json = serde_json::to_string(&StatusPayload {
            status: state.as_status_str(),
        });
        self.publish_json(&topic, json);
    }

    fn publish_event(&mut self, kind: TransitionKind, user_id: u32) {
        let topic = event_topic(self.cell_id);
        let json = serde_json::to_string(&EventPayload {
            event_type: kind.as_event_str(),
            user_id,
        });
        self.publish_json(&topic, json);
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
