//! System configuration parameters
//!
//! All tunable parameters for the locker cell controller.  Network
//! credentials and identifiers default to build-time environment overrides
//! (`LOCKER_*`), matching how the cells are provisioned at flash time.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core cell configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellConfig {
    // --- Identity ---
    /// Cell identifier used in topic names. Stable for the process lifetime.
    pub cell_id: u16,
    /// MQTT client identifier presented at connect time.
    pub client_id: heapless::String<32>,

    // --- Network ---
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    pub broker_host: heapless::String<64>,
    pub broker_port: u16,

    // --- Timing ---
    /// Minimum gap between accepted Hall-sensor edges (milliseconds).
    pub debounce_window_ms: u32,
    /// Reconciliation poll interval (milliseconds).
    pub poll_interval_ms: u32,
    /// Fixed delay between blocking broker reconnect attempts (milliseconds).
    pub reconnect_delay_ms: u32,

    // --- Policy ---
    /// When true, a `close` command for an already-closed door re-announces
    /// the closed status/event pair instead of being a strict no-op.
    pub republish_when_closed: bool,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            cell_id: 1,
            client_id: str_to_heapless("locker-cell-1"),

            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
            broker_host: str_to_heapless("localhost"),
            broker_port: 1883,

            debounce_window_ms: 100,
            poll_interval_ms: 1000,
            reconnect_delay_ms: 2000,

            republish_when_closed: false,
        }
    }
}

impl CellConfig {
    /// Build a config from compile-time `LOCKER_*` environment overrides.
    ///
    /// Unset variables fall back to [`CellConfig::default`] values. Values
    /// too long for their field are truncated to the field capacity.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(id) = option_env!("LOCKER_CELL_ID") {
            if let Ok(id) = id.parse::<u16>() {
                cfg.cell_id = id;
            }
        }
        if let Some(ssid) = option_env!("LOCKER_WIFI_SSID") {
            cfg.wifi_ssid = str_to_heapless(ssid);
        }
        if let Some(pass) = option_env!("LOCKER_WIFI_PASSWORD") {
            cfg.wifi_password = str_to_heapless(pass);
        }
        if let Some(host) = option_env!("LOCKER_BROKER_HOST") {
            cfg.broker_host = str_to_heapless(host);
        }
        if let Some(port) = option_env!("LOCKER_BROKER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                cfg.broker_port = port;
            }
        }
        if let Some(client) = option_env!("LOCKER_CLIENT_ID") {
            cfg.client_id = str_to_heapless(client);
        }

        cfg
    }

    /// Sanity-check the assembled configuration before the control loop
    /// starts.  A cell that boots with a broken config must halt loudly
    /// rather than publish under a wrong identity.
    pub fn validate(&self) -> Result<()> {
        if self.cell_id == 0 {
            return Err(Error::Config("cell_id must be non-zero"));
        }
        if self.broker_host.is_empty() {
            return Err(Error::Config("broker_host must not be empty"));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be non-zero"));
        }
        Ok(())
    }
}

/// Copy `s` into a fixed-capacity string, truncating on overflow.
fn str_to_heapless<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = CellConfig::default();
        assert!(c.cell_id > 0);
        assert!(c.broker_port > 0);
        assert!(c.debounce_window_ms > 0);
        assert!(c.poll_interval_ms >= c.debounce_window_ms);
        assert!(c.reconnect_delay_ms > 0);
        assert!(!c.republish_when_closed, "strict no-op is the default policy");
    }

    #[test]
    fn serde_roundtrip() {
        let c = CellConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: CellConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.cell_id, c2.cell_id);
        assert_eq!(c.broker_port, c2.broker_port);
        assert_eq!(c.debounce_window_ms, c2.debounce_window_ms);
        assert_eq!(c.republish_when_closed, c2.republish_when_closed);
    }

    #[test]
    fn validate_rejects_broken_identity() {
        let mut c = CellConfig::default();
        assert!(c.validate().is_ok());
        c.cell_id = 0;
        assert!(c.validate().is_err());

        let mut c = CellConfig::default();
        c.broker_host.clear();
        assert!(c.validate().is_err());
    }

    #[test]
    fn overlong_values_truncate() {
        let s: heapless::String<8> = str_to_heapless("0123456789abcdef");
        assert_eq!(s.as_str(), "01234567");
    }
}
