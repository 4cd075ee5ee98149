//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`] — the boundary for network
//! connectivity.  The locker controller treats association internals as an
//! external service: it connects once at boot and polls for reconnection
//! with exponential backoff.  Broker-level recovery is handled separately
//! by the MQTT channel's blocking retry loop.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.

use core::fmt;
use log::{error, info};

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    AlreadyConnected,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::AlreadyConnected => write!(f, "already connected to AP"),
        }
    }
}

pub trait ConnectivityPort {
    fn connect(&mut self) -> Result<(), ConnectivityError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    fn poll(&mut self);
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

const MAX_BACKOFF_SECS: u32 = 60;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_secs: u32,
    #[cfg(target_os = "espidf")]
    wifi: Option<esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>>,
}

impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: 2,
            #[cfg(target_os = "espidf")]
            wifi: None,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::hal::peripherals::Peripherals;
        use esp_idf_svc::nvs::EspDefaultNvsPartition;
        use esp_idf_svc::wifi::{
            AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
        };

        // The modem peripheral and sysloop are taken on first use; the
        // wrapped handle lives for the rest of the process.
        if self.wifi.is_none() {
            let peripherals =
                Peripherals::take().map_err(|_| ConnectivityError::ConnectionFailed)?;
            let sysloop =
                EspSystemEventLoop::take().map_err(|_| ConnectivityError::ConnectionFailed)?;
            let nvs =
                EspDefaultNvsPartition::take().map_err(|_| ConnectivityError::ConnectionFailed)?;
            let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))
                .map_err(|_| ConnectivityError::ConnectionFailed)?;
            let wifi = BlockingWifi::wrap(esp_wifi, sysloop)
                .map_err(|_| ConnectivityError::ConnectionFailed)?;
            self.wifi = Some(wifi);
        }

        let Some(wifi) = self.wifi.as_mut() else {
            return Err(ConnectivityError::ConnectionFailed);
        };

        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let conf = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        wifi.set_configuration(&conf)
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        wifi.start()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        wifi.connect()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        wifi.wait_netif_up()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;

        info!("WiFi(espidf): STA up on '{}'", self.ssid);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        let auth = if self.password.is_empty() { "open" } else { "wpa2" };
        info!("WiFi(sim): connected to '{}' ({})", self.ssid, auth);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Some(wifi) = self.wifi.as_mut() {
            let _ = wifi.disconnect();
            let _ = wifi.stop();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        info!("WiFi(sim): disconnected");
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        if self.state == WifiState::Connected {
            return Err(ConnectivityError::AlreadyConnected);
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        self.state = WifiState::Connecting;

        match self.platform_connect() {
            Ok(()) => {
                self.state = WifiState::Connected;
                self.backoff_secs = 2;
                info!("WiFi: connected");
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed — {}", e);
                self.state = WifiState::Reconnecting { attempt: 0 };
                Err(e)
            }
        }
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    fn poll(&mut self) {
        if let WifiState::Reconnecting { attempt } = self.state {
            info!("WiFi: reconnect attempt {} (backoff {}s)", attempt, self.backoff_secs);
            match self.platform_connect() {
                Ok(()) => {
                    self.state = WifiState::Connected;
                    self.backoff_secs = 2;
                    info!("WiFi: reconnected");
                }
                Err(_) => {
                    self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
                    self.state = WifiState::Reconnecting { attempt: attempt + 1 };
                }
            }
        }
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_ssid() {
        let mut a = WifiAdapter::new();
        assert_eq!(
            a.set_credentials("", "password123"),
            Err(ConnectivityError::InvalidSsid)
        );
    }

    #[test]
    fn rejects_short_password() {
        let mut a = WifiAdapter::new();
        assert_eq!(
            a.set_credentials("MyNet", "short"),
            Err(ConnectivityError::InvalidPassword)
        );
    }

    #[test]
    fn accepts_open_network() {
        let mut a = WifiAdapter::new();
        assert!(a.set_credentials("OpenCafe", "").is_ok());
    }

    #[test]
    fn connect_without_credentials_fails() {
        let mut a = WifiAdapter::new();
        assert_eq!(a.connect(), Err(ConnectivityError::NoCredentials));
    }

    #[test]
    fn connect_disconnect_roundtrip() {
        let mut a = WifiAdapter::new();
        a.set_credentials("TestNet", "password1").unwrap();
        a.connect().unwrap();
        assert!(a.is_connected());
        a.disconnect();
        assert!(!a.is_connected());
    }

    #[test]
    fn double_connect_fails() {
        let mut a = WifiAdapter::new();
        a.set_credentials("Net", "password1").unwrap();
        a.connect().unwrap();
        assert_eq!(a.connect(), Err(ConnectivityError::AlreadyConnected));
    }
}
