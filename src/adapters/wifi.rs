//! WiFi station-mode adapter.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`WifiStation`], the ESP-IDF WiFi driver
//!   via `esp_idf_svc::wifi::BlockingWifi`.
//! - **all targets**: credential validation and the reconnect backoff,
//!   both exercised by host tests.
//!
//! ## Reconnection policy
//!
//! On disconnect the supervisor waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) before retrying.

use core::fmt;

use crate::config::WifiConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(
                f,
                "password invalid (must be 8-64 bytes for WPA2, or empty for open)"
            ),
        }
    }
}

impl core::error::Error for ConnectivityError {}

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

/// Validated station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let mut creds = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        creds
            .ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(creds)
    }

    /// Credentials baked into the configuration; an empty SSID means none
    /// were provided at build time.
    pub fn from_config(config: &WifiConfig) -> Result<Self, ConnectivityError> {
        if config.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        Self::new(&config.ssid, &config.password)
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Backoff
// ───────────────────────────────────────────────────────────────

const MIN_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

/// Exponential reconnect delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    secs: u32,
}

impl Backoff {
    pub const fn new() -> Self {
        Self {
            secs: MIN_BACKOFF_SECS,
        }
    }

    /// Delay to wait now; doubles the next one.
    pub fn next_delay_secs(&mut self) -> u32 {
        let current = self.secs;
        self.secs = (self.secs * 2).min(MAX_BACKOFF_SECS);
        current
    }

    pub fn reset(&mut self) {
        self.secs = MIN_BACKOFF_SECS;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF station
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use station::WifiStation;

#[cfg(target_os = "espidf")]
mod station {
    use std::thread;
    use std::time::Duration;

    use anyhow::anyhow;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{info, warn};

    use super::{Backoff, WifiCredentials};

    const CONNECT_ATTEMPTS: u32 = 5;

    pub struct WifiStation {
        wifi: BlockingWifi<EspWifi<'static>>,
        backoff: Backoff,
    }

    impl WifiStation {
        /// Bring the station up and block until it has an IP address.
        pub fn connect(
            modem: Modem,
            sysloop: EspSystemEventLoop,
            nvs: EspDefaultNvsPartition,
            creds: &WifiCredentials,
        ) -> anyhow::Result<Self> {
            let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
            let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

            let auth_method = if creds.is_open() {
                AuthMethod::None
            } else {
                AuthMethod::WPAWPA2Personal
            };
            wifi.set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: creds
                    .ssid()
                    .try_into()
                    .map_err(|_| anyhow!("wifi ssid too long"))?,
                password: creds
                    .password()
                    .try_into()
                    .map_err(|_| anyhow!("wifi password too long"))?,
                auth_method,
                ..Default::default()
            }))?;
            wifi.start()?;
            info!("WiFi: connecting to '{}'", creds.ssid());

            let mut station = Self {
                wifi,
                backoff: Backoff::new(),
            };
            let mut last_err = None;
            for attempt in 1..=CONNECT_ATTEMPTS {
                match station.try_connect() {
                    Ok(()) => {
                        info!("WiFi: connected on attempt {}", attempt);
                        return Ok(station);
                    }
                    Err(e) => {
                        let delay = station.backoff.next_delay_secs();
                        warn!("WiFi: attempt {} failed ({:#}), retry in {}s", attempt, e, delay);
                        last_err = Some(e);
                        thread::sleep(Duration::from_secs(u64::from(delay)));
                    }
                }
            }
            Err(last_err.unwrap_or_else(|| anyhow!("wifi connect failed")))
        }

        pub fn is_connected(&self) -> bool {
            self.wifi.is_connected().unwrap_or(false)
        }

        /// Called periodically by the supervisor; reconnects with backoff
        /// when the link dropped.
        pub fn poll(&mut self) {
            if self.is_connected() {
                self.backoff.reset();
                return;
            }
            warn!("WiFi: connection lost, reconnecting");
            if let Err(e) = self.try_connect() {
                let delay = self.backoff.next_delay_secs();
                warn!("WiFi: reconnect failed ({:#}), retry in {}s", e, delay);
                thread::sleep(Duration::from_secs(u64::from(delay)));
            } else {
                info!("WiFi: reconnected");
                self.backoff.reset();
            }
        }

        fn try_connect(&mut self) -> anyhow::Result<()> {
            let _ = self.wifi.disconnect();
            self.wifi.connect()?;
            self.wifi.wait_netif_up()?;
            Ok(())
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
