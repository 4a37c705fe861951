//! System configuration parameters
//!
//! All tunable parameters for the OTA updater.  Network credentials are
//! baked in at build time from the `WIFI_SSID`, `WIFI_PASS`, `MQTT_URL`,
//! `MQTT_USER` and `MQTT_PASS` environment variables.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Largest image accepted by `start` unless overridden (4 MB).
pub const DEFAULT_MAX_FIRMWARE_SIZE: u32 = 4 * 1024 * 1024;

/// Largest payload accepted on the firmware-data topic (32 KiB).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 32 * 1024;

/// MQTT header/topic slack added on top of the largest chunk.
const MQTT_BUFFER_SLACK: usize = 200;

/// Topic names for the three logical channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    /// JSON control messages (`start` / `end` / `abort`).
    pub control: String,
    /// Raw firmware chunks.
    pub firmware: String,
    /// Outbound human-readable log lines.
    pub log: String,
}

impl TopicConfig {
    /// `<device_id>/ota/{control,firmware,log}`
    pub fn for_device(device_id: &str) -> Self {
        Self {
            control: format!("{device_id}/ota/control"),
            firmware: format!("{device_id}/ota/firmware"),
            log: format!("{device_id}/ota/log"),
        }
    }
}

/// Broker session parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// e.g. `mqtts://broker.example.com:8883`
    pub broker_url: String,
    /// A random hex suffix is appended per session.
    pub client_id_prefix: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Delay between reconnection attempts (milliseconds)
    pub reconnect_delay_ms: u32,
}

/// Station-mode WiFi credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

/// Core OTA configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtaConfig {
    pub topics: TopicConfig,

    // --- Limits ---
    /// Largest accepted firmware-data payload (bytes)
    pub max_chunk_size: usize,
    /// Largest image a `start` command may announce (bytes)
    pub max_firmware_size: u32,

    // --- Timing ---
    /// Pause between the success log and the reset, so the log line leaves
    /// the device (milliseconds)
    pub restart_delay_ms: u32,

    pub mqtt: MqttConfig,
    pub wifi: WifiConfig,
}

impl OtaConfig {
    /// Defaults with topics scoped to `device_id`.
    pub fn for_device(device_id: &str) -> Self {
        Self {
            topics: TopicConfig::for_device(device_id),
            ..Self::default()
        }
    }

    /// Receive buffer needed so a full chunk arrives in one MQTT event.
    pub fn mqtt_buffer_size(&self) -> usize {
        self.max_chunk_size + MQTT_BUFFER_SLACK
    }

    /// Reject configurations the updater cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.topics;
        if t.control.is_empty() || t.firmware.is_empty() || t.log.is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        if t.control == t.firmware || t.control == t.log || t.firmware == t.log {
            return Err(ConfigError::DuplicateTopic);
        }
        if self.max_chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if u32::try_from(self.max_chunk_size).map_or(true, |c| c > self.max_firmware_size) {
            return Err(ConfigError::ChunkLargerThanImage);
        }
        if self.mqtt.broker_url.is_empty() {
            return Err(ConfigError::MissingBrokerUrl);
        }
        Ok(())
    }
}

impl Default for OtaConfig {
    fn default() -> Self {
        Self {
            topics: TopicConfig::for_device("esp32"),

            // Limits
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_firmware_size: DEFAULT_MAX_FIRMWARE_SIZE,

            // Timing
            restart_delay_ms: 1000,

            mqtt: MqttConfig {
                broker_url: option_env!("MQTT_URL")
                    .unwrap_or("mqtts://localhost:8883")
                    .into(),
                client_id_prefix: "esp32-ota-client-".into(),
                username: option_env!("MQTT_USER").map(Into::into),
                password: option_env!("MQTT_PASS").map(Into::into),
                reconnect_delay_ms: 5000,
            },
            wifi: WifiConfig {
                ssid: build_env_string(option_env!("WIFI_SSID")),
                password: build_env_string(option_env!("WIFI_PASS")),
            },
        }
    }
}

/// Truncating copy into a fixed-capacity string; credential validation
/// happens in the WiFi adapter.
fn build_env_string<const N: usize>(value: Option<&str>) -> heapless::String<N> {
    let mut s = heapless::String::new();
    for c in value.unwrap_or_default().chars() {
        if s.push(c).is_err() {
            break;
        }
    }
    s
}

/// Errors from [`OtaConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    EmptyTopic,
    DuplicateTopic,
    ZeroChunkSize,
    ChunkLargerThanImage,
    MissingBrokerUrl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTopic => write!(f, "topic names must not be empty"),
            Self::DuplicateTopic => write!(f, "control, firmware and log topics must differ"),
            Self::ZeroChunkSize => write!(f, "max_chunk_size must be positive"),
            Self::ChunkLargerThanImage => {
                write!(f, "max_chunk_size must not exceed max_firmware_size")
            }
            Self::MissingBrokerUrl => write!(f, "broker URL is empty"),
        }
    }
}

impl core::error::Error for ConfigError {}
