//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                   |
//! |-------------|--------------------|-------------------------------|
//! | `flash`     | FlashPort          | esp-ota partition / RAM       |
//! | `system`    | RestartPort        | SoC reset / recorder          |
//! | `log_sink`  | EventSink          | Serial log, MQTT log topic    |
//! |             | LogPublisher       | Outbox → `mqtt-tx` thread     |
//! | `mqtt`      | (threads)          | ESP-IDF MQTT client           |
//! | `wifi`      | (station)          | ESP-IDF WiFi STA              |
//! | `device_id` | (helpers)          | eFuse MAC, hardware RNG       |

pub mod device_id;
pub mod flash;
pub mod log_sink;
#[cfg(target_os = "espidf")]
pub mod mqtt;
pub mod system;
pub mod wifi;
