//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable device ID in the form `OTA-XXYYZZ` (last 3 bytes of
//! the 6-byte MAC in uppercase hex). It prefixes the device's MQTT topics.

use core::fmt::Write;

/// Fixed-size device ID string: "OTA-XXYYZZ".
pub type DeviceIdString = heapless::String<16>;

/// MQTT client identifier: prefix plus random hex suffix.
pub type ClientIdString = heapless::String<48>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: `mac` is a valid 6-byte buffer, as the call requires.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Hardware random number for the client id suffix.
#[cfg(target_os = "espidf")]
pub fn random_u16() -> u16 {
    // SAFETY: esp_random has no preconditions.
    (unsafe { esp_idf_svc::sys::esp_random() } & 0xFFFF) as u16
}

/// Simulation: derive something that varies between runs.
#[cfg(not(target_os = "espidf"))]
pub fn random_u16() -> u16 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos & 0xFFFF) as u16
}

/// Derive the short device ID from the last 3 MAC bytes.
/// Format: `OTA-XXYYZZ` (e.g., `OTA-EFCAFE`).
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    let _ = write!(id, "OTA-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// Build a client id from `prefix` and a 16-bit random suffix, so two
/// boots of the same device never collide on the broker.  Over-long
/// prefixes are truncated to fit.
pub fn client_id(prefix: &str, suffix: u16) -> ClientIdString {
    let mut id = ClientIdString::new();
    for c in prefix.chars() {
        if id.capacity() - id.len() <= 4 || id.push(c).is_err() {
            break;
        }
    }
    let _ = write!(id, "{suffix:04x}");
    id
}
