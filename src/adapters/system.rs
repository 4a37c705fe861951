//! SoC-level collaborators: restart and boot validation.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::RestartPort;

// ── Restart ───────────────────────────────────────────────────

/// Reboots the chip after a short grace period so the final log line
/// can leave the outbox.
#[cfg(target_os = "espidf")]
pub struct EspRestart {
    delay_ms: u32,
}

#[cfg(target_os = "espidf")]
impl EspRestart {
    pub fn new(delay_ms: u32) -> Self {
        Self { delay_ms }
    }
}

#[cfg(target_os = "espidf")]
impl RestartPort for EspRestart {
    fn request_restart(&mut self) {
        info!("OTA: rebooting into new firmware in {} ms", self.delay_ms);
        std::thread::sleep(std::time::Duration::from_millis(u64::from(self.delay_ms)));
        esp_ota::restart();
    }
}

/// Simulation: records the request instead of resetting.
#[derive(Debug, Default)]
pub struct SimRestart {
    requested: bool,
}

impl SimRestart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> bool {
        self.requested
    }
}

impl RestartPort for SimRestart {
    fn request_restart(&mut self) {
        info!("OTA restart (simulation): no hardware reset");
        self.requested = true;
    }
}

// ── Boot validation ───────────────────────────────────────────

/// Mark the running image valid.
///
/// Without this, the bootloader rolls back to the previous firmware on
/// the next reset when rollback is enabled.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!("OTA: firmware marked valid (rollback cancelled)"),
        Err(e) => warn!("OTA: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    info!("OTA rollback check (simulation): skipped");
}
