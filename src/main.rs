//! MQTT OTA updater: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                       │
//! │                                                                  │
//! │  WifiStation   mqtt-rx / mqtt-tx   EspOtaFlash   EspRestart      │
//! │  (STA link)    (broker session)    (FlashPort)   (RestartPort)   │
//! │                                                                  │
//! │  ──────────────── INBOX / OUTBOX mailboxes ────────────────      │
//! │                                                                  │
//! │  ┌────────────────────────────────────────────────────────┐      │
//! │  │  ota-worker: MessageRouter → OtaController (pure logic) │      │
//! │  └────────────────────────────────────────────────────────┘      │
//! │                                                                  │
//! │  main thread: WiFi supervision                                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::info;

use mqtt_ota::FIRMWARE_VERSION;
use mqtt_ota::adapters::device_id;
use mqtt_ota::adapters::flash::EspOtaFlash;
use mqtt_ota::adapters::log_sink::{MailboxPublisher, OUTBOX, TopicLogSink};
use mqtt_ota::adapters::mqtt;
use mqtt_ota::adapters::system::{EspRestart, check_rollback};
use mqtt_ota::adapters::wifi::{WifiCredentials, WifiStation};
use mqtt_ota::app::controller::OtaController;
use mqtt_ota::config::OtaConfig;
use mqtt_ota::transport::mailbox::INBOX;
use mqtt_ota::transport::router::MessageRouter;

const WORKER_STACK_SIZE: usize = 12 * 1024;
const WIFI_POLL_INTERVAL: Duration = Duration::from_secs(5);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  MQTT OTA v{}                        ║", FIRMWARE_VERSION);
    info!("╚══════════════════════════════════════╝");

    // ── 1b. Keep the image we just booted ─────────────────────
    check_rollback();

    // ── 2. Identity + configuration ───────────────────────────
    let id = device_id::device_id(&device_id::read_mac());
    let config = OtaConfig::for_device(&id);
    config.validate().context("invalid configuration")?;
    info!(
        "Device {}: control='{}' firmware='{}' log='{}'",
        id, config.topics.control, config.topics.firmware, config.topics.log
    );

    // ── 3. WiFi ───────────────────────────────────────────────
    let creds = WifiCredentials::from_config(&config.wifi)?;
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = WifiStation::connect(peripherals.modem, sysloop, nvs, &creds)?;

    // ── 4. OTA worker ─────────────────────────────────────────
    spawn_worker(&config)?;

    // ── 5. MQTT session ───────────────────────────────────────
    let client_id = device_id::client_id(&config.mqtt.client_id_prefix, device_id::random_u16());
    mqtt::start(&config, &client_id)?;

    // ── 6. Supervise the link ─────────────────────────────────
    loop {
        thread::sleep(WIFI_POLL_INTERVAL);
        wifi.poll();
    }
}

/// The worker is the only owner of the controller: messages are handled
/// one at a time, in arrival order.
fn spawn_worker(config: &OtaConfig) -> Result<()> {
    let router = MessageRouter::new(config);
    let mut sink = TopicLogSink::new(MailboxPublisher::new(&OUTBOX), config.topics.log.clone());
    let restart_delay_ms = config.restart_delay_ms;
    let max_firmware_size = config.max_firmware_size;

    thread::Builder::new()
        .name("ota-worker".into())
        .stack_size(WORKER_STACK_SIZE)
        .spawn(move || {
            let mut ota = OtaController::new(EspOtaFlash::new(), EspRestart::new(restart_delay_ms))
                .with_max_firmware_size(max_firmware_size);
            loop {
                let msg = INBOX.next();
                router.dispatch(&msg.topic, &msg.payload, &mut ota, &mut sink);
            }
        })
        .context("spawning ota-worker")?;
    Ok(())
}
