//! MQTT broker adapter (ESP-IDF only).
//!
//! Two threads share the broker session:
//!
//! - `mqtt-rx` pumps [`EspMqttConnection`], reassembles fragmented
//!   payloads and posts whole messages to [`INBOX`].  On every
//!   (re)connect it asks the publisher to subscribe.
//! - `mqtt-tx` owns [`EspMqttClient`] and drains [`OUTBOX`]: subscribe
//!   requests, the ready banner and log lines.
//!
//! The receive thread never calls into the client.  esp-mqtt holds its
//! internal lock while an event is being consumed, so a client call from
//! the event pump could wait on itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use log::{debug, info, warn};

use crate::app::events::OtaEvent;
use crate::app::ports::EventSink;
use crate::config::{OtaConfig, TopicConfig};
use crate::transport::mailbox::INBOX;
use crate::transport::reassembly::{Assembled, Fragment, Reassembler};
use crate::FIRMWARE_VERSION;

use super::log_sink::{MailboxPublisher, OUTBOX, Outbound, TopicLogSink};

const RX_STACK_SIZE: usize = 8 * 1024;
const TX_STACK_SIZE: usize = 6 * 1024;
const OUT_BUFFER_SIZE: usize = 1024;

/// Set when a subscribe request could not be queued.
static SUBSCRIBE_PENDING: AtomicBool = AtomicBool::new(false);

/// Create the client and start both threads.  The client connects (and
/// later reconnects) in the background.
pub fn start(config: &OtaConfig, client_id: &str) -> anyhow::Result<()> {
    let (client, conn) = create_client(config, client_id)?;
    spawn_receiver(conn, config)?;
    spawn_publisher(client, config.topics.clone())?;
    info!(
        "mqtt: client '{}' started for {}",
        client_id, config.mqtt.broker_url
    );
    Ok(())
}

fn create_client(
    config: &OtaConfig,
    client_id: &str,
) -> anyhow::Result<(EspMqttClient<'static>, EspMqttConnection)> {
    let conf = MqttClientConfiguration {
        client_id: Some(client_id),
        username: config.mqtt.username.as_deref(),
        password: config.mqtt.password.as_deref(),
        buffer_size: config.mqtt_buffer_size(),
        out_buffer_size: OUT_BUFFER_SIZE,
        reconnect_timeout: Some(Duration::from_millis(u64::from(
            config.mqtt.reconnect_delay_ms,
        ))),
        crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
        ..Default::default()
    };
    EspMqttClient::new(&config.mqtt.broker_url, &conf).context("creating MQTT client")
}

// ── Receive side ──────────────────────────────────────────────

fn spawn_receiver(mut conn: EspMqttConnection, config: &OtaConfig) -> anyhow::Result<()> {
    let limit = config.max_chunk_size;
    let topics = config.topics.clone();
    thread::Builder::new()
        .name("mqtt-rx".into())
        .stack_size(RX_STACK_SIZE)
        .spawn(move || {
            let mut reassembler = Reassembler::new(limit);
            while let Ok(event) = conn.next() {
                match event.payload() {
                    EventPayload::Connected(_) => {
                        info!("mqtt: connected");
                        request_subscribe();
                    }
                    EventPayload::Disconnected => {
                        warn!("mqtt: disconnected, client will reconnect");
                    }
                    EventPayload::Received {
                        topic,
                        data,
                        details,
                        ..
                    } => {
                        let fragment = match details {
                            Details::Complete => Fragment::Complete,
                            Details::InitialChunk(c) => Fragment::Initial {
                                total: c.total_data_size,
                            },
                            Details::SubsequentChunk(c) => Fragment::Subsequent {
                                offset: c.current_data_offset,
                                total: c.total_data_size,
                            },
                        };
                        match reassembler.push(topic, data, fragment) {
                            Some(Assembled::Message(msg)) => INBOX.post(msg),
                            Some(Assembled::Oversized { topic, len }) => {
                                report_oversized(&topics, &topic, len, limit);
                            }
                            None => {}
                        }
                    }
                    EventPayload::Error(e) => warn!("mqtt: {:?}", e),
                    _ => {}
                }
            }
            warn!("mqtt: connection closed, receive loop exiting");
        })
        .context("spawning mqtt-rx")?;
    Ok(())
}

fn request_subscribe() {
    if OUTBOX.try_post(Outbound::Subscribe).is_err() {
        SUBSCRIBE_PENDING.store(true, Ordering::Release);
    }
}

/// Firmware chunks too large to buffer never reach the router, so the
/// rejection line is sent from here.
fn report_oversized(topics: &TopicConfig, topic: &str, len: usize, max: usize) {
    if topic != topics.firmware {
        debug!("mqtt: dropped {}-byte message on '{}'", len, topic);
        return;
    }
    let mut sink = TopicLogSink::new(MailboxPublisher::new(&OUTBOX), topics.log.clone());
    sink.emit(&OtaEvent::ChunkTooLarge { len, max });
}

// ── Transmit side ─────────────────────────────────────────────

fn spawn_publisher(mut client: EspMqttClient<'static>, topics: TopicConfig) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("mqtt-tx".into())
        .stack_size(TX_STACK_SIZE)
        .spawn(move || {
            loop {
                let item = OUTBOX.next();
                handle_outbound(&mut client, &topics, item);
                if SUBSCRIBE_PENDING.swap(false, Ordering::AcqRel) {
                    handle_outbound(&mut client, &topics, Outbound::Subscribe);
                }
            }
        })
        .context("spawning mqtt-tx")?;
    Ok(())
}

fn handle_outbound(client: &mut EspMqttClient<'static>, topics: &TopicConfig, item: Outbound) {
    match item {
        Outbound::Subscribe => {
            for topic in [&topics.control, &topics.firmware] {
                match client.subscribe(topic, QoS::AtLeastOnce) {
                    Ok(_) => info!("mqtt: subscribed to '{}'", topic),
                    Err(e) => warn!("mqtt: subscribe to '{}' failed: {:?}", topic, e),
                }
            }
            let banner = OtaEvent::Ready {
                version: FIRMWARE_VERSION,
            }
            .to_string();
            info!("{}", banner);
            publish(client, &topics.log, &banner);
        }
        Outbound::Line { topic, message } => publish(client, &topic, &message),
    }
}

fn publish(client: &mut EspMqttClient<'static>, topic: &str, message: &str) {
    if let Err(e) = client.publish(topic, QoS::AtMostOnce, false, message.as_bytes()) {
        debug!("mqtt: publish to '{}' failed: {:?}", topic, e);
    }
}
