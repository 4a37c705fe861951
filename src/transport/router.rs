//! Topic router: the single entry point for inbound broker messages.
//!
//! The router classifies a `(topic, payload)` pair and hands it to the
//! matching controller operation.  It keeps no transfer state of its own;
//! the only thing it knows is the configured topic names and chunk limit.

use log::{debug, warn};

use crate::app::controller::OtaController;
use crate::app::events::OtaEvent;
use crate::app::ports::{EventSink, FlashPort, RestartPort};
use crate::config::OtaConfig;

use super::codec::decode_command;

/// Which path a message took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Control,
    Firmware,
    /// Not one of ours.
    Ignored,
}

pub struct MessageRouter {
    control_topic: String,
    firmware_topic: String,
    max_chunk_size: usize,
}

impl MessageRouter {
    pub fn new(config: &OtaConfig) -> Self {
        Self {
            control_topic: config.topics.control.clone(),
            firmware_topic: config.topics.firmware.clone(),
            max_chunk_size: config.max_chunk_size,
        }
    }

    pub fn classify(&self, topic: &str) -> Route {
        if topic == self.control_topic {
            Route::Control
        } else if topic == self.firmware_topic {
            Route::Firmware
        } else {
            Route::Ignored
        }
    }

    /// Classify and dispatch one message.
    ///
    /// Failures are reported through `sink` by the controller (or here, for
    /// decode and size errors); nothing propagates to the caller.
    pub fn dispatch<F: FlashPort, R: RestartPort>(
        &self,
        topic: &str,
        payload: &[u8],
        ota: &mut OtaController<F, R>,
        sink: &mut impl EventSink,
    ) -> Route {
        let route = self.classify(topic);
        match route {
            Route::Control => match decode_command(payload) {
                Ok(cmd) => {
                    debug!("router: control '{}'", cmd.name());
                    if let Err(e) = ota.handle_command(cmd, sink) {
                        debug!("router: '{}' rejected ({} error)", cmd.name(), e.kind());
                    }
                }
                Err(e) => {
                    warn!("router: malformed control message: {}", e);
                    sink.emit(&OtaEvent::MalformedCommand(e));
                }
            },
            Route::Firmware => {
                if payload.len() > self.max_chunk_size {
                    sink.emit(&OtaEvent::ChunkTooLarge {
                        len: payload.len(),
                        max: self.max_chunk_size,
                    });
                } else if let Err(e) = ota.handle_chunk(payload, sink) {
                    debug!("router: chunk rejected ({} error)", e.kind());
                }
            }
            Route::Ignored => {
                debug!("router: ignoring message on '{}'", topic);
            }
        }
        route
    }
}
