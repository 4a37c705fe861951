//! Event sink adapters.
//!
//! [`LogEventSink`] writes OTA events to the ESP-IDF logger (UART /
//! USB-CDC).  [`TopicLogSink`] does the same and also publishes each
//! event's line on the MQTT log topic, so the deploy tool can follow a
//! transfer remotely.
//!
//! The worker never touches the MQTT client: lines go through
//! [`MailboxPublisher`] into [`OUTBOX`], which the publisher thread drains.
//! Per-chunk progress stays on serial.  The last [`OUTCOME_RESERVE`]
//! outbox slots only take outcome lines, so a lagging publisher loses
//! routine lines before it loses "OTA Success" or an `Error:` verdict.

use log::{log, warn};

use crate::app::events::OtaEvent;
use crate::app::ports::{EventSink, LogPublisher, PublishError};
use crate::transport::mailbox::Mailbox;

/// Adapter that logs every [`OtaEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &OtaEvent) {
        log!(event.level(), "OTA | {}", event);
    }
}

/// Serial log plus a copy on the broker's log topic.
pub struct TopicLogSink<P: LogPublisher> {
    serial: LogEventSink,
    publisher: P,
    topic: String,
}

impl<P: LogPublisher> TopicLogSink<P> {
    pub fn new(publisher: P, topic: impl Into<String>) -> Self {
        Self {
            serial: LogEventSink::new(),
            publisher,
            topic: topic.into(),
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

impl<P: LogPublisher> EventSink for TopicLogSink<P> {
    fn emit(&mut self, event: &OtaEvent) {
        self.serial.emit(event);
        let line = event.to_string();
        let sent = match event {
            OtaEvent::Progress { .. } => return,
            e if e.is_outcome() => self.publisher.publish_outcome(&self.topic, &line),
            _ => self.publisher.publish(&self.topic, &line),
        };
        if let Err(e) = sent {
            warn!("log topic: dropped line ({})", e);
        }
    }
}

// ── Outbox ────────────────────────────────────────────────────

/// Work for the MQTT publisher thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Session (re)established: subscribe to the OTA topics and announce
    /// the running firmware.
    Subscribe,
    /// Publish one log line.
    Line { topic: String, message: String },
}

pub const OUTBOX_DEPTH: usize = 8;

/// Outbox slots held back for outcome lines.
pub const OUTCOME_RESERVE: usize = 2;

/// Lines waiting for the publisher thread.
pub static OUTBOX: Mailbox<Outbound, OUTBOX_DEPTH> = Mailbox::new();

/// [`LogPublisher`] that hands lines to a mailbox without blocking.
pub struct MailboxPublisher<const N: usize> {
    outbox: &'static Mailbox<Outbound, N>,
}

impl<const N: usize> MailboxPublisher<N> {
    pub const fn new(outbox: &'static Mailbox<Outbound, N>) -> Self {
        Self { outbox }
    }

    fn post(&self, topic: &str, message: &str) -> Result<(), PublishError> {
        self.outbox
            .try_post(Outbound::Line {
                topic: topic.into(),
                message: message.into(),
            })
            .map_err(|_| PublishError::Rejected)
    }
}

impl<const N: usize> LogPublisher for MailboxPublisher<N> {
    fn publish(&mut self, topic: &str, message: &str) -> Result<(), PublishError> {
        if N.saturating_sub(self.outbox.len()) <= OUTCOME_RESERVE {
            return Err(PublishError::Rejected);
        }
        self.post(topic, message)
    }

    fn publish_outcome(&mut self, topic: &str, message: &str) -> Result<(), PublishError> {
        self.post(topic, message)
    }
}
