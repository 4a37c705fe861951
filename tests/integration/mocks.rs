//! Recording adapters for integration tests.
//!
//! Capture every event and published line so tests can assert on the
//! full history an operator would see on the log topic.

use mqtt_ota::adapters::flash::MemoryFlash;
use mqtt_ota::adapters::system::SimRestart;
use mqtt_ota::app::controller::OtaController;
use mqtt_ota::app::events::OtaEvent;
use mqtt_ota::app::ports::{EventSink, LogPublisher, PublishError};

pub type TestController = OtaController<MemoryFlash, SimRestart>;

/// Controller over a fresh partition of `capacity` bytes.
pub fn controller(capacity: u32) -> TestController {
    OtaController::new(MemoryFlash::new(capacity), SimRestart::new())
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<OtaEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&OtaEvent> {
        self.events.last()
    }

    /// Rendered log-topic lines.
    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }

    pub fn errors(&self) -> usize {
        self.events.iter().filter(|e| e.is_error()).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &OtaEvent) {
        self.events.push(*event);
    }
}

// ── RecordingPublisher ────────────────────────────────────────

/// Broker stand-in; can be switched offline.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Vec<(String, String)>,
    pub offline: bool,
}

impl LogPublisher for RecordingPublisher {
    fn publish(&mut self, topic: &str, message: &str) -> Result<(), PublishError> {
        if self.offline {
            return Err(PublishError::NotConnected);
        }
        self.published.push((topic.into(), message.into()));
        Ok(())
    }
}
