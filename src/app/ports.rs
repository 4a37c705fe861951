//! Port traits: the hexagonal boundary between the OTA core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ OtaController (domain)
//! ```
//!
//! Driven adapters (flash partition, restart, log sinks, MQTT publisher)
//! implement these traits.  The [`OtaController`](super::controller::OtaController)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use core::fmt;

use crate::error::{SpaceError, VerifyError, WriteError};

// ───────────────────────────────────────────────────────────────
// Flash port (driven adapter: domain → update partition)
// ───────────────────────────────────────────────────────────────

/// Opens write transactions on the inactive update partition.
///
/// At most one transaction may be open.  The controller guarantees this by
/// holding the returned [`FlashTransaction`] by value and only calling
/// `begin` from `Idle`; implementations may additionally refuse a second
/// `begin` with [`SpaceError::Partition`].
pub trait FlashPort {
    type Transaction: FlashTransaction;

    /// Reserve and erase room for `total_size` bytes.
    fn begin(&mut self, total_size: u32) -> Result<Self::Transaction, SpaceError>;
}

/// An open, append-only write to the update partition.
///
/// Dropping a transaction without calling [`commit`](Self::commit) must
/// behave like [`abort`](Self::abort).
pub trait FlashTransaction {
    /// Append `data` after everything written so far.  Order of calls
    /// defines the image layout; there is no seek.
    fn write(&mut self, data: &[u8]) -> Result<(), WriteError>;

    /// Finalize, validate and mark the image bootable.
    fn commit(self) -> Result<(), VerifyError>;

    /// Discard everything written.  Always succeeds.
    fn abort(self);
}

// ───────────────────────────────────────────────────────────────
// Restart port (driven adapter: domain → SoC reset)
// ───────────────────────────────────────────────────────────────

/// Reboots into the freshly committed image.
///
/// On hardware this never returns; simulation adapters record the request.
pub trait RestartPort {
    fn request_restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / log topic)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`OtaEvent`](super::events::OtaEvent)s
/// through this port.  Adapters decide where they go (serial log, MQTT
/// log topic, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::OtaEvent);
}

// ───────────────────────────────────────────────────────────────
// Publisher port (driven adapter: sink → broker)
// ───────────────────────────────────────────────────────────────

/// Sends a UTF-8 line to a topic on the message broker.
pub trait LogPublisher {
    fn publish(&mut self, topic: &str, message: &str) -> Result<(), PublishError>;

    /// Publish a line that ends a transfer or rejects a command.
    /// Bounded publishers keep room for these when routine lines fill up.
    fn publish_outcome(&mut self, topic: &str, message: &str) -> Result<(), PublishError> {
        self.publish(topic, message)
    }
}

/// Errors from [`LogPublisher`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// No broker session is currently established.
    NotConnected,
    /// The client rejected the message (queue full, too large).
    Rejected,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "broker not connected"),
            Self::Rejected => write!(f, "publish rejected by client"),
        }
    }
}
