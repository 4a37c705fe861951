//! Outbound log events.
//!
//! The controller and router emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish on the
//! MQTT log topic, or both.  `Display` renders the human-readable line
//! that goes out on the log topic; error lines start with `Error:` so the
//! deploy tool can spot failures.

use core::fmt;

use crate::error::{ErrorKind, OtaError};
use crate::transport::codec::DecodeError;

/// Structured events emitted by the OTA core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaEvent {
    /// Broker session (re)established; announces the running firmware.
    Ready { version: &'static str },

    /// A transfer was opened.
    Started { total_size: u32 },

    /// A chunk was written.
    Progress { received: u32, total: u32 },

    /// The image was committed; a restart follows.
    Completed { total_size: u32 },

    /// The sender aborted the transfer.
    Aborted,

    /// An operation was rejected or failed.  The error's kind tells
    /// whether the transfer survived (protocol/resource) or was torn down
    /// (transfer/integrity).
    Failed(OtaError),

    /// A control payload could not be decoded.
    MalformedCommand(DecodeError),

    /// A data payload exceeded the configured chunk limit and was dropped.
    ChunkTooLarge { len: usize, max: usize },
}

impl OtaEvent {
    /// Serial log level for this event.
    pub fn level(&self) -> log::Level {
        match self {
            Self::Progress { .. } => log::Level::Debug,
            Self::Ready { .. } | Self::Started { .. } | Self::Completed { .. } => {
                log::Level::Info
            }
            Self::Aborted | Self::MalformedCommand(_) | Self::ChunkTooLarge { .. } => {
                log::Level::Warn
            }
            Self::Failed(e) => match e.kind() {
                ErrorKind::Protocol => log::Level::Warn,
                ErrorKind::Resource | ErrorKind::Transfer | ErrorKind::Integrity => {
                    log::Level::Error
                }
            },
        }
    }

    /// Lines that close a transfer or reject a command.  The deploy tool
    /// waits for one of these, so they must reach the log topic.
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Aborted | Self::Failed(_) | Self::MalformedCommand(_)
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Failed(_) | Self::MalformedCommand(_) | Self::ChunkTooLarge { .. }
        )
    }
}

impl fmt::Display for OtaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready { version } => write!(f, "Device ready. Firmware v{version}"),
            Self::Started { total_size } => {
                write!(f, "OTA started, total size = {total_size}")
            }
            Self::Progress { received, total } => {
                write!(f, "Received chunk. Total: {received} / {total}")
            }
            Self::Completed { total_size } => {
                write!(f, "OTA Success: update successful ({total_size} bytes). Rebooting...")
            }
            Self::Aborted => write!(f, "OTA aborted"),
            Self::Failed(e) => match e.kind() {
                ErrorKind::Protocol | ErrorKind::Resource => write!(f, "Error: {e}"),
                ErrorKind::Transfer => write!(f, "Error: {e}. Transfer aborted."),
                ErrorKind::Integrity => {
                    write!(f, "Error: verification failed, {e}. Image discarded.")
                }
            },
            Self::MalformedCommand(e) => write!(f, "Error: malformed control message ({e})"),
            Self::ChunkTooLarge { len, max } => {
                write!(f, "Error: chunk of {len} bytes exceeds limit of {max}")
            }
        }
    }
}
