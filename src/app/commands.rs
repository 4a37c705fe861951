//! Inbound commands to the OTA controller.
//!
//! These are produced by the control-topic codec
//! ([`transport::codec`](crate::transport::codec)) and consumed
//! immediately by [`OtaController::handle_command`](super::controller::OtaController::handle_command).

/// SHA-256 digest announced by the sender.
pub type Digest = [u8; 32];

/// Lifecycle commands for a firmware transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaCommand {
    /// Open a transfer for an image of `size` bytes.
    Start { size: u32, sha256: Option<Digest> },

    /// All chunks sent; verify, commit and restart.
    End,

    /// Discard the current transfer.
    Abort,
}

impl OtaCommand {
    /// `start` without a digest.
    pub const fn start(size: u32) -> Self {
        Self::Start { size, sha256: None }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::End => "end",
            Self::Abort => "abort",
        }
    }
}
