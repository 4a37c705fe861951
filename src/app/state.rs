//! Transfer progress record owned by the [`OtaController`](super::controller::OtaController).

/// Whether a transfer window is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OtaStatus {
    #[default]
    Idle,
    InProgress,
}

/// Progress of the current transfer.
///
/// Invariants kept by the constructors below:
/// - `Idle` implies `total_size == 0 && bytes_received == 0`.
/// - `bytes_received <= total_size` while `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OtaState {
    status: OtaStatus,
    total_size: u32,
    bytes_received: u32,
}

impl OtaState {
    pub const fn idle() -> Self {
        Self {
            status: OtaStatus::Idle,
            total_size: 0,
            bytes_received: 0,
        }
    }

    pub const fn started(total_size: u32) -> Self {
        Self {
            status: OtaStatus::InProgress,
            total_size,
            bytes_received: 0,
        }
    }

    pub fn status(&self) -> OtaStatus {
        self.status
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == OtaStatus::InProgress
    }

    pub fn total_size(&self) -> u32 {
        self.total_size
    }

    pub fn bytes_received(&self) -> u32 {
        self.bytes_received
    }

    /// Bytes still expected before the image is complete.
    pub fn remaining(&self) -> u32 {
        self.total_size - self.bytes_received
    }

    /// Whether `len` more bytes fit without passing `total_size`.
    pub fn fits(&self, len: usize) -> bool {
        u32::try_from(len).is_ok_and(|len| len <= self.remaining())
    }

    /// Record `len` accepted bytes. Callers must check [`fits`](Self::fits) first.
    pub(crate) fn advance(&mut self, len: u32) {
        debug_assert!(self.is_in_progress());
        debug_assert!(len <= self.remaining());
        self.bytes_received += len;
    }

    /// Progress in whole percent (0 when idle).
    pub fn percent(&self) -> u8 {
        if self.total_size == 0 {
            return 0;
        }
        (u64::from(self.bytes_received) * 100 / u64::from(self.total_size)) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.is_in_progress() && self.bytes_received == self.total_size
    }
}
