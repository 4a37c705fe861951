//! Error types for the OTA updater.
//!
//! The flash primitive reports three narrow failures ([`SpaceError`],
//! [`WriteError`], [`VerifyError`]); the controller funnels them, together
//! with its own protocol checks, into [`OtaError`].  Every variant maps to
//! one [`ErrorKind`] so adapters can decide how loudly to report it.
//! All types are `Copy` and carry no heap data.

use core::fmt;

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-order input from the sender.  No state mutation.
    Protocol,
    /// Flash could not reserve room for the image.  No state mutation.
    Resource,
    /// A chunk could not be written (write failure or overrun).  The
    /// transfer is aborted.
    Transfer,
    /// The finished image failed validation.  The image is discarded.
    Integrity,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol => write!(f, "protocol"),
            Self::Resource => write!(f, "resource"),
            Self::Transfer => write!(f, "transfer"),
            Self::Integrity => write!(f, "integrity"),
        }
    }
}

// ---------------------------------------------------------------------------
// Flash primitive errors
// ---------------------------------------------------------------------------

/// `begin` could not open a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceError {
    /// The update partition is smaller than the requested image.
    InsufficientSpace { requested: u32, available: u32 },
    /// No inactive OTA partition exists (bad partition scheme).
    NoPartition,
    /// The partition could not be erased or opened.
    Partition,
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientSpace {
                requested,
                available,
            } => write!(
                f,
                "image of {} bytes does not fit in {} byte partition",
                requested, available
            ),
            Self::NoPartition => write!(f, "no inactive OTA partition available"),
            Self::Partition => write!(f, "OTA partition could not be opened"),
        }
    }
}

/// `write` failed; the partition contents are now undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    /// The flash driver rejected the write.
    Flash,
    /// The write would run past the reserved region.
    OutOfSpace,
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flash => write!(f, "flash write failed"),
            Self::OutOfSpace => write!(f, "write past end of partition"),
        }
    }
}

/// `commit` rejected the written image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    /// Image header or checksum validation failed.
    InvalidImage,
    /// The image validated but could not be made bootable.
    BootSetFailed,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidImage => write!(f, "image verification failed"),
            Self::BootSetFailed => write!(f, "set boot partition failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Controller error
// ---------------------------------------------------------------------------

/// Every rejected or failed controller operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    /// `start` arrived while a transfer is open.
    AlreadyInProgress,
    /// `start` carried a size of zero or above the configured limit.
    InvalidSize(u32),
    /// The flash transaction could not be opened.
    Space(SpaceError),
    /// A chunk would push the received count past the declared size.
    Overflow { received: u32, chunk: u32, total: u32 },
    /// A chunk write failed.
    Write(WriteError),
    /// `end` arrived before every declared byte was written.
    IncompleteImage { received: u32, total: u32 },
    /// The SHA-256 of the received bytes does not match the announced one.
    DigestMismatch,
    /// Commit rejected the image.
    Verify(VerifyError),
}

impl OtaError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyInProgress | Self::InvalidSize(_) => ErrorKind::Protocol,
            Self::Space(_) => ErrorKind::Resource,
            Self::Overflow { .. } | Self::Write(_) => ErrorKind::Transfer,
            Self::IncompleteImage { .. } | Self::DigestMismatch | Self::Verify(_) => {
                ErrorKind::Integrity
            }
        }
    }
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInProgress => write!(f, "OTA already in progress"),
            Self::InvalidSize(size) => write!(f, "invalid firmware size ({size})"),
            Self::Space(e) => write!(f, "not enough space for OTA: {e}"),
            Self::Overflow {
                received,
                chunk,
                total,
            } => write!(
                f,
                "chunk of {chunk} bytes overflows image ({received}/{total} received)"
            ),
            Self::Write(e) => write!(f, "{e}"),
            Self::IncompleteImage { received, total } => {
                write!(f, "image incomplete ({received}/{total} bytes)")
            }
            Self::DigestMismatch => write!(f, "SHA-256 digest mismatch"),
            Self::Verify(e) => write!(f, "{e}"),
        }
    }
}

impl From<SpaceError> for OtaError {
    fn from(e: SpaceError) -> Self {
        Self::Space(e)
    }
}

impl From<WriteError> for OtaError {
    fn from(e: WriteError) -> Self {
        Self::Write(e)
    }
}

impl From<VerifyError> for OtaError {
    fn from(e: VerifyError) -> Self {
        Self::Verify(e)
    }
}

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, OtaError>;
