//! Control-topic JSON codec.
//!
//! Wire format (UTF-8 JSON object, unknown fields ignored):
//! ```text
//! {"type": "start", "size": 1048576, "sha256": "<64 hex chars, optional>"}
//! {"type": "end"}
//! {"type": "abort"}
//! ```
//!
//! A `start` without `size` decodes to size 0, which the controller
//! rejects as an invalid size.

use core::fmt;

use serde::Deserialize;

use crate::app::commands::{Digest, OtaCommand};

#[derive(Deserialize)]
struct RawControl {
    #[serde(rename = "type")]
    kind: Option<String>,
    size: Option<serde_json::Value>,
    sha256: Option<String>,
}

/// Why a control payload was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not a JSON object (or not UTF-8).
    InvalidJson,
    /// No `type` field.
    MissingType,
    /// `type` is not one of `start`, `end`, `abort`.
    UnknownType,
    /// `size` is negative, fractional, non-numeric or above `u32::MAX`.
    InvalidSize,
    /// `sha256` is not 64 hex characters.
    InvalidDigest,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson => write!(f, "invalid JSON"),
            Self::MissingType => write!(f, "missing \"type\" field"),
            Self::UnknownType => write!(f, "unknown command type"),
            Self::InvalidSize => write!(f, "\"size\" must be a non-negative 32-bit integer"),
            Self::InvalidDigest => write!(f, "\"sha256\" must be 64 hex characters"),
        }
    }
}

impl core::error::Error for DecodeError {}

/// Decode one control-topic payload.
pub fn decode_command(payload: &[u8]) -> Result<OtaCommand, DecodeError> {
    let raw: RawControl =
        serde_json::from_slice(payload).map_err(|_| DecodeError::InvalidJson)?;

    match raw.kind.as_deref() {
        None => Err(DecodeError::MissingType),
        Some("start") => {
            let size = match raw.size {
                None => 0,
                Some(v) => v
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or(DecodeError::InvalidSize)?,
            };
            let sha256 = raw.sha256.as_deref().map(parse_digest).transpose()?;
            Ok(OtaCommand::Start { size, sha256 })
        }
        Some("end") => Ok(OtaCommand::End),
        Some("abort") => Ok(OtaCommand::Abort),
        Some(_) => Err(DecodeError::UnknownType),
    }
}

fn parse_digest(hex: &str) -> Result<Digest, DecodeError> {
    let bytes = hex.as_bytes();
    if bytes.len() != 64 {
        return Err(DecodeError::InvalidDigest);
    }
    let mut out = [0u8; 32];
    for (byte, pair) in out.iter_mut().zip(bytes.chunks_exact(2)) {
        *byte = (nibble(pair[0])? << 4) | nibble(pair[1])?;
    }
    Ok(out)
}

fn nibble(c: u8) -> Result<u8, DecodeError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(DecodeError::InvalidDigest),
    }
}
