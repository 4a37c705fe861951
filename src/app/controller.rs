//! OTA update state machine.
//!
//! Flow: `start` → N × chunk → `end` → restart
//!
//! ```text
//!            start (ok)                 end (commit ok) ─▶ restart
//!   ┌──────┐ ────────▶ ┌────────────┐ ──────────────────▶ ┌──────┐
//!   │ Idle │           │ InProgress │  end (fail) / abort │ Idle │
//!   └──────┘ ◀──────── └────────────┘ ──────────────────▶ └──────┘
//!            write failure / overflow
//! ```
//!
//! Every operation runs to completion against [`OtaState`] and the open
//! flash transaction before the next message is considered; callers must
//! serialise access (the controller is `&mut self` throughout).
//!
//! Transfer errors tear the transfer down: a failed write or a chunk that
//! would overrun the announced size aborts the flash transaction and
//! returns to `Idle`, so a half-written image can never be committed.

use hmac_sha256::Hash;
use log::{debug, info, warn};

use crate::config::DEFAULT_MAX_FIRMWARE_SIZE;
use crate::error::{self, OtaError};

use super::commands::{Digest, OtaCommand};
use super::events::OtaEvent;
use super::ports::{EventSink, FlashPort, FlashTransaction, RestartPort};
use super::state::OtaState;

/// What a handled message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do in the current state (e.g. a chunk while idle).
    Ignored,
    Started,
    Progress { received: u32, total: u32 },
    /// Image committed and restart requested.
    Committed,
    Aborted,
}

struct Session<T> {
    txn: T,
    hasher: Hash,
    expected_sha256: Option<Digest>,
}

/// The OTA controller owns the transfer state, the flash port and the
/// restart collaborator.
pub struct OtaController<F: FlashPort, R: RestartPort> {
    flash: F,
    restart: R,
    state: OtaState,
    session: Option<Session<F::Transaction>>,
    max_firmware_size: u32,
}

impl<F: FlashPort, R: RestartPort> OtaController<F, R> {
    pub fn new(flash: F, restart: R) -> Self {
        Self {
            flash,
            restart,
            state: OtaState::idle(),
            session: None,
            max_firmware_size: DEFAULT_MAX_FIRMWARE_SIZE,
        }
    }

    /// Reject `start` commands announcing more than `limit` bytes.
    #[must_use]
    pub fn with_max_firmware_size(mut self, limit: u32) -> Self {
        self.max_firmware_size = limit;
        self
    }

    pub fn state(&self) -> OtaState {
        self.state
    }

    /// Whether a flash transaction is currently held.
    pub fn has_open_transaction(&self) -> bool {
        self.session.is_some()
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn restart(&self) -> &R {
        &self.restart
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Apply a decoded control command.
    pub fn handle_command(
        &mut self,
        cmd: OtaCommand,
        sink: &mut impl EventSink,
    ) -> error::Result<Outcome> {
        match cmd {
            OtaCommand::Start { size, sha256 } => self.handle_start(size, sha256, sink),
            OtaCommand::End => self.handle_end(sink),
            OtaCommand::Abort => self.handle_abort(sink),
        }
    }

    // ── Operations ────────────────────────────────────────────

    /// Open a transfer of `size` bytes. Rejected while a transfer is open.
    pub fn handle_start(
        &mut self,
        size: u32,
        sha256: Option<Digest>,
        sink: &mut impl EventSink,
    ) -> error::Result<Outcome> {
        if self.state.is_in_progress() {
            return fail(sink, OtaError::AlreadyInProgress);
        }
        if size == 0 || size > self.max_firmware_size {
            return fail(sink, OtaError::InvalidSize(size));
        }

        let txn = match self.flash.begin(size) {
            Ok(txn) => txn,
            Err(e) => {
                warn!("OTA: flash begin failed: {:?}", e);
                return fail(sink, e.into());
            }
        };

        self.session = Some(Session {
            txn,
            hasher: Hash::new(),
            expected_sha256: sha256,
        });
        self.state = OtaState::started(size);
        info!(
            "OTA: begin ({} bytes, digest {})",
            size,
            if sha256.is_some() { "announced" } else { "none" }
        );
        sink.emit(&OtaEvent::Started { total_size: size });
        Ok(Outcome::Started)
    }

    /// Append one chunk to the open transaction. Ignored while idle.
    pub fn handle_chunk(
        &mut self,
        data: &[u8],
        sink: &mut impl EventSink,
    ) -> error::Result<Outcome> {
        if data.is_empty() {
            return Ok(Outcome::Ignored);
        }
        let Some(session) = self.session.as_mut() else {
            debug!("OTA: dropping {} byte chunk outside transfer", data.len());
            return Ok(Outcome::Ignored);
        };

        if !self.state.fits(data.len()) {
            let e = OtaError::Overflow {
                received: self.state.bytes_received(),
                chunk: u32::try_from(data.len()).unwrap_or(u32::MAX),
                total: self.state.total_size(),
            };
            self.teardown();
            return fail(sink, e);
        }

        if let Err(e) = session.txn.write(data) {
            warn!(
                "OTA: write failed at offset {}: {:?}",
                self.state.bytes_received(),
                e
            );
            self.teardown();
            return fail(sink, e.into());
        }
        session.hasher.update(data);

        // `fits` bounded the length by a u32 above.
        self.state.advance(data.len() as u32);
        let (received, total) = (self.state.bytes_received(), self.state.total_size());
        sink.emit(&OtaEvent::Progress { received, total });
        Ok(Outcome::Progress { received, total })
    }

    /// Verify and commit the image, then request a restart.
    pub fn handle_end(&mut self, sink: &mut impl EventSink) -> error::Result<Outcome> {
        let Some(Session {
            txn,
            hasher,
            expected_sha256,
        }) = self.session.take()
        else {
            return Ok(Outcome::Ignored);
        };
        let finished = self.state;
        self.state = OtaState::idle();

        if !finished.is_complete() {
            txn.abort();
            return fail(
                sink,
                OtaError::IncompleteImage {
                    received: finished.bytes_received(),
                    total: finished.total_size(),
                },
            );
        }

        if let Some(expected) = expected_sha256 {
            if hasher.finalize() != expected {
                txn.abort();
                return fail(sink, OtaError::DigestMismatch);
            }
        }

        if let Err(e) = txn.commit() {
            warn!("OTA: commit failed: {:?}", e);
            return fail(sink, e.into());
        }

        info!("OTA: committed {} bytes, restarting", finished.total_size());
        sink.emit(&OtaEvent::Completed {
            total_size: finished.total_size(),
        });
        self.restart.request_restart();
        Ok(Outcome::Committed)
    }

    /// Discard the open transfer. Ignored while idle.
    pub fn handle_abort(&mut self, sink: &mut impl EventSink) -> error::Result<Outcome> {
        if self.session.is_none() {
            return Ok(Outcome::Ignored);
        }
        self.teardown();
        warn!("OTA: aborted");
        sink.emit(&OtaEvent::Aborted);
        Ok(Outcome::Aborted)
    }

    // ── Internal ──────────────────────────────────────────────

    fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            session.txn.abort();
        }
        self.state = OtaState::idle();
    }
}

fn fail(sink: &mut impl EventSink, e: OtaError) -> error::Result<Outcome> {
    sink.emit(&OtaEvent::Failed(e));
    Err(e)
}

// ── Tests ─────────────────────────────────────────────────────
