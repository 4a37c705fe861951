//! Update-partition adapters.
//!
//! Implements [`FlashPort`] twice:
//!
//! - **`target_os = "espidf"`**: [`EspOtaFlash`], backed by the `esp-ota`
//!   crate (safe wrapper around the ESP-IDF OTA partition API).
//! - **all targets**: [`MemoryFlash`], an in-RAM partition used by host
//!   simulation and tests, with deterministic fault injection.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, warn};

use crate::app::ports::{FlashPort, FlashTransaction};
use crate::error::{SpaceError, VerifyError, WriteError};

// ───────────────────────────────────────────────────────────────
// ESP-IDF backend
// ───────────────────────────────────────────────────────────────

/// The inactive OTA app partition, written through `esp-ota`.
#[cfg(target_os = "espidf")]
#[derive(Default)]
pub struct EspOtaFlash;

#[cfg(target_os = "espidf")]
impl EspOtaFlash {
    pub fn new() -> Self {
        Self
    }

    /// Size of the partition the next update would be written to.
    fn next_partition_size() -> Result<u32, SpaceError> {
        // SAFETY: read-only query of the static partition table; a null
        // `start_from` means "after the running partition".
        let part = unsafe { esp_idf_sys::esp_ota_get_next_update_partition(core::ptr::null()) };
        if part.is_null() {
            return Err(SpaceError::NoPartition);
        }
        // SAFETY: non-null pointers returned above point into the
        // partition table, which lives for the whole program.
        Ok(unsafe { (*part).size })
    }
}

#[cfg(target_os = "espidf")]
impl FlashPort for EspOtaFlash {
    type Transaction = EspOtaTransaction;

    fn begin(&mut self, total_size: u32) -> Result<EspOtaTransaction, SpaceError> {
        let available = Self::next_partition_size()?;
        if total_size > available {
            return Err(SpaceError::InsufficientSpace {
                requested: total_size,
                available,
            });
        }
        let update = esp_ota::OtaUpdate::begin().map_err(|e| {
            warn!("esp-ota begin failed: {:?}", e);
            SpaceError::Partition
        })?;
        Ok(EspOtaTransaction { update })
    }
}

#[cfg(target_os = "espidf")]
pub struct EspOtaTransaction {
    update: esp_ota::OtaUpdate,
}

#[cfg(target_os = "espidf")]
impl FlashTransaction for EspOtaTransaction {
    fn write(&mut self, data: &[u8]) -> Result<(), WriteError> {
        self.update.write(data).map_err(|e| {
            warn!("esp-ota write failed: {:?}", e);
            WriteError::Flash
        })
    }

    fn commit(self) -> Result<(), VerifyError> {
        let mut completed = self.update.finalize().map_err(|e| {
            warn!("esp-ota finalize failed: {:?}", e);
            VerifyError::InvalidImage
        })?;
        completed.set_as_boot_partition().map_err(|e| {
            warn!("esp-ota set_as_boot_partition failed: {:?}", e);
            VerifyError::BootSetFailed
        })
    }

    fn abort(self) {
        // esp-ota aborts automatically when OtaUpdate is dropped
        drop(self.update);
    }
}

// ───────────────────────────────────────────────────────────────
// In-memory backend
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Partition {
    capacity: u32,
    reserved: u32,
    staged: Vec<u8>,
    committed: Option<Vec<u8>>,
    open: bool,

    begin_count: usize,
    write_count: usize,
    commit_count: usize,
    abort_count: usize,

    fail_begin: Option<SpaceError>,
    fail_write_after: Option<usize>,
    fail_commit: bool,
}

impl Partition {
    fn discard(&mut self) {
        self.open = false;
        self.staged.clear();
        self.reserved = 0;
    }
}

/// RAM-backed update partition.
///
/// Cloning shares the same partition, so a test can keep a handle for
/// inspection while the controller owns another.
#[derive(Debug, Clone)]
pub struct MemoryFlash {
    part: Rc<RefCell<Partition>>,
}

impl MemoryFlash {
    pub fn new(capacity: u32) -> Self {
        Self {
            part: Rc::new(RefCell::new(Partition {
                capacity,
                ..Partition::default()
            })),
        }
    }

    // ── Fault injection ───────────────────────────────────────

    /// Make every `begin` fail with `err`.
    #[must_use]
    pub fn fail_begin(self, err: SpaceError) -> Self {
        self.part.borrow_mut().fail_begin = Some(err);
        self
    }

    /// Let `n` writes succeed, then fail every following write.
    #[must_use]
    pub fn fail_write_after(self, n: usize) -> Self {
        self.part.borrow_mut().fail_write_after = Some(n);
        self
    }

    /// Make `commit` reject the image.
    #[must_use]
    pub fn fail_commit(self) -> Self {
        self.part.borrow_mut().fail_commit = true;
        self
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn capacity(&self) -> u32 {
        self.part.borrow().capacity
    }

    pub fn is_open(&self) -> bool {
        self.part.borrow().open
    }

    /// Bytes written to the open (or last discarded) transaction.
    pub fn staged(&self) -> Vec<u8> {
        self.part.borrow().staged.clone()
    }

    /// The last committed image.
    pub fn committed(&self) -> Option<Vec<u8>> {
        self.part.borrow().committed.clone()
    }

    pub fn begin_count(&self) -> usize {
        self.part.borrow().begin_count
    }

    /// Successful writes across all transactions.
    pub fn write_count(&self) -> usize {
        self.part.borrow().write_count
    }

    pub fn commit_count(&self) -> usize {
        self.part.borrow().commit_count
    }

    pub fn abort_count(&self) -> usize {
        self.part.borrow().abort_count
    }
}

impl FlashPort for MemoryFlash {
    type Transaction = MemoryTransaction;

    fn begin(&mut self, total_size: u32) -> Result<MemoryTransaction, SpaceError> {
        let mut p = self.part.borrow_mut();
        if p.open {
            return Err(SpaceError::Partition);
        }
        if let Some(err) = p.fail_begin {
            return Err(err);
        }
        if total_size > p.capacity {
            return Err(SpaceError::InsufficientSpace {
                requested: total_size,
                available: p.capacity,
            });
        }
        p.staged.clear();
        p.reserved = total_size;
        p.open = true;
        p.begin_count += 1;
        debug!("flash(sim): reserved {} bytes", total_size);
        Ok(MemoryTransaction {
            part: Rc::clone(&self.part),
            closed: false,
        })
    }
}

/// Open transaction on a [`MemoryFlash`].
#[derive(Debug)]
pub struct MemoryTransaction {
    part: Rc<RefCell<Partition>>,
    closed: bool,
}

impl MemoryTransaction {
    fn close_discarding(&mut self) {
        if !self.closed {
            self.closed = true;
            let mut p = self.part.borrow_mut();
            p.discard();
            p.abort_count += 1;
        }
    }
}

impl FlashTransaction for MemoryTransaction {
    fn write(&mut self, data: &[u8]) -> Result<(), WriteError> {
        let mut p = self.part.borrow_mut();
        if p.fail_write_after.is_some_and(|n| p.write_count >= n) {
            return Err(WriteError::Flash);
        }
        if p.staged.len() + data.len() > p.reserved as usize {
            return Err(WriteError::OutOfSpace);
        }
        p.staged.extend_from_slice(data);
        p.write_count += 1;
        Ok(())
    }

    fn commit(mut self) -> Result<(), VerifyError> {
        self.closed = true;
        let mut p = self.part.borrow_mut();
        if p.fail_commit || p.staged.len() != p.reserved as usize {
            p.discard();
            return Err(VerifyError::InvalidImage);
        }
        p.open = false;
        p.committed = Some(core::mem::take(&mut p.staged));
        p.reserved = 0;
        p.commit_count += 1;
        Ok(())
    }

    fn abort(mut self) {
        self.close_discarding();
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.close_discarding();
    }
}
