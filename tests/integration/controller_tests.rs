//! End-to-end transfer scenarios against `OtaController` with the
//! in-memory partition.

use mqtt_ota::adapters::flash::MemoryFlash;
use mqtt_ota::adapters::system::SimRestart;
use mqtt_ota::app::controller::{OtaController, Outcome};
use mqtt_ota::app::events::OtaEvent;
use mqtt_ota::app::state::{OtaState, OtaStatus};
use mqtt_ota::error::{ErrorKind, OtaError, SpaceError};

use crate::mocks::{RecordingSink, controller};

fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// ── Happy path ────────────────────────────────────────────────

#[test]
fn three_chunk_transfer_commits_and_restarts() {
    let mut ota = controller(64 * 1024);
    let mut sink = RecordingSink::new();
    let img = image(1024);

    assert_eq!(ota.handle_start(1024, None, &mut sink), Ok(Outcome::Started));
    assert_eq!(ota.state(), OtaState::started(1024));

    let mut offset = 0;
    for (len, expected) in [(400, 400), (400, 800), (224, 1024)] {
        let out = ota.handle_chunk(&img[offset..offset + len], &mut sink);
        assert_eq!(
            out,
            Ok(Outcome::Progress {
                received: expected,
                total: 1024
            })
        );
        offset += len;
    }
    assert!(ota.state().is_complete());
    assert_eq!(ota.state().percent(), 100);

    assert_eq!(ota.handle_end(&mut sink), Ok(Outcome::Committed));
    assert_eq!(ota.state().status(), OtaStatus::Idle);
    assert!(ota.restart().requested());
    assert_eq!(ota.flash().committed(), Some(img));

    assert_eq!(
        sink.lines(),
        vec![
            "OTA started, total size = 1024",
            "Received chunk. Total: 400 / 1024",
            "Received chunk. Total: 800 / 1024",
            "Received chunk. Total: 1024 / 1024",
            "OTA Success: update successful (1024 bytes). Rebooting...",
        ]
    );
}

#[test]
fn progress_is_queryable_mid_transfer() {
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    ota.handle_start(1000, None, &mut sink).unwrap();
    ota.handle_chunk(&image(250), &mut sink).unwrap();
    assert_eq!(ota.state().bytes_received(), 250);
    assert_eq!(ota.state().remaining(), 750);
    assert_eq!(ota.state().percent(), 25);
}

// ── Rejections that keep the transfer ─────────────────────────

#[test]
fn second_start_does_not_disturb_open_transfer() {
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    ota.handle_start(8, None, &mut sink).unwrap();
    ota.handle_chunk(b"abcd", &mut sink).unwrap();

    assert_eq!(
        ota.handle_start(16, None, &mut sink),
        Err(OtaError::AlreadyInProgress)
    );
    assert_eq!(
        sink.last().map(ToString::to_string).as_deref(),
        Some("Error: OTA already in progress")
    );

    ota.handle_chunk(b"efgh", &mut sink).unwrap();
    assert_eq!(ota.handle_end(&mut sink), Ok(Outcome::Committed));
    assert_eq!(ota.flash().committed(), Some(b"abcdefgh".to_vec()));
    assert_eq!(ota.flash().begin_count(), 1);
}

#[test]
fn zero_size_start_stays_idle() {
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    assert_eq!(
        ota.handle_start(0, None, &mut sink),
        Err(OtaError::InvalidSize(0))
    );
    assert_eq!(ota.state(), OtaState::idle());
    assert!(!ota.has_open_transaction());
    assert_eq!(sink.errors(), 1);
}

#[test]
fn start_larger_than_partition_reports_space() {
    let mut ota = controller(512);
    let mut sink = RecordingSink::new();
    let err = ota.handle_start(1024, None, &mut sink).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resource);
    assert_eq!(
        sink.lines(),
        vec!["Error: not enough space for OTA: image of 1024 bytes does not fit in 512 byte partition"]
    );
}

#[test]
fn missing_partition_is_a_resource_error() {
    let mut ota = OtaController::new(
        MemoryFlash::new(4096).fail_begin(SpaceError::NoPartition),
        SimRestart::new(),
    );
    let mut sink = RecordingSink::new();
    assert_eq!(
        ota.handle_start(16, None, &mut sink),
        Err(OtaError::Space(SpaceError::NoPartition))
    );
    assert_eq!(ota.state(), OtaState::idle());
}

// ── Failures that tear the transfer down ──────────────────────

#[test]
fn oversized_chunk_aborts_and_discards() {
    let mut ota = controller(64 * 1024);
    let mut sink = RecordingSink::new();
    ota.handle_start(1024, None, &mut sink).unwrap();

    let err = ota.handle_chunk(&image(2000), &mut sink).unwrap_err();
    assert_eq!(
        err,
        OtaError::Overflow {
            received: 0,
            chunk: 2000,
            total: 1024
        }
    );
    assert_eq!(err.kind(), ErrorKind::Transfer);
    assert_eq!(ota.state(), OtaState::idle());
    assert_eq!(ota.flash().abort_count(), 1);
    assert!(!ota.flash().is_open());

    let line = sink.last().map(ToString::to_string).unwrap_or_default();
    assert!(line.starts_with("Error:"), "{line}");
    assert!(line.ends_with("Transfer aborted."), "{line}");
}

#[test]
fn chunks_after_abort_are_ignored() {
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    ota.handle_start(16, None, &mut sink).unwrap();
    ota.handle_chunk(b"abcd", &mut sink).unwrap();
    assert_eq!(ota.handle_abort(&mut sink), Ok(Outcome::Aborted));
    assert_eq!(sink.last(), Some(&OtaEvent::Aborted));

    sink.clear();
    assert_eq!(ota.handle_chunk(b"efgh", &mut sink), Ok(Outcome::Ignored));
    assert!(sink.events.is_empty());
    assert_eq!(ota.flash().write_count(), 1);
    assert!(ota.flash().staged().is_empty());
}

#[test]
fn double_abort_is_harmless() {
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    ota.handle_start(16, None, &mut sink).unwrap();
    ota.handle_abort(&mut sink).unwrap();
    assert_eq!(ota.handle_abort(&mut sink), Ok(Outcome::Ignored));
    assert_eq!(ota.flash().abort_count(), 1);
}

#[test]
fn write_failure_then_fresh_transfer_succeeds() {
    let mut ota = OtaController::new(
        MemoryFlash::new(4096).fail_write_after(1),
        SimRestart::new(),
    );
    let mut sink = RecordingSink::new();
    ota.handle_start(8, None, &mut sink).unwrap();
    ota.handle_chunk(b"abcd", &mut sink).unwrap();
    assert!(ota.handle_chunk(b"efgh", &mut sink).is_err());
    assert_eq!(ota.state(), OtaState::idle());

    // The partition keeps failing writes; a new start is still accepted.
    assert_eq!(ota.handle_start(4, None, &mut sink), Ok(Outcome::Started));
    assert_eq!(ota.flash().begin_count(), 2);
}

#[test]
fn end_without_all_bytes_is_integrity_failure() {
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    ota.handle_start(1024, None, &mut sink).unwrap();
    ota.handle_chunk(&image(400), &mut sink).unwrap();
    let err = ota.handle_end(&mut sink).unwrap_err();
    assert_eq!(
        err,
        OtaError::IncompleteImage {
            received: 400,
            total: 1024
        }
    );
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(ota.flash().committed().is_none());
    assert!(!ota.restart().requested());

    // Recoverable: the next transfer starts from scratch.
    assert_eq!(ota.handle_start(4, None, &mut sink), Ok(Outcome::Started));
    assert_eq!(ota.state().bytes_received(), 0);
}

#[test]
fn digest_is_checked_before_commit() {
    let img = image(64);
    let digest = hmac_sha256::Hash::hash(&img);

    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    ota.handle_start(64, Some(digest), &mut sink).unwrap();
    ota.handle_chunk(&img[..32], &mut sink).unwrap();
    ota.handle_chunk(&img[32..], &mut sink).unwrap();
    assert_eq!(ota.handle_end(&mut sink), Ok(Outcome::Committed));

    let mut ota = controller(4096);
    ota.handle_start(64, Some(digest), &mut sink).unwrap();
    ota.handle_chunk(&img[32..], &mut sink).unwrap();
    ota.handle_chunk(&img[..32], &mut sink).unwrap();
    assert_eq!(ota.handle_end(&mut sink), Err(OtaError::DigestMismatch));
    assert!(ota.flash().committed().is_none());
}

// ── Accepted limitations ──────────────────────────────────────

#[test]
fn stalled_transfer_stays_open_until_aborted() {
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    ota.handle_start(100, None, &mut sink).unwrap();
    ota.handle_chunk(&image(10), &mut sink).unwrap();

    // No timeout: nothing but an explicit abort closes the transfer.
    for _ in 0..3 {
        assert_eq!(
            ota.handle_start(100, None, &mut sink),
            Err(OtaError::AlreadyInProgress)
        );
    }
    assert!(ota.state().is_in_progress());
    assert!(ota.has_open_transaction());

    ota.handle_abort(&mut sink).unwrap();
    assert_eq!(ota.handle_start(100, None, &mut sink), Ok(Outcome::Started));
}
