//! Fuzz target: control-topic decoding and dispatch
//!
//! Splits the input into a sequence of broker messages (first byte of each
//! record picks the topic, second byte its length) and pushes them through
//! `MessageRouter::dispatch` into a controller over the in-memory partition.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - `bytes_received <= total_size` while a transfer is open
//! - Idle always means zero counters and no open transaction
//! - A restart is only ever requested after an image was committed
//!
//! cargo fuzz run fuzz_control_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use mqtt_ota::adapters::flash::MemoryFlash;
use mqtt_ota::adapters::system::SimRestart;
use mqtt_ota::app::controller::OtaController;
use mqtt_ota::app::events::OtaEvent;
use mqtt_ota::app::ports::EventSink;
use mqtt_ota::config::OtaConfig;
use mqtt_ota::transport::codec::decode_command;
use mqtt_ota::transport::router::MessageRouter;

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _event: &OtaEvent) {}
}

fuzz_target!(|data: &[u8]| {
    // The raw input as one control payload must never panic the decoder.
    let _ = decode_command(data);

    let mut config = OtaConfig::for_device("fuzz");
    config.max_chunk_size = 128;
    let router = MessageRouter::new(&config);
    let mut ota = OtaController::new(MemoryFlash::new(1024), SimRestart::new());
    let mut sink = Discard;

    let mut rest = data;
    while rest.len() >= 2 {
        let topic = match rest[0] % 3 {
            0 => config.topics.control.as_str(),
            1 => config.topics.firmware.as_str(),
            _ => "fuzz/other",
        };
        let len = usize::from(rest[1]).min(rest.len() - 2);
        let payload = &rest[2..2 + len];
        rest = &rest[2 + len..];

        router.dispatch(topic, payload, &mut ota, &mut sink);

        let s = ota.state();
        if s.is_in_progress() {
            assert!(s.bytes_received() <= s.total_size());
            assert!(ota.has_open_transaction());
        } else {
            assert_eq!(s.total_size(), 0);
            assert_eq!(s.bytes_received(), 0);
            assert!(!ota.has_open_transaction());
        }
        if ota.restart().requested() {
            assert!(ota.flash().committed().is_some());
        }
    }
});
