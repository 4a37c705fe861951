//! Fuzz target: `Reassembler::push`
//!
//! Drives arbitrary fragment sequences (including out-of-order offsets and
//! lying totals) into the reassembler and checks that it never panics and
//! never yields a message longer than its buffering limit.
//!
//! cargo fuzz run fuzz_reassembly

#![no_main]

use libfuzzer_sys::fuzz_target;
use mqtt_ota::transport::reassembly::{Assembled, Fragment, Reassembler};

const LIMIT: usize = 256;

fuzz_target!(|data: &[u8]| {
    let mut r = Reassembler::new(LIMIT);
    let mut rest = data;
    while rest.len() >= 4 {
        let kind = rest[0] % 3;
        let total = usize::from(u16::from_le_bytes([rest[1], rest[2]]));
        let len = usize::from(rest[3]).min(rest.len() - 4);
        let piece = &rest[4..4 + len];
        rest = &rest[4 + len..];

        let fragment = match kind {
            0 => Fragment::Complete,
            1 => Fragment::Initial { total },
            _ => Fragment::Subsequent {
                offset: usize::from(rest.first().copied().unwrap_or(0)),
                total,
            },
        };
        if let Some(Assembled::Message(m)) = r.push(Some("t"), piece, fragment) {
            if !matches!(fragment, Fragment::Complete) {
                assert!(m.payload.len() <= LIMIT);
            }
        }
    }
});
