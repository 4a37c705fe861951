//! Broker-facing message plumbing.
//!
//! ```text
//!  MQTT rx ──▶ Reassembly ──▶ Mailbox ──▶ Router ──┬─▶ Codec ──▶ OtaController
//!  (adapter)   (fragments)    (queue)     (topic)  └──(chunk)──────▶
//! ```

pub mod codec;
pub mod mailbox;
pub mod reassembly;
pub mod router;
