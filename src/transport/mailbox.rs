//! Bounded queues between the MQTT threads and the OTA worker.
//!
//! Uses `embassy-sync` bounded channels so that the connection pump never
//! touches controller state: it only posts messages, and exactly one worker
//! drains them in delivery order.  Log lines travel the other way through
//! a second mailbox so the worker never waits on the MQTT client lock.
//!
//! ```text
//! ┌──────────────┐  InboundMessage  ┌──────────────┐  lines   ┌───────────┐
//! │ MQTT rx loop │─────────────────▶│  OTA worker  │─────────▶│ publisher │
//! │  (thread)    │     INBOX        │ router + ctl │  OUTBOX  │ (thread)  │
//! └──────────────┘                  └──────────────┘          └───────────┘
//! ```
//!
//! `post` blocks while the queue is full.  Back-pressure on the broker
//! connection is preferable to dropping firmware chunks.  `try_post` never
//! blocks and hands the item back when the queue is full.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use futures_lite::future::block_on;

/// One complete broker message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Inbound queue depth.  Each slot can hold a full chunk on the heap.
pub const INBOX_DEPTH: usize = 4;

pub struct Mailbox<T, const N: usize> {
    channel: Channel<CriticalSectionRawMutex, T, N>,
}

impl<T, const N: usize> Mailbox<T, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue, blocking the calling thread while the queue is full.
    pub fn post(&self, item: T) {
        block_on(self.channel.send(item));
    }

    /// Enqueue without blocking; returns the item if the queue is full.
    pub fn try_post(&self, item: T) -> Result<(), T> {
        self.channel.try_send(item).map_err(|TrySendError::Full(item)| item)
    }

    /// Dequeue, blocking the calling thread until an item arrives.
    pub fn next(&self) -> T {
        block_on(self.channel.receive())
    }

    pub fn try_next(&self) -> Option<T> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl<T, const N: usize> Default for Mailbox<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide inbox shared by the receive thread and the worker.
pub static INBOX: Mailbox<InboundMessage, INBOX_DEPTH> = Mailbox::new();
