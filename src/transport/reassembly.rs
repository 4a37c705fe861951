//! Reassembly of MQTT payloads that the client delivers in pieces.
//!
//! ESP-IDF's MQTT client hands over a message larger than its receive
//! buffer as an initial fragment (carrying the topic) followed by
//! subsequent fragments at increasing offsets.  With the buffer sized to
//! hold a full firmware chunk, only oversized messages arrive this way;
//! their bytes are counted but not stored.

use log::warn;

use super::mailbox::InboundMessage;

/// How a piece of a received message relates to the whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    /// The whole message in one event.
    Complete,
    /// First piece of a `total`-byte message.
    Initial { total: usize },
    /// Later piece starting at `offset`.
    Subsequent { offset: usize, total: usize },
}

/// Result of feeding a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembled {
    Message(InboundMessage),
    /// A message above the buffering limit; payload discarded.
    Oversized { topic: String, len: usize },
}

struct Pending {
    topic: String,
    total: usize,
    received: usize,
    buf: Option<Vec<u8>>,
}

pub struct Reassembler {
    limit: usize,
    pending: Option<Pending>,
}

impl Reassembler {
    /// Buffer messages up to `limit` bytes.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Feed one receive event.  Returns a message once it is whole.
    pub fn push(
        &mut self,
        topic: Option<&str>,
        data: &[u8],
        fragment: Fragment,
    ) -> Option<Assembled> {
        match fragment {
            Fragment::Complete => {
                if self.pending.take().is_some() {
                    warn!("mqtt: fragmented message interrupted, dropped");
                }
                let Some(topic) = topic else {
                    warn!("mqtt: message without topic dropped");
                    return None;
                };
                Some(Assembled::Message(InboundMessage {
                    topic: topic.into(),
                    payload: data.to_vec(),
                }))
            }
            Fragment::Initial { total } => {
                if self.pending.take().is_some() {
                    warn!("mqtt: fragmented message interrupted, dropped");
                }
                let Some(topic) = topic else {
                    warn!("mqtt: fragmented message without topic dropped");
                    return None;
                };
                self.pending = Some(Pending {
                    topic: topic.into(),
                    total,
                    received: 0,
                    buf: (total <= self.limit).then(|| Vec::with_capacity(total)),
                });
                self.append(0, total, data)
            }
            Fragment::Subsequent { offset, total } => self.append(offset, total, data),
        }
    }

    fn append(&mut self, offset: usize, total: usize, data: &[u8]) -> Option<Assembled> {
        let Some(p) = self.pending.as_mut() else {
            warn!("mqtt: fragment at offset {} without a start, dropped", offset);
            return None;
        };
        if p.total != total || p.received != offset || offset + data.len() > total {
            warn!(
                "mqtt: fragment sequence error (offset {}, expected {}), dropped",
                offset, p.received
            );
            self.pending = None;
            return None;
        }
        p.received += data.len();
        if let Some(buf) = p.buf.as_mut() {
            buf.extend_from_slice(data);
        }
        if p.received < p.total {
            return None;
        }

        let p = self.pending.take()?;
        Some(match p.buf {
            Some(payload) => Assembled::Message(InboundMessage {
                topic: p.topic,
                payload,
            }),
            None => Assembled::Oversized {
                topic: p.topic,
                len: p.total,
            },
        })
    }
}
