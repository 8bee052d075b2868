//! Transport contract (spec §6) and an in-memory, lossless, ordered
//! implementation used by the property tests in §8 and by
//! `HandshakeBenchRunner` to drive both sides of a handshake without real
//! sockets.
//!
//! The core never does stream reassembly; frames arrive already deframed.
//! Loss, duplication, or reordering is a transport bug, not something the
//! driver compensates for.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Mutex;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::types::PeerId;

/// A handle the driver consumes to exchange framed bytes with exactly one
/// peer. `send` may suspend for a real transport; `recv` suspends until a
/// frame arrives or `deadline` passes, realizing the "cooperative sleep
/// racing the handshake task" pattern (spec §9) without an async runtime.
pub trait Transport {
    fn send(&self, peer: &PeerId, bytes: Vec<u8>) -> Result<()>;

    /// Returns `Ok(None)` if `deadline` passes with nothing delivered,
    /// `Ok(Some(bytes))` for the next in-order frame, or `Err` if the
    /// underlying channel is unusable (the peer endpoint is gone).
    fn recv(&self, deadline: Instant) -> Result<Option<Vec<u8>>>;
}

/// One endpoint of a two-party in-memory transport pair. Reliable,
/// in-order, FIFO per (sender, receiver) direction by construction (each
/// direction is a dedicated `mpsc` channel).
pub struct InMemoryTransport {
    remote: PeerId,
    outbox: mpsc::Sender<Vec<u8>>,
    inbox: Mutex<mpsc::Receiver<Vec<u8>>>,
}

impl InMemoryTransport {
    /// Build a connected pair: `(a_endpoint, b_endpoint)`. Each endpoint
    /// only ever exchanges frames with the other.
    pub fn pair(a: PeerId, b: PeerId) -> (Self, Self) {
        let (tx_a_to_b, rx_a_to_b) = mpsc::channel();
        let (tx_b_to_a, rx_b_to_a) = mpsc::channel();
        let _ = (&a, &b);
        (
            Self {
                remote: b,
                outbox: tx_a_to_b,
                inbox: Mutex::new(rx_b_to_a),
            },
            Self {
                remote: a,
                outbox: tx_b_to_a,
                inbox: Mutex::new(rx_a_to_b),
            },
        )
    }
}

impl Transport for InMemoryTransport {
    fn send(&self, peer: &PeerId, bytes: Vec<u8>) -> Result<()> {
        if *peer != self.remote {
            return Err(Error::transport_failure(format!(
                "this endpoint only speaks to {}, not {peer}",
                self.remote
            )));
        }
        self.outbox
            .send(bytes)
            .map_err(|_| Error::transport_failure("peer endpoint has been dropped"))
    }

    fn recv(&self, deadline: Instant) -> Result<Option<Vec<u8>>> {
        let inbox = self
            .inbox
            .lock()
            .map_err(|_| Error::transport_failure("transport lock poisoned"))?;
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        match inbox.recv_timeout(deadline - now) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::transport_failure("peer endpoint has been dropped"))
            }
        }
    }
}
