//! Small shared value types: peer identity, session output, and benchmark
//! metrics. None of these carry behavior beyond construction and accessors.

use zeroize::ZeroizeOnDrop;

use crate::suite::{CryptoSuite, SignatureAlgorithm};

/// An opaque, stable device identifier. Equality is by value; the core
/// never owns or interprets the string beyond that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PeerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The output of a completed handshake: two directional traffic keys and
/// the transcript hash both sides observed. Ownership transfers to the
/// caller; nothing here is retained by the driver after hand-off.
#[derive(ZeroizeOnDrop)]
pub struct SessionKeys {
    pub tx_key: [u8; 32],
    pub rx_key: [u8; 32],
    #[zeroize(skip)]
    pub transcript_hash: [u8; 32],
}

impl core::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("tx_key", &"[REDACTED]")
            .field("rx_key", &"[REDACTED]")
            .field("transcript_hash", &hex_preview(&self.transcript_hash))
            .finish()
    }
}

fn hex_preview(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(16);
    for b in &bytes[..8] {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Snapshot of the most recently completed handshake, exposed to callers
/// and to the benchmark harness. Byte-equal across repeated reads of the
/// same completion (§8 "idempotent metrics").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeMetrics {
    pub rtt_ms: u64,
    pub message_a_wire_bytes: usize,
    pub message_b_wire_bytes: usize,
    pub finished_wire_bytes: usize,
    pub chosen_suite: CryptoSuite,
    pub sig_a_algorithm: SignatureAlgorithm,
}

/// 32 random bytes, freshly sampled per session (spec §4.1 G).
#[derive(Clone, ZeroizeOnDrop)]
pub struct Nonce(pub [u8; 32]);

impl Nonce {
    pub fn random() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Nonce").field(&"[REDACTED]").finish()
    }
}
