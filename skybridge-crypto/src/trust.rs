//! Trust provider contract (spec §4.5): fingerprint pinning, pre-shared
//! KEM public keys, and an optional secure-enclave public key. Read-only
//! from the driver's perspective; it never mutates or persists anything.

use std::collections::HashMap;

use crate::suite::CryptoSuite;
use crate::types::PeerId;

/// Capability set the driver consumes to enforce pins before deriving keys.
pub trait TrustProvider: Send + Sync {
    /// SHA-256 fingerprint (hex-encoded) pinned for this peer's identity
    /// public key, if any.
    fn trusted_fingerprint(&self, peer: &PeerId) -> Option<String>;

    /// Pre-shared KEM public keys pinned per suite for this peer.
    fn trusted_kem_public_keys(&self, peer: &PeerId) -> HashMap<CryptoSuite, Vec<u8>>;

    /// The secure-enclave public key pinned for this peer, if any.
    fn trusted_secure_enclave_public_key(&self, peer: &PeerId) -> Option<Vec<u8>>;
}

/// `HashMap`-backed default, for tests and simple deployments that don't
/// need a persistent trust store.
#[derive(Debug, Default)]
pub struct InMemoryTrustProvider {
    fingerprints: HashMap<PeerId, String>,
    kem_public_keys: HashMap<PeerId, HashMap<CryptoSuite, Vec<u8>>>,
    secure_enclave_public_keys: HashMap<PeerId, Vec<u8>>,
}

impl InMemoryTrustProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin_fingerprint(&mut self, peer: PeerId, fingerprint_hex: impl Into<String>) -> &mut Self {
        self.fingerprints.insert(peer, fingerprint_hex.into());
        self
    }

    pub fn pin_kem_public_key(&mut self, peer: PeerId, suite: CryptoSuite, public_key: Vec<u8>) -> &mut Self {
        self.kem_public_keys.entry(peer).or_default().insert(suite, public_key);
        self
    }

    pub fn pin_secure_enclave_public_key(&mut self, peer: PeerId, public_key: Vec<u8>) -> &mut Self {
        self.secure_enclave_public_keys.insert(peer, public_key);
        self
    }
}

impl TrustProvider for InMemoryTrustProvider {
    fn trusted_fingerprint(&self, peer: &PeerId) -> Option<String> {
        self.fingerprints.get(peer).cloned()
    }

    fn trusted_kem_public_keys(&self, peer: &PeerId) -> HashMap<CryptoSuite, Vec<u8>> {
        self.kem_public_keys.get(peer).cloned().unwrap_or_default()
    }

    fn trusted_secure_enclave_public_key(&self, peer: &PeerId) -> Option<Vec<u8>> {
        self.secure_enclave_public_keys.get(peer).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_peer_has_no_pins() {
        let trust = InMemoryTrustProvider::new();
        let peer = PeerId::new("device-a");
        assert!(trust.trusted_fingerprint(&peer).is_none());
        assert!(trust.trusted_kem_public_keys(&peer).is_empty());
        assert!(trust.trusted_secure_enclave_public_key(&peer).is_none());
    }

    #[test]
    fn pins_are_retrievable_after_set() {
        let mut trust = InMemoryTrustProvider::new();
        let peer = PeerId::new("device-a");
        trust.pin_fingerprint(peer.clone(), "deadbeef");
        trust.pin_kem_public_key(peer.clone(), CryptoSuite::PqcMlkem768Mldsa65, vec![1, 2, 3]);
        trust.pin_secure_enclave_public_key(peer.clone(), vec![4, 5, 6]);

        assert_eq!(trust.trusted_fingerprint(&peer).as_deref(), Some("deadbeef"));
        assert_eq!(
            trust.trusted_kem_public_keys(&peer).get(&CryptoSuite::PqcMlkem768Mldsa65),
            Some(&vec![1, 2, 3])
        );
        assert_eq!(trust.trusted_secure_enclave_public_key(&peer), Some(vec![4, 5, 6]));
    }
}
