//! Provider capability surface: KEM + signature operations for one or more
//! [`CryptoSuite`]s, plus the key-handle and identity types consumed by the
//! driver. Concrete providers (`providers::classical`, `providers::pqc`,
//! `providers::hybrid`) implement this trait; the driver is generic over it.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;
use crate::suite::{CryptoSuite, SecurityTier, SignatureAlgorithm};

/// A freshly generated or decapsulated shared secret. Always exactly 32
/// bytes in this protocol, regardless of suite.
#[derive(ZeroizeOnDrop)]
pub struct SharedSecret(pub(crate) [u8; 32]);

impl SharedSecret {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl core::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedSecret").field("len", &32).finish()
    }
}

/// An ephemeral KEM private key, owned exclusively by one in-flight session
/// and wiped when dropped or when the session reaches a terminal state.
#[derive(ZeroizeOnDrop)]
pub struct EphemeralKemPrivate(pub(crate) Vec<u8>);

impl EphemeralKemPrivate {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for EphemeralKemPrivate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EphemeralKemPrivate")
            .field("len", &self.0.len())
            .finish()
    }
}

/// A signing key handle. The driver never inspects the bytes of a software
/// key; it only ever passes the handle back into the provider that issued
/// it. `SecureElement` is the seam a host platform can fill in; a provider
/// that has no secure element support returns `Unsupported` from `sign`.
#[derive(Clone)]
pub enum SigningKeyHandle {
    SoftwareKey(SoftwareKeyBytes),
    SecureElementKey(String),
}

/// Zeroizing wrapper around raw software signing-key bytes.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SoftwareKeyBytes(pub Vec<u8>);

impl core::fmt::Debug for SoftwareKeyBytes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SoftwareKeyBytes")
            .field("len", &self.0.len())
            .finish()
    }
}

/// The on-wire identity blob: a protocol public key tagged with its
/// algorithm, plus an optional secure-enclave public key that must match
/// exactly when both sides have one pinned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPublicKeys {
    pub protocol_public_key: Vec<u8>,
    pub protocol_algorithm: SignatureAlgorithm,
    pub secure_enclave_public_key: Option<Vec<u8>>,
}

impl IdentityPublicKeys {
    pub fn software(protocol_public_key: Vec<u8>, protocol_algorithm: SignatureAlgorithm) -> Self {
        Self {
            protocol_public_key,
            protocol_algorithm,
            secure_enclave_public_key: None,
        }
    }

    pub fn fingerprint(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&self.protocol_public_key);
        hasher.finalize().into()
    }
}

/// KEM ciphertext, variable length per suite but fixed for any given suite.
#[derive(Debug, Clone)]
pub struct KemCiphertext(pub Vec<u8>);

/// KEM public key, variable length per suite but fixed for any given suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KemPublicKey(pub Vec<u8>);

/// An ephemeral KEM keypair: the private half is wiped on drop, the public
/// half is sent on the wire.
pub struct KemKeypair {
    pub private: EphemeralKemPrivate,
    pub public: KemPublicKey,
}

/// Capability set a cryptographic suite provider exposes to the driver.
///
/// All operations are fallible and must clear sensitive intermediate
/// buffers on the error path as well as the success path (the wrapper types
/// above handle this for anything that outlives the call; operations that
/// build and discard scratch buffers internally are responsible for their
/// own `Zeroize::zeroize()` calls).
pub trait CryptoProvider {
    /// The suites this provider can speak.
    fn supported_suites(&self) -> &'static [CryptoSuite];

    /// This provider's ceiling security tier, used by the registry to order
    /// offers without needing to special-case every suite.
    fn tier(&self) -> SecurityTier;

    fn generate_kem_keypair(&self, suite: CryptoSuite) -> Result<KemKeypair>;

    /// Responder-side: encapsulate against the peer's KEM public key.
    fn encapsulate(
        &self,
        suite: CryptoSuite,
        peer_public: &KemPublicKey,
    ) -> Result<(KemCiphertext, SharedSecret)>;

    /// Initiator-side: decapsulate using our own ephemeral private key.
    fn decapsulate(
        &self,
        suite: CryptoSuite,
        private: &EphemeralKemPrivate,
        ciphertext: &KemCiphertext,
    ) -> Result<SharedSecret>;

    fn generate_signing_keypair(&self, alg: SignatureAlgorithm) -> Result<(SigningKeyHandle, Vec<u8>)>;

    fn sign(&self, alg: SignatureAlgorithm, key: &SigningKeyHandle, msg: &[u8]) -> Result<Vec<u8>>;

    fn verify(&self, alg: SignatureAlgorithm, public_key: &[u8], msg: &[u8], sig: &[u8]) -> Result<bool>;
}

/// Best-effort secret buffer clear for scratch material that does not
/// outlive a single call (e.g. intermediate DH outputs before HKDF mixes
/// them). Kept as a free function so provider bindings don't each need
/// their own ad hoc zeroizing newtype for single-use buffers.
pub(crate) fn wipe(mut buf: Vec<u8>) {
    buf.zeroize();
}
