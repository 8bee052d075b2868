//! Hybrid suite binding: an X-Wing-style combiner over concurrent X25519 DH
//! and ML-KEM-768 encapsulation, signed with ML-DSA-65. Grounded in the
//! teacher's `hybrid_handshake.rs` combiner, generalized from its
//! hand-picked key sizes to the provider-trait shape this crate uses
//! everywhere else.

use x25519_dalek::{PublicKey as XPublicKey, StaticSecret as XStaticSecret};

use super::pqc::PqcProvider;
use crate::error::{Error, Result};
use crate::kdf::combine_hybrid_secret;
use crate::provider::{
    CryptoProvider, EphemeralKemPrivate, KemCiphertext, KemKeypair, KemPublicKey, SharedSecret,
    SigningKeyHandle,
};
use crate::suite::{CryptoSuite, SecurityTier, SignatureAlgorithm};

const SUITES: [CryptoSuite; 1] = [CryptoSuite::HybridXwingMldsa65];

const X25519_PK_LEN: usize = 32;
const X25519_SK_LEN: usize = 32;

/// Pack `x_private || u16_be(pqc_public.len()) || pqc_public || pqc_private`
/// into the private-key blob, so `decapsulate` can recover the pqc public
/// key it generated alongside `pqc_private` without a second round trip
/// through the driver. The combiner (spec §4.3) must see the same
/// `pk_pqc` bytes on both sides, and only the generating side has them
/// on hand without a peer message.
fn pack_hybrid_private(x_private: &[u8], pqc_public: &[u8], pqc_private: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(x_private.len() + 2 + pqc_public.len() + pqc_private.len());
    out.extend_from_slice(x_private);
    out.extend_from_slice(&(pqc_public.len() as u16).to_be_bytes());
    out.extend_from_slice(pqc_public);
    out.extend_from_slice(pqc_private);
    out
}

fn unpack_hybrid_private(blob: &[u8]) -> Result<(&[u8], &[u8], &[u8])> {
    if blob.len() < X25519_SK_LEN + 2 {
        return Err(Error::kem_failure("hybrid private key blob is too short"));
    }
    let (x_private, rest) = blob.split_at(X25519_SK_LEN);
    let (len_bytes, rest) = rest.split_at(2);
    let pqc_public_len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
    if rest.len() < pqc_public_len {
        return Err(Error::kem_failure("hybrid private key blob truncated before pqc public key"));
    }
    let (pqc_public, pqc_private) = rest.split_at(pqc_public_len);
    Ok((x_private, pqc_public, pqc_private))
}

/// Combines a bare X25519 DH step (no classical-provider HKDF wrapping; the
/// hybrid combiner does its own mixing) with [`PqcProvider`]'s ML-KEM-768.
#[derive(Debug, Default)]
pub struct HybridProvider {
    pqc: PqcProvider,
}

impl HybridProvider {
    pub fn new() -> Self {
        Self {
            pqc: PqcProvider::new(),
        }
    }

    fn require_suite(&self, suite: CryptoSuite) -> Result<()> {
        if suite != CryptoSuite::HybridXwingMldsa65 {
            return Err(Error::kem_failure("hybrid provider only speaks HybridXwingMldsa65"));
        }
        Ok(())
    }
}

impl CryptoProvider for HybridProvider {
    fn supported_suites(&self) -> &'static [CryptoSuite] {
        &SUITES
    }

    fn tier(&self) -> SecurityTier {
        SecurityTier::HybridPreferred
    }

    fn generate_kem_keypair(&self, suite: CryptoSuite) -> Result<KemKeypair> {
        self.require_suite(suite)?;
        let x_private = XStaticSecret::random_from_rng(rand_core::OsRng);
        let x_public = XPublicKey::from(&x_private);

        let pqc_keypair = self.pqc.generate_kem_keypair(CryptoSuite::PqcMlkem768Mldsa65)?;

        let private_bytes = pack_hybrid_private(
            &x_private.to_bytes(),
            &pqc_keypair.public.0,
            pqc_keypair.private.as_bytes(),
        );

        let mut public_bytes = x_public.as_bytes().to_vec();
        public_bytes.extend_from_slice(&pqc_keypair.public.0);

        Ok(KemKeypair {
            private: EphemeralKemPrivate::new(private_bytes),
            public: KemPublicKey(public_bytes),
        })
    }

    fn encapsulate(
        &self,
        suite: CryptoSuite,
        peer_public: &KemPublicKey,
    ) -> Result<(KemCiphertext, SharedSecret)> {
        self.require_suite(suite)?;
        if peer_public.0.len() <= X25519_PK_LEN {
            return Err(Error::malformed("hybrid public key too short to contain both halves"));
        }
        let (x_peer_bytes, pqc_peer_bytes) = peer_public.0.split_at(X25519_PK_LEN);
        let x_peer_bytes: [u8; X25519_PK_LEN] = x_peer_bytes
            .try_into()
            .map_err(|_| Error::malformed("hybrid X25519 half has the wrong length"))?;
        let x_peer = XPublicKey::from(x_peer_bytes);

        let x_ephemeral = XStaticSecret::random_from_rng(rand_core::OsRng);
        let x_ciphertext = XPublicKey::from(&x_ephemeral);
        let ss_classical = x_ephemeral.diffie_hellman(&x_peer);

        let (pqc_ciphertext, ss_pqc) = self
            .pqc
            .encapsulate(CryptoSuite::PqcMlkem768Mldsa65, &KemPublicKey(pqc_peer_bytes.to_vec()))?;

        let combined = combine_hybrid_secret(
            ss_classical.as_bytes(),
            ss_pqc.as_bytes(),
            &pqc_ciphertext.0,
            pqc_peer_bytes,
        );

        let mut ciphertext = x_ciphertext.as_bytes().to_vec();
        ciphertext.extend_from_slice(&pqc_ciphertext.0);

        Ok((KemCiphertext(ciphertext), SharedSecret::new(combined)))
    }

    fn decapsulate(
        &self,
        suite: CryptoSuite,
        private: &EphemeralKemPrivate,
        ciphertext: &KemCiphertext,
    ) -> Result<SharedSecret> {
        self.require_suite(suite)?;
        let (x_priv_bytes, pqc_public, pqc_priv_bytes) = unpack_hybrid_private(private.as_bytes())?;
        let x_priv_bytes: [u8; X25519_SK_LEN] = x_priv_bytes
            .try_into()
            .map_err(|_| Error::kem_failure("hybrid X25519 private half has the wrong length"))?;
        let x_private = XStaticSecret::from(x_priv_bytes);

        if ciphertext.0.len() <= X25519_PK_LEN {
            return Err(Error::malformed("hybrid ciphertext too short to contain both halves"));
        }
        let (x_ct_bytes, pqc_ct_bytes) = ciphertext.0.split_at(X25519_PK_LEN);
        let x_ct_bytes: [u8; X25519_PK_LEN] = x_ct_bytes
            .try_into()
            .map_err(|_| Error::malformed("hybrid X25519 ciphertext half has the wrong length"))?;
        let x_peer_ephemeral = XPublicKey::from(x_ct_bytes);
        let ss_classical = x_private.diffie_hellman(&x_peer_ephemeral);

        let pqc_private = EphemeralKemPrivate::new(pqc_priv_bytes.to_vec());
        let ss_pqc = self.pqc.decapsulate(
            CryptoSuite::PqcMlkem768Mldsa65,
            &pqc_private,
            &KemCiphertext(pqc_ct_bytes.to_vec()),
        )?;

        // `pk_pqc` here must be our own ML-KEM-768 public key (the one the
        // peer encapsulated against), not the ciphertext — it was packed
        // alongside the private key by `generate_kem_keypair` precisely so
        // both sides feed the combiner the identical bytes (spec §4.3).
        let combined = combine_hybrid_secret(
            ss_classical.as_bytes(),
            ss_pqc.as_bytes(),
            pqc_ct_bytes,
            pqc_public,
        );

        Ok(SharedSecret::new(combined))
    }

    fn generate_signing_keypair(&self, alg: SignatureAlgorithm) -> Result<(SigningKeyHandle, Vec<u8>)> {
        self.pqc.generate_signing_keypair(alg)
    }

    fn sign(&self, alg: SignatureAlgorithm, key: &SigningKeyHandle, msg: &[u8]) -> Result<Vec<u8>> {
        self.pqc.sign(alg, key, msg)
    }

    fn verify(&self, alg: SignatureAlgorithm, public_key: &[u8], msg: &[u8], sig: &[u8]) -> Result<bool> {
        self.pqc.verify(alg, public_key, msg, sig)
    }
}
