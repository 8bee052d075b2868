//! Classical suite binding: X25519 reshaped as a one-shot KEM (ephemeral DH,
//! shared secret run through HKDF) plus Ed25519 signatures. Grounded in the
//! teacher's ephemeral-X25519 handling in `hybrid_handshake.rs`.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use x25519_dalek::{PublicKey as XPublicKey, StaticSecret as XStaticSecret};

use crate::error::{Error, Result};
use crate::kdf::hkdf_expand_32;
use crate::provider::{
    wipe, CryptoProvider, EphemeralKemPrivate, KemCiphertext, KemKeypair, KemPublicKey,
    SharedSecret, SigningKeyHandle, SoftwareKeyBytes,
};
use crate::suite::{CryptoSuite, SecurityTier, SignatureAlgorithm};

const KEM_LABEL: &[u8] = b"skybridge-hs-v1/classical-kem";

/// The only suite this binding speaks.
const SUITES: [CryptoSuite; 1] = [CryptoSuite::ClassicX25519Ed25519];

#[derive(Debug, Default)]
pub struct ClassicalProvider;

impl ClassicalProvider {
    pub fn new() -> Self {
        Self
    }

    fn require_suite(&self, suite: CryptoSuite) -> Result<()> {
        if suite != CryptoSuite::ClassicX25519Ed25519 {
            return Err(Error::kem_failure("classical provider only speaks ClassicX25519Ed25519"));
        }
        Ok(())
    }
}

impl CryptoProvider for ClassicalProvider {
    fn supported_suites(&self) -> &'static [CryptoSuite] {
        &SUITES
    }

    fn tier(&self) -> SecurityTier {
        SecurityTier::Classical
    }

    fn generate_kem_keypair(&self, suite: CryptoSuite) -> Result<KemKeypair> {
        self.require_suite(suite)?;
        let private = XStaticSecret::random_from_rng(OsRng);
        let public = XPublicKey::from(&private);
        Ok(KemKeypair {
            private: EphemeralKemPrivate::new(private.to_bytes().to_vec()),
            public: KemPublicKey(public.as_bytes().to_vec()),
        })
    }

    fn encapsulate(
        &self,
        suite: CryptoSuite,
        peer_public: &KemPublicKey,
    ) -> Result<(KemCiphertext, SharedSecret)> {
        self.require_suite(suite)?;
        let peer_bytes: [u8; 32] = peer_public
            .0
            .as_slice()
            .try_into()
            .map_err(|_| Error::malformed("classical KEM public key must be 32 bytes"))?;
        let peer = XPublicKey::from(peer_bytes);

        let ephemeral = XStaticSecret::random_from_rng(OsRng);
        let ciphertext = XPublicKey::from(&ephemeral);

        let mut dh_output = ephemeral.diffie_hellman(&peer).to_bytes().to_vec();
        let ss = derive_shared_secret(&dh_output)?;
        wipe(dh_output.split_off(0));

        Ok((
            KemCiphertext(ciphertext.as_bytes().to_vec()),
            SharedSecret::new(ss),
        ))
    }

    fn decapsulate(
        &self,
        suite: CryptoSuite,
        private: &EphemeralKemPrivate,
        ciphertext: &KemCiphertext,
    ) -> Result<SharedSecret> {
        self.require_suite(suite)?;
        let private_bytes: [u8; 32] = private
            .as_bytes()
            .try_into()
            .map_err(|_| Error::kem_failure("classical KEM private key must be 32 bytes"))?;
        let ours = XStaticSecret::from(private_bytes);

        let ct_bytes: [u8; 32] = ciphertext
            .0
            .as_slice()
            .try_into()
            .map_err(|_| Error::malformed("classical KEM ciphertext must be 32 bytes"))?;
        let their_ephemeral = XPublicKey::from(ct_bytes);

        let mut dh_output = ours.diffie_hellman(&their_ephemeral).to_bytes().to_vec();
        let ss = derive_shared_secret(&dh_output)?;
        wipe(dh_output.split_off(0));

        Ok(SharedSecret::new(ss))
    }

    fn generate_signing_keypair(&self, alg: SignatureAlgorithm) -> Result<(SigningKeyHandle, Vec<u8>)> {
        require_ed25519(alg)?;
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();
        Ok((
            SigningKeyHandle::SoftwareKey(SoftwareKeyBytes(signing_key.to_bytes().to_vec())),
            verifying_key.to_bytes().to_vec(),
        ))
    }

    fn sign(&self, alg: SignatureAlgorithm, key: &SigningKeyHandle, msg: &[u8]) -> Result<Vec<u8>> {
        require_ed25519(alg)?;
        let SigningKeyHandle::SoftwareKey(bytes) = key else {
            return Err(Error::kem_failure("classical provider cannot use a secure-element key handle"));
        };
        let key_bytes: [u8; 32] = bytes
            .0
            .as_slice()
            .try_into()
            .map_err(|_| Error::kem_failure("Ed25519 signing key must be 32 bytes"))?;
        let signing_key = SigningKey::from_bytes(&key_bytes);
        Ok(signing_key.sign(msg).to_bytes().to_vec())
    }

    fn verify(&self, alg: SignatureAlgorithm, public_key: &[u8], msg: &[u8], sig: &[u8]) -> Result<bool> {
        require_ed25519(alg)?;
        let pk_bytes: [u8; 32] = public_key
            .try_into()
            .map_err(|_| Error::malformed("Ed25519 public key must be 32 bytes"))?;
        let verifying_key =
            VerifyingKey::from_bytes(&pk_bytes).map_err(|_| Error::malformed("invalid Ed25519 public key"))?;
        let sig_bytes: [u8; 64] = sig
            .try_into()
            .map_err(|_| Error::malformed("Ed25519 signature must be 64 bytes"))?;
        let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
        Ok(verifying_key.verify(msg, &signature).is_ok())
    }
}

fn require_ed25519(alg: SignatureAlgorithm) -> Result<()> {
    if alg != SignatureAlgorithm::Ed25519 {
        return Err(Error::kem_failure("classical provider only signs with Ed25519"));
    }
    Ok(())
}

fn derive_shared_secret(dh_output: &[u8]) -> Result<[u8; 32]> {
    let prk = crate::kdf::hkdf_extract(KEM_LABEL, dh_output);
    hkdf_expand_32(&prk, b"shared-secret")
}
