//! PQC-only suite binding: ML-KEM-768 key encapsulation and ML-DSA-65
//! signatures, both from the RustCrypto pure-Rust implementations.

use ml_dsa::{KeyGen, MlDsa65};
use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{KemCore, MlKem768};
use rand::rngs::OsRng;
use signature::{Keypair, Signer, Verifier};

use crate::error::{Error, Result};
use crate::provider::{
    CryptoProvider, EphemeralKemPrivate, KemCiphertext, KemKeypair, KemPublicKey, SharedSecret,
    SigningKeyHandle, SoftwareKeyBytes,
};
use crate::suite::{CryptoSuite, SecurityTier, SignatureAlgorithm};

const SUITES: [CryptoSuite; 1] = [CryptoSuite::PqcMlkem768Mldsa65];

#[derive(Debug, Default)]
pub struct PqcProvider;

impl PqcProvider {
    pub fn new() -> Self {
        Self
    }

    fn require_suite(&self, suite: CryptoSuite) -> Result<()> {
        if suite != CryptoSuite::PqcMlkem768Mldsa65 {
            return Err(Error::kem_failure("PQC provider only speaks PqcMlkem768Mldsa65"));
        }
        Ok(())
    }
}

impl CryptoProvider for PqcProvider {
    fn supported_suites(&self) -> &'static [CryptoSuite] {
        &SUITES
    }

    fn tier(&self) -> SecurityTier {
        SecurityTier::PqcPreferred
    }

    fn generate_kem_keypair(&self, suite: CryptoSuite) -> Result<KemKeypair> {
        self.require_suite(suite)?;
        let mut rng = OsRng;
        let (decapsulation_key, encapsulation_key) = MlKem768::generate(&mut rng);
        Ok(KemKeypair {
            private: EphemeralKemPrivate::new(decapsulation_key.as_bytes().to_vec()),
            public: KemPublicKey(encapsulation_key.as_bytes().to_vec()),
        })
    }

    fn encapsulate(
        &self,
        suite: CryptoSuite,
        peer_public: &KemPublicKey,
    ) -> Result<(KemCiphertext, SharedSecret)> {
        self.require_suite(suite)?;
        let ek = ml_kem::kem::EncapsulationKey::<ml_kem::MlKem768Params>::from_bytes(
            peer_public
                .0
                .as_slice()
                .try_into()
                .map_err(|_| Error::malformed("ML-KEM-768 encapsulation key has the wrong length"))?,
        );
        let mut rng = OsRng;
        let (ciphertext, shared_secret) = ek
            .encapsulate(&mut rng)
            .map_err(|_| Error::kem_failure("ML-KEM-768 encapsulation failed"))?;
        Ok((
            KemCiphertext(ciphertext.to_vec()),
            SharedSecret::new(
                shared_secret
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::kem_failure("ML-KEM-768 shared secret has the wrong length"))?,
            ),
        ))
    }

    fn decapsulate(
        &self,
        suite: CryptoSuite,
        private: &EphemeralKemPrivate,
        ciphertext: &KemCiphertext,
    ) -> Result<SharedSecret> {
        self.require_suite(suite)?;
        let dk = ml_kem::kem::DecapsulationKey::<ml_kem::MlKem768Params>::from_bytes(
            private
                .as_bytes()
                .try_into()
                .map_err(|_| Error::kem_failure("ML-KEM-768 decapsulation key has the wrong length"))?,
        );
        let ct = ciphertext
            .0
            .as_slice()
            .try_into()
            .map_err(|_| Error::malformed("ML-KEM-768 ciphertext has the wrong length"))?;
        let shared_secret = dk
            .decapsulate(&ct)
            .map_err(|_| Error::kem_failure("ML-KEM-768 decapsulation failed"))?;
        Ok(SharedSecret::new(
            shared_secret
                .as_slice()
                .try_into()
                .map_err(|_| Error::kem_failure("ML-KEM-768 shared secret has the wrong length"))?,
        ))
    }

    fn generate_signing_keypair(&self, alg: SignatureAlgorithm) -> Result<(SigningKeyHandle, Vec<u8>)> {
        require_ml_dsa(alg)?;
        let mut rng = OsRng;
        let keypair = MlDsa65::key_gen(&mut rng);
        let public = keypair.verifying_key().encode().to_vec();
        let private = keypair.signing_key().encode().to_vec();
        Ok((
            SigningKeyHandle::SoftwareKey(SoftwareKeyBytes(private)),
            public,
        ))
    }

    fn sign(&self, alg: SignatureAlgorithm, key: &SigningKeyHandle, msg: &[u8]) -> Result<Vec<u8>> {
        require_ml_dsa(alg)?;
        let SigningKeyHandle::SoftwareKey(bytes) = key else {
            return Err(Error::kem_failure("PQC provider cannot use a secure-element key handle"));
        };
        let signing_key = ml_dsa::SigningKey::<MlDsa65>::decode(
            bytes
                .0
                .as_slice()
                .try_into()
                .map_err(|_| Error::kem_failure("ML-DSA-65 signing key has the wrong length"))?,
        );
        Ok(signing_key.sign(msg).encode().to_vec())
    }

    fn verify(&self, alg: SignatureAlgorithm, public_key: &[u8], msg: &[u8], sig: &[u8]) -> Result<bool> {
        require_ml_dsa(alg)?;
        let verifying_key = ml_dsa::VerifyingKey::<MlDsa65>::decode(
            public_key
                .try_into()
                .map_err(|_| Error::malformed("ML-DSA-65 public key has the wrong length"))?,
        );
        let signature = ml_dsa::Signature::<MlDsa65>::decode(
            sig.try_into()
                .map_err(|_| Error::malformed("ML-DSA-65 signature has the wrong length"))?,
        )
        .ok_or_else(|| Error::malformed("ML-DSA-65 signature encoding rejected"))?;
        Ok(verifying_key.verify(msg, &signature).is_ok())
    }
}

fn require_ml_dsa(alg: SignatureAlgorithm) -> Result<()> {
    if alg != SignatureAlgorithm::MlDsa65 {
        return Err(Error::kem_failure("PQC provider only signs with ML-DSA-65"));
    }
    Ok(())
}
