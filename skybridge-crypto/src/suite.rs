//! Cryptographic suite and signature algorithm identifiers.
//!
//! A suite bundles a KEM and a signature algorithm under a single wire byte.
//! Suites are ordered only by [`SecurityTier`] for policy comparisons; the
//! wire-id ordering used for deterministic tie-breaking is unrelated.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Relative security tier, used only for policy comparisons (`classical <
/// pqcPreferred < hybridPreferred`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SecurityTier {
    Classical,
    PqcPreferred,
    HybridPreferred,
}

/// A negotiable (KEM, signature) bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CryptoSuite {
    ClassicX25519Ed25519,
    PqcMlkem768Mldsa65,
    HybridXwingMldsa65,
}

impl CryptoSuite {
    /// Fixed, stable wire-id byte. Never renumber an existing suite.
    pub const fn wire_id(self) -> u8 {
        match self {
            CryptoSuite::ClassicX25519Ed25519 => 0x01,
            CryptoSuite::PqcMlkem768Mldsa65 => 0x02,
            CryptoSuite::HybridXwingMldsa65 => 0x03,
        }
    }

    pub fn from_wire_id(id: u8) -> Result<Self> {
        match id {
            0x01 => Ok(CryptoSuite::ClassicX25519Ed25519),
            0x02 => Ok(CryptoSuite::PqcMlkem768Mldsa65),
            0x03 => Ok(CryptoSuite::HybridXwingMldsa65),
            other => Err(Error::malformed(format!("unknown suite wire-id {other}"))),
        }
    }

    pub const fn is_pqc(self) -> bool {
        matches!(
            self,
            CryptoSuite::PqcMlkem768Mldsa65 | CryptoSuite::HybridXwingMldsa65
        )
    }

    pub const fn is_hybrid(self) -> bool {
        matches!(self, CryptoSuite::HybridXwingMldsa65)
    }

    pub const fn security_tier(self) -> SecurityTier {
        match self {
            CryptoSuite::ClassicX25519Ed25519 => SecurityTier::Classical,
            CryptoSuite::PqcMlkem768Mldsa65 => SecurityTier::PqcPreferred,
            CryptoSuite::HybridXwingMldsa65 => SecurityTier::HybridPreferred,
        }
    }

    /// The signature algorithm a compliant peer MUST use with this suite.
    pub const fn mandated_signature_algorithm(self) -> SignatureAlgorithm {
        match self {
            CryptoSuite::ClassicX25519Ed25519 => SignatureAlgorithm::Ed25519,
            CryptoSuite::PqcMlkem768Mldsa65 | CryptoSuite::HybridXwingMldsa65 => {
                SignatureAlgorithm::MlDsa65
            }
        }
    }

    /// All suites this build knows about, in a stable canonical order
    /// (ascending wire-id). Used by the registry to intersect with what a
    /// provider actually supports.
    pub const ALL: [CryptoSuite; 3] = [
        CryptoSuite::ClassicX25519Ed25519,
        CryptoSuite::PqcMlkem768Mldsa65,
        CryptoSuite::HybridXwingMldsa65,
    ];
}

/// Signature algorithm identifier, independent of which suite names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    Ed25519,
    MlDsa65,
}

impl SignatureAlgorithm {
    pub const fn wire_id(self) -> u8 {
        match self {
            SignatureAlgorithm::Ed25519 => 0x01,
            SignatureAlgorithm::MlDsa65 => 0x02,
        }
    }

    pub fn from_wire_id(id: u8) -> Result<Self> {
        match id {
            0x01 => Ok(SignatureAlgorithm::Ed25519),
            0x02 => Ok(SignatureAlgorithm::MlDsa65),
            other => Err(Error::malformed(format!(
                "unknown signature algorithm wire-id {other}"
            ))),
        }
    }

    /// Upper bound on public-key bytes for this algorithm, used to bound
    /// parsing before any allocation.
    pub const fn max_public_key_len(self) -> usize {
        match self {
            SignatureAlgorithm::Ed25519 => 32,
            SignatureAlgorithm::MlDsa65 => 1952,
        }
    }

    /// Upper bound on signature bytes for this algorithm.
    pub const fn max_signature_len(self) -> usize {
        match self {
            SignatureAlgorithm::Ed25519 => 64,
            SignatureAlgorithm::MlDsa65 => 3309,
        }
    }
}
