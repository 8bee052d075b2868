#![forbid(unsafe_code)]

//! HKDF-SHA256 helpers shared by the key schedule and the hybrid KEM
//! combiner.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// `HKDF-Extract(salt, ikm)`, returning the 32-byte PRK.
pub fn hkdf_extract(salt: &[u8], ikm: &[u8]) -> [u8; 32] {
    let (prk, _hk) = Hkdf::<Sha256>::extract(Some(salt), ikm);
    prk.into()
}

/// `HKDF-Expand(prk, info, L)` into a caller-sized output buffer.
pub fn hkdf_expand(prk: &[u8; 32], info: &[u8], out: &mut [u8]) -> Result<()> {
    let hk = Hkdf::<Sha256>::from_prk(prk).map_err(|_| Error::kem_failure("invalid PRK length"))?;
    hk.expand(info, out)
        .map_err(|_| Error::kem_failure("HKDF expand failed"))
}

/// Convenience: expand a single 32-byte key from a PRK and label.
pub fn hkdf_expand_32(prk: &[u8; 32], info: &[u8]) -> Result<[u8; 32]> {
    let mut out = [0u8; 32];
    hkdf_expand(prk, info, &mut out)?;
    Ok(out)
}

/// Combine two independent shared secrets plus binding context into one
/// 32-byte secret, used by the hybrid provider's KEM combiner (spec §4.3:
/// `ss = KDF(ss_classical || ss_pqc || ct_pqc || pk_pqc)`).
pub fn combine_hybrid_secret(
    ss_classical: &[u8],
    ss_pqc: &[u8],
    ct_pqc: &[u8],
    pk_pqc: &[u8],
) -> [u8; 32] {
    let mut ikm =
        Vec::with_capacity(ss_classical.len() + ss_pqc.len() + ct_pqc.len() + pk_pqc.len());
    ikm.extend_from_slice(ss_classical);
    ikm.extend_from_slice(ss_pqc);
    ikm.extend_from_slice(ct_pqc);
    ikm.extend_from_slice(pk_pqc);

    let prk = hkdf_extract(b"skybridge-hs-v1/hybrid-combiner", &ikm);
    ikm.zeroize();
    prk
}


