//! Transcript hashing, Finished-MAC construction, signature coverage, and
//! the key schedule that binds session keys to everything both parties
//! observed on the wire. See spec §4.1 B–D.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::kdf::{hkdf_expand_32, hkdf_extract};
use crate::suite::CryptoSuite;

type HmacSha256 = Hmac<Sha256>;

const DOMAIN_LABEL: &[u8] = b"SKYBRIDGE-HS-v1";
const FINISHED_LABEL: &[u8] = b"finished";

/// Role octet mixed into the Finished-MAC computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    pub const fn octet(self) -> u8 {
        match self {
            Role::Initiator => 0x01,
            Role::Responder => 0x02,
        }
    }
}

/// A rolling SHA-256 transcript. Append-only: bytes mixed in cannot be
/// removed. Exactly the wire bytes of each message (length-prefix
/// included) are mixed in, in send/receive order.
#[derive(Clone)]
pub struct Transcript {
    hasher: Sha256,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_LABEL);
        Self { hasher }
    }

    /// Mix in one message's exact wire bytes.
    pub fn mix(&mut self, wire_bytes: &[u8]) {
        self.hasher.update(wire_bytes);
    }

    /// The transcript hash after mixing in MessageA and MessageB, exposed
    /// in `SessionKeys` and used as the HKDF-Extract salt and as the
    /// Finished-MAC message prefix. Does not include the `finished` label.
    pub fn hash_ab(&self) -> [u8; 32] {
        self.hasher.clone().finalize().into()
    }
}

/// Build the exact bytes HMAC-SHA256 is computed over for MessageC:
/// `transcriptHash_AB || "finished" || role_octet`.
pub fn finished_mac_message(hash_ab: &[u8; 32], role: Role) -> Vec<u8> {
    let mut msg = Vec::with_capacity(32 + FINISHED_LABEL.len() + 1);
    msg.extend_from_slice(hash_ab);
    msg.extend_from_slice(FINISHED_LABEL);
    msg.push(role.octet());
    msg
}

/// Compute the Finished-MAC tag for MessageC.
pub fn compute_finished_mac(fin_key: &[u8; 32], hash_ab: &[u8; 32], role: Role) -> [u8; 32] {
    let msg = finished_mac_message(hash_ab, role);
    let mut mac = HmacSha256::new_from_slice(fin_key).expect("HMAC accepts any key length");
    mac.update(&msg);
    mac.finalize().into_bytes().into()
}

/// Constant-time verification of a received Finished-MAC tag.
pub fn verify_finished_mac(fin_key: &[u8; 32], hash_ab: &[u8; 32], role: Role, tag: &[u8]) -> Result<()> {
    let msg = finished_mac_message(hash_ab, role);
    let mut mac = HmacSha256::new_from_slice(fin_key).expect("HMAC accepts any key length");
    mac.update(&msg);
    mac.verify_slice(tag).map_err(|_| Error::FinishedMacInvalid)
}

/// Bytes covered by sigA: `"sigA-v1" || offeredSuitesEncoded ||
/// initiatorEphemeralKEMpk || initiatorIdentityPk || initiatorNonce ||
/// peerIdEncoded`.
pub fn sig_a_message(
    offered_suites_encoded: &[u8],
    initiator_kem_pk: &[u8],
    initiator_identity_pk: &[u8],
    initiator_nonce: &[u8; 32],
    peer_id_encoded: &[u8],
) -> Vec<u8> {
    let mut msg = Vec::with_capacity(
        7 + offered_suites_encoded.len()
            + initiator_kem_pk.len()
            + initiator_identity_pk.len()
            + 32
            + peer_id_encoded.len(),
    );
    msg.extend_from_slice(b"sigA-v1");
    msg.extend_from_slice(offered_suites_encoded);
    msg.extend_from_slice(initiator_kem_pk);
    msg.extend_from_slice(initiator_identity_pk);
    msg.extend_from_slice(initiator_nonce);
    msg.extend_from_slice(peer_id_encoded);
    msg
}

/// Bytes covered by sigB: `"sigB-v1" || chosenSuite || kemCiphertext ||
/// responderIdentityPk || responderNonce || transcriptHash_A`.
pub fn sig_b_message(
    chosen_suite: CryptoSuite,
    kem_ciphertext: &[u8],
    responder_identity_pk: &[u8],
    responder_nonce: &[u8; 32],
    transcript_hash_a: &[u8; 32],
) -> Vec<u8> {
    let mut msg = Vec::with_capacity(
        7 + 1 + kem_ciphertext.len() + responder_identity_pk.len() + 32 + 32,
    );
    msg.extend_from_slice(b"sigB-v1");
    msg.push(chosen_suite.wire_id());
    msg.extend_from_slice(kem_ciphertext);
    msg.extend_from_slice(responder_identity_pk);
    msg.extend_from_slice(responder_nonce);
    msg.extend_from_slice(transcript_hash_a);
    msg
}

/// The four keys derived from the raw KEM shared secret and the A+B
/// transcript hash (spec §4.1 C). Zeroized on drop; `tx`/`rx` are moved out
/// to the caller on success, everything else is discarded with the
/// session.
#[derive(ZeroizeOnDrop)]
pub struct KeySchedule {
    pub tx_init: [u8; 32],
    pub tx_resp: [u8; 32],
    pub fin_key_i: [u8; 32],
    pub fin_key_r: [u8; 32],
}

impl core::fmt::Debug for KeySchedule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeySchedule").finish_non_exhaustive()
    }
}

/// Run the key schedule: `prk = HKDF-Extract(salt=transcriptHash_AB,
/// ikm=ss)`, then four labeled HKDF-Expand calls.
pub fn derive_key_schedule(shared_secret: &[u8], transcript_hash_ab: &[u8; 32]) -> Result<KeySchedule> {
    let mut prk = hkdf_extract(transcript_hash_ab, shared_secret);
    let tx_init = hkdf_expand_32(&prk, b"init->resp")?;
    let tx_resp = hkdf_expand_32(&prk, b"resp->init")?;
    let fin_key_i = hkdf_expand_32(&prk, b"fin-init")?;
    let fin_key_r = hkdf_expand_32(&prk, b"fin-resp")?;
    prk.zeroize();
    Ok(KeySchedule {
        tx_init,
        tx_resp,
        fin_key_i,
        fin_key_r,
    })
}
