//! Length-prefixed TLV wire codec (spec §4.4). Hand-rolled, the way the
//! teacher's `hybrid_handshake.rs` builds and parses its own wire format,
//! rather than pulling in a generic serialization crate for three fixed
//! message shapes.

use crate::error::{Error, Result};
use crate::provider::IdentityPublicKeys;
use crate::suite::{CryptoSuite, SignatureAlgorithm};

pub const WIRE_VERSION: u8 = 1;

/// Maximum total handshake wire size across all three messages (spec §4.4).
pub const MAX_HANDSHAKE_WIRE_BYTES: usize = 64 * 1024;

pub(crate) const MSG_TYPE_A: u8 = 0x01;
pub(crate) const MSG_TYPE_B: u8 = 0x02;
pub(crate) const MSG_TYPE_C: u8 = 0x03;

const TAG_OFFERED_SUITES: u8 = 0x01;
const TAG_KEM_PK: u8 = 0x02;
const TAG_IDENTITY_PK: u8 = 0x03;
const TAG_NONCE: u8 = 0x04;
const TAG_SIG: u8 = 0x05;
const TAG_CHOSEN_SUITE: u8 = 0x01;
const TAG_KEM_CIPHERTEXT: u8 = 0x02;
const TAG_FINISHED_MAC: u8 = 0x01;

fn push_field(out: &mut Vec<u8>, tag: u8, bytes: &[u8]) -> Result<()> {
    let len: u16 = bytes
        .len()
        .try_into()
        .map_err(|_| Error::malformed("field too large for a u16 length prefix"))?;
    out.push(tag);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

fn frame(msg_type: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let len: u16 = payload
        .len()
        .try_into()
        .map_err(|_| Error::malformed("payload too large for a u16 length prefix"))?;
    let mut out = Vec::with_capacity(4 + payload.len());
    out.push(msg_type);
    out.push(WIRE_VERSION);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    check_total_size(out.len())?;
    Ok(out)
}

fn check_total_size(len: usize) -> Result<()> {
    if len > MAX_HANDSHAKE_WIRE_BYTES {
        return Err(Error::MessageTooLarge);
    }
    Ok(())
}

/// One `tag || u16BE len || bytes` field read off the front of `input`.
struct FieldCursor<'a> {
    input: &'a [u8],
}

impl<'a> FieldCursor<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    fn next_field(&mut self, expected_tag: u8) -> Result<&'a [u8]> {
        if self.input.len() < 3 {
            return Err(Error::malformed("truncated field header"));
        }
        let tag = self.input[0];
        if tag != expected_tag {
            return Err(Error::malformed(format!(
                "expected field tag {expected_tag:#x}, got {tag:#x}"
            )));
        }
        let len = u16::from_be_bytes([self.input[1], self.input[2]]) as usize;
        let rest = &self.input[3..];
        if rest.len() < len {
            return Err(Error::malformed("field length exceeds remaining payload"));
        }
        let (value, tail) = rest.split_at(len);
        self.input = tail;
        Ok(value)
    }

    fn finish(self) -> Result<()> {
        if !self.input.is_empty() {
            return Err(Error::malformed("trailing bytes after last field"));
        }
        Ok(())
    }
}

/// A parsed frame header plus its payload slice, before per-message-type
/// field decoding.
struct Header<'a> {
    msg_type: u8,
    payload: &'a [u8],
}

fn parse_header(input: &[u8]) -> Result<Header<'_>> {
    check_total_size(input.len())?;
    if input.len() < 4 {
        return Err(Error::malformed("frame shorter than the fixed header"));
    }
    let msg_type = input[0];
    let version = input[1];
    if version != WIRE_VERSION {
        return Err(Error::UnsupportedVersion(version));
    }
    let len = u16::from_be_bytes([input[2], input[3]]) as usize;
    let payload = &input[4..];
    if payload.len() != len {
        return Err(Error::malformed("declared payload length does not match frame size"));
    }
    Ok(Header { msg_type, payload })
}

/// `IdentityPublicKeys` encoded as: `u8 algorithm || u16BE len ||
/// protocol_public_key || u8 has_enclave_key || [u16BE len || bytes]`.
pub fn encode_identity_public_keys(identity: &IdentityPublicKeys) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.push(identity.protocol_algorithm.wire_id());
    let pk_len: u16 = identity
        .protocol_public_key
        .len()
        .try_into()
        .map_err(|_| Error::malformed("identity public key too large"))?;
    out.extend_from_slice(&pk_len.to_be_bytes());
    out.extend_from_slice(&identity.protocol_public_key);
    match &identity.secure_enclave_public_key {
        None => out.push(0),
        Some(enclave_key) => {
            out.push(1);
            let enclave_len: u16 = enclave_key
                .len()
                .try_into()
                .map_err(|_| Error::malformed("secure enclave public key too large"))?;
            out.extend_from_slice(&enclave_len.to_be_bytes());
            out.extend_from_slice(enclave_key);
        }
    }
    Ok(out)
}

pub fn decode_identity_public_keys(input: &[u8]) -> Result<IdentityPublicKeys> {
    if input.is_empty() {
        return Err(Error::malformed("empty identity blob"));
    }
    let protocol_algorithm = SignatureAlgorithm::from_wire_id(input[0])?;
    if input.len() < 3 {
        return Err(Error::malformed("truncated identity blob"));
    }
    let pk_len = u16::from_be_bytes([input[1], input[2]]) as usize;
    let rest = &input[3..];
    if rest.len() < pk_len {
        return Err(Error::malformed("identity blob public key length mismatch"));
    }
    if pk_len > protocol_algorithm.max_public_key_len() {
        return Err(Error::malformed("identity public key exceeds algorithm bound"));
    }
    let (protocol_public_key, rest) = rest.split_at(pk_len);
    if rest.is_empty() {
        return Err(Error::malformed("missing secure-enclave-presence flag"));
    }
    let has_enclave = rest[0];
    let rest = &rest[1..];
    let secure_enclave_public_key = match has_enclave {
        0 => {
            if !rest.is_empty() {
                return Err(Error::malformed("trailing bytes after absent enclave key"));
            }
            None
        }
        1 => {
            if rest.len() < 2 {
                return Err(Error::malformed("truncated enclave key length"));
            }
            let enclave_len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
            let enclave_bytes = &rest[2..];
            if enclave_bytes.len() != enclave_len {
                return Err(Error::malformed("enclave key length mismatch"));
            }
            Some(enclave_bytes.to_vec())
        }
        other => return Err(Error::malformed(format!("invalid enclave-presence flag {other}"))),
    };
    Ok(IdentityPublicKeys {
        protocol_public_key: protocol_public_key.to_vec(),
        protocol_algorithm,
        secure_enclave_public_key,
    })
}

/// Decoded/encoded view of MessageA (spec §4.4).
#[derive(Debug, Clone)]
pub struct MessageA {
    pub offered_suites_wire_ids: Vec<u8>,
    pub initiator_kem_pk: Vec<u8>,
    pub initiator_identity_pk: Vec<u8>,
    pub initiator_nonce: [u8; 32],
    pub sig_a: Vec<u8>,
}

impl MessageA {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        push_field(&mut payload, TAG_OFFERED_SUITES, &self.offered_suites_wire_ids)?;
        push_field(&mut payload, TAG_KEM_PK, &self.initiator_kem_pk)?;
        push_field(&mut payload, TAG_IDENTITY_PK, &self.initiator_identity_pk)?;
        push_field(&mut payload, TAG_NONCE, &self.initiator_nonce)?;
        push_field(&mut payload, TAG_SIG, &self.sig_a)?;
        frame(MSG_TYPE_A, &payload)
    }

    pub fn decode(input: &[u8]) -> Result<Self> {
        let header = parse_header(input)?;
        if header.msg_type != MSG_TYPE_A {
            return Err(Error::UnexpectedMessage);
        }
        let mut cursor = FieldCursor::new(header.payload);
        let offered_suites_wire_ids = cursor.next_field(TAG_OFFERED_SUITES)?.to_vec();
        let initiator_kem_pk = cursor.next_field(TAG_KEM_PK)?.to_vec();
        let initiator_identity_pk = cursor.next_field(TAG_IDENTITY_PK)?.to_vec();
        let initiator_nonce: [u8; 32] = cursor
            .next_field(TAG_NONCE)?
            .try_into()
            .map_err(|_| Error::malformed("initiator nonce must be 32 bytes"))?;
        let sig_a = cursor.next_field(TAG_SIG)?.to_vec();
        cursor.finish()?;
        Ok(Self {
            offered_suites_wire_ids,
            initiator_kem_pk,
            initiator_identity_pk,
            initiator_nonce,
            sig_a,
        })
    }
}

/// Decoded/encoded view of MessageB (spec §4.4).
#[derive(Debug, Clone)]
pub struct MessageB {
    pub chosen_suite: CryptoSuite,
    pub kem_ciphertext: Vec<u8>,
    pub responder_identity_pk: Vec<u8>,
    pub responder_nonce: [u8; 32],
    pub sig_b: Vec<u8>,
}

impl MessageB {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        push_field(&mut payload, TAG_CHOSEN_SUITE, &[self.chosen_suite.wire_id()])?;
        push_field(&mut payload, TAG_KEM_CIPHERTEXT, &self.kem_ciphertext)?;
        push_field(&mut payload, TAG_IDENTITY_PK, &self.responder_identity_pk)?;
        push_field(&mut payload, TAG_NONCE, &self.responder_nonce)?;
        push_field(&mut payload, TAG_SIG, &self.sig_b)?;
        frame(MSG_TYPE_B, &payload)
    }

    pub fn decode(input: &[u8]) -> Result<Self> {
        let header = parse_header(input)?;
        if header.msg_type != MSG_TYPE_B {
            return Err(Error::UnexpectedMessage);
        }
        let mut cursor = FieldCursor::new(header.payload);
        let chosen_suite_bytes = cursor.next_field(TAG_CHOSEN_SUITE)?;
        if chosen_suite_bytes.len() != 1 {
            return Err(Error::malformed("chosen suite field must be one byte"));
        }
        let chosen_suite = CryptoSuite::from_wire_id(chosen_suite_bytes[0])?;
        let kem_ciphertext = cursor.next_field(TAG_KEM_CIPHERTEXT)?.to_vec();
        let responder_identity_pk = cursor.next_field(TAG_IDENTITY_PK)?.to_vec();
        let responder_nonce: [u8; 32] = cursor
            .next_field(TAG_NONCE)?
            .try_into()
            .map_err(|_| Error::malformed("responder nonce must be 32 bytes"))?;
        let sig_b = cursor.next_field(TAG_SIG)?.to_vec();
        cursor.finish()?;
        Ok(Self {
            chosen_suite,
            kem_ciphertext,
            responder_identity_pk,
            responder_nonce,
            sig_b,
        })
    }
}

/// Decoded/encoded view of MessageC (spec §4.4): a bare 32-byte Finished-MAC.
#[derive(Debug, Clone)]
pub struct MessageC {
    pub finished_mac: [u8; 32],
}

impl MessageC {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        push_field(&mut payload, TAG_FINISHED_MAC, &self.finished_mac)?;
        frame(MSG_TYPE_C, &payload)
    }

    pub fn decode(input: &[u8]) -> Result<Self> {
        let header = parse_header(input)?;
        if header.msg_type != MSG_TYPE_C {
            return Err(Error::UnexpectedMessage);
        }
        let mut cursor = FieldCursor::new(header.payload);
        let finished_mac: [u8; 32] = cursor
            .next_field(TAG_FINISHED_MAC)?
            .try_into()
            .map_err(|_| Error::malformed("finished MAC must be 32 bytes"))?;
        cursor.finish()?;
        Ok(Self { finished_mac })
    }
}

/// Peek a frame's message type without fully decoding it, so the driver can
/// dispatch before committing to a specific message struct.
pub fn peek_msg_type(input: &[u8]) -> Result<u8> {
    parse_header(input).map(|h| h.msg_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::SignatureAlgorithm;

    #[test]
    fn message_a_round_trips() {
        let msg = MessageA {
            offered_suites_wire_ids: vec![0x01, 0x03],
            initiator_kem_pk: vec![7; 32],
            initiator_identity_pk: encode_identity_public_keys(&IdentityPublicKeys::software(
                vec![9; 32],
                SignatureAlgorithm::Ed25519,
            ))
            .unwrap(),
            initiator_nonce: [1u8; 32],
            sig_a: vec![5; 64],
        };
        let bytes = msg.encode().unwrap();
        let decoded = MessageA::decode(&bytes).unwrap();
        assert_eq!(decoded.offered_suites_wire_ids, msg.offered_suites_wire_ids);
        assert_eq!(decoded.initiator_kem_pk, msg.initiator_kem_pk);
        assert_eq!(decoded.initiator_nonce, msg.initiator_nonce);
        assert_eq!(decoded.sig_a, msg.sig_a);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let msg = MessageC { finished_mac: [0u8; 32] };
        let mut bytes = msg.encode().unwrap();
        bytes[1] = 2;
        assert!(matches!(MessageC::decode(&bytes), Err(Error::UnsupportedVersion(2))));
    }

    #[test]
    fn truncated_field_is_malformed() {
        let msg = MessageC { finished_mac: [0u8; 32] };
        let mut bytes = msg.encode().unwrap();
        bytes.truncate(bytes.len() - 10);
        assert!(matches!(MessageC::decode(&bytes), Err(Error::MalformedMessage(_))));
    }

    #[test]
    fn identity_blob_round_trips_with_and_without_enclave_key() {
        let plain = IdentityPublicKeys::software(vec![1; 32], SignatureAlgorithm::Ed25519);
        let encoded = encode_identity_public_keys(&plain).unwrap();
        assert_eq!(decode_identity_public_keys(&encoded).unwrap(), plain);

        let mut with_enclave = plain.clone();
        with_enclave.secure_enclave_public_key = Some(vec![2; 32]);
        let encoded = encode_identity_public_keys(&with_enclave).unwrap();
        assert_eq!(decode_identity_public_keys(&encoded).unwrap(), with_enclave);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let huge = vec![0u8; MAX_HANDSHAKE_WIRE_BYTES + 1];
        assert!(matches!(parse_header(&huge), Err(Error::MessageTooLarge)));
    }

    proptest::proptest! {
        /// MessageA round-trips for any field lengths that fit the wire
        /// format's u16 length prefixes, the same kind of codec round-trip
        /// property the teacher exercises over its own wire formats.
        #[test]
        fn message_a_round_trips_over_arbitrary_field_lengths(
            offered in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..8),
            kem_pk in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64),
            identity_pk in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..64),
            nonce in proptest::prelude::any::<[u8; 32]>(),
            sig in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..128),
        ) {
            let msg = MessageA {
                offered_suites_wire_ids: offered,
                initiator_kem_pk: kem_pk,
                initiator_identity_pk: identity_pk,
                initiator_nonce: nonce,
                sig_a: sig,
            };
            let bytes = msg.encode().unwrap();
            let decoded = MessageA::decode(&bytes).unwrap();
            proptest::prop_assert_eq!(decoded.offered_suites_wire_ids, msg.offered_suites_wire_ids);
            proptest::prop_assert_eq!(decoded.initiator_kem_pk, msg.initiator_kem_pk);
            proptest::prop_assert_eq!(decoded.initiator_identity_pk, msg.initiator_identity_pk);
            proptest::prop_assert_eq!(decoded.initiator_nonce, msg.initiator_nonce);
            proptest::prop_assert_eq!(decoded.sig_a, msg.sig_a);
        }

        /// Any single-bit flip anywhere in an encoded MessageC must either
        /// be rejected outright or decode to a different MAC value — never
        /// silently decode to the same bytes (spec §8 "transcript binding").
        #[test]
        fn message_c_bit_flip_never_decodes_identically(
            mac in proptest::prelude::any::<[u8; 32]>(),
            bit_index in 0usize..(4 + 1 + 2 + 32) * 8,
        ) {
            let msg = MessageC { finished_mac: mac };
            let mut bytes = msg.encode().unwrap();
            let byte_index = bit_index / 8;
            bytes[byte_index] ^= 1 << (bit_index % 8);
            match MessageC::decode(&bytes) {
                Ok(decoded) => proptest::prop_assert_ne!(decoded.finished_mac, mac),
                Err(_) => {}
            }
        }
    }
}
