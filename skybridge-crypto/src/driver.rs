//! The per-peer handshake driver (spec §4.1): exchanges three framed
//! messages, derives session keys, and surfaces metrics. One
//! [`HandshakeSession`] per peer, no shared mutable state between peers —
//! callers serialize access to a single driver instance exactly as
//! `AeadSession` in the teacher's `nyx-crypto::session` assumes exclusive
//! ownership per direction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::provider::{CryptoProvider, IdentityPublicKeys, KemCiphertext, KemPublicKey, SigningKeyHandle};
use crate::registry::{self, CryptoPolicy, HandshakePolicy, OfferedSuites, Strategy};
use crate::suite::CryptoSuite;
use crate::transcript::{self, derive_key_schedule, Role, Transcript};
use crate::transport::Transport;
use crate::trust::TrustProvider;
use crate::types::{HandshakeMetrics, Nonce, PeerId, SessionKeys};
use crate::wire::{self, MessageA, MessageB, MessageC};

/// This endpoint's long-term identity: the signing key handle the provider
/// consumes, and the public blob sent on the wire. The driver never
/// inspects `signing_key`'s bytes.
pub struct Identity {
    pub public_keys: IdentityPublicKeys,
    pub signing_key: SigningKeyHandle,
}

/// A cooperative cancellation flag. Cheap to clone; checked once per
/// iteration of `initiate_handshake`'s wait loop, the same cadence the
/// deadline is checked at (spec §9 "Deadline handling").
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-session state machine position (spec §4.1 state table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    AwaitingMessageB,
    AwaitingMessageC,
    AwaitingFinishedAck,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl HandshakeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            HandshakeState::Completed
                | HandshakeState::Failed
                | HandshakeState::TimedOut
                | HandshakeState::Cancelled
        )
    }
}

/// One in-flight handshake with one peer. Every field that can hold key
/// material is zeroized on drop, directly (`Zeroizing<[u8; 32]>`) or via
/// the wrapper types in `provider`/`transcript`.
struct HandshakeSession {
    peer: PeerId,
    role: Role,
    state: HandshakeState,
    offered: Option<OfferedSuites>,
    chosen: Option<CryptoSuite>,
    ephemeral_kem_private: Option<crate::provider::EphemeralKemPrivate>,
    transcript: Transcript,
    transcript_hash_ab: Option<[u8; 32]>,
    tx_key: Option<Zeroizing<[u8; 32]>>,
    rx_key: Option<Zeroizing<[u8; 32]>>,
    fin_key_mine: Option<Zeroizing<[u8; 32]>>,
    fin_key_theirs: Option<Zeroizing<[u8; 32]>>,
    started_at: Instant,
    deadline: Instant,
    rtt_anchor: Instant,
    message_a_wire_bytes: usize,
    message_b_wire_bytes: usize,
    sig_a_algorithm: Option<crate::suite::SignatureAlgorithm>,
}

impl HandshakeSession {
    fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Drives one peer's handshake per call; the driver itself holds no
/// mutable state shared across peers beyond the `sessions` map keyed by
/// `PeerId`.
pub struct HandshakeDriver<P: CryptoProvider> {
    provider: P,
    identity: Identity,
    trust: Box<dyn TrustProvider>,
    crypto_policy: CryptoPolicy,
    handshake_policy: HandshakePolicy,
    strategy: Strategy,
    timeout: Duration,
    sessions: HashMap<PeerId, HandshakeSession>,
    completed: HashMap<PeerId, SessionKeys>,
    last_metrics: Option<HandshakeMetrics>,
}

impl<P: CryptoProvider> HandshakeDriver<P> {
    pub fn new(
        provider: P,
        identity: Identity,
        trust: Box<dyn TrustProvider>,
        crypto_policy: CryptoPolicy,
        handshake_policy: HandshakePolicy,
        strategy: Strategy,
        timeout: Duration,
    ) -> Result<Self> {
        crypto_policy.validate()?;
        Ok(Self {
            provider,
            identity,
            trust,
            crypto_policy,
            handshake_policy,
            strategy,
            timeout,
            sessions: HashMap::new(),
            completed: HashMap::new(),
            last_metrics: None,
        })
    }

    /// Current state of an in-flight or just-terminated session, for
    /// harness glue that needs to know when to stop polling a responder.
    pub fn session_state(&self, peer: &PeerId) -> Option<HandshakeState> {
        self.sessions.get(peer).map(|s| s.state)
    }

    /// Take the output of a completed session. Once taken, the peer slot
    /// is free for a new handshake.
    pub fn take_session_keys(&mut self, peer: &PeerId) -> Option<SessionKeys> {
        self.completed.remove(peer)
    }

    /// Snapshot of the most recently completed handshake's metrics.
    /// Returns byte-equal results across repeated calls (spec §8).
    pub fn get_last_metrics(&self) -> Option<HandshakeMetrics> {
        self.last_metrics.clone()
    }

    /// Sweep sessions whose deadline has passed without reaching a
    /// terminal state, failing them with `TimedOut`. Call periodically
    /// from whatever drives the responder side of a peer's messages, the
    /// same role a timer-wheel plays in a real scheduler (spec §9).
    pub fn expire_overdue_sessions(&mut self) -> Vec<PeerId> {
        let now = Instant::now();
        let overdue: Vec<PeerId> = self
            .sessions
            .iter()
            .filter(|(_, s)| !s.is_terminal() && now >= s.deadline)
            .map(|(peer, _)| peer.clone())
            .collect();
        for peer in &overdue {
            warn!(peer = %peer, "handshake session expired");
            self.sessions.remove(peer);
        }
        overdue
    }

    /// Initiator role: build and send MessageA, then block (via
    /// `transport.recv`) until the handshake completes, fails, times out,
    /// or `cancellation` is set.
    pub fn initiate_handshake(
        &mut self,
        peer: PeerId,
        transport: &dyn Transport,
        cancellation: &CancellationToken,
    ) -> Result<SessionKeys> {
        if let Some(existing) = self.sessions.get(&peer) {
            if !existing.is_terminal() {
                return Err(Error::SessionAlreadyInProgress);
            }
        }
        self.sessions.remove(&peer);

        let offered = registry::offered(self.strategy, &self.crypto_policy, &self.handshake_policy, &self.provider)?;
        debug!(peer = %peer, offered = ?offered.as_slice(), "initiator built offer");

        let kem_keypair = self.provider.generate_kem_keypair(offered.first())?;
        let nonce = Nonce::random();
        let identity_pk_encoded = wire::encode_identity_public_keys(&self.identity.public_keys)?;

        let sig_a_msg = transcript::sig_a_message(
            &offered.to_wire_ids(),
            &kem_keypair.public.0,
            &identity_pk_encoded,
            &nonce.0,
            peer.as_str().as_bytes(),
        );
        let sig_a = self
            .provider
            .sign(self.identity.public_keys.protocol_algorithm, &self.identity.signing_key, &sig_a_msg)?;

        let message_a = MessageA {
            offered_suites_wire_ids: offered.to_wire_ids(),
            initiator_kem_pk: kem_keypair.public.0.clone(),
            initiator_identity_pk: identity_pk_encoded,
            initiator_nonce: nonce.0,
            sig_a,
        };
        let message_a_bytes = message_a.encode()?;

        let started_at = Instant::now();
        let deadline = started_at + self.timeout;
        let mut transcript = Transcript::new();
        transcript.mix(&message_a_bytes);

        let session = HandshakeSession {
            peer: peer.clone(),
            role: Role::Initiator,
            state: HandshakeState::AwaitingMessageB,
            offered: Some(offered),
            chosen: None,
            ephemeral_kem_private: Some(kem_keypair.private),
            transcript,
            transcript_hash_ab: None,
            tx_key: None,
            rx_key: None,
            fin_key_mine: None,
            fin_key_theirs: None,
            started_at,
            deadline,
            rtt_anchor: started_at,
            message_a_wire_bytes: message_a_bytes.len(),
            message_b_wire_bytes: 0,
            sig_a_algorithm: Some(self.identity.public_keys.protocol_algorithm),
        };
        self.sessions.insert(peer.clone(), session);

        if let Err(e) = transport.send(&peer, message_a_bytes) {
            return Err(self.fail_session(&peer, e));
        }

        loop {
            if cancellation.is_cancelled() {
                return Err(self.fail_session(&peer, Error::Cancelled));
            }
            let deadline = match self.sessions.get(&peer) {
                Some(s) => s.deadline,
                None => return Err(Error::TransportFailure("session vanished unexpectedly".into())),
            };
            if Instant::now() >= deadline {
                return Err(self.fail_session(&peer, Error::TimedOut));
            }
            match transport.recv(deadline) {
                Ok(Some(bytes)) => match self.step(&peer, &bytes, transport) {
                    Ok(HandshakeState::Completed) => {
                        return Ok(self.take_session_keys(&peer).expect("just completed"));
                    }
                    Ok(_) => continue,
                    Err(e) => return Err(e),
                },
                Ok(None) => continue,
                Err(e) => return Err(self.fail_session(&peer, e)),
            }
        }
    }

    /// Non-blocking: parse one inbound frame, advance the state machine,
    /// and emit any required reply via `transport`.
    pub fn handle_message(&mut self, bytes: &[u8], from_peer: &PeerId, transport: &dyn Transport) -> Result<()> {
        self.step(from_peer, bytes, transport)?;
        Ok(())
    }

    fn step(&mut self, peer: &PeerId, bytes: &[u8], transport: &dyn Transport) -> Result<HandshakeState> {
        if let Some(session) = self.sessions.get(peer) {
            if Instant::now() >= session.deadline {
                return Err(self.fail_session(peer, Error::TimedOut));
            }
        }

        let msg_type = match wire::peek_msg_type(bytes) {
            Ok(t) => t,
            Err(e) => return Err(self.fail_session(peer, e)),
        };
        let existing_state = self.sessions.get(peer).map(|s| s.state);

        match (existing_state, msg_type) {
            (None, wire::MSG_TYPE_A) => self.responder_handle_message_a(peer, bytes, transport),
            (Some(HandshakeState::AwaitingMessageB), wire::MSG_TYPE_B) => {
                self.initiator_handle_message_b(peer, bytes, transport)
            }
            (Some(HandshakeState::AwaitingMessageC), wire::MSG_TYPE_C) => {
                self.responder_handle_message_c(peer, bytes)
            }
            _ => Err(self.fail_session(peer, Error::UnexpectedMessage)),
        }
    }

    fn responder_handle_message_a(
        &mut self,
        peer: &PeerId,
        bytes: &[u8],
        transport: &dyn Transport,
    ) -> Result<HandshakeState> {
        let rtt_anchor = Instant::now();
        let deadline = rtt_anchor + self.timeout;

        let msg_a = MessageA::decode(bytes).map_err(|e| self.fail_session(peer, e))?;
        let offered = OfferedSuites::from_wire_ids(&msg_a.offered_suites_wire_ids)
            .map_err(|e| self.fail_session(peer, e))?;
        let chosen = registry::choose_suite(&offered, &self.crypto_policy, &self.handshake_policy, &self.provider)
            .map_err(|e| self.fail_session(peer, e))?;
        info!(peer = %peer, suite = ?chosen, "responder chose suite");

        let identity = wire::decode_identity_public_keys(&msg_a.initiator_identity_pk)
            .map_err(|e| self.fail_session(peer, e))?;
        if identity.protocol_algorithm != chosen.mandated_signature_algorithm() {
            return Err(self.fail_session(peer, Error::AlgorithmMismatch));
        }

        if let Err(e) = self.check_trust_pins(peer, &identity) {
            return Err(self.fail_session(peer, e));
        }
        if let Err(e) = self.check_kem_pin(peer, chosen, &msg_a.initiator_kem_pk) {
            return Err(self.fail_session(peer, e));
        }

        let sig_a_msg = transcript::sig_a_message(
            &msg_a.offered_suites_wire_ids,
            &msg_a.initiator_kem_pk,
            &msg_a.initiator_identity_pk,
            &msg_a.initiator_nonce,
            peer.as_str().as_bytes(),
        );
        let verified = self
            .provider
            .verify(identity.protocol_algorithm, &identity.protocol_public_key, &sig_a_msg, &msg_a.sig_a)
            .map_err(|e| self.fail_session(peer, e))?;
        if !verified {
            return Err(self.fail_session(peer, Error::SignatureInvalid));
        }

        if self.handshake_policy.strict_pqc && !chosen.is_pqc() {
            return Err(self.fail_session(
                peer,
                Error::policy_violation("strictPQC pre-key-derivation check rejected a non-PQC suite"),
            ));
        }
        if self.identity.public_keys.protocol_algorithm != chosen.mandated_signature_algorithm() {
            return Err(self.fail_session(peer, Error::AlgorithmMismatch));
        }

        let (ciphertext, shared_secret) = self
            .provider
            .encapsulate(chosen, &KemPublicKey(msg_a.initiator_kem_pk.clone()))
            .map_err(|e| self.fail_session(peer, e))?;

        let mut transcript = Transcript::new();
        transcript.mix(bytes);
        let transcript_hash_a = transcript.hash_ab();

        let responder_nonce = Nonce::random();
        let responder_identity_pk_encoded =
            wire::encode_identity_public_keys(&self.identity.public_keys).map_err(|e| self.fail_session(peer, e))?;
        let sig_b_msg = transcript::sig_b_message(
            chosen,
            &ciphertext.0,
            &responder_identity_pk_encoded,
            &responder_nonce.0,
            &transcript_hash_a,
        );
        let sig_b = self
            .provider
            .sign(chosen.mandated_signature_algorithm(), &self.identity.signing_key, &sig_b_msg)
            .map_err(|e| self.fail_session(peer, e))?;

        let message_b = MessageB {
            chosen_suite: chosen,
            kem_ciphertext: ciphertext.0,
            responder_identity_pk: responder_identity_pk_encoded,
            responder_nonce: responder_nonce.0,
            sig_b,
        };
        let message_b_bytes = message_b.encode().map_err(|e| self.fail_session(peer, e))?;
        transcript.mix(&message_b_bytes);
        let transcript_hash_ab = transcript.hash_ab();

        let schedule = derive_key_schedule(shared_secret.as_bytes(), &transcript_hash_ab)
            .map_err(|e| self.fail_session(peer, e))?;

        let session = HandshakeSession {
            peer: peer.clone(),
            role: Role::Responder,
            state: HandshakeState::AwaitingMessageC,
            offered: Some(offered),
            chosen: Some(chosen),
            ephemeral_kem_private: None,
            transcript,
            transcript_hash_ab: Some(transcript_hash_ab),
            tx_key: Some(Zeroizing::new(schedule.tx_resp)),
            rx_key: Some(Zeroizing::new(schedule.tx_init)),
            fin_key_mine: Some(Zeroizing::new(schedule.fin_key_r)),
            fin_key_theirs: Some(Zeroizing::new(schedule.fin_key_i)),
            started_at: rtt_anchor,
            deadline,
            rtt_anchor,
            message_a_wire_bytes: bytes.len(),
            message_b_wire_bytes: message_b_bytes.len(),
            sig_a_algorithm: Some(identity.protocol_algorithm),
        };
        self.sessions.insert(peer.clone(), session);

        if let Err(e) = transport.send(peer, message_b_bytes) {
            return Err(self.fail_session(peer, e));
        }
        Ok(HandshakeState::AwaitingMessageC)
    }

    fn initiator_handle_message_b(
        &mut self,
        peer: &PeerId,
        bytes: &[u8],
        transport: &dyn Transport,
    ) -> Result<HandshakeState> {
        let message_b_received_at = Instant::now();

        let msg_b = MessageB::decode(bytes).map_err(|e| self.fail_session(peer, e))?;

        let offered_contains_chosen = self
            .sessions
            .get(peer)
            .and_then(|s| s.offered.as_ref())
            .map(|o| o.contains(msg_b.chosen_suite))
            .unwrap_or(false);
        if !offered_contains_chosen {
            return Err(self.fail_session(
                peer,
                Error::policy_violation("responder chose a suite the initiator never offered"),
            ));
        }

        let identity = wire::decode_identity_public_keys(&msg_b.responder_identity_pk)
            .map_err(|e| self.fail_session(peer, e))?;
        if identity.protocol_algorithm != msg_b.chosen_suite.mandated_signature_algorithm() {
            return Err(self.fail_session(peer, Error::AlgorithmMismatch));
        }
        if self.handshake_policy.strict_pqc && !msg_b.chosen_suite.is_pqc() {
            return Err(self.fail_session(
                peer,
                Error::policy_violation("strictPQC pre-key-derivation check rejected a non-PQC suite"),
            ));
        }

        let transcript_hash_a = self
            .sessions
            .get(peer)
            .map(|s| s.transcript.hash_ab())
            .ok_or_else(|| Error::TransportFailure("session vanished unexpectedly".into()))?;

        let sig_b_msg = transcript::sig_b_message(
            msg_b.chosen_suite,
            &msg_b.kem_ciphertext,
            &msg_b.responder_identity_pk,
            &msg_b.responder_nonce,
            &transcript_hash_a,
        );
        let verified = self
            .provider
            .verify(identity.protocol_algorithm, &identity.protocol_public_key, &sig_b_msg, &msg_b.sig_b)
            .map_err(|e| self.fail_session(peer, e))?;
        if !verified {
            return Err(self.fail_session(peer, Error::SignatureInvalid));
        }

        let ephemeral_private = self
            .sessions
            .get(peer)
            .and_then(|s| s.ephemeral_kem_private.as_ref())
            .ok_or_else(|| Error::TransportFailure("session vanished unexpectedly".into()))?;
        let shared_secret = self
            .provider
            .decapsulate(msg_b.chosen_suite, ephemeral_private, &KemCiphertext(msg_b.kem_ciphertext.clone()))
            .map_err(|e| self.fail_session(peer, e))?;

        let session = self
            .sessions
            .get_mut(peer)
            .ok_or_else(|| Error::TransportFailure("session vanished unexpectedly".into()))?;
        session.transcript.mix(bytes);
        let transcript_hash_ab = session.transcript.hash_ab();

        let schedule = match derive_key_schedule(shared_secret.as_bytes(), &transcript_hash_ab) {
            Ok(s) => s,
            Err(e) => return Err(self.fail_session(peer, e)),
        };
        let finished_tag = transcript::compute_finished_mac(&schedule.fin_key_i, &transcript_hash_ab, Role::Initiator);
        let message_c = MessageC { finished_mac: finished_tag };
        let message_c_bytes = match message_c.encode() {
            Ok(b) => b,
            Err(e) => return Err(self.fail_session(peer, e)),
        };

        let rtt_ms = message_b_received_at.duration_since(self.sessions[peer].started_at).as_millis() as u64;
        let session = self.sessions.get_mut(peer).expect("session present");
        session.chosen = Some(msg_b.chosen_suite);
        session.transcript_hash_ab = Some(transcript_hash_ab);
        session.tx_key = Some(Zeroizing::new(schedule.tx_init));
        session.rx_key = Some(Zeroizing::new(schedule.tx_resp));
        session.fin_key_mine = Some(Zeroizing::new(schedule.fin_key_i));
        session.fin_key_theirs = Some(Zeroizing::new(schedule.fin_key_r));
        session.message_b_wire_bytes = bytes.len();
        session.state = HandshakeState::AwaitingFinishedAck;

        if let Err(e) = transport.send(peer, message_c_bytes.clone()) {
            return Err(self.fail_session(peer, e));
        }

        let (message_a_wire_bytes, chosen, sig_a_algorithm) = {
            let s = &self.sessions[peer];
            (s.message_a_wire_bytes, s.chosen.expect("set above"), s.sig_a_algorithm.expect("set at initiate"))
        };
        self.last_metrics = Some(HandshakeMetrics {
            rtt_ms,
            message_a_wire_bytes,
            message_b_wire_bytes: bytes.len(),
            finished_wire_bytes: message_c_bytes.len(),
            chosen_suite: chosen,
            sig_a_algorithm,
        });

        let mut completed_session = self.sessions.remove(peer).expect("session present");
        completed_session.state = HandshakeState::Completed;
        let keys = SessionKeys {
            tx_key: *completed_session.tx_key.take().expect("set above"),
            rx_key: *completed_session.rx_key.take().expect("set above"),
            transcript_hash: transcript_hash_ab,
        };
        self.completed.insert(peer.clone(), keys);
        Ok(HandshakeState::Completed)
    }

    fn responder_handle_message_c(&mut self, peer: &PeerId, bytes: &[u8]) -> Result<HandshakeState> {
        let now = Instant::now();
        let msg_c = MessageC::decode(bytes).map_err(|e| self.fail_session(peer, e))?;

        let (fin_key_theirs, transcript_hash_ab, rtt_anchor, message_a_wire_bytes, message_b_wire_bytes, chosen, sig_a_algorithm) = {
            let session = self
                .sessions
                .get(peer)
                .ok_or_else(|| Error::TransportFailure("session vanished unexpectedly".into()))?;
            (
                session.fin_key_theirs.clone().expect("set when MessageB was built"),
                session.transcript_hash_ab.expect("set when MessageB was built"),
                session.rtt_anchor,
                session.message_a_wire_bytes,
                session.message_b_wire_bytes,
                session.chosen.expect("set when MessageB was built"),
                session.sig_a_algorithm.expect("set when MessageA arrived"),
            )
        };

        if let Err(_e) = transcript::verify_finished_mac(&fin_key_theirs, &transcript_hash_ab, Role::Initiator, &msg_c.finished_mac) {
            return Err(self.fail_session(peer, Error::FinishedMacInvalid));
        }

        let rtt_ms = now.duration_since(rtt_anchor).as_millis() as u64;
        self.last_metrics = Some(HandshakeMetrics {
            rtt_ms,
            message_a_wire_bytes,
            message_b_wire_bytes,
            finished_wire_bytes: bytes.len(),
            chosen_suite: chosen,
            sig_a_algorithm,
        });

        let mut completed_session = self.sessions.remove(peer).expect("session present");
        completed_session.state = HandshakeState::Completed;
        let keys = SessionKeys {
            tx_key: *completed_session.tx_key.take().expect("set when MessageB was built"),
            rx_key: *completed_session.rx_key.take().expect("set when MessageB was built"),
            transcript_hash: transcript_hash_ab,
        };
        self.completed.insert(peer.clone(), keys);
        info!(peer = %peer, "responder completed handshake");
        Ok(HandshakeState::Completed)
    }

    fn check_trust_pins(&self, peer: &PeerId, identity: &IdentityPublicKeys) -> Result<()> {
        if let Some(expected_fingerprint) = self.trust.trusted_fingerprint(peer) {
            let actual = hex_encode(&identity.fingerprint());
            if !actual.eq_ignore_ascii_case(&expected_fingerprint) {
                return Err(Error::IdentityPinMismatch);
            }
        }
        if let Some(expected_enclave) = self.trust.trusted_secure_enclave_public_key(peer) {
            match &identity.secure_enclave_public_key {
                Some(actual) if *actual == expected_enclave => {}
                _ => return Err(Error::IdentityPinMismatch),
            }
        }
        Ok(())
    }

    fn check_kem_pin(&self, peer: &PeerId, suite: CryptoSuite, presented_kem_pk: &[u8]) -> Result<()> {
        if !suite.is_pqc() {
            return Ok(());
        }
        let pins = self.trust.trusted_kem_public_keys(peer);
        if let Some(expected) = pins.get(&suite) {
            if expected.as_slice() != presented_kem_pk {
                return Err(Error::KemKeyPinMismatch);
            }
        }
        Ok(())
    }

    /// Remove (and thereby zeroize, via `Drop`) a peer's in-flight
    /// session, and return `err` unchanged so call sites can
    /// `return Err(self.fail_session(peer, err));`.
    fn fail_session(&mut self, peer: &PeerId, err: Error) -> Error {
        self.sessions.remove(peer);
        err
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use core::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
