//! Error taxonomy for the handshake core.
//!
//! Every variant corresponds to one fatal condition the driver, registry,
//! codec, or provider layer can raise. None of these are retried inside
//! this crate; callers that want retry/fallback policy (e.g. falling back
//! from a failed PQC attempt to a classical one) implement it above us.

use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("initiator built an empty offered-suites list")]
    EmptyOfferedSuites,

    #[error("no suite is mutually acceptable after policy filtering")]
    NoMutuallyAcceptableSuite,

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    #[error("handshake wire size exceeds the 64 KiB bound")]
    MessageTooLarge,

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("finished-MAC verification failed")]
    FinishedMacInvalid,

    #[error("KEM operation failed: {0}")]
    KemFailure(String),

    #[error("peer identity fingerprint does not match the pinned value")]
    IdentityPinMismatch,

    #[error("peer KEM public key does not match the pinned value")]
    KemKeyPinMismatch,

    #[error("signature algorithm does not match the suite's mandated algorithm")]
    AlgorithmMismatch,

    #[error("unexpected message type for the current state")]
    UnexpectedMessage,

    #[error("a handshake with this peer is already in progress")]
    SessionAlreadyInProgress,

    #[error("handshake deadline elapsed")]
    TimedOut,

    #[error("handshake was cancelled")]
    Cancelled,

    #[error("transport failure: {0}")]
    TransportFailure(String),
}

impl Error {
    pub fn policy_violation(msg: impl Into<String>) -> Self {
        Self::PolicyViolation(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedMessage(msg.into())
    }

    pub fn kem_failure(msg: impl Into<String>) -> Self {
        Self::KemFailure(msg.into())
    }

    pub fn transport_failure(msg: impl Into<String>) -> Self {
        Self::TransportFailure(msg.into())
    }

    /// True for errors the driver treats as fatal-with-secret-wipe (all but
    /// `SessionAlreadyInProgress`, which the caller may retry once the prior
    /// session reaches a terminal state).
    pub fn is_fatal_to_session(&self) -> bool {
        !matches!(self, Error::SessionAlreadyInProgress)
    }
}
