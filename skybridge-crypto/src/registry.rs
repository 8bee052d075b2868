//! Suite registry and policy: turns a strategy tag and a provider's
//! capabilities into an ordered offer, and turns an initiator's offer into
//! a responder's chosen suite. Pure — no I/O, no time (spec §4.2).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::provider::CryptoProvider;
use crate::suite::{CryptoSuite, SecurityTier};

/// Which family of suites an endpoint wants to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ClassicOnly,
    PqcOnly,
    HybridPreferred,
}

/// Ordered, deduplicated, non-empty sequence of suites. Order conveys
/// initiator preference, most-preferred first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferedSuites(Vec<CryptoSuite>);

impl OfferedSuites {
    pub fn new(suites: Vec<CryptoSuite>) -> Result<Self> {
        let mut seen = Vec::with_capacity(suites.len());
        for suite in suites {
            if !seen.contains(&suite) {
                seen.push(suite);
            }
        }
        if seen.is_empty() {
            return Err(Error::EmptyOfferedSuites);
        }
        Ok(Self(seen))
    }

    pub fn as_slice(&self) -> &[CryptoSuite] {
        &self.0
    }

    pub fn first(&self) -> CryptoSuite {
        self.0[0]
    }

    pub fn contains(&self, suite: CryptoSuite) -> bool {
        self.0.contains(&suite)
    }

    pub fn to_wire_ids(&self) -> Vec<u8> {
        self.0.iter().map(|s| s.wire_id()).collect()
    }

    pub fn from_wire_ids(ids: &[u8]) -> Result<Self> {
        let suites = ids
            .iter()
            .map(|id| CryptoSuite::from_wire_id(*id))
            .collect::<Result<Vec<_>>>()?;
        Self::new(suites)
    }
}

/// Tunable crypto-suite acceptance rules (spec §3 `CryptoPolicy`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoPolicy {
    pub minimum_security_tier: SecurityTier,
    pub allow_experimental_hybrid: bool,
    pub advertise_hybrid: bool,
    pub require_hybrid_if_available: bool,
}

impl Default for CryptoPolicy {
    fn default() -> Self {
        Self {
            minimum_security_tier: SecurityTier::Classical,
            allow_experimental_hybrid: false,
            advertise_hybrid: false,
            require_hybrid_if_available: false,
        }
    }
}

impl CryptoPolicy {
    /// Load a `CryptoPolicy` from a TOML document, the way
    /// `nyx-core::config` loads its own config structs, then run
    /// `validate()` before handing it back. Missing fields fall back to
    /// `Default::default()` per field thanks to `#[serde(default)]`.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let policy: Self = toml::from_str(toml_str)
            .map_err(|e| Error::policy_violation(format!("invalid crypto policy TOML: {e}")))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Rejects contradictory configurations before they reach the driver
    /// (e.g. requiring hybrid while refusing to advertise or accept it).
    pub fn validate(&self) -> Result<()> {
        if self.require_hybrid_if_available && !self.allow_experimental_hybrid {
            return Err(Error::policy_violation(
                "require_hybrid_if_available set without allow_experimental_hybrid",
            ));
        }
        if self.minimum_security_tier == SecurityTier::HybridPreferred
            && !self.allow_experimental_hybrid
        {
            return Err(Error::policy_violation(
                "minimum_security_tier=hybridPreferred requires allow_experimental_hybrid",
            ));
        }
        Ok(())
    }
}

/// Top-level handshake strictness (spec §3 `HandshakePolicy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakePolicy {
    /// Rejects any message that negotiates or names a non-PQC suite.
    /// Enforced at exactly two points (spec §9 open question,
    /// consolidated here): offer construction (initiator) and
    /// pre-key-derivation validation (both sides).
    pub strict_pqc: bool,
}

impl HandshakePolicy {
    pub const fn strict_pqc() -> Self {
        Self { strict_pqc: true }
    }

    /// Load a `HandshakePolicy` from a TOML document; missing fields fall
    /// back to `Default::default()` per field thanks to `#[serde(default)]`.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| Error::policy_violation(format!("invalid handshake policy TOML: {e}")))
    }
}

/// Build the ordered offer for `strategy` from what `provider` can speak,
/// filtered by `crypto_policy` and `handshake_policy` (spec §4.2).
pub fn offered(
    strategy: Strategy,
    crypto_policy: &CryptoPolicy,
    handshake_policy: &HandshakePolicy,
    provider: &dyn CryptoProvider,
) -> Result<OfferedSuites> {
    let mut candidates: Vec<CryptoSuite> = match strategy {
        Strategy::ClassicOnly => CryptoSuite::ALL.iter().copied().filter(|s| !s.is_pqc()).collect(),
        Strategy::PqcOnly => CryptoSuite::ALL
            .iter()
            .copied()
            .filter(|s| s.is_pqc() && !s.is_hybrid())
            .collect(),
        Strategy::HybridPreferred => {
            let hybrid = CryptoSuite::ALL.iter().copied().filter(|s| s.is_hybrid());
            let pqc = CryptoSuite::ALL
                .iter()
                .copied()
                .filter(|s| s.is_pqc() && !s.is_hybrid());
            let classic = CryptoSuite::ALL.iter().copied().filter(|s| !s.is_pqc());
            hybrid.chain(pqc).chain(classic).collect()
        }
    };

    candidates.retain(|s| provider.supported_suites().contains(s));
    candidates.retain(|s| !s.is_hybrid() || crypto_policy.advertise_hybrid);
    if handshake_policy.strict_pqc {
        candidates.retain(|s| s.is_pqc());
    }

    OfferedSuites::new(candidates)
}

/// `true` if `provider` can speak `suite` at all, ignoring policy.
pub fn supports(suite: CryptoSuite, provider: &dyn CryptoProvider) -> bool {
    provider.supported_suites().contains(&suite)
}

/// Responder-side suite choice (spec §4.1 Algorithm A). `offered` is the
/// initiator's list; the intersection preserves initiator preference order
/// and wire-id is only a tie-breaker, which a deduplicated ordered list
/// never actually needs — it is documented here to match the spec text.
pub fn choose_suite(
    offered: &OfferedSuites,
    crypto_policy: &CryptoPolicy,
    handshake_policy: &HandshakePolicy,
    provider: &dyn CryptoProvider,
) -> Result<CryptoSuite> {
    let mut candidates: Vec<CryptoSuite> = offered
        .as_slice()
        .iter()
        .copied()
        .filter(|s| provider.supported_suites().contains(s))
        .collect();

    candidates.retain(|s| s.security_tier() >= crypto_policy.minimum_security_tier);
    if !crypto_policy.allow_experimental_hybrid {
        candidates.retain(|s| !s.is_hybrid());
    }
    if crypto_policy.require_hybrid_if_available && candidates.iter().any(|s| s.is_hybrid()) {
        candidates.retain(|s| s.is_hybrid());
    }

    candidates.sort_by_key(|s| s.wire_id());
    candidates.sort_by_key(|s| offered.as_slice().iter().position(|o| o == s).unwrap_or(usize::MAX));

    let chosen = candidates.into_iter().next().ok_or(Error::NoMutuallyAcceptableSuite)?;

    if handshake_policy.strict_pqc && !chosen.is_pqc() {
        return Err(Error::policy_violation(
            "strictPQC handshake policy chose a non-PQC suite",
        ));
    }

    Ok(chosen)
}
