//! Concrete [`crate::provider::CryptoProvider`] bindings, one per security
//! tier. Each binding is feature-gated so a build can ship only the tiers it
//! needs; `full` (the default) carries all three.

#[cfg(feature = "classical")]
pub mod classical;

#[cfg(feature = "pqc")]
pub mod pqc;

#[cfg(feature = "hybrid")]
pub mod hybrid;
