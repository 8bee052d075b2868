//! Authenticated key-exchange handshake with hybrid post-quantum
//! capability negotiation.
//!
//! Two peers exchange three framed messages ([`wire::MessageA`],
//! [`wire::MessageB`], [`wire::MessageC`]) to agree on a [`suite::CryptoSuite`],
//! derive a pair of directional traffic keys, and bind both to a rolling
//! transcript hash. [`driver::HandshakeDriver`] is the entry point; it is
//! generic over a [`provider::CryptoProvider`], of which this crate ships
//! three ([`providers::classical`], [`providers::pqc`], [`providers::hybrid`])
//! gated behind their respective Cargo features.
#![forbid(unsafe_code)]

pub mod driver;
pub mod error;
pub mod kdf;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod suite;
pub mod transcript;
pub mod transport;
pub mod trust;
pub mod types;
pub mod wire;

pub use error::{Error, Result};
