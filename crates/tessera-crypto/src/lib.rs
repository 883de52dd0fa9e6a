//! Tessera Crypto - Hybrid post-quantum provider core
//!
//! This crate provides:
//! - ML-KEM-768 / ML-DSA-65 through a native Rust backend and a PQClean fallback
//! - X-Wing hybrid KEM (ML-KEM-768 + X25519) on the native tier
//! - X25519 / Ed25519 classical tier with HPKE base mode sealing
//! - Sealed envelopes with context binding and exported session secrets
//! - Signing through raw keys, platform signers or callbacks
//! - A tier governor that self-tests providers before activating one

pub mod classic;
pub mod config;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod provider;
pub mod secure;
pub mod selection;
pub mod signing;
pub mod suite;

pub(crate) mod cipher;
mod rng;

#[cfg(feature = "keychain")]
pub mod keychain;
#[cfg(feature = "native-pqc")]
pub mod native;
#[cfg(feature = "software-pqc")]
pub mod software;
#[cfg(feature = "native-pqc")]
mod xwing;

pub use classic::ClassicProvider;
pub use config::CryptoPolicy;
pub use envelope::SealedEnvelope;
pub use error::{CryptoError, Result};
pub use keys::{KeyMaterial, KeyPair};
pub use provider::CryptoProvider;
pub use secure::SecureBuffer;
pub use selection::{provider_for, provider_for_suite, TierGovernor, TierReport};
pub use signing::{PlatformSigner, SigningKeyHandle};
pub use suite::{CryptoSuite, KeyRole, KeyUsage, ProviderTier};

#[cfg(feature = "keychain")]
pub use keychain::KeychainSigner;
#[cfg(feature = "native-pqc")]
pub use native::NativePqcProvider;
#[cfg(feature = "software-pqc")]
pub use software::SoftwarePqcProvider;
