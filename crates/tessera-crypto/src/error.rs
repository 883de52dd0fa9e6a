//! Error taxonomy shared by every provider tier

use crate::suite::{CryptoSuite, KeyUsage};

/// Errors that can occur in cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Key usage mismatch: expected {expected}, got {actual}")]
    KeyUsageMismatch { expected: KeyUsage, actual: KeyUsage },

    #[error("Suite mismatch: expected {expected}, got {actual}")]
    SuiteMismatch {
        expected: CryptoSuite,
        actual: CryptoSuite,
    },

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Encapsulation failed")]
    EncapsulationFailed,

    #[error("Decapsulation failed")]
    DecapsulationFailed,

    #[error("Signature failed")]
    SignatureFailed,

    #[error("Invalid nonce length: expected 0 or 12, got {0}")]
    InvalidNonceLength(usize),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(&'static str),

    #[error("Provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Keychain error: {0}")]
    Keychain(String),

    /// Catch-all for primitive failures, AEAD authentication included.
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;

impl CryptoError {
    /// The single error every envelope decryption failure collapses into.
    pub(crate) fn open_failed() -> Self {
        CryptoError::OperationFailed("envelope could not be opened".to_string())
    }
}
