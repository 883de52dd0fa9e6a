//! Signing key handles
//!
//! Three ways to hold a signing key, all with the same capability: turn an
//! input buffer into a signature.

use std::fmt;
use std::sync::Arc;

use crate::keys::KeyMaterial;
use crate::Result;

/// A key that lives outside this process (secure enclave, TPM, OS keychain).
pub trait PlatformSigner: Send + Sync + fmt::Debug {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

pub type SigningCallback = Box<dyn Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync>;

pub enum SigningKeyHandle {
    /// In-process private key; consumed and zeroized by the signing call.
    Raw(KeyMaterial),
    /// Hardware-backed reference; the platform performs the signature.
    Platform(Arc<dyn PlatformSigner>),
    /// Remote or HSM-backed identity.
    Callback(SigningCallback),
}

impl SigningKeyHandle {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        SigningKeyHandle::Callback(Box::new(f))
    }

    pub fn platform(signer: impl PlatformSigner + 'static) -> Self {
        SigningKeyHandle::Platform(Arc::new(signer))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            SigningKeyHandle::Raw(_) => "raw",
            SigningKeyHandle::Platform(_) => "platform",
            SigningKeyHandle::Callback(_) => "callback",
        }
    }
}

impl From<KeyMaterial> for SigningKeyHandle {
    fn from(key: KeyMaterial) -> Self {
        SigningKeyHandle::Raw(key)
    }
}

impl fmt::Debug for SigningKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningKeyHandle::Raw(key) => f.debug_tuple("Raw").field(key).finish(),
            SigningKeyHandle::Platform(signer) => f.debug_tuple("Platform").field(signer).finish(),
            SigningKeyHandle::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}
