//! Key material and key pairs
//!
//! Bytes are tagged with suite, usage and role so a provider can refuse a
//! key meant for something else before any primitive runs. All key bytes are
//! zeroized on drop; public keys too, which costs nothing and keeps one type.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::suite::{CryptoSuite, KeyRole, KeyUsage};
use crate::{CryptoError, Result};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    #[zeroize(skip)]
    suite: CryptoSuite,
    #[zeroize(skip)]
    usage: KeyUsage,
    #[zeroize(skip)]
    role: KeyRole,
    #[serde(with = "hex::serde")]
    bytes: Vec<u8>,
}

impl KeyMaterial {
    pub fn new(suite: CryptoSuite, usage: KeyUsage, role: KeyRole, bytes: Vec<u8>) -> Self {
        Self {
            suite,
            usage,
            role,
            bytes,
        }
    }

    pub fn public(suite: CryptoSuite, usage: KeyUsage, bytes: Vec<u8>) -> Self {
        Self::new(suite, usage, KeyRole::Public, bytes)
    }

    pub fn private(suite: CryptoSuite, usage: KeyUsage, bytes: Vec<u8>) -> Self {
        Self::new(suite, usage, KeyRole::Private, bytes)
    }

    pub fn suite(&self) -> CryptoSuite {
        self.suite
    }

    pub fn usage(&self) -> KeyUsage {
        self.usage
    }

    pub fn role(&self) -> KeyRole {
        self.role
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Checks the tags and length and hands back the raw bytes.
    ///
    /// `accepted_lens[0]` is the canonical size reported on a length error.
    pub fn require(
        &self,
        suite: CryptoSuite,
        usage: KeyUsage,
        role: KeyRole,
        accepted_lens: &[usize],
    ) -> Result<&[u8]> {
        if self.suite != suite {
            return Err(CryptoError::SuiteMismatch {
                expected: suite,
                actual: self.suite,
            });
        }
        if self.usage != usage {
            return Err(CryptoError::KeyUsageMismatch {
                expected: usage,
                actual: self.usage,
            });
        }
        if self.role != role {
            return Err(CryptoError::InvalidKeyFormat(format!(
                "expected a {} key",
                match role {
                    KeyRole::Public => "public",
                    KeyRole::Private => "private",
                }
            )));
        }
        if !accepted_lens.contains(&self.bytes.len()) {
            return Err(CryptoError::InvalidKeyLength {
                expected: accepted_lens.first().copied().unwrap_or_default(),
                actual: self.bytes.len(),
            });
        }
        Ok(&self.bytes)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("KeyMaterial");
        out.field("suite", &self.suite)
            .field("usage", &self.usage)
            .field("role", &self.role)
            .field("len", &self.bytes.len());
        if self.role == KeyRole::Public {
            out.field("bytes", &hex::encode(&self.bytes));
        }
        out.finish()
    }
}

/// An asymmetric pair sharing one suite and usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPair {
    public: KeyMaterial,
    private: KeyMaterial,
}

impl KeyPair {
    pub fn new(public: KeyMaterial, private: KeyMaterial) -> Result<Self> {
        let pair = Self { public, private };
        pair.validate()?;
        Ok(pair)
    }

    /// Re-checks the pair invariants, e.g. after loading it from storage.
    pub fn validate(&self) -> Result<()> {
        if self.public.role != KeyRole::Public || self.private.role != KeyRole::Private {
            return Err(CryptoError::InvalidKeyFormat(
                "key pair roles must be public and private".to_string(),
            ));
        }
        if self.public.suite != self.private.suite {
            return Err(CryptoError::SuiteMismatch {
                expected: self.public.suite,
                actual: self.private.suite,
            });
        }
        if self.public.usage != self.private.usage {
            return Err(CryptoError::KeyUsageMismatch {
                expected: self.public.usage,
                actual: self.private.usage,
            });
        }
        Ok(())
    }

    pub fn public(&self) -> &KeyMaterial {
        &self.public
    }

    pub fn private(&self) -> &KeyMaterial {
        &self.private
    }

    pub fn suite(&self) -> CryptoSuite {
        self.public.suite
    }

    pub fn usage(&self) -> KeyUsage {
        self.public.usage
    }

    pub fn into_parts(self) -> (KeyMaterial, KeyMaterial) {
        (self.public, self.private)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signing_pair() -> KeyPair {
        KeyPair::new(
            KeyMaterial::public(CryptoSuite::X25519Ed25519, KeyUsage::Signing, vec![1; 32]),
            KeyMaterial::private(CryptoSuite::X25519Ed25519, KeyUsage::Signing, vec![2; 32]),
        )
        .unwrap()
    }

    #[test]
    fn test_require_accepts_matching_key() {
        let pair = signing_pair();
        let bytes = pair
            .public()
            .require(CryptoSuite::X25519Ed25519, KeyUsage::Signing, KeyRole::Public, &[32])
            .unwrap();
        assert_eq!(bytes, &[1u8; 32][..]);
    }

    #[test]
    fn test_require_rejects_wrong_usage() {
        let pair = signing_pair();
        let err = pair
            .public()
            .require(CryptoSuite::X25519Ed25519, KeyUsage::KeyExchange, KeyRole::Public, &[32])
            .unwrap_err();
        assert!(matches!(
            err,
            CryptoError::KeyUsageMismatch {
                expected: KeyUsage::KeyExchange,
                actual: KeyUsage::Signing
            }
        ));
    }

    #[test]
    fn test_require_rejects_wrong_length() {
        let key = KeyMaterial::public(CryptoSuite::MlKem768MlDsa65, KeyUsage::KeyExchange, vec![0; 1183]);
        let err = key
            .require(CryptoSuite::MlKem768MlDsa65, KeyUsage::KeyExchange, KeyRole::Public, &[1184])
            .unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 1184,
                actual: 1183
            }
        ));
    }

    #[test]
    fn test_require_rejects_wrong_role_and_suite() {
        let pair = signing_pair();
        assert!(matches!(
            pair.private()
                .require(CryptoSuite::X25519Ed25519, KeyUsage::Signing, KeyRole::Public, &[32]),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
        assert!(matches!(
            pair.public()
                .require(CryptoSuite::MlKem768MlDsa65, KeyUsage::Signing, KeyRole::Public, &[32]),
            Err(CryptoError::SuiteMismatch { .. })
        ));
    }

    #[test]
    fn test_pair_rejects_mixed_usage() {
        let result = KeyPair::new(
            KeyMaterial::public(CryptoSuite::X25519Ed25519, KeyUsage::Signing, vec![1; 32]),
            KeyMaterial::private(CryptoSuite::X25519Ed25519, KeyUsage::KeyExchange, vec![2; 32]),
        );
        assert!(matches!(result, Err(CryptoError::KeyUsageMismatch { .. })));
    }

    #[test]
    fn test_private_bytes_not_in_debug() {
        let pair = signing_pair();
        let rendered = format!("{:?}", pair.private());
        assert!(!rendered.contains("0202"));
    }

    #[test]
    fn test_json_roundtrip_is_hex() {
        let pair = signing_pair();
        let json = serde_json::to_string(&pair).unwrap();
        assert!(json.contains(&"01".repeat(32)));
        let loaded: KeyPair = serde_json::from_str(&json).unwrap();
        loaded.validate().unwrap();
        assert_eq!(loaded.private(), pair.private());
    }
}
