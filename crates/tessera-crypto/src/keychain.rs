//! Hardware keychain integration
//!
//! `KeychainSigner` is a `PlatformSigner` whose private key lives in the OS
//! keychain. The key is read into zeroizing memory for one signature and
//! dropped again; it never sits in a long-lived struct.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use zeroize::Zeroizing;

use crate::keys::KeyMaterial;
use crate::provider::CryptoProvider;
use crate::signing::PlatformSigner;
use crate::suite::{KeyRole, KeyUsage};
use crate::{CryptoError, Result};

pub struct KeychainSigner {
    service_name: String,
    account: String,
    provider: Arc<dyn CryptoProvider>,
}

impl KeychainSigner {
    pub fn new(service_name: &str, account: &str, provider: Arc<dyn CryptoProvider>) -> Self {
        Self {
            service_name: service_name.to_string(),
            account: account.to_string(),
            provider,
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service_name, &self.account).map_err(|e| CryptoError::Keychain(e.to_string()))
    }

    /// Stores a private signing key for the provider's suite.
    pub fn store(&self, key: &KeyMaterial) -> Result<()> {
        let suite = self.provider.active_suite();
        if key.suite() != suite {
            return Err(CryptoError::SuiteMismatch {
                expected: suite,
                actual: key.suite(),
            });
        }
        if key.usage() != KeyUsage::Signing {
            return Err(CryptoError::KeyUsageMismatch {
                expected: KeyUsage::Signing,
                actual: key.usage(),
            });
        }
        if key.role() != KeyRole::Private {
            return Err(CryptoError::InvalidKeyFormat(
                "only private signing keys belong in the keychain".to_string(),
            ));
        }

        let encoded = Zeroizing::new(
            serde_json::to_string(key).map_err(|e| CryptoError::Keychain(e.to_string()))?,
        );
        self.entry()?
            .set_password(&encoded)
            .map_err(|e| CryptoError::Keychain(e.to_string()))
    }

    fn load(&self) -> Result<KeyMaterial> {
        let encoded = Zeroizing::new(self.entry()?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => {
                CryptoError::Keychain(format!("no signing key stored for {}", self.account))
            }
            _ => CryptoError::Keychain(e.to_string()),
        })?);
        serde_json::from_str(&encoded).map_err(|e| CryptoError::InvalidKeyFormat(e.to_string()))
    }
}

impl PlatformSigner for KeychainSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        debug!(service = %self.service_name, account = %self.account, "keychain sign");
        let key = self.load()?;
        self.provider.sign_with_key(data, &key)
    }
}

impl fmt::Debug for KeychainSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeychainSigner")
            .field("service_name", &self.service_name)
            .field("account", &self.account)
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classic::ClassicProvider;
    use crate::suite::CryptoSuite;

    fn signer() -> KeychainSigner {
        KeychainSigner::new("tessera-test", "unit", Arc::new(ClassicProvider::new()))
    }

    // These fail before the keychain is touched.

    #[test]
    fn test_store_rejects_public_key() {
        let key = KeyMaterial::public(CryptoSuite::X25519Ed25519, KeyUsage::Signing, vec![0; 32]);
        assert!(matches!(signer().store(&key), Err(CryptoError::InvalidKeyFormat(_))));
    }

    #[test]
    fn test_store_rejects_exchange_key() {
        let key = KeyMaterial::private(CryptoSuite::X25519Ed25519, KeyUsage::KeyExchange, vec![0; 32]);
        assert!(matches!(signer().store(&key), Err(CryptoError::KeyUsageMismatch { .. })));
    }

    #[test]
    fn test_store_rejects_foreign_suite() {
        let key = KeyMaterial::private(CryptoSuite::MlKem768MlDsa65, KeyUsage::Signing, vec![0; 64]);
        assert!(matches!(signer().store(&key), Err(CryptoError::SuiteMismatch { .. })));
    }

    #[test]
    fn test_debug_names_provider() {
        let rendered = format!("{:?}", signer());
        assert!(rendered.contains("classic"));
    }
}
