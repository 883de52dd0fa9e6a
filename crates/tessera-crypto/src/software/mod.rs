//! Software PQC tier: ML-KEM-768 and ML-DSA-65 from the PQClean C library
//!
//! For platforms without the native backend. Private keys use the library's
//! expanded encoding (2400 / 4032 bytes). Envelopes are byte-compatible with
//! the native tier because both run the shared KEM-DEM in `provider`.

mod ffi;

use tracing::debug;

use crate::keys::{KeyMaterial, KeyPair};
use crate::provider::{check_encapsulated_key, CryptoProvider};
use crate::secure::SecureBuffer;
use crate::suite::{CryptoSuite, KeyRole, KeyUsage, ProviderTier};
use crate::{CryptoError, Result};

const SUITE: CryptoSuite = CryptoSuite::MlKem768MlDsa65;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwarePqcProvider;

impl SoftwarePqcProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn for_suite(suite: CryptoSuite) -> Result<Self> {
        if suite != SUITE {
            return Err(CryptoError::ProviderNotAvailable(format!(
                "software PQC tier does not implement {suite}"
            )));
        }
        Ok(Self)
    }

    /// Expanded private key sizes reported by the C library.
    pub fn private_key_len(usage: KeyUsage) -> usize {
        match usage {
            KeyUsage::KeyExchange => ffi::kem_sizes().secret_key,
            KeyUsage::Signing => ffi::dsa_sizes().secret_key,
        }
    }

    fn private_bytes<'a>(&self, key: &'a KeyMaterial, usage: KeyUsage) -> Result<&'a [u8]> {
        key.require(SUITE, usage, KeyRole::Private, &[Self::private_key_len(usage)])
    }
}

fn into_pair(usage: KeyUsage, public: Vec<u8>, secret: SecureBuffer) -> Result<KeyPair> {
    let private = secret.with_bytes(|bytes| KeyMaterial::private(SUITE, usage, bytes.to_vec()));
    KeyPair::new(KeyMaterial::public(SUITE, usage, public), private)
}

impl CryptoProvider for SoftwarePqcProvider {
    fn provider_name(&self) -> &'static str {
        "software-pqc"
    }

    fn tier(&self) -> ProviderTier {
        ProviderTier::SoftwarePqc
    }

    fn active_suite(&self) -> CryptoSuite {
        SUITE
    }

    fn generate_key_pair(&self, usage: KeyUsage) -> Result<KeyPair> {
        debug!(suite = %SUITE, %usage, "generate key pair");
        let (public, secret) = match usage {
            KeyUsage::KeyExchange => ffi::kem_keypair()?,
            KeyUsage::Signing => ffi::dsa_keypair()?,
        };
        into_pair(usage, public, secret)
    }

    fn encapsulate(&self, recipient_public_key: &KeyMaterial) -> Result<(Vec<u8>, SecureBuffer)> {
        let public = recipient_public_key.require(
            SUITE,
            KeyUsage::KeyExchange,
            KeyRole::Public,
            &[ffi::kem_sizes().public_key],
        )?;
        ffi::kem_encapsulate(public)
    }

    fn decapsulate(&self, encapsulated_key: &[u8], private_key: &KeyMaterial) -> Result<SecureBuffer> {
        let secret = SecureBuffer::from_slice(self.private_bytes(private_key, KeyUsage::KeyExchange)?);
        check_encapsulated_key(SUITE, encapsulated_key)?;
        ffi::kem_decapsulate(encapsulated_key, &secret)
    }

    fn sign_with_key(&self, data: &[u8], private_key: &KeyMaterial) -> Result<Vec<u8>> {
        let secret = SecureBuffer::from_slice(self.private_bytes(private_key, KeyUsage::Signing)?);
        ffi::dsa_sign(data, &secret)
    }

    fn verify(&self, data: &[u8], signature: &[u8], public_key: &KeyMaterial) -> Result<bool> {
        let public = public_key.require(
            SUITE,
            KeyUsage::Signing,
            KeyRole::Public,
            &[ffi::dsa_sizes().public_key],
        )?;
        ffi::dsa_verify(data, signature, public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanded_key_sizes() {
        let provider = SoftwarePqcProvider::new();
        let kem = provider.generate_key_pair(KeyUsage::KeyExchange).unwrap();
        assert_eq!(kem.public().len(), 1184);
        assert_eq!(kem.private().len(), 2400);

        let dsa = provider.generate_key_pair(KeyUsage::Signing).unwrap();
        assert_eq!(dsa.public().len(), 1952);
        assert_eq!(dsa.private().len(), 4032);
    }

    #[test]
    fn test_seal_open() {
        let provider = SoftwarePqcProvider::new();
        let pair = provider.generate_key_pair(KeyUsage::KeyExchange).unwrap();
        let envelope = provider.seal_envelope(b"over ffi", pair.public(), b"ctx").unwrap();
        let opened = provider.open_envelope(&envelope, pair.private(), b"ctx").unwrap();
        assert_eq!(opened.as_slice(), b"over ffi");
    }

    #[test]
    fn test_signing_key_rejected_for_decapsulation() {
        let provider = SoftwarePqcProvider::new();
        let signing = provider.generate_key_pair(KeyUsage::Signing).unwrap();
        let err = provider.decapsulate(&[0u8; 1088], signing.private()).unwrap_err();
        assert!(matches!(err, CryptoError::KeyUsageMismatch { .. }));
    }

    #[test]
    fn test_only_mlkem_suite() {
        assert!(SoftwarePqcProvider::for_suite(CryptoSuite::MlKem768MlDsa65).is_ok());
        assert!(matches!(
            SoftwarePqcProvider::for_suite(CryptoSuite::XWingMlDsa65),
            Err(CryptoError::ProviderNotAvailable(_))
        ));
    }

    #[test]
    fn test_self_test_passes() {
        assert!(SoftwarePqcProvider::new().self_test());
    }
}
