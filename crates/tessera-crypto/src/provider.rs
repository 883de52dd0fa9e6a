//! The provider contract
//!
//! One trait, one implementation per tier. The KEM-DEM seal/open, the
//! exported-secret variants, signing-handle dispatch and the self-test are
//! written once here on top of each provider's raw KEM and signature
//! primitives, so the key schedule cannot drift between tiers.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::cipher;
use crate::envelope::SealedEnvelope;
use crate::kdf;
use crate::keys::{KeyMaterial, KeyPair};
use crate::secure::SecureBuffer;
use crate::signing::SigningKeyHandle;
use crate::suite::{CryptoSuite, KeyUsage, ProviderTier};
use crate::{CryptoError, Result};

const SELF_TEST_CONTEXT: &[u8] = b"tessera/v1/self-test";
const SELF_TEST_MESSAGE: &[u8] = b"tier self-test";

pub trait CryptoProvider: Send + Sync + fmt::Debug {
    fn provider_name(&self) -> &'static str;

    fn tier(&self) -> ProviderTier;

    fn active_suite(&self) -> CryptoSuite;

    fn generate_key_pair(&self, usage: KeyUsage) -> Result<KeyPair>;

    /// Raw KEM: returns the encapsulated key and the shared secret.
    fn encapsulate(&self, recipient_public_key: &KeyMaterial) -> Result<(Vec<u8>, SecureBuffer)>;

    fn decapsulate(&self, encapsulated_key: &[u8], private_key: &KeyMaterial) -> Result<SecureBuffer>;

    /// Signs with an in-process private key.
    fn sign_with_key(&self, data: &[u8], private_key: &KeyMaterial) -> Result<Vec<u8>>;

    /// `Ok(false)` for a signature that does not verify; `Err` only for a
    /// public key that cannot be parsed.
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &KeyMaterial) -> Result<bool>;

    fn seal_envelope(
        &self,
        plaintext: &[u8],
        recipient_public_key: &KeyMaterial,
        context: &[u8],
    ) -> Result<SealedEnvelope> {
        kem_dem_seal(self, plaintext, recipient_public_key, context).map(|(envelope, _)| envelope)
    }

    fn open_envelope(
        &self,
        envelope: &SealedEnvelope,
        private_key: &KeyMaterial,
        context: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        kem_dem_open(self, envelope, private_key, context).map(|(plaintext, _)| plaintext)
    }

    /// Seal, also returning a 32-byte session-root secret bound to `context`.
    fn seal_with_exported_secret(
        &self,
        plaintext: &[u8],
        recipient_public_key: &KeyMaterial,
        context: &[u8],
    ) -> Result<(SealedEnvelope, SecureBuffer)> {
        let (envelope, shared) = kem_dem_seal(self, plaintext, recipient_public_key, context)?;
        let session = kdf::derive_session_secret(&shared, self.active_suite(), context)?;
        Ok((envelope, session))
    }

    fn open_with_exported_secret(
        &self,
        envelope: &SealedEnvelope,
        private_key: &KeyMaterial,
        context: &[u8],
    ) -> Result<(Zeroizing<Vec<u8>>, SecureBuffer)> {
        let (plaintext, shared) = kem_dem_open(self, envelope, private_key, context)?;
        let session = kdf::derive_session_secret(&shared, self.active_suite(), context)?;
        Ok((plaintext, session))
    }

    fn sign(&self, data: &[u8], key: SigningKeyHandle) -> Result<Vec<u8>> {
        debug!(provider = self.provider_name(), handle = key.kind(), len = data.len(), "sign");
        match key {
            SigningKeyHandle::Raw(private_key) => {
                let signature = self.sign_with_key(data, &private_key);
                drop(private_key);
                signature
            }
            SigningKeyHandle::Platform(signer) => signer.sign(data),
            SigningKeyHandle::Callback(callback) => callback(data),
        }
    }

    /// One full key-generation, seal/open and sign/verify cycle. A panic
    /// inside a backend counts as a failure.
    fn self_test(&self) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| run_self_test(self))) {
            Ok(Ok(())) => {
                debug!(provider = self.provider_name(), "self-test passed");
                true
            }
            Ok(Err(e)) => {
                warn!(provider = self.provider_name(), error = %e, "self-test failed");
                false
            }
            Err(_) => {
                warn!(provider = self.provider_name(), "self-test panicked");
                false
            }
        }
    }
}

fn run_self_test<P: CryptoProvider + ?Sized>(provider: &P) -> Result<()> {
    let exchange = provider.generate_key_pair(KeyUsage::KeyExchange)?;
    let envelope = provider.seal_envelope(SELF_TEST_MESSAGE, exchange.public(), SELF_TEST_CONTEXT)?;
    let opened = provider.open_envelope(&envelope, exchange.private(), SELF_TEST_CONTEXT)?;
    if opened.as_slice() != SELF_TEST_MESSAGE {
        return Err(CryptoError::OperationFailed("self-test round trip mismatch".to_string()));
    }

    let signing = provider.generate_key_pair(KeyUsage::Signing)?;
    let signature = provider.sign_with_key(SELF_TEST_MESSAGE, signing.private())?;
    if !provider.verify(SELF_TEST_MESSAGE, &signature, signing.public())? {
        return Err(CryptoError::SignatureFailed);
    }
    Ok(())
}

/// Encapsulate, derive the AEAD key, encrypt. Returns the shared secret so
/// the caller can derive further outputs from it.
pub(crate) fn kem_dem_seal<P: CryptoProvider + ?Sized>(
    provider: &P,
    plaintext: &[u8],
    recipient_public_key: &KeyMaterial,
    context: &[u8],
) -> Result<(SealedEnvelope, SecureBuffer)> {
    let suite = provider.active_suite();
    debug!(provider = provider.provider_name(), %suite, len = plaintext.len(), "seal");

    let (encapsulated_key, shared) = provider.encapsulate(recipient_public_key)?;
    let key = kdf::derive_aead_key(&shared, suite, context)?;
    let sealed = cipher::seal(&key, plaintext, context)?;

    let envelope = SealedEnvelope::new(
        encapsulated_key,
        sealed.nonce.to_vec(),
        sealed.ciphertext,
        sealed.tag.to_vec(),
    )?;
    Ok((envelope, shared))
}

pub(crate) fn kem_dem_open<P: CryptoProvider + ?Sized>(
    provider: &P,
    envelope: &SealedEnvelope,
    private_key: &KeyMaterial,
    context: &[u8],
) -> Result<(Zeroizing<Vec<u8>>, SecureBuffer)> {
    let suite = provider.active_suite();
    debug!(provider = provider.provider_name(), %suite, len = envelope.ciphertext.len(), "open");

    envelope.validate()?;
    if envelope.is_hpke() {
        return Err(CryptoError::MalformedEnvelope("HPKE envelope for a KEM-DEM suite"));
    }

    let shared = provider.decapsulate(&envelope.encapsulated_key, private_key)?;
    let key = kdf::derive_aead_key(&shared, suite, context)?;
    let plaintext = cipher::open(&key, &envelope.nonce, &envelope.ciphertext, &envelope.tag, context)?;
    Ok((plaintext, shared))
}

/// Rejects an encapsulated key of the wrong size before decapsulating.
pub(crate) fn check_encapsulated_key(suite: CryptoSuite, encapsulated_key: &[u8]) -> Result<()> {
    let expected = suite.encapsulated_key_len();
    if encapsulated_key.len() != expected {
        return Err(CryptoError::InvalidKeyLength {
            expected,
            actual: encapsulated_key.len(),
        });
    }
    Ok(())
}
