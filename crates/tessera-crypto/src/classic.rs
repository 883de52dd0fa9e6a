//! Classical fallback tier: X25519 key agreement, Ed25519 signatures
//!
//! Sealing prefers RFC 9180 base mode (DHKEM(X25519, HKDF-SHA256),
//! HKDF-SHA256, ChaCha20-Poly1305). If that is compiled out, disabled, or
//! fails, the provider falls back to an ephemeral X25519 KEM feeding the
//! shared KEM-DEM. Opening dispatches on envelope shape, so a recipient opens
//! either construction regardless of its own sending preference.
//!
//! Verification also accepts P-256 ECDSA public keys, detected from the key
//! bytes. A 32-byte key is always Ed25519, whatever its first byte. Otherwise
//! `0x30..` is a DER SubjectPublicKeyInfo and `0x04..` with length 65 is an
//! uncompressed X9.63 point.

use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey, VerifyingKey};
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature as P256Signature, VerifyingKey as P256VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use tracing::{debug, warn};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::envelope::SealedEnvelope;
use crate::kdf;
use crate::keys::{KeyMaterial, KeyPair};
use crate::provider::{check_encapsulated_key, kem_dem_open, kem_dem_seal, CryptoProvider};
use crate::rng;
use crate::secure::SecureBuffer;
use crate::suite::{CryptoSuite, KeyRole, KeyUsage, ProviderTier, ED25519_KEY_LEN, X25519_KEY_LEN};
use crate::{CryptoError, Result};

const SUITE: CryptoSuite = CryptoSuite::X25519Ed25519;
const P256_RAW_KEY_LEN: usize = 65;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassicProvider {
    use_hpke: bool,
}

impl Default for ClassicProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassicProvider {
    /// HPKE sealing whenever it is compiled in.
    pub fn new() -> Self {
        Self::with_hpke(true)
    }

    /// Seal with the X25519 KEM-DEM only. Opening HPKE envelopes still works.
    pub fn without_hpke() -> Self {
        Self::with_hpke(false)
    }

    pub fn with_hpke(enabled: bool) -> Self {
        Self {
            use_hpke: enabled && cfg!(feature = "hpke"),
        }
    }

    pub fn uses_hpke(&self) -> bool {
        self.use_hpke
    }

    fn seal_inner(
        &self,
        plaintext: &[u8],
        recipient_public_key: &KeyMaterial,
        context: &[u8],
    ) -> Result<(SealedEnvelope, SecureBuffer)> {
        let public = x25519_bytes(recipient_public_key, KeyRole::Public)?;

        if self.use_hpke {
            match hpke_seal(plaintext, &public, context) {
                Ok(sealed) => return Ok(sealed),
                Err(e) => warn!(error = %e, "HPKE seal failed, falling back to X25519 KEM-DEM"),
            }
        }

        let (envelope, shared) = kem_dem_seal(self, plaintext, recipient_public_key, context)?;
        let session = kdf::derive_session_secret(&shared, SUITE, context)?;
        Ok((envelope, session))
    }

    fn open_inner(
        &self,
        envelope: &SealedEnvelope,
        private_key: &KeyMaterial,
        context: &[u8],
    ) -> Result<(Zeroizing<Vec<u8>>, SecureBuffer)> {
        envelope.validate()?;
        if !envelope.is_hpke() {
            let (plaintext, shared) = kem_dem_open(self, envelope, private_key, context)?;
            let session = kdf::derive_session_secret(&shared, SUITE, context)?;
            return Ok((plaintext, session));
        }

        let private = Zeroizing::new(x25519_bytes(private_key, KeyRole::Private)?);
        check_encapsulated_key(SUITE, &envelope.encapsulated_key)?;
        hpke_open(envelope, &private, context)
    }
}

#[cfg(feature = "hpke")]
use base_mode::{open as hpke_open, seal as hpke_seal};

#[cfg(not(feature = "hpke"))]
fn hpke_seal(_: &[u8], _: &[u8; 32], _: &[u8]) -> Result<(SealedEnvelope, SecureBuffer)> {
    Err(CryptoError::ProviderNotAvailable("HPKE support is not compiled in".to_string()))
}

#[cfg(not(feature = "hpke"))]
fn hpke_open(_: &SealedEnvelope, _: &[u8; 32], _: &[u8]) -> Result<(Zeroizing<Vec<u8>>, SecureBuffer)> {
    Err(CryptoError::ProviderNotAvailable("HPKE support is not compiled in".to_string()))
}

fn x25519_bytes(key: &KeyMaterial, role: KeyRole) -> Result<[u8; X25519_KEY_LEN]> {
    let bytes = key.require(SUITE, KeyUsage::KeyExchange, role, &[X25519_KEY_LEN])?;
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyFormat("X25519 key".to_string()))
}

/// KEM shared secret: `DH || ephemeral public || recipient public`.
fn kem_secret(dh: &[u8; 32], ephemeral: &PublicKey, recipient: &PublicKey) -> SecureBuffer {
    let mut secret = SecureBuffer::zeroed(3 * X25519_KEY_LEN);
    secret.with_bytes_mut(|out| {
        out[..32].copy_from_slice(dh);
        out[32..64].copy_from_slice(ephemeral.as_bytes());
        out[64..].copy_from_slice(recipient.as_bytes());
    });
    secret
}

fn verify_ed25519(data: &[u8], signature: &[u8], public: &[u8]) -> Result<bool> {
    let public: [u8; ED25519_KEY_LEN] = public
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyFormat("Ed25519 public key".to_string()))?;
    let key = VerifyingKey::from_bytes(&public)
        .map_err(|_| CryptoError::InvalidKeyFormat("Ed25519 public key is not a curve point".to_string()))?;
    let Ok(signature) = Ed25519Signature::from_slice(signature) else {
        return Ok(false);
    };
    Ok(key.verify_strict(data, &signature).is_ok())
}

fn verify_p256(data: &[u8], signature: &[u8], key: &P256VerifyingKey) -> bool {
    let parsed = if signature.len() == 64 {
        P256Signature::from_slice(signature)
    } else {
        P256Signature::from_der(signature)
    };
    let Ok(parsed) = parsed else {
        return false;
    };
    let parsed = parsed.normalize_s().unwrap_or(parsed);
    key.verify(data, &parsed).is_ok()
}

impl CryptoProvider for ClassicProvider {
    fn provider_name(&self) -> &'static str {
        "classic"
    }

    fn tier(&self) -> ProviderTier {
        ProviderTier::Classic
    }

    fn active_suite(&self) -> CryptoSuite {
        SUITE
    }

    fn generate_key_pair(&self, usage: KeyUsage) -> Result<KeyPair> {
        debug!(suite = %SUITE, %usage, "generate key pair");
        let seed = rng::key_seed::<32>()?;
        let public = match usage {
            KeyUsage::KeyExchange => PublicKey::from(&StaticSecret::from(*seed)).to_bytes(),
            KeyUsage::Signing => SigningKey::from_bytes(&seed).verifying_key().to_bytes(),
        };
        KeyPair::new(
            KeyMaterial::public(SUITE, usage, public.to_vec()),
            KeyMaterial::private(SUITE, usage, seed.to_vec()),
        )
    }

    fn encapsulate(&self, recipient_public_key: &KeyMaterial) -> Result<(Vec<u8>, SecureBuffer)> {
        let recipient = PublicKey::from(x25519_bytes(recipient_public_key, KeyRole::Public)?);
        let ephemeral = StaticSecret::from(*rng::encapsulation_seed::<X25519_KEY_LEN>()?);
        let ephemeral_public = PublicKey::from(&ephemeral);

        let dh = ephemeral.diffie_hellman(&recipient);
        if !dh.was_contributory() {
            return Err(CryptoError::EncapsulationFailed);
        }
        let secret = kem_secret(dh.as_bytes(), &ephemeral_public, &recipient);
        Ok((ephemeral_public.to_bytes().to_vec(), secret))
    }

    fn decapsulate(&self, encapsulated_key: &[u8], private_key: &KeyMaterial) -> Result<SecureBuffer> {
        let private = StaticSecret::from(x25519_bytes(private_key, KeyRole::Private)?);
        check_encapsulated_key(SUITE, encapsulated_key)?;
        let ephemeral: [u8; X25519_KEY_LEN] = encapsulated_key
            .try_into()
            .map_err(|_| CryptoError::DecapsulationFailed)?;
        let ephemeral = PublicKey::from(ephemeral);

        let dh = private.diffie_hellman(&ephemeral);
        if !dh.was_contributory() {
            return Err(CryptoError::DecapsulationFailed);
        }
        Ok(kem_secret(dh.as_bytes(), &ephemeral, &PublicKey::from(&private)))
    }

    fn seal_envelope(
        &self,
        plaintext: &[u8],
        recipient_public_key: &KeyMaterial,
        context: &[u8],
    ) -> Result<SealedEnvelope> {
        self.seal_inner(plaintext, recipient_public_key, context)
            .map(|(envelope, _)| envelope)
    }

    fn open_envelope(
        &self,
        envelope: &SealedEnvelope,
        private_key: &KeyMaterial,
        context: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        self.open_inner(envelope, private_key, context)
            .map(|(plaintext, _)| plaintext)
    }

    fn seal_with_exported_secret(
        &self,
        plaintext: &[u8],
        recipient_public_key: &KeyMaterial,
        context: &[u8],
    ) -> Result<(SealedEnvelope, SecureBuffer)> {
        self.seal_inner(plaintext, recipient_public_key, context)
    }

    fn open_with_exported_secret(
        &self,
        envelope: &SealedEnvelope,
        private_key: &KeyMaterial,
        context: &[u8],
    ) -> Result<(Zeroizing<Vec<u8>>, SecureBuffer)> {
        self.open_inner(envelope, private_key, context)
    }

    fn sign_with_key(&self, data: &[u8], private_key: &KeyMaterial) -> Result<Vec<u8>> {
        let seed: Zeroizing<[u8; ED25519_KEY_LEN]> = Zeroizing::new(
            private_key
                .require(SUITE, KeyUsage::Signing, KeyRole::Private, &[ED25519_KEY_LEN])?
                .try_into()
                .map_err(|_| CryptoError::SignatureFailed)?,
        );
        let key = SigningKey::from_bytes(&seed);
        Ok(key.sign(data).to_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8], public_key: &KeyMaterial) -> Result<bool> {
        if public_key.suite() != SUITE {
            return Err(CryptoError::SuiteMismatch {
                expected: SUITE,
                actual: public_key.suite(),
            });
        }
        if public_key.usage() != KeyUsage::Signing {
            return Err(CryptoError::KeyUsageMismatch {
                expected: KeyUsage::Signing,
                actual: public_key.usage(),
            });
        }
        if public_key.role() != KeyRole::Public {
            return Err(CryptoError::InvalidKeyFormat("expected a public key".to_string()));
        }

        let bytes = public_key.as_bytes();
        match bytes {
            _ if bytes.len() == ED25519_KEY_LEN => verify_ed25519(data, signature, bytes),
            [0x30, ..] => {
                let key = P256VerifyingKey::from_public_key_der(bytes)
                    .map_err(|e| CryptoError::InvalidKeyFormat(format!("P-256 DER public key: {e}")))?;
                Ok(verify_p256(data, signature, &key))
            }
            [0x04, ..] if bytes.len() == P256_RAW_KEY_LEN => {
                let key = P256VerifyingKey::from_sec1_bytes(bytes)
                    .map_err(|_| CryptoError::InvalidKeyFormat("P-256 X9.63 public key".to_string()))?;
                Ok(verify_p256(data, signature, &key))
            }
            _ => Err(CryptoError::InvalidKeyLength {
                expected: ED25519_KEY_LEN,
                actual: bytes.len(),
            }),
        }
    }
}

#[cfg(feature = "hpke")]
mod base_mode {
    use chacha20poly1305::aead::OsRng;
    use hpke::aead::ChaCha20Poly1305;
    use hpke::kdf::HkdfSha256;
    use hpke::kem::X25519HkdfSha256;
    use hpke::{Deserializable, Kem as KemTrait, OpModeR, OpModeS, Serializable};
    use zeroize::Zeroizing;

    use super::SUITE;
    use crate::envelope::SealedEnvelope;
    use crate::kdf;
    use crate::secure::SecureBuffer;
    use crate::{CryptoError, Result};

    type Kem = X25519HkdfSha256;
    type PublicKey = <Kem as KemTrait>::PublicKey;
    type PrivateKey = <Kem as KemTrait>::PrivateKey;
    type EncappedKey = <Kem as KemTrait>::EncappedKey;

    /// The info string binds the context through the shared salt; the
    /// context is also the AAD.
    fn info(context: &[u8]) -> [u8; 32] {
        kdf::envelope_salt(context)
    }

    fn export(ctx_export: impl FnOnce(&[u8], &mut [u8]) -> std::result::Result<(), hpke::HpkeError>) -> Result<SecureBuffer> {
        let mut session = SecureBuffer::zeroed(kdf::SESSION_SECRET_LEN);
        let exporter_context = kdf::info(kdf::SESSION_SECRET_INFO, SUITE);
        session
            .with_bytes_mut(|out| ctx_export(&exporter_context, out))
            .map_err(|e| CryptoError::OperationFailed(format!("HPKE export: {e}")))?;
        Ok(session)
    }

    pub(super) fn seal(
        plaintext: &[u8],
        recipient: &[u8; 32],
        context: &[u8],
    ) -> Result<(SealedEnvelope, SecureBuffer)> {
        let recipient = PublicKey::from_bytes(recipient)
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("X25519 public key: {e}")))?;
        let (encapped, mut sender) = hpke::setup_sender::<ChaCha20Poly1305, HkdfSha256, Kem, _>(
            &OpModeS::Base,
            &recipient,
            &info(context),
            &mut OsRng,
        )
        .map_err(|_| CryptoError::EncapsulationFailed)?;

        let ciphertext = sender
            .seal(plaintext, context)
            .map_err(|e| CryptoError::OperationFailed(format!("HPKE seal: {e}")))?;
        let session = export(|exporter_context, out| sender.export(exporter_context, out))?;
        Ok((SealedEnvelope::hpke(encapped.to_bytes().to_vec(), ciphertext), session))
    }

    pub(super) fn open(
        envelope: &SealedEnvelope,
        private: &[u8; 32],
        context: &[u8],
    ) -> Result<(Zeroizing<Vec<u8>>, SecureBuffer)> {
        let private = PrivateKey::from_bytes(private)
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("X25519 private key: {e}")))?;
        let encapped = EncappedKey::from_bytes(&envelope.encapsulated_key)
            .map_err(|_| CryptoError::DecapsulationFailed)?;
        let mut receiver = hpke::setup_receiver::<ChaCha20Poly1305, HkdfSha256, Kem>(
            &OpModeR::Base,
            &private,
            &encapped,
            &info(context),
        )
        .map_err(|_| CryptoError::DecapsulationFailed)?;

        let plaintext = receiver
            .open(&envelope.ciphertext, context)
            .map_err(|_| CryptoError::open_failed())?;
        let session = export(|exporter_context, out| receiver.export(exporter_context, out))?;
        Ok((Zeroizing::new(plaintext), session))
    }
}
