//! Native PQC tier: ML-KEM-768 and ML-DSA-65 in pure Rust (libcrux), with
//! optional X-Wing hybrid key exchange.
//!
//! Private keys are compact: `seed || SHA-256(public key)`.
//!
//! | key               | seed        | total |
//! |-------------------|-------------|-------|
//! | ML-KEM-768        | `d || z` 64 | 96    |
//! | ML-DSA-65         | `xi` 32     | 64    |
//! | X-Wing            | 32          | 64    |
//!
//! The digest is checked against the regenerated public key on every load.
//! Expanded FIPS 203/204 private keys (2400 / 4032 bytes), as produced by the
//! software tier, are accepted for ML-KEM-768 and ML-DSA-65 so peers can move
//! keys between tiers; `expand_private_key` goes the other way.

use libcrux_ml_dsa::ml_dsa_65::{self, MLDSA65Signature, MLDSA65SigningKey, MLDSA65VerificationKey};
use libcrux_ml_kem::mlkem768::{self, MlKem768Ciphertext, MlKem768PrivateKey, MlKem768PublicKey};
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::keys::{KeyMaterial, KeyPair};
use crate::provider::{check_encapsulated_key, CryptoProvider};
use crate::rng;
use crate::secure::SecureBuffer;
use crate::suite::{
    CryptoSuite, KeyRole, KeyUsage, ProviderTier, MLDSA65_PUBLIC_KEY_LEN, MLDSA65_SIGNATURE_LEN,
    MLKEM768_CIPHERTEXT_LEN, MLKEM768_PUBLIC_KEY_LEN,
};
use crate::xwing;
use crate::{CryptoError, Result};

const DIGEST_LEN: usize = 32;
const KEM_SEED_LEN: usize = 64;
const DSA_SEED_LEN: usize = 32;

pub const MLKEM768_COMPACT_PRIVATE_KEY_LEN: usize = KEM_SEED_LEN + DIGEST_LEN;
pub const MLDSA65_COMPACT_PRIVATE_KEY_LEN: usize = DSA_SEED_LEN + DIGEST_LEN;
pub const XWING_COMPACT_PRIVATE_KEY_LEN: usize = xwing::SEED_LEN + DIGEST_LEN;
pub const MLKEM768_EXPANDED_PRIVATE_KEY_LEN: usize = 2400;
pub const MLDSA65_EXPANDED_PRIVATE_KEY_LEN: usize = 4032;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativePqcProvider {
    suite: CryptoSuite,
}

impl Default for NativePqcProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl NativePqcProvider {
    /// ML-KEM-768 + ML-DSA-65.
    pub fn new() -> Self {
        Self {
            suite: CryptoSuite::MlKem768MlDsa65,
        }
    }

    /// X-Wing + ML-DSA-65.
    pub fn hybrid() -> Self {
        Self {
            suite: CryptoSuite::XWingMlDsa65,
        }
    }

    pub fn for_suite(suite: CryptoSuite) -> Result<Self> {
        match suite {
            CryptoSuite::MlKem768MlDsa65 => Ok(Self::new()),
            CryptoSuite::XWingMlDsa65 => Ok(Self::hybrid()),
            CryptoSuite::X25519Ed25519 => Err(CryptoError::ProviderNotAvailable(format!(
                "{suite} is not a native PQC suite"
            ))),
        }
    }

    /// Converts a compact private key into the expanded FIPS encoding used by
    /// the software tier. X-Wing has no expanded form.
    pub fn expand_private_key(&self, private_key: &KeyMaterial) -> Result<KeyMaterial> {
        let expanded = match (self.suite, private_key.usage()) {
            (CryptoSuite::MlKem768MlDsa65, KeyUsage::KeyExchange) => {
                let bytes = self.kem_private_bytes(private_key)?;
                let MlKemPrivate::Compact(kem) = load_kem_private(bytes)? else {
                    return Ok(private_key.clone());
                };
                kem.private_key().as_ref().to_vec()
            }
            (_, KeyUsage::Signing) => match load_dsa_private(self.dsa_private_bytes(private_key)?)? {
                DsaPrivate::Compact(signing_key) => signing_key.as_slice().to_vec(),
                DsaPrivate::Expanded(_) => return Ok(private_key.clone()),
            },
            (suite, usage) => {
                return Err(CryptoError::InvalidKeyFormat(format!(
                    "{suite} {usage} keys have no expanded encoding"
                )))
            }
        };
        Ok(KeyMaterial::private(self.suite, private_key.usage(), expanded))
    }

    fn kem_private_bytes<'a>(&self, private_key: &'a KeyMaterial) -> Result<&'a [u8]> {
        let accepted: &[usize] = match self.suite {
            CryptoSuite::XWingMlDsa65 => &[XWING_COMPACT_PRIVATE_KEY_LEN],
            _ => &[MLKEM768_COMPACT_PRIVATE_KEY_LEN, MLKEM768_EXPANDED_PRIVATE_KEY_LEN],
        };
        private_key.require(self.suite, KeyUsage::KeyExchange, KeyRole::Private, accepted)
    }

    fn dsa_private_bytes<'a>(&self, private_key: &'a KeyMaterial) -> Result<&'a [u8]> {
        private_key.require(
            self.suite,
            KeyUsage::Signing,
            KeyRole::Private,
            &[MLDSA65_COMPACT_PRIVATE_KEY_LEN, MLDSA65_EXPANDED_PRIVATE_KEY_LEN],
        )
    }

    fn generate_kem(&self) -> Result<KeyPair> {
        let (public, private) = match self.suite {
            CryptoSuite::XWingMlDsa65 => {
                let seed = rng::key_seed::<{ xwing::SEED_LEN }>()?;
                let public = xwing::expand(&seed).public_key();
                (public.clone(), compact(&seed[..], &public))
            }
            _ => {
                let seed = rng::key_seed::<KEM_SEED_LEN>()?;
                let pair = mlkem768::generate_key_pair(*seed);
                let public = pair.public_key().as_ref().to_vec();
                (public.clone(), compact(&seed[..], &public))
            }
        };
        KeyPair::new(
            KeyMaterial::public(self.suite, KeyUsage::KeyExchange, public),
            KeyMaterial::private(self.suite, KeyUsage::KeyExchange, private),
        )
    }

    fn generate_dsa(&self) -> Result<KeyPair> {
        let seed = rng::key_seed::<DSA_SEED_LEN>()?;
        let pair = ml_dsa_65::generate_key_pair(*seed);
        let public = pair.verification_key.as_slice().to_vec();
        let private = compact(&seed[..], &public);
        KeyPair::new(
            KeyMaterial::public(self.suite, KeyUsage::Signing, public),
            KeyMaterial::private(self.suite, KeyUsage::Signing, private),
        )
    }
}

enum MlKemPrivate {
    Compact(mlkem768::MlKem768KeyPair),
    Expanded(Box<MlKem768PrivateKey>),
}

enum DsaPrivate {
    Compact(Box<MLDSA65SigningKey>),
    Expanded(Box<MLDSA65SigningKey>),
}

/// `seed || SHA-256(public)`, zeroized by `KeyMaterial` once wrapped.
fn compact(seed: &[u8], public: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seed.len() + DIGEST_LEN);
    out.extend_from_slice(seed);
    out.extend_from_slice(&Sha256::digest(public));
    out
}

fn check_digest(public: &[u8], digest: &[u8]) -> Result<()> {
    if Sha256::digest(public).as_slice() != digest {
        return Err(CryptoError::InvalidKeyFormat(
            "private key does not match its public key digest".to_string(),
        ));
    }
    Ok(())
}

fn load_kem_private(bytes: &[u8]) -> Result<MlKemPrivate> {
    if bytes.len() == MLKEM768_EXPANDED_PRIVATE_KEY_LEN {
        let mut raw = Zeroizing::new([0u8; MLKEM768_EXPANDED_PRIVATE_KEY_LEN]);
        raw.copy_from_slice(bytes);
        return Ok(MlKemPrivate::Expanded(Box::new(MlKem768PrivateKey::from(*raw))));
    }
    let (seed, digest) = bytes.split_at(KEM_SEED_LEN);
    let mut seed_arr: [u8; KEM_SEED_LEN] = seed
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyFormat("ML-KEM seed".to_string()))?;
    let pair = mlkem768::generate_key_pair(seed_arr);
    seed_arr.zeroize();
    check_digest(pair.public_key().as_ref(), digest)?;
    Ok(MlKemPrivate::Compact(pair))
}

fn load_xwing_private(bytes: &[u8]) -> Result<xwing::ExpandedKey> {
    let (seed, digest) = bytes.split_at(xwing::SEED_LEN);
    let seed: Zeroizing<[u8; xwing::SEED_LEN]> = Zeroizing::new(
        seed.try_into()
            .map_err(|_| CryptoError::InvalidKeyFormat("X-Wing seed".to_string()))?,
    );
    let key = xwing::expand(&seed);
    check_digest(&key.public_key(), digest)?;
    Ok(key)
}

fn load_dsa_private(bytes: &[u8]) -> Result<DsaPrivate> {
    if bytes.len() == MLDSA65_EXPANDED_PRIVATE_KEY_LEN {
        let mut raw = Zeroizing::new([0u8; MLDSA65_EXPANDED_PRIVATE_KEY_LEN]);
        raw.copy_from_slice(bytes);
        return Ok(DsaPrivate::Expanded(Box::new(MLDSA65SigningKey::new(*raw))));
    }
    let (seed, digest) = bytes.split_at(DSA_SEED_LEN);
    let mut seed_arr: [u8; DSA_SEED_LEN] = seed
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyFormat("ML-DSA seed".to_string()))?;
    let pair = ml_dsa_65::generate_key_pair(seed_arr);
    seed_arr.zeroize();
    check_digest(pair.verification_key.as_slice(), digest)?;
    Ok(DsaPrivate::Compact(Box::new(pair.signing_key)))
}

impl CryptoProvider for NativePqcProvider {
    fn provider_name(&self) -> &'static str {
        match self.suite {
            CryptoSuite::XWingMlDsa65 => "native-pqc-xwing",
            _ => "native-pqc",
        }
    }

    fn tier(&self) -> ProviderTier {
        ProviderTier::NativePqc
    }

    fn active_suite(&self) -> CryptoSuite {
        self.suite
    }

    fn generate_key_pair(&self, usage: KeyUsage) -> Result<KeyPair> {
        debug!(suite = %self.suite, %usage, "generate key pair");
        match usage {
            KeyUsage::KeyExchange => self.generate_kem(),
            KeyUsage::Signing => self.generate_dsa(),
        }
    }

    fn encapsulate(&self, recipient_public_key: &KeyMaterial) -> Result<(Vec<u8>, SecureBuffer)> {
        let expected = self.suite.public_key_len(KeyUsage::KeyExchange);
        let public = recipient_public_key.require(self.suite, KeyUsage::KeyExchange, KeyRole::Public, &[expected])?;

        if self.suite == CryptoSuite::XWingMlDsa65 {
            let (ciphertext, shared) = xwing::encapsulate(public)?;
            return Ok((ciphertext, SecureBuffer::from_slice(&shared[..])));
        }

        let public: [u8; MLKEM768_PUBLIC_KEY_LEN] = public.try_into().map_err(|_| CryptoError::EncapsulationFailed)?;
        let randomness = rng::encapsulation_seed::<32>()?;
        let (ciphertext, mut shared) = mlkem768::encapsulate(&MlKem768PublicKey::from(public), *randomness);
        let secret = SecureBuffer::from_slice(&shared);
        shared.zeroize();
        Ok((ciphertext.as_ref().to_vec(), secret))
    }

    fn decapsulate(&self, encapsulated_key: &[u8], private_key: &KeyMaterial) -> Result<SecureBuffer> {
        let bytes = self.kem_private_bytes(private_key)?;
        check_encapsulated_key(self.suite, encapsulated_key)?;

        if self.suite == CryptoSuite::XWingMlDsa65 {
            let key = load_xwing_private(bytes)?;
            let shared = key.decapsulate(encapsulated_key)?;
            return Ok(SecureBuffer::from_slice(&shared[..]));
        }

        let ciphertext: [u8; MLKEM768_CIPHERTEXT_LEN] =
            encapsulated_key.try_into().map_err(|_| CryptoError::DecapsulationFailed)?;
        let ciphertext = MlKem768Ciphertext::from(ciphertext);
        let mut shared = match load_kem_private(bytes)? {
            MlKemPrivate::Compact(pair) => mlkem768::decapsulate(pair.private_key(), &ciphertext),
            MlKemPrivate::Expanded(private) => mlkem768::decapsulate(&private, &ciphertext),
        };
        let secret = SecureBuffer::from_slice(&shared);
        shared.zeroize();
        Ok(secret)
    }

    fn sign_with_key(&self, data: &[u8], private_key: &KeyMaterial) -> Result<Vec<u8>> {
        let signing_key = match load_dsa_private(self.dsa_private_bytes(private_key)?)? {
            DsaPrivate::Compact(key) | DsaPrivate::Expanded(key) => key,
        };
        let randomness = rng::signing_seed::<32>()?;
        let signature = ml_dsa_65::sign(&signing_key, data, b"", *randomness)
            .map_err(|_| CryptoError::SignatureFailed)?;
        Ok(signature.as_slice().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8], public_key: &KeyMaterial) -> Result<bool> {
        let public = public_key.require(self.suite, KeyUsage::Signing, KeyRole::Public, &[MLDSA65_PUBLIC_KEY_LEN])?;
        let public: [u8; MLDSA65_PUBLIC_KEY_LEN] = public
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyFormat("ML-DSA-65 public key".to_string()))?;
        let Ok(signature) = <[u8; MLDSA65_SIGNATURE_LEN]>::try_from(signature) else {
            return Ok(false);
        };
        let verification_key = MLDSA65VerificationKey::new(public);
        Ok(ml_dsa_65::verify(&verification_key, data, b"", &MLDSA65Signature::new(signature)).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_private_key_sizes() {
        let provider = NativePqcProvider::new();
        let kem = provider.generate_key_pair(KeyUsage::KeyExchange).unwrap();
        assert_eq!(kem.public().len(), 1184);
        assert_eq!(kem.private().len(), 96);

        let dsa = provider.generate_key_pair(KeyUsage::Signing).unwrap();
        assert_eq!(dsa.public().len(), 1952);
        assert_eq!(dsa.private().len(), 64);

        let xwing = NativePqcProvider::hybrid().generate_key_pair(KeyUsage::KeyExchange).unwrap();
        assert_eq!(xwing.public().len(), 1216);
        assert_eq!(xwing.private().len(), 64);
    }

    #[test]
    fn test_kem_shared_secrets_agree() {
        let provider = NativePqcProvider::new();
        let pair = provider.generate_key_pair(KeyUsage::KeyExchange).unwrap();
        let (ciphertext, sender) = provider.encapsulate(pair.public()).unwrap();
        assert_eq!(ciphertext.len(), 1088);
        let receiver = provider.decapsulate(&ciphertext, pair.private()).unwrap();
        assert!(sender.with_bytes(|bytes| receiver.ct_eq(bytes)));
    }

    #[test]
    fn test_corrupted_digest_is_rejected() {
        let provider = NativePqcProvider::new();
        let pair = provider.generate_key_pair(KeyUsage::KeyExchange).unwrap();
        let (ciphertext, _) = provider.encapsulate(pair.public()).unwrap();

        let mut bytes = pair.private().as_bytes().to_vec();
        bytes[95] ^= 0x01;
        let corrupted = KeyMaterial::private(CryptoSuite::MlKem768MlDsa65, KeyUsage::KeyExchange, bytes);
        assert!(matches!(
            provider.decapsulate(&ciphertext, &corrupted),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_expanded_key_decapsulates_like_compact() {
        let provider = NativePqcProvider::new();
        let pair = provider.generate_key_pair(KeyUsage::KeyExchange).unwrap();
        let expanded = provider.expand_private_key(pair.private()).unwrap();
        assert_eq!(expanded.len(), MLKEM768_EXPANDED_PRIVATE_KEY_LEN);

        let (ciphertext, sender) = provider.encapsulate(pair.public()).unwrap();
        let receiver = provider.decapsulate(&ciphertext, &expanded).unwrap();
        assert!(sender.with_bytes(|bytes| receiver.ct_eq(bytes)));
    }

    #[test]
    fn test_expanded_signing_key_signs() {
        let provider = NativePqcProvider::new();
        let pair = provider.generate_key_pair(KeyUsage::Signing).unwrap();
        let expanded = provider.expand_private_key(pair.private()).unwrap();
        assert_eq!(expanded.len(), MLDSA65_EXPANDED_PRIVATE_KEY_LEN);

        let signature = provider.sign_with_key(b"msg", &expanded).unwrap();
        assert!(provider.verify(b"msg", &signature, pair.public()).unwrap());
    }

    #[test]
    fn test_xwing_has_no_expanded_form() {
        let provider = NativePqcProvider::hybrid();
        let pair = provider.generate_key_pair(KeyUsage::KeyExchange).unwrap();
        assert!(matches!(
            provider.expand_private_key(pair.private()),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_classic_suite_is_not_native() {
        assert!(matches!(
            NativePqcProvider::for_suite(CryptoSuite::X25519Ed25519),
            Err(CryptoError::ProviderNotAvailable(_))
        ));
    }

    #[test]
    fn test_self_test_passes() {
        assert!(NativePqcProvider::new().self_test());
        assert!(NativePqcProvider::hybrid().self_test());
    }
}
