use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ed25519_dalek::SigningKey as Ed25519SigningKey;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature as P256Signature, SigningKey as P256SigningKey};
use p256::pkcs8::EncodePublicKey;
use tessera_crypto::{
    ClassicProvider, CryptoError, CryptoProvider, CryptoSuite, KeyMaterial, KeyUsage, PlatformSigner, Result,
    SigningKeyHandle,
};

fn providers() -> Vec<Arc<dyn CryptoProvider>> {
    let mut all: Vec<Arc<dyn CryptoProvider>> = vec![Arc::new(ClassicProvider::new())];
    #[cfg(feature = "native-pqc")]
    {
        all.push(Arc::new(tessera_crypto::NativePqcProvider::new()));
        all.push(Arc::new(tessera_crypto::NativePqcProvider::hybrid()));
    }
    #[cfg(feature = "software-pqc")]
    all.push(Arc::new(tessera_crypto::SoftwarePqcProvider::new()));
    all
}

/// Stands in for an enclave: holds the key and counts how often it signs.
#[derive(Debug)]
struct EnclaveSigner {
    provider: Arc<dyn CryptoProvider>,
    key: KeyMaterial,
    calls: Arc<AtomicUsize>,
}

impl PlatformSigner for EnclaveSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.provider.sign_with_key(data, &self.key)
    }
}

#[test]
fn test_raw_handle_signs_and_verifies() {
    for provider in providers() {
        let (public, private) = provider.generate_key_pair(KeyUsage::Signing).unwrap().into_parts();
        let signature = provider.sign(b"release v1.2.0", private.into()).unwrap();
        let expected = if provider.active_suite().is_post_quantum() { 3309 } else { 64 };
        assert_eq!(signature.len(), expected);
        assert!(provider.verify(b"release v1.2.0", &signature, &public).unwrap());
    }
}

#[test]
fn test_mutations_fail_verification() {
    for provider in providers() {
        let pair = provider.generate_key_pair(KeyUsage::Signing).unwrap();
        let signature = provider.sign_with_key(b"payload", pair.private()).unwrap();

        assert!(!provider.verify(b"paylaod", &signature, pair.public()).unwrap());

        let mut flipped = signature.clone();
        flipped[10] ^= 0x80;
        assert!(!provider.verify(b"payload", &flipped, pair.public()).unwrap());

        assert!(!provider.verify(b"payload", &signature[1..], pair.public()).unwrap());
        assert!(!provider.verify(b"payload", &[], pair.public()).unwrap());

        let other = provider.generate_key_pair(KeyUsage::Signing).unwrap();
        assert!(!provider.verify(b"payload", &signature, other.public()).unwrap());
    }
}

#[test]
fn test_callback_handle() {
    for provider in providers() {
        let (public, private) = provider.generate_key_pair(KeyUsage::Signing).unwrap().into_parts();
        let remote = Arc::clone(&provider);
        let handle = SigningKeyHandle::callback(move |data| remote.sign_with_key(data, &private));

        let signature = provider.sign(b"remote identity", handle).unwrap();
        assert!(provider.verify(b"remote identity", &signature, &public).unwrap());
    }
}

#[test]
fn test_callback_error_propagates() {
    let provider = ClassicProvider::new();
    let handle = SigningKeyHandle::callback(|_| Err(CryptoError::Keychain("hsm offline".to_string())));
    assert!(matches!(
        provider.sign(b"x", handle),
        Err(CryptoError::Keychain(message)) if message == "hsm offline"
    ));
}

#[test]
fn test_platform_handle() {
    for provider in providers() {
        let (public, private) = provider.generate_key_pair(KeyUsage::Signing).unwrap().into_parts();
        let calls = Arc::new(AtomicUsize::new(0));
        let signer = EnclaveSigner {
            provider: Arc::clone(&provider),
            key: private,
            calls: Arc::clone(&calls),
        };

        let handle = SigningKeyHandle::platform(signer);
        assert!(format!("{handle:?}").starts_with("Platform"));
        let signature = provider.sign(b"device attestation", handle).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(provider.verify(b"device attestation", &signature, &public).unwrap());
    }
}

#[test]
fn test_exchange_key_cannot_sign() {
    for provider in providers() {
        let exchange = provider.generate_key_pair(KeyUsage::KeyExchange).unwrap();
        assert!(matches!(
            provider.sign_with_key(b"x", exchange.private()),
            Err(CryptoError::KeyUsageMismatch { .. })
        ));
    }
}

#[test]
fn test_raw_handle_debug_redacts_key() {
    let provider = ClassicProvider::new();
    let pair = provider.generate_key_pair(KeyUsage::Signing).unwrap();
    let secret_hex = hex::encode(pair.private().as_bytes());
    let rendered = format!("{:?}", SigningKeyHandle::from(pair.private().clone()));
    assert!(rendered.starts_with("Raw"));
    assert!(!rendered.contains(&secret_hex));
}

/// First Ed25519 seed of the form `[i_lo, i_hi, 0, ..]` whose public key starts with `prefix`.
fn ed25519_key_starting_with(prefix: u8) -> (Ed25519SigningKey, Vec<u8>) {
    (0..=u16::MAX)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[..2].copy_from_slice(&i.to_le_bytes());
            Ed25519SigningKey::from_bytes(&seed)
        })
        .find_map(|key| {
            let public = key.verifying_key().to_bytes();
            (public[0] == prefix).then(|| (key, public.to_vec()))
        })
        .unwrap()
}

#[test]
fn test_classic_verify_every_key_encoding() {
    let provider = ClassicProvider::new();
    let signing_public = |bytes: Vec<u8>| KeyMaterial::public(CryptoSuite::X25519Ed25519, KeyUsage::Signing, bytes);
    let message = b"firmware 4.1";

    for prefix in [0x30, 0x04] {
        let (key, public) = ed25519_key_starting_with(prefix);
        assert_eq!(public.len(), 32);
        let signature = ed25519_dalek::Signer::sign(&key, message).to_bytes();
        let public = signing_public(public);
        assert!(provider.verify(message, &signature, &public).unwrap(), "0x{prefix:02x}");
        assert!(!provider.verify(b"firmware 4.2", &signature, &public).unwrap(), "0x{prefix:02x}");

        let private = KeyMaterial::private(CryptoSuite::X25519Ed25519, KeyUsage::Signing, key.to_bytes().to_vec());
        let ours = provider.sign_with_key(message, &private).unwrap();
        assert_eq!(ours, signature.to_vec());
    }

    let p256_key = P256SigningKey::from_slice(&[0x42; 32]).unwrap();
    let p256_signature: P256Signature = p256_key.sign(message);
    let verifying = p256_key.verifying_key();
    let der = verifying.to_public_key_der().unwrap().as_bytes().to_vec();
    let raw = verifying.to_encoded_point(false).as_bytes().to_vec();
    for public in [der, raw] {
        let public = signing_public(public);
        assert!(provider.verify(message, &p256_signature.to_bytes(), &public).unwrap());
        assert!(!provider.verify(b"firmware 4.2", &p256_signature.to_bytes(), &public).unwrap());
    }
}
