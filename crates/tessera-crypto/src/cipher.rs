//! ChaCha20-Poly1305 data encapsulation
//!
//! Detached mode: nonce and tag travel as separate envelope fields and the
//! caller's context is the associated data. Every decryption failure maps to
//! the same error, so a bad tag looks exactly like a corrupted ciphertext.

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Key, Nonce, Tag,
};
use zeroize::Zeroizing;

use crate::rng;
use crate::{CryptoError, Result};

/// 256-bit key (32 bytes)
pub const KEY_SIZE: usize = 32;
/// 96-bit nonce (12 bytes)
pub const NONCE_SIZE: usize = 12;
/// Poly1305 tag (16 bytes)
pub const TAG_SIZE: usize = 16;

pub(crate) struct Sealed {
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_SIZE],
}

pub(crate) fn seal(key: &[u8; KEY_SIZE], plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = rng::nonce::<NONCE_SIZE>()?;

    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), aad, &mut ciphertext)
        .map_err(|_| CryptoError::OperationFailed("encryption failed".to_string()))?;

    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(tag.as_slice());
    Ok(Sealed {
        nonce,
        ciphertext,
        tag: tag_bytes,
    })
}

pub(crate) fn open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonceLength(nonce.len()));
    }
    if tag.len() != TAG_SIZE {
        return Err(CryptoError::open_failed());
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let mut plaintext = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            aad,
            &mut plaintext[..],
            Tag::from_slice(tag),
        )
        .map_err(|_| CryptoError::open_failed())?;
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_SIZE] = [0x11; KEY_SIZE];

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let sealed = seal(&KEY, b"session bootstrap", b"ctx").unwrap();
        assert_ne!(sealed.ciphertext.as_slice(), b"session bootstrap");

        let opened = open(&KEY, &sealed.nonce, &sealed.ciphertext, &sealed.tag, b"ctx").unwrap();
        assert_eq!(opened.as_slice(), b"session bootstrap");
    }

    #[test]
    fn test_tag_and_ciphertext_failures_are_identical() {
        let sealed = seal(&KEY, b"secret data", b"ctx").unwrap();

        let mut bad_tag = sealed.tag;
        bad_tag[0] ^= 0x01;
        let tag_err = open(&KEY, &sealed.nonce, &sealed.ciphertext, &bad_tag, b"ctx").unwrap_err();

        let mut bad_ct = sealed.ciphertext.clone();
        bad_ct[0] ^= 0x01;
        let ct_err = open(&KEY, &sealed.nonce, &bad_ct, &sealed.tag, b"ctx").unwrap_err();

        assert_eq!(tag_err.to_string(), ct_err.to_string());
    }

    #[test]
    fn test_wrong_aad_fails() {
        let sealed = seal(&KEY, b"secret data", b"test-v1").unwrap();
        assert!(open(&KEY, &sealed.nonce, &sealed.ciphertext, &sealed.tag, b"test-v2").is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = seal(&KEY, b"secret data", b"").unwrap();
        let other = [0x22; KEY_SIZE];
        assert!(open(&other, &sealed.nonce, &sealed.ciphertext, &sealed.tag, b"").is_err());
    }

    #[test]
    fn test_nonce_length_checked() {
        let sealed = seal(&KEY, b"x", b"").unwrap();
        let err = open(&KEY, &sealed.nonce[..8], &sealed.ciphertext, &sealed.tag, b"").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidNonceLength(8)));
    }
}
