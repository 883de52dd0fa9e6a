//! Key derivation shared by every tier
//!
//! The salt is `SHA-256(KDF_SALT_LABEL || context)` for all providers. Two
//! peers on different tiers interoperate only because these bytes agree, so
//! the labels below are versioned protocol constants.
//!
//! The envelope AEAD key and the exported session secret are two HKDF-Expand
//! outputs of the same PRK under distinct `info` strings, each ending with the
//! suite wire id (u16 LE). Neither output reveals the other.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::secure::SecureBuffer;
use crate::suite::CryptoSuite;
use crate::{CryptoError, Result};

pub const KDF_SALT_LABEL: &[u8] = b"tessera/v1/envelope-salt";
pub const AEAD_KEY_INFO: &[u8] = b"tessera/v1/envelope-key";
pub const SESSION_SECRET_INFO: &[u8] = b"tessera/v1/session-root";

pub const AEAD_KEY_LEN: usize = 32;
pub const SESSION_SECRET_LEN: usize = 32;

pub fn envelope_salt(context: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(KDF_SALT_LABEL);
    hasher.update(context);
    hasher.finalize().into()
}

/// `label || wire_id_le`
pub fn info(label: &[u8], suite: CryptoSuite) -> Vec<u8> {
    let mut info = Vec::with_capacity(label.len() + 2);
    info.extend_from_slice(label);
    info.extend_from_slice(&suite.wire_bytes());
    info
}

fn expand<const N: usize>(
    shared_secret: &SecureBuffer,
    suite: CryptoSuite,
    context: &[u8],
    label: &[u8],
) -> Result<Zeroizing<[u8; N]>> {
    let salt = envelope_salt(context);
    let mut okm = Zeroizing::new([0u8; N]);
    shared_secret.with_bytes(|ikm| {
        Hkdf::<Sha256>::new(Some(&salt), ikm)
            .expand(&info(label, suite), &mut okm[..])
            .map_err(|_| CryptoError::OperationFailed("HKDF output length".to_string()))
    })?;
    Ok(okm)
}

pub fn derive_aead_key(
    shared_secret: &SecureBuffer,
    suite: CryptoSuite,
    context: &[u8],
) -> Result<Zeroizing<[u8; AEAD_KEY_LEN]>> {
    expand(shared_secret, suite, context, AEAD_KEY_INFO)
}

pub fn derive_session_secret(
    shared_secret: &SecureBuffer,
    suite: CryptoSuite,
    context: &[u8],
) -> Result<SecureBuffer> {
    let okm = expand::<SESSION_SECRET_LEN>(shared_secret, suite, context, SESSION_SECRET_INFO)?;
    Ok(SecureBuffer::from_slice(&okm[..]))
}
