//! Safe wrappers over the PQClean ML-KEM-768 / ML-DSA-65 C entry points
//!
//! Each wrapper owns its output buffers, passes raw pointers only for the
//! duration of one C call, and checks the returned status. Sizes come from
//! the library, never from constants in this crate. Secret outputs are
//! written straight into a `SecureBuffer`.

use std::ptr;

use pqcrypto_mldsa::ffi as dsa_ffi;
use pqcrypto_mldsa::mldsa65;
use pqcrypto_mlkem::ffi as kem_ffi;
use pqcrypto_mlkem::mlkem768;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _};

use crate::secure::SecureBuffer;
use crate::{CryptoError, Result};

const SUCCESS: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KemSizes {
    pub public_key: usize,
    pub secret_key: usize,
    pub ciphertext: usize,
    pub shared_secret: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DsaSizes {
    pub public_key: usize,
    pub secret_key: usize,
    pub signature: usize,
}

pub(crate) fn kem_sizes() -> KemSizes {
    KemSizes {
        public_key: mlkem768::public_key_bytes(),
        secret_key: mlkem768::secret_key_bytes(),
        ciphertext: mlkem768::ciphertext_bytes(),
        shared_secret: mlkem768::shared_secret_bytes(),
    }
}

pub(crate) fn dsa_sizes() -> DsaSizes {
    DsaSizes {
        public_key: mldsa65::public_key_bytes(),
        secret_key: mldsa65::secret_key_bytes(),
        signature: mldsa65::signature_bytes(),
    }
}

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(CryptoError::InvalidKeyLength { expected, actual });
    }
    Ok(())
}

pub(crate) fn kem_keypair() -> Result<(Vec<u8>, SecureBuffer)> {
    let sizes = kem_sizes();
    let mut public_key = vec![0u8; sizes.public_key];
    let mut secret_key = SecureBuffer::zeroed(sizes.secret_key);

    let status = secret_key.with_bytes_mut(|sk| unsafe {
        kem_ffi::PQCLEAN_MLKEM768_CLEAN_crypto_kem_keypair(public_key.as_mut_ptr(), sk.as_mut_ptr())
    });
    if status != SUCCESS {
        return Err(CryptoError::KeyGenerationFailed(format!(
            "ML-KEM-768 keypair returned status {status}"
        )));
    }
    Ok((public_key, secret_key))
}

pub(crate) fn kem_encapsulate(public_key: &[u8]) -> Result<(Vec<u8>, SecureBuffer)> {
    let sizes = kem_sizes();
    check_len(sizes.public_key, public_key.len())?;

    let mut ciphertext = vec![0u8; sizes.ciphertext];
    let mut shared = SecureBuffer::zeroed(sizes.shared_secret);
    let status = shared.with_bytes_mut(|ss| unsafe {
        kem_ffi::PQCLEAN_MLKEM768_CLEAN_crypto_kem_enc(
            ciphertext.as_mut_ptr(),
            ss.as_mut_ptr(),
            public_key.as_ptr(),
        )
    });
    if status != SUCCESS {
        return Err(CryptoError::EncapsulationFailed);
    }
    Ok((ciphertext, shared))
}

pub(crate) fn kem_decapsulate(ciphertext: &[u8], secret_key: &SecureBuffer) -> Result<SecureBuffer> {
    let sizes = kem_sizes();
    check_len(sizes.secret_key, secret_key.len())?;
    check_len(sizes.ciphertext, ciphertext.len())?;

    let mut shared = SecureBuffer::zeroed(sizes.shared_secret);
    let status = secret_key.with_bytes(|sk| {
        shared.with_bytes_mut(|ss| unsafe {
            kem_ffi::PQCLEAN_MLKEM768_CLEAN_crypto_kem_dec(ss.as_mut_ptr(), ciphertext.as_ptr(), sk.as_ptr())
        })
    });
    if status != SUCCESS {
        return Err(CryptoError::DecapsulationFailed);
    }
    Ok(shared)
}

pub(crate) fn dsa_keypair() -> Result<(Vec<u8>, SecureBuffer)> {
    let sizes = dsa_sizes();
    let mut public_key = vec![0u8; sizes.public_key];
    let mut secret_key = SecureBuffer::zeroed(sizes.secret_key);

    let status = secret_key.with_bytes_mut(|sk| unsafe {
        dsa_ffi::PQCLEAN_MLDSA65_CLEAN_crypto_sign_keypair(public_key.as_mut_ptr(), sk.as_mut_ptr())
    });
    if status != SUCCESS {
        return Err(CryptoError::KeyGenerationFailed(format!(
            "ML-DSA-65 keypair returned status {status}"
        )));
    }
    Ok((public_key, secret_key))
}

/// Detached ML-DSA-65 signature with an empty context string. The secret key
/// stays inside its `SecureBuffer` for the whole call.
pub(crate) fn dsa_sign(data: &[u8], secret_key: &SecureBuffer) -> Result<Vec<u8>> {
    let sizes = dsa_sizes();
    check_len(sizes.secret_key, secret_key.len())?;

    let mut signature = vec![0u8; sizes.signature];
    let mut signature_len: usize = 0;
    let status = secret_key.with_bytes(|sk| unsafe {
        dsa_ffi::PQCLEAN_MLDSA65_CLEAN_crypto_sign_signature_ctx(
            signature.as_mut_ptr(),
            &mut signature_len,
            data.as_ptr(),
            data.len(),
            ptr::null(),
            0,
            sk.as_ptr(),
        )
    });
    if status != SUCCESS || signature_len > sizes.signature {
        return Err(CryptoError::SignatureFailed);
    }
    signature.truncate(signature_len);
    Ok(signature)
}

pub(crate) fn dsa_verify(data: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool> {
    let sizes = dsa_sizes();
    check_len(sizes.public_key, public_key.len())?;
    if signature.len() != sizes.signature {
        return Ok(false);
    }
    let public_key = mldsa65::PublicKey::from_bytes(public_key)
        .map_err(|_| CryptoError::InvalidKeyFormat("ML-DSA-65 public key".to_string()))?;
    let Ok(signature) = mldsa65::DetachedSignature::from_bytes(signature) else {
        return Ok(false);
    };
    Ok(mldsa65::verify_detached_signature(&signature, data, &public_key).is_ok())
}
