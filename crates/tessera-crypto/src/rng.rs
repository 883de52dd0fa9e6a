//! System CSPRNG access
//!
//! Every byte of randomness comes from `ring::rand::SystemRandom`. A failed
//! fill is reported to the caller, never papered over with a weaker source.

use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

/// Randomness for key generation. Failure is `KeyGenerationFailed`.
pub(crate) fn fill_key_material(dest: &mut [u8]) -> Result<()> {
    SystemRandom::new()
        .fill(dest)
        .map_err(|_| CryptoError::KeyGenerationFailed("system RNG unavailable".to_string()))
}

pub(crate) fn key_seed<const N: usize>() -> Result<Zeroizing<[u8; N]>> {
    let mut seed = Zeroizing::new([0u8; N]);
    fill_key_material(&mut seed[..])?;
    Ok(seed)
}

/// Randomness consumed while encapsulating. Failure is `EncapsulationFailed`.
pub(crate) fn encapsulation_seed<const N: usize>() -> Result<Zeroizing<[u8; N]>> {
    let mut seed = Zeroizing::new([0u8; N]);
    SystemRandom::new()
        .fill(&mut seed[..])
        .map_err(|_| CryptoError::EncapsulationFailed)?;
    Ok(seed)
}

pub(crate) fn nonce<const N: usize>() -> Result<[u8; N]> {
    let mut nonce = [0u8; N];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| CryptoError::OperationFailed("system RNG unavailable".to_string()))?;
    Ok(nonce)
}

/// Hedging randomness for signatures. Failure is `SignatureFailed`.
#[cfg(feature = "native-pqc")]
pub(crate) fn signing_seed<const N: usize>() -> Result<Zeroizing<[u8; N]>> {
    let mut seed = Zeroizing::new([0u8; N]);
    SystemRandom::new()
        .fill(&mut seed[..])
        .map_err(|_| CryptoError::SignatureFailed)?;
    Ok(seed)
}
