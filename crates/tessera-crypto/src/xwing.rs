//! X-Wing hybrid KEM (ML-KEM-768 + X25519)
//!
//! A 32-byte seed expands with SHAKE256 into the ML-KEM `d || z` seed and the
//! X25519 scalar. The shared secret is
//! `SHA3-256(ss_M || ss_X || ct_X || pk_X || label)`.

use libcrux_ml_kem::mlkem768::{self, MlKem768Ciphertext, MlKem768KeyPair, MlKem768PublicKey};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Digest, Sha3_256, Shake256};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use crate::suite::{MLKEM768_CIPHERTEXT_LEN, MLKEM768_PUBLIC_KEY_LEN, X25519_KEY_LEN, XWING_CIPHERTEXT_LEN};
use crate::{CryptoError, Result};

pub(crate) const SEED_LEN: usize = 32;
const ESEED_LEN: usize = 64;

const LABEL: &[u8] = br"\.//^\";

pub(crate) struct ExpandedKey {
    kem: MlKem768KeyPair,
    x25519: StaticSecret,
    x25519_public: PublicKey,
}

pub(crate) fn expand(seed: &[u8; SEED_LEN]) -> ExpandedKey {
    let mut hasher = Shake256::default();
    hasher.update(seed);
    let mut reader = hasher.finalize_xof();
    let mut expanded = Zeroizing::new([0u8; 96]);
    reader.read(&mut expanded[..]);

    let mut kem_seed = [0u8; 64];
    kem_seed.copy_from_slice(&expanded[..64]);
    let kem = mlkem768::generate_key_pair(kem_seed);
    kem_seed.zeroize();

    let mut scalar = [0u8; X25519_KEY_LEN];
    scalar.copy_from_slice(&expanded[64..]);
    let x25519 = StaticSecret::from(scalar);
    scalar.zeroize();
    let x25519_public = PublicKey::from(&x25519);

    ExpandedKey {
        kem,
        x25519,
        x25519_public,
    }
}

impl ExpandedKey {
    /// `pk_M || pk_X`
    pub(crate) fn public_key(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MLKEM768_PUBLIC_KEY_LEN + X25519_KEY_LEN);
        out.extend_from_slice(self.kem.public_key().as_ref());
        out.extend_from_slice(self.x25519_public.as_bytes());
        out
    }

    pub(crate) fn decapsulate(&self, ciphertext: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
        if ciphertext.len() != XWING_CIPHERTEXT_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: XWING_CIPHERTEXT_LEN,
                actual: ciphertext.len(),
            });
        }
        let (ct_m, ct_x) = ciphertext.split_at(MLKEM768_CIPHERTEXT_LEN);
        let ct_m: [u8; MLKEM768_CIPHERTEXT_LEN] =
            ct_m.try_into().map_err(|_| CryptoError::DecapsulationFailed)?;
        let ct_x: [u8; X25519_KEY_LEN] = ct_x.try_into().map_err(|_| CryptoError::DecapsulationFailed)?;

        let ss_m = Zeroizing::new(mlkem768::decapsulate(
            self.kem.private_key(),
            &MlKem768Ciphertext::from(ct_m),
        ));
        let ss_x = Zeroizing::new(self.x25519.diffie_hellman(&PublicKey::from(ct_x)).to_bytes());
        Ok(combine(&ss_m, &ss_x, &ct_x, self.x25519_public.as_bytes()))
    }
}

pub(crate) fn encapsulate(public_key: &[u8]) -> Result<(Vec<u8>, Zeroizing<[u8; 32]>)> {
    let eseed = crate::rng::encapsulation_seed::<ESEED_LEN>()?;
    encapsulate_derand(public_key, &eseed)
}

/// `eseed[..32]` is the ML-KEM message, `eseed[32..]` the ephemeral X25519 scalar.
fn encapsulate_derand(public_key: &[u8], eseed: &[u8; ESEED_LEN]) -> Result<(Vec<u8>, Zeroizing<[u8; 32]>)> {
    let (pk_m, pk_x) = public_key.split_at(MLKEM768_PUBLIC_KEY_LEN);
    let pk_m: [u8; MLKEM768_PUBLIC_KEY_LEN] = pk_m.try_into().map_err(|_| CryptoError::EncapsulationFailed)?;
    let pk_x: [u8; X25519_KEY_LEN] = pk_x.try_into().map_err(|_| CryptoError::EncapsulationFailed)?;

    let mut kem_randomness = Zeroizing::new([0u8; 32]);
    kem_randomness.copy_from_slice(&eseed[..32]);
    let (ct_m, ss_m) = mlkem768::encapsulate(&MlKem768PublicKey::from(pk_m), *kem_randomness);
    let ss_m = Zeroizing::new(ss_m);

    let mut scalar = Zeroizing::new([0u8; X25519_KEY_LEN]);
    scalar.copy_from_slice(&eseed[32..]);
    let ephemeral = StaticSecret::from(*scalar);
    let ct_x = PublicKey::from(&ephemeral);
    let ss_x = Zeroizing::new(ephemeral.diffie_hellman(&PublicKey::from(pk_x)).to_bytes());

    let mut ciphertext = Vec::with_capacity(XWING_CIPHERTEXT_LEN);
    ciphertext.extend_from_slice(ct_m.as_ref());
    ciphertext.extend_from_slice(ct_x.as_bytes());

    let shared = combine(&ss_m, &ss_x, ct_x.as_bytes(), &pk_x);
    Ok((ciphertext, shared))
}

fn combine(ss_m: &[u8; 32], ss_x: &[u8; 32], ct_x: &[u8; 32], pk_x: &[u8; 32]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Sha3_256::new();
    Digest::update(&mut hasher, ss_m);
    Digest::update(&mut hasher, ss_x);
    Digest::update(&mut hasher, ct_x);
    Digest::update(&mut hasher, pk_x);
    Digest::update(&mut hasher, LABEL);
    Zeroizing::new(hasher.finalize().into())
}
