//! Secret byte storage
//!
//! `SecureBuffer` owns a fixed-length heap allocation that is overwritten
//! with zeros in `Drop`. Bytes are reachable only through scoped closures,
//! or through an explicit `export` when a higher layer needs its own copy.

use std::fmt;

use zeroize::{Zeroize, Zeroizing};

use crate::rng;
use crate::Result;

pub struct SecureBuffer {
    bytes: Box<[u8]>,
}

impl SecureBuffer {
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len].into_boxed_slice(),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec().into_boxed_slice(),
        }
    }

    /// Fresh random bytes from the system CSPRNG.
    pub fn random(len: usize) -> Result<Self> {
        let mut buffer = Self::zeroed(len);
        rng::fill_key_material(&mut buffer.bytes)?;
        Ok(buffer)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.bytes)
    }

    pub fn with_bytes_mut<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.bytes)
    }

    /// Copies the secret out for a caller that manages its own lifetime.
    pub fn export(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.bytes.to_vec())
    }

    /// Equality without early exit on the first differing byte.
    pub fn ct_eq(&self, other: &[u8]) -> bool {
        if self.bytes.len() != other.len() {
            return false;
        }
        self.bytes
            .iter()
            .zip(other)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureBuffer([REDACTED; {}])", self.bytes.len())
    }
}
