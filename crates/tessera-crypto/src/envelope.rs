//! Sealed envelope and its wire format
//!
//! Wire layout, each field prefixed by its length as u32 little-endian:
//!
//! ```text
//! len | encapsulated key | len | nonce (0|12) | len | ciphertext | len | tag (0|16)
//! ```
//!
//! Empty nonce and tag mark the HPKE construction, which carries both inside
//! the ciphertext.

use serde::{Deserialize, Serialize};

use crate::cipher::{NONCE_SIZE, TAG_SIZE};
use crate::{CryptoError, Result};

const LEN_PREFIX: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    #[serde(with = "hex::serde")]
    pub encapsulated_key: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub nonce: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub tag: Vec<u8>,
}

impl SealedEnvelope {
    pub fn new(
        encapsulated_key: Vec<u8>,
        nonce: Vec<u8>,
        ciphertext: Vec<u8>,
        tag: Vec<u8>,
    ) -> Result<Self> {
        let envelope = Self {
            encapsulated_key,
            nonce,
            ciphertext,
            tag,
        };
        envelope.validate()?;
        Ok(envelope)
    }

    /// An HPKE base-mode envelope: nonce and tag live inside `ciphertext`.
    pub fn hpke(encapsulated_key: Vec<u8>, ciphertext: Vec<u8>) -> Self {
        Self {
            encapsulated_key,
            nonce: Vec::new(),
            ciphertext,
            tag: Vec::new(),
        }
    }

    pub fn is_hpke(&self) -> bool {
        self.nonce.is_empty() && self.tag.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.encapsulated_key.is_empty() {
            return Err(CryptoError::MalformedEnvelope("missing encapsulated key"));
        }
        if !self.nonce.is_empty() && self.nonce.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidNonceLength(self.nonce.len()));
        }
        if !self.tag.is_empty() && self.tag.len() != TAG_SIZE {
            return Err(CryptoError::MalformedEnvelope("tag must be 0 or 16 bytes"));
        }
        if self.nonce.is_empty() != self.tag.is_empty() {
            return Err(CryptoError::MalformedEnvelope(
                "nonce and tag must both be present or both be empty",
            ));
        }
        Ok(())
    }

    pub fn encoded_len(&self) -> usize {
        4 * LEN_PREFIX
            + self.encapsulated_key.len()
            + self.nonce.len()
            + self.ciphertext.len()
            + self.tag.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.validate()?;
        let mut out = Vec::with_capacity(self.encoded_len());
        for field in [&self.encapsulated_key, &self.nonce, &self.ciphertext, &self.tag] {
            let len = u32::try_from(field.len())
                .map_err(|_| CryptoError::MalformedEnvelope("field longer than u32::MAX"))?;
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(field);
        }
        Ok(out)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = FieldReader { rest: data };
        let encapsulated_key = reader.field()?;
        let nonce = reader.field()?;
        let ciphertext = reader.field()?;
        let tag = reader.field()?;
        if !reader.rest.is_empty() {
            return Err(CryptoError::MalformedEnvelope("trailing bytes after tag"));
        }
        Self::new(encapsulated_key, nonce, ciphertext, tag)
    }
}

struct FieldReader<'a> {
    rest: &'a [u8],
}

impl FieldReader<'_> {
    fn field(&mut self) -> Result<Vec<u8>> {
        let Some((prefix, rest)) = self.rest.split_first_chunk::<LEN_PREFIX>() else {
            return Err(CryptoError::MalformedEnvelope("truncated length prefix"));
        };
        let len = u32::from_le_bytes(*prefix) as usize;
        if rest.len() < len {
            return Err(CryptoError::MalformedEnvelope("truncated field"));
        }
        let (field, rest) = rest.split_at(len);
        self.rest = rest;
        Ok(field.to_vec())
    }
}
