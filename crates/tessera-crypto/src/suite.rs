//! Suite, usage and tier identifiers
//!
//! Wire ids are part of the protocol: they travel as 2-byte little-endian
//! integers and are mixed into every HKDF `info`, so they never change once
//! assigned.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MLKEM768_PUBLIC_KEY_LEN: usize = 1184;
pub const MLKEM768_CIPHERTEXT_LEN: usize = 1088;
pub const MLDSA65_PUBLIC_KEY_LEN: usize = 1952;
pub const MLDSA65_SIGNATURE_LEN: usize = 3309;
pub const XWING_PUBLIC_KEY_LEN: usize = MLKEM768_PUBLIC_KEY_LEN + X25519_KEY_LEN;
pub const XWING_CIPHERTEXT_LEN: usize = MLKEM768_CIPHERTEXT_LEN + X25519_KEY_LEN;
pub const X25519_KEY_LEN: usize = 32;
pub const ED25519_KEY_LEN: usize = 32;
pub const SHARED_SECRET_LEN: usize = 32;

/// An algorithm combination: one KEM plus one signature scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CryptoSuite {
    /// ML-KEM-768 + ML-DSA-65
    MlKem768MlDsa65,
    /// X-Wing (ML-KEM-768 + X25519) + ML-DSA-65
    XWingMlDsa65,
    /// X25519 + Ed25519
    X25519Ed25519,
}

impl CryptoSuite {
    pub const ALL: [CryptoSuite; 3] = [
        CryptoSuite::MlKem768MlDsa65,
        CryptoSuite::XWingMlDsa65,
        CryptoSuite::X25519Ed25519,
    ];

    pub const fn wire_id(self) -> u16 {
        match self {
            CryptoSuite::MlKem768MlDsa65 => 0x0001,
            CryptoSuite::XWingMlDsa65 => 0x0002,
            CryptoSuite::X25519Ed25519 => 0x0100,
        }
    }

    pub const fn wire_bytes(self) -> [u8; 2] {
        self.wire_id().to_le_bytes()
    }

    pub fn from_wire_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|suite| suite.wire_id() == id)
    }

    pub fn from_wire_bytes(bytes: [u8; 2]) -> Option<Self> {
        Self::from_wire_id(u16::from_le_bytes(bytes))
    }

    pub const fn name(self) -> &'static str {
        match self {
            CryptoSuite::MlKem768MlDsa65 => "ML-KEM-768+ML-DSA-65",
            CryptoSuite::XWingMlDsa65 => "X-Wing+ML-DSA-65",
            CryptoSuite::X25519Ed25519 => "X25519+Ed25519",
        }
    }

    /// Public key size for a usage. Private key sizes are provider-specific.
    pub const fn public_key_len(self, usage: KeyUsage) -> usize {
        match (self, usage) {
            (CryptoSuite::MlKem768MlDsa65, KeyUsage::KeyExchange) => MLKEM768_PUBLIC_KEY_LEN,
            (CryptoSuite::XWingMlDsa65, KeyUsage::KeyExchange) => XWING_PUBLIC_KEY_LEN,
            (CryptoSuite::X25519Ed25519, KeyUsage::KeyExchange) => X25519_KEY_LEN,
            (CryptoSuite::X25519Ed25519, KeyUsage::Signing) => ED25519_KEY_LEN,
            (_, KeyUsage::Signing) => MLDSA65_PUBLIC_KEY_LEN,
        }
    }

    pub const fn encapsulated_key_len(self) -> usize {
        match self {
            CryptoSuite::MlKem768MlDsa65 => MLKEM768_CIPHERTEXT_LEN,
            CryptoSuite::XWingMlDsa65 => XWING_CIPHERTEXT_LEN,
            CryptoSuite::X25519Ed25519 => X25519_KEY_LEN,
        }
    }

    pub const fn is_post_quantum(self) -> bool {
        !matches!(self, CryptoSuite::X25519Ed25519)
    }
}

impl fmt::Display for CryptoSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Intended use of a key; a key never crosses over to the other usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyUsage {
    KeyExchange,
    Signing,
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyUsage::KeyExchange => f.write_str("key-exchange"),
            KeyUsage::Signing => f.write_str("signing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyRole {
    Public,
    Private,
}

/// Backend tier, ordered from least to most preferred
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderTier {
    Classic,
    SoftwarePqc,
    NativePqc,
}

impl ProviderTier {
    /// Most preferred first.
    pub const BY_PREFERENCE: [ProviderTier; 3] = [
        ProviderTier::NativePqc,
        ProviderTier::SoftwarePqc,
        ProviderTier::Classic,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ProviderTier::NativePqc => "native-pqc",
            ProviderTier::SoftwarePqc => "software-pqc",
            ProviderTier::Classic => "classic",
        }
    }

    /// Whether this build carries the backend for the tier.
    pub const fn is_compiled(self) -> bool {
        match self {
            ProviderTier::NativePqc => cfg!(feature = "native-pqc"),
            ProviderTier::SoftwarePqc => cfg!(feature = "software-pqc"),
            ProviderTier::Classic => true,
        }
    }
}

impl fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_ids_are_stable() {
        assert_eq!(CryptoSuite::MlKem768MlDsa65.wire_bytes(), [0x01, 0x00]);
        assert_eq!(CryptoSuite::XWingMlDsa65.wire_bytes(), [0x02, 0x00]);
        assert_eq!(CryptoSuite::X25519Ed25519.wire_bytes(), [0x00, 0x01]);
    }

    #[test]
    fn test_wire_id_lookup() {
        for suite in CryptoSuite::ALL {
            assert_eq!(CryptoSuite::from_wire_bytes(suite.wire_bytes()), Some(suite));
        }
        assert_eq!(CryptoSuite::from_wire_id(0xffff), None);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(ProviderTier::NativePqc > ProviderTier::SoftwarePqc);
        assert!(ProviderTier::SoftwarePqc > ProviderTier::Classic);
        assert!(ProviderTier::Classic.is_compiled());
    }

    #[test]
    fn test_fixed_sizes() {
        let suite = CryptoSuite::MlKem768MlDsa65;
        assert_eq!(suite.public_key_len(KeyUsage::KeyExchange), 1184);
        assert_eq!(suite.public_key_len(KeyUsage::Signing), 1952);
        assert_eq!(suite.encapsulated_key_len(), 1088);
        assert_eq!(CryptoSuite::XWingMlDsa65.public_key_len(KeyUsage::KeyExchange), 1216);
        assert_eq!(CryptoSuite::XWingMlDsa65.encapsulated_key_len(), 1120);
    }

    #[test]
    fn test_suite_serde_names() {
        let json = serde_json::to_string(&CryptoSuite::XWingMlDsa65).unwrap();
        assert_eq!(json, "\"x-wing-ml-dsa65\"");
        let tier: ProviderTier = serde_json::from_str("\"software-pqc\"").unwrap();
        assert_eq!(tier, ProviderTier::SoftwarePqc);
    }
}
