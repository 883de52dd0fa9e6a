//! Provider selection policy
//!
//! ```json
//! { "minimum_tier": "software-pqc", "prefer_hybrid_kem": true, "classic_hpke": true }
//! ```
//!
//! Every field is optional; missing ones take the defaults below.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::suite::ProviderTier;
use crate::{CryptoError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CryptoPolicy {
    /// Tiers below this are never activated.
    pub minimum_tier: ProviderTier,
    /// Native tier uses X-Wing instead of plain ML-KEM-768.
    pub prefer_hybrid_kem: bool,
    /// Classic tier seals with HPKE base mode when compiled in.
    pub classic_hpke: bool,
}

impl Default for CryptoPolicy {
    fn default() -> Self {
        Self {
            minimum_tier: ProviderTier::Classic,
            prefer_hybrid_kem: false,
            classic_hpke: true,
        }
    }
}

impl CryptoPolicy {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CryptoError::InvalidPolicy(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| CryptoError::InvalidPolicy(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Post-quantum only.
    pub fn pqc_only() -> Self {
        Self {
            minimum_tier: ProviderTier::SoftwarePqc,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        assert_eq!(CryptoPolicy::from_json("{}").unwrap(), CryptoPolicy::default());
    }

    #[test]
    fn test_partial_override() {
        let policy = CryptoPolicy::from_json(r#"{"minimum_tier":"native-pqc","prefer_hybrid_kem":true}"#).unwrap();
        assert_eq!(policy.minimum_tier, ProviderTier::NativePqc);
        assert!(policy.prefer_hybrid_kem);
        assert!(policy.classic_hpke);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = CryptoPolicy::from_json(r#"{"minimum":"classic"}"#).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidPolicy(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = CryptoPolicy::load(Path::new("/nonexistent/tessera-policy.json")).unwrap_err();
        assert!(err.to_string().contains("tessera-policy.json"));
    }
}
