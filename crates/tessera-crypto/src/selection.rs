//! Tier governor and provider factory
//!
//! The governor never trusts compile-time availability: each candidate runs
//! its self-test, and the most preferred passing tier at or above the policy
//! minimum is activated. Landing below the best compiled tier is logged as a
//! downgrade; finding nothing acceptable is an error, never a silent fallback.

use tracing::{debug, info, warn};

use crate::classic::ClassicProvider;
use crate::config::CryptoPolicy;
#[cfg(feature = "native-pqc")]
use crate::native::NativePqcProvider;
use crate::provider::CryptoProvider;
#[cfg(feature = "software-pqc")]
use crate::software::SoftwarePqcProvider;
use crate::suite::{CryptoSuite, ProviderTier};
use crate::{CryptoError, Result};

/// Builds the provider for one tier, or `ProviderNotAvailable` when the tier
/// is not compiled in.
pub fn provider_for(tier: ProviderTier, policy: &CryptoPolicy) -> Result<Box<dyn CryptoProvider>> {
    match tier {
        #[cfg(feature = "native-pqc")]
        ProviderTier::NativePqc => Ok(Box::new(if policy.prefer_hybrid_kem {
            NativePqcProvider::hybrid()
        } else {
            NativePqcProvider::new()
        })),
        #[cfg(feature = "software-pqc")]
        ProviderTier::SoftwarePqc => Ok(Box::new(SoftwarePqcProvider::new())),
        ProviderTier::Classic => Ok(Box::new(ClassicProvider::with_hpke(policy.classic_hpke))),
        #[allow(unreachable_patterns)]
        tier => Err(CryptoError::ProviderNotAvailable(format!(
            "{tier} tier is not compiled in"
        ))),
    }
}

#[cfg(feature = "native-pqc")]
fn native_for(suite: CryptoSuite) -> Option<Box<dyn CryptoProvider>> {
    NativePqcProvider::for_suite(suite)
        .ok()
        .map(|p| Box::new(p) as Box<dyn CryptoProvider>)
}

#[cfg(not(feature = "native-pqc"))]
fn native_for(_: CryptoSuite) -> Option<Box<dyn CryptoProvider>> {
    None
}

#[cfg(feature = "software-pqc")]
fn software_for(suite: CryptoSuite) -> Option<Box<dyn CryptoProvider>> {
    SoftwarePqcProvider::for_suite(suite)
        .ok()
        .map(|p| Box::new(p) as Box<dyn CryptoProvider>)
}

#[cfg(not(feature = "software-pqc"))]
fn software_for(_: CryptoSuite) -> Option<Box<dyn CryptoProvider>> {
    None
}

/// The most preferred compiled provider implementing a negotiated suite.
pub fn provider_for_suite(suite: CryptoSuite, policy: &CryptoPolicy) -> Result<Box<dyn CryptoProvider>> {
    if suite == CryptoSuite::X25519Ed25519 {
        return Ok(Box::new(ClassicProvider::with_hpke(policy.classic_hpke)));
    }
    native_for(suite)
        .or_else(|| software_for(suite))
        .ok_or_else(|| CryptoError::ProviderNotAvailable(format!("no compiled provider implements {suite}")))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierReport {
    pub tier: ProviderTier,
    pub provider_name: &'static str,
    pub suite: CryptoSuite,
    pub passed: bool,
}

#[derive(Debug)]
pub struct TierGovernor {
    policy: CryptoPolicy,
    candidates: Vec<Box<dyn CryptoProvider>>,
}

impl TierGovernor {
    /// One candidate per compiled tier.
    pub fn new(policy: CryptoPolicy) -> Self {
        let candidates = ProviderTier::BY_PREFERENCE
            .into_iter()
            .filter_map(|tier| provider_for(tier, &policy).ok())
            .collect();
        Self::with_candidates(policy, candidates)
    }

    pub fn with_candidates(policy: CryptoPolicy, mut candidates: Vec<Box<dyn CryptoProvider>>) -> Self {
        candidates.sort_by(|a, b| b.tier().cmp(&a.tier()));
        Self { policy, candidates }
    }

    pub fn policy(&self) -> &CryptoPolicy {
        &self.policy
    }

    /// Self-test results for every candidate, minimum tier ignored.
    pub fn survey(&self) -> Vec<TierReport> {
        self.candidates
            .iter()
            .map(|provider| TierReport {
                tier: provider.tier(),
                provider_name: provider.provider_name(),
                suite: provider.active_suite(),
                passed: provider.self_test(),
            })
            .collect()
    }

    pub fn activate(self) -> Result<Box<dyn CryptoProvider>> {
        let minimum = self.policy.minimum_tier;
        let best = self.candidates.first().map(|p| p.tier());

        for provider in self.candidates {
            let tier = provider.tier();
            if tier < minimum {
                debug!(%tier, %minimum, "tier below policy minimum, skipped");
                continue;
            }
            if !provider.self_test() {
                warn!(%tier, provider = provider.provider_name(), "self-test failed, trying next tier");
                continue;
            }
            if best.is_some_and(|best| tier < best) {
                warn!(%tier, best = ?best, "activated below the best compiled tier");
            }
            info!(%tier, provider = provider.provider_name(), suite = %provider.active_suite(), "provider activated");
            return Ok(provider);
        }

        Err(CryptoError::ProviderNotAvailable(format!(
            "no provider at or above {minimum} passed its self-test"
        )))
    }
}
