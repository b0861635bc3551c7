//! Tier default quotas and capabilities.
//!
//! [`defaults_for`] is consulted exactly once per license, at creation
//! time, to populate the frozen entitlement snapshot. It is never
//! invoked again for an existing license, so editing this table has no
//! effect on already-issued licenses.

use sentra_core::models::license::{FeatureSet, LicenseTier};

const GIB: u64 = 1024 * 1024 * 1024;
const TIB: u64 = 1024 * GIB;

/// Default quotas and capabilities for a tier.
#[derive(Debug, Clone)]
pub struct TierDefaults {
    pub max_users: u64,
    pub max_products: u64,
    pub max_api_calls: u64,
    pub max_storage_bytes: u64,
    pub features: FeatureSet,
}

/// Resolve the default entitlements for a subscription tier.
pub fn defaults_for(tier: LicenseTier) -> TierDefaults {
    match tier {
        LicenseTier::Trial => TierDefaults {
            max_users: 5,
            max_products: 3,
            max_api_calls: 1_000,
            max_storage_bytes: 10 * GIB,
            features: FeatureSet {
                demo_watermark: true,
                ..FeatureSet::default()
            },
        },
        LicenseTier::Starter => TierDefaults {
            max_users: 25,
            max_products: 5,
            max_api_calls: 10_000,
            max_storage_bytes: 100 * GIB,
            features: FeatureSet {
                email_support: true,
                ..FeatureSet::default()
            },
        },
        LicenseTier::Professional => TierDefaults {
            max_users: 100,
            max_products: 15,
            max_api_calls: 50_000,
            max_storage_bytes: 500 * GIB,
            features: FeatureSet {
                priority_support: true,
                custom_branding: true,
                ..FeatureSet::default()
            },
        },
        LicenseTier::Enterprise => TierDefaults {
            max_users: 1_000,
            max_products: 35,
            max_api_calls: 1_000_000,
            max_storage_bytes: 2 * TIB,
            features: FeatureSet {
                dedicated_support: true,
                custom_branding: true,
                sla: true,
                audit_logs: true,
                ..FeatureSet::default()
            },
        },
        LicenseTier::Unlimited => TierDefaults {
            max_users: 999_999,
            max_products: 35,
            max_api_calls: 999_999_999,
            max_storage_bytes: 10 * TIB,
            features: FeatureSet {
                white_label: true,
                custom_integrations: true,
                dedicated_support: true,
                sla: true,
                audit_logs: true,
                custom_development: true,
                ..FeatureSet::default()
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enterprise_defaults() {
        let d = defaults_for(LicenseTier::Enterprise);
        assert_eq!(d.max_users, 1_000);
        assert_eq!(d.max_products, 35);
        assert_eq!(d.max_api_calls, 1_000_000);
        assert_eq!(d.max_storage_bytes, 2 * TIB);
        assert!(d.features.dedicated_support);
        assert!(d.features.sla);
        assert!(d.features.audit_logs);
        assert!(!d.features.demo_watermark);
    }

    #[test]
    fn trial_is_watermarked_and_small() {
        let d = defaults_for(LicenseTier::Trial);
        assert_eq!(d.max_users, 5);
        assert!(d.features.demo_watermark);
        assert!(!d.features.email_support);
    }

    #[test]
    fn tiers_are_ordered() {
        assert!(LicenseTier::Trial < LicenseTier::Starter);
        assert!(LicenseTier::Starter < LicenseTier::Professional);
        assert!(LicenseTier::Professional < LicenseTier::Enterprise);
        assert!(LicenseTier::Enterprise < LicenseTier::Unlimited);
    }

    #[test]
    fn quotas_grow_with_tier() {
        let tiers = [
            LicenseTier::Trial,
            LicenseTier::Starter,
            LicenseTier::Professional,
            LicenseTier::Enterprise,
            LicenseTier::Unlimited,
        ];
        for pair in tiers.windows(2) {
            let lo = defaults_for(pair[0]);
            let hi = defaults_for(pair[1]);
            assert!(lo.max_users < hi.max_users || lo.max_products <= hi.max_products);
            assert!(lo.max_api_calls < hi.max_api_calls);
            assert!(lo.max_storage_bytes < hi.max_storage_bytes);
        }
    }
}
