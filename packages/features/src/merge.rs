//! # Feature override merge
//!
//! Combines a fully populated default provider set with an optional partial
//! custom set and a list of disabled feature names:
//!
//! ```text
//! disabled (exact or namespaced alias) → Disabled, never the default
//! only one side present                → that side
//! both present, custom-wins            → custom (or field-wise deep merge)
//! both present, default-wins           → default + warning
//! both present, throw                  → MergeError::Conflict
//! ```

use crate::name::FeatureName;
use crate::set::{FeatureProviderSet, Slot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    #[default]
    CustomWins,
    DefaultWins,
    Throw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOptions {
    #[serde(default)]
    pub policy: MergePolicy,
    #[serde(default)]
    pub deep_merge: bool,
}

/// Provider values that may be merged field by field.
pub trait Mergeable: Clone {
    /// Merge `custom` over `self`, or `None` when this provider has no
    /// mergeable fields.
    fn deep_merge(&self, _custom: &Self) -> Option<Self> {
        None
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("Feature '{feature}' is provided by both the default and the custom set")]
    Conflict { feature: FeatureName },
}

#[derive(Debug, Clone)]
pub struct MergeResult<P> {
    pub providers: FeatureProviderSet<P>,
    pub disabled_features: Vec<FeatureName>,
    pub overridden_features: Vec<FeatureName>,
    pub partially_merged_features: Vec<FeatureName>,
    pub warnings: Vec<String>,
}

impl<P> MergeResult<P> {
    pub fn is_feature_enabled(&self, name: &FeatureName) -> bool {
        self.providers.is_enabled(name)
    }

    /// Effective provider; disabled features never fall back to a default.
    pub fn provider(&self, name: &FeatureName) -> Option<&P> {
        self.providers.get(name)
    }
}

pub fn merge<P: Mergeable>(
    defaults: &FeatureProviderSet<P>,
    custom: Option<&FeatureProviderSet<P>>,
    disabled: &[String],
    options: &MergeOptions,
) -> Result<MergeResult<P>, MergeError> {
    let mut result = MergeResult {
        providers: FeatureProviderSet::new(),
        disabled_features: Vec::new(),
        overridden_features: Vec::new(),
        partially_merged_features: Vec::new(),
        warnings: Vec::new(),
    };

    let empty = FeatureProviderSet::new();
    let custom = custom.unwrap_or(&empty);

    let mut disabled_names: BTreeSet<FeatureName> =
        disabled.iter().map(|name| FeatureName::parse(name)).collect();
    for name in custom.names() {
        if custom.is_disabled(name) {
            disabled_names.insert(name.clone());
        }
    }

    let all_names: BTreeSet<&FeatureName> = defaults
        .names()
        .chain(custom.names())
        .chain(disabled_names.iter())
        .collect();

    for name in all_names {
        if disabled_names.contains(name) {
            if defaults.slot(name).is_none() && custom.slot(name).is_none() {
                result
                    .warnings
                    .push(format!("Disabled feature '{}' is not provided by any set", name));
            }
            result.providers.disable(name.clone());
            result.disabled_features.push(name.clone());
            continue;
        }

        match (defaults.get(name), custom.get(name)) {
            (None, None) => {}
            (Some(default), None) => result.providers.insert(name.clone(), default.clone()),
            (None, Some(custom)) => {
                result.providers.insert(name.clone(), custom.clone());
                result.overridden_features.push(name.clone());
            }
            (Some(default), Some(custom)) => match options.policy {
                MergePolicy::CustomWins => {
                    let merged = if options.deep_merge {
                        default.deep_merge(custom)
                    } else {
                        None
                    };
                    match merged {
                        Some(merged) => {
                            result.providers.insert(name.clone(), merged);
                            result.partially_merged_features.push(name.clone());
                        }
                        None => {
                            result.providers.insert(name.clone(), custom.clone());
                            result.overridden_features.push(name.clone());
                        }
                    }
                }
                MergePolicy::DefaultWins => {
                    tracing::warn!(feature = %name, "custom provider ignored by default-wins policy");
                    result.providers.insert(name.clone(), default.clone());
                    result.warnings.push(format!(
                        "Custom provider for '{}' ignored: default-wins policy keeps the default",
                        name
                    ));
                }
                MergePolicy::Throw => {
                    return Err(MergeError::Conflict {
                        feature: name.clone(),
                    });
                }
            },
        }
    }

    tracing::debug!(
        providers = result.providers.providers().count(),
        disabled = result.disabled_features.len(),
        overridden = result.overridden_features.len(),
        partially_merged = result.partially_merged_features.len(),
        "merged feature providers"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestProvider {
        Plain(&'static str),
        Fields(Option<u32>, Option<u32>),
    }

    impl Mergeable for TestProvider {
        fn deep_merge(&self, custom: &Self) -> Option<Self> {
            match (self, custom) {
                (TestProvider::Fields(a, b), TestProvider::Fields(c, d)) => {
                    Some(TestProvider::Fields(c.or(*a), d.or(*b)))
                }
                _ => None,
            }
        }
    }

    fn defaults() -> FeatureProviderSet<TestProvider> {
        FeatureProviderSet::new()
            .with("getLabel", TestProvider::Plain("default-label"))
            .with("layout", TestProvider::Fields(Some(1), Some(2)))
    }

    #[test]
    fn test_custom_wins_replaces() {
        let custom = FeatureProviderSet::new().with("getLabel", TestProvider::Plain("custom"));
        let result = merge(&defaults(), Some(&custom), &[], &MergeOptions::default()).unwrap();
        assert_eq!(
            result.provider(&FeatureName::GetLabel),
            Some(&TestProvider::Plain("custom"))
        );
        assert_eq!(result.overridden_features, vec![FeatureName::GetLabel]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_deep_merge_is_partial() {
        let custom = FeatureProviderSet::new().with("layout", TestProvider::Fields(None, Some(9)));
        let options = MergeOptions {
            deep_merge: true,
            ..Default::default()
        };
        let result = merge(&defaults(), Some(&custom), &[], &options).unwrap();
        assert_eq!(
            result.provider(&FeatureName::Layout),
            Some(&TestProvider::Fields(Some(1), Some(9)))
        );
        assert_eq!(result.partially_merged_features, vec![FeatureName::Layout]);
        assert!(result.overridden_features.is_empty());
    }

    #[test]
    fn test_deep_merge_falls_back_to_replace_for_opaque_providers() {
        let custom = FeatureProviderSet::new().with("getLabel", TestProvider::Plain("custom"));
        let options = MergeOptions {
            deep_merge: true,
            ..Default::default()
        };
        let result = merge(&defaults(), Some(&custom), &[], &options).unwrap();
        assert_eq!(result.overridden_features, vec![FeatureName::GetLabel]);
    }

    #[test]
    fn test_disabled_alias_wins_over_default() {
        let result = merge(
            &defaults(),
            None,
            &["diagram.layout".to_string()],
            &MergeOptions::default(),
        )
        .unwrap();
        assert!(!result.is_feature_enabled(&FeatureName::Layout));
        assert!(result.provider(&FeatureName::Layout).is_none());
        assert!(result.providers.is_disabled(&FeatureName::Layout));
        assert_eq!(result.disabled_features, vec![FeatureName::Layout]);
    }

    #[test]
    fn test_custom_set_can_disable() {
        let mut custom = FeatureProviderSet::new();
        custom.disable("getLabel");
        let result = merge(&defaults(), Some(&custom), &[], &MergeOptions::default()).unwrap();
        assert!(result.provider(&FeatureName::GetLabel).is_none());
        assert_eq!(result.disabled_features, vec![FeatureName::GetLabel]);
    }

    #[test]
    fn test_default_wins_warns() {
        let custom = FeatureProviderSet::new().with("getLabel", TestProvider::Plain("custom"));
        let options = MergeOptions {
            policy: MergePolicy::DefaultWins,
            ..Default::default()
        };
        let result = merge(&defaults(), Some(&custom), &[], &options).unwrap();
        assert_eq!(
            result.provider(&FeatureName::GetLabel),
            Some(&TestProvider::Plain("default-label"))
        );
        assert_eq!(result.warnings.len(), 1);
        assert!(result.overridden_features.is_empty());
    }

    #[test]
    fn test_throw_on_conflict() {
        let custom = FeatureProviderSet::new().with("getLabel", TestProvider::Plain("custom"));
        let options = MergeOptions {
            policy: MergePolicy::Throw,
            ..Default::default()
        };
        let err = merge(&defaults(), Some(&custom), &[], &options).unwrap_err();
        assert_eq!(
            err,
            MergeError::Conflict {
                feature: FeatureName::GetLabel
            }
        );
    }

    #[test]
    fn test_throw_without_conflict_succeeds() {
        let custom = FeatureProviderSet::new().with("hover", TestProvider::Plain("custom"));
        let options = MergeOptions {
            policy: MergePolicy::Throw,
            ..Default::default()
        };
        assert!(merge(&defaults(), Some(&custom), &[], &options).is_ok());
    }

    #[test]
    fn test_unknown_disabled_name_warns() {
        let result = merge(
            &defaults(),
            None,
            &["tandem:minimap".to_string()],
            &MergeOptions::default(),
        )
        .unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(
            result.disabled_features,
            vec![FeatureName::Extension("minimap".into())]
        );
    }

    #[test]
    fn test_policy_parses_kebab_case() {
        let policy: MergePolicy = serde_json::from_str("\"default-wins\"").unwrap();
        assert_eq!(policy, MergePolicy::DefaultWins);
    }
}
