use crate::config::ConfigService;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub const EXCLUDED_PREFIXES_KEY: &str = "AUTOINJECT_EXCLUDED_PREFIXES";
pub const AMBIGUITY_KEY: &str = "AUTOINJECT_AMBIGUITY";
pub const WARN_ON_FALLBACK_KEY: &str = "AUTOINJECT_WARN_ON_FALLBACK";
pub const OPTIONS_KEY: &str = "AUTOINJECT_OPTIONS";

/// What auto-discovery does when several implementations qualify.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Use the first implementation in registry order and log the others.
    #[default]
    FirstWins,
    /// Fail with `AmbiguousImplementation`.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryOptions {
    /// Origin crates never considered by auto-discovery.
    pub excluded_prefixes: Vec<String>,
    pub ambiguity: AmbiguityPolicy,
    /// Log swallowed fallback failures during auto-instantiation.
    pub warn_on_fallback: bool,
}

impl Default for FactoryOptions {
    fn default() -> Self {
        Self {
            excluded_prefixes: [
                "std", "core", "alloc", "tokio", "axum", "tower", "tracing", "dashmap", "linkme",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            ambiguity: AmbiguityPolicy::default(),
            warn_on_fallback: true,
        }
    }
}

impl FactoryOptions {
    /// Load options from configuration.
    ///
    /// A JSON document under `AUTOINJECT_OPTIONS` is read first; individual keys
    /// override it.
    pub fn from_config(config: &ConfigService) -> Self {
        let mut options = config
            .get(OPTIONS_KEY)
            .and_then(|raw| match serde_json::from_str::<FactoryOptions>(&raw) {
                Ok(options) => Some(options),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring invalid {}", OPTIONS_KEY);
                    None
                }
            })
            .unwrap_or_default();

        if let Some(prefixes) = config.get_list(EXCLUDED_PREFIXES_KEY) {
            options.excluded_prefixes = prefixes;
        }
        if let Some(policy) = config.get_parsed::<AmbiguityPolicy>(AMBIGUITY_KEY) {
            options.ambiguity = policy;
        }
        if let Some(warn) = config.get_bool(WARN_ON_FALLBACK_KEY) {
            options.warn_on_fallback = warn;
        }
        options
    }

    pub fn from_env() -> Self {
        Self::from_config(&ConfigService::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_exclude_runtime_crates() {
        let options = FactoryOptions::default();
        assert!(options.excluded_prefixes.iter().any(|p| p == "std"));
        assert_eq!(options.ambiguity, AmbiguityPolicy::FirstWins);
        assert!(options.warn_on_fallback);
    }

    #[test]
    fn test_individual_keys_override_json_document() {
        let config = ConfigService::empty();
        config.set(OPTIONS_KEY, r#"{"ambiguity":"reject","warn_on_fallback":false}"#);
        config.set(EXCLUDED_PREFIXES_KEY, "std,vendor");
        config.set(AMBIGUITY_KEY, "first_wins");

        let options = FactoryOptions::from_config(&config);
        assert_eq!(options.excluded_prefixes, vec!["std", "vendor"]);
        assert_eq!(options.ambiguity, AmbiguityPolicy::FirstWins);
        assert!(!options.warn_on_fallback);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = ConfigService::empty();
        config.set(OPTIONS_KEY, "{not json");
        config.set(AMBIGUITY_KEY, "coin_flip");
        assert_eq!(FactoryOptions::from_config(&config), FactoryOptions::default());
    }
}
