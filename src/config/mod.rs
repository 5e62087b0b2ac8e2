//! Configuration for the injection engine.
//!
//! Values come from a [`ConfigService`] seeded with the process environment.

mod options;

pub use options::{
    AmbiguityPolicy, FactoryOptions, AMBIGUITY_KEY, EXCLUDED_PREFIXES_KEY, OPTIONS_KEY,
    WARN_ON_FALLBACK_KEY,
};

use dashmap::DashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Create a configuration seeded from environment variables.
    pub fn new() -> Self {
        let service = Self::empty();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    /// Create a configuration without reading the environment.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Parse `key`; unparseable values are logged and treated as absent.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparseable configuration value");
                None
            }
        }
    }

    /// Comma separated list; blank items are dropped.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let raw = self.get(key)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => {
                tracing::warn!(key, value = %raw, "ignoring non-boolean configuration value");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let config = ConfigService::empty();
        config.set("LIST", " std, tokio ,, axum");
        config.set("FLAG", "Off");
        config.set("NUMBER", "12");
        config.set("BROKEN", "twelve");

        assert_eq!(
            config.get_list("LIST").unwrap(),
            vec!["std", "tokio", "axum"]
        );
        assert_eq!(config.get_bool("FLAG"), Some(false));
        assert_eq!(config.get_parsed::<u32>("NUMBER"), Some(12));
        assert_eq!(config.get_parsed::<u32>("BROKEN"), None);
        assert_eq!(config.get("MISSING"), None);
    }
}
