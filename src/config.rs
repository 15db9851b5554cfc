// Process configuration assembled from environment variables

use thiserror::Error;

use crate::catalog::CatalogConfig;
use crate::directory::DirectoryConfig;
use crate::holdings::HoldingsConfig;

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub holdings: HoldingsConfig,
    pub directory: DirectoryConfig,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            holdings: HoldingsConfig::default(),
            directory: DirectoryConfig::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Keys are required, base
    /// URLs fall back to the public endpoints except for the directory.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::MissingVar(name));

        let mut config = AppConfig::default();

        config.catalog.ttb_key = require("ALADDIN_API_KEY")?;
        if let Some(base_url) = get("ALADDIN_API_BASE_URL") {
            config.catalog.gateway.base_url = base_url;
        }

        config.holdings.auth_key = require("LIBRARY_API_KEY")?;
        if let Some(base_url) = get("LIBRARY_API_BASE_URL") {
            config.holdings.gateway.base_url = base_url;
        }
        if let Some(region) = get("LIBRARY_API_REGION") {
            config.holdings.region = region.parse().map_err(|_| ConfigError::InvalidValue {
                name: "LIBRARY_API_REGION",
                value: region,
            })?;
        }

        config.directory.gateway.base_url = require("SUPABASE_URL")?;
        config.directory.api_key = require("SUPABASE_ANON_KEY")?;

        if let Some(level) = get("LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("ALADDIN_API_KEY", "ttb-key"),
            ("LIBRARY_API_KEY", "auth-key"),
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]
    }

    #[test]
    fn test_defaults_fill_optional_values() {
        let env = vars(&required());
        let config = AppConfig::from_lookup(|name| env.get(name).cloned()).unwrap();

        assert_eq!(config.catalog.ttb_key, "ttb-key");
        assert_eq!(config.catalog.gateway.base_url, "http://www.aladin.co.kr/ttb/api");
        assert_eq!(config.catalog.gateway.timeout_ms, 15_000);
        assert_eq!(config.holdings.gateway.base_url, "http://data4library.kr/api");
        assert_eq!(config.holdings.region, 11);
        assert_eq!(config.directory.gateway.base_url, "https://project.supabase.co");
        assert_eq!(config.directory.api_key, "anon");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let mut pairs = required();
        pairs.push(("ALADDIN_API_BASE_URL", "http://localhost:9000/ttb"));
        pairs.push(("LIBRARY_API_REGION", "21"));
        pairs.push(("LOG_LEVEL", "debug"));
        let env = vars(&pairs);

        let config = AppConfig::from_lookup(|name| env.get(name).cloned()).unwrap();

        assert_eq!(config.catalog.gateway.base_url, "http://localhost:9000/ttb");
        assert_eq!(config.holdings.region, 21);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_and_blank_keys() {
        let env = vars(&[("ALADDIN_API_KEY", "  "), ("LIBRARY_API_KEY", "auth-key")]);
        let err = AppConfig::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::MissingVar("ALADDIN_API_KEY"));

        let env = vars(&[("ALADDIN_API_KEY", "k"), ("LIBRARY_API_KEY", "k")]);
        let err = AppConfig::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: SUPABASE_URL"
        );
    }

    #[test]
    fn test_bad_region() {
        let mut pairs = required();
        pairs.push(("LIBRARY_API_REGION", "seoul"));
        let env = vars(&pairs);

        let err = AppConfig::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "LIBRARY_API_REGION", .. }));
    }
}
