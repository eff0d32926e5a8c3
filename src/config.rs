//! Typed configuration for the planning adapters
//!
//! Built once at startup from environment variables (after `.env` is loaded)
//! and handed to each adapter by value. Bad values are rejected here rather than
//! defaulting deep in call logic.

use crate::error::ConfigError;
use serde::Deserialize;
use std::env;
use std::time::Duration;

pub const WORKOUT_ENV_PREFIX: &str = "WORKOUT_API";
pub const DIET_ENV_PREFIX: &str = "DIET_API";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_ms: u64,
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1_000,
            factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 120_000,
        }
    }
}

impl BreakerConfig {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

/// TTLs in seconds per data category
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CacheTtlConfig {
    pub plan_secs: u64,
    pub library_secs: u64,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            plan_secs: 24 * 60 * 60,
            library_secs: 7 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FeatureFlags {
    pub enable_caching: bool,
    pub enable_circuit_breaker: bool,
    pub enable_retries: bool,
    pub mock_mode: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_caching: true,
            enable_circuit_breaker: true,
            enable_retries: true,
            mock_mode: false,
        }
    }
}

/// Settings for one upstream planning service
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: String,
    #[serde(default)]
    pub api_secret: Option<String>,
    /// Budget for one logical call, retries and backoff included. Each HTTP
    /// attempt gets a share of it (see `upstream::attempt_timeout`).
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub cache: CacheTtlConfig,
    #[serde(default)]
    pub features: FeatureFlags,
    pub cache_prefix: String,
}

impl ServiceConfig {
    /// Mock-mode config that never needs credentials. Used by the demo binary and tests.
    pub fn mock(cache_prefix: &str) -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            api_key: String::new(),
            api_secret: None,
            timeout_ms: 30_000,
            retry: RetryConfig::default(),
            breaker: BreakerConfig::default(),
            cache: CacheTtlConfig::default(),
            features: FeatureFlags {
                mock_mode: true,
                ..FeatureFlags::default()
            },
            cache_prefix: cache_prefix.to_string(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load from the process environment using `<PREFIX>_<SETTING>` keys
    pub fn from_env(prefix: &str, cache_prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, cache_prefix, |key| env::var(key).ok())
    }

    /// Load using an arbitrary key lookup
    pub fn from_lookup<F>(prefix: &str, cache_prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = EnvSource { prefix, lookup };

        let defaults = FeatureFlags::default();
        let features = FeatureFlags {
            enable_caching: source.parse_or("ENABLE_CACHING", defaults.enable_caching)?,
            enable_circuit_breaker: source
                .parse_or("ENABLE_CIRCUIT_BREAKER", defaults.enable_circuit_breaker)?,
            enable_retries: source.parse_or("ENABLE_RETRIES", defaults.enable_retries)?,
            mock_mode: source.parse_or("MOCK_MODE", defaults.mock_mode)?,
        };

        let retry_defaults = RetryConfig::default();
        let breaker_defaults = BreakerConfig::default();
        let ttl_defaults = CacheTtlConfig::default();

        let config = Self {
            base_url: source
                .get("BASE_URL")
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            api_key: source.get("KEY").unwrap_or_default(),
            api_secret: source.get("SECRET"),
            timeout_ms: source.parse_or("TIMEOUT_MS", 30_000)?,
            retry: RetryConfig {
                attempts: source.parse_or("RETRY_ATTEMPTS", retry_defaults.attempts)?,
                delay_ms: source.parse_or("RETRY_DELAY_MS", retry_defaults.delay_ms)?,
                factor: source.parse_or("RETRY_FACTOR", retry_defaults.factor)?,
            },
            breaker: BreakerConfig {
                failure_threshold: source
                    .parse_or("CB_FAILURE_THRESHOLD", breaker_defaults.failure_threshold)?,
                reset_timeout_ms: source
                    .parse_or("CB_RESET_TIMEOUT_MS", breaker_defaults.reset_timeout_ms)?,
            },
            cache: CacheTtlConfig {
                plan_secs: source.parse_or("CACHE_TTL_PLAN_SECS", ttl_defaults.plan_secs)?,
                library_secs: source
                    .parse_or("CACHE_TTL_LIBRARY_SECS", ttl_defaults.library_secs)?,
            },
            features,
            cache_prefix: cache_prefix.to_string(),
        };

        config.validate(prefix)?;
        Ok(config)
    }

    /// Reject settings that would make the adapter misbehave at call time
    pub fn validate(&self, prefix: &str) -> Result<(), ConfigError> {
        let key = |name: &str| format!("{}_{}", prefix, name);

        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: key("TIMEOUT_MS"),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                key: key("CB_FAILURE_THRESHOLD"),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.breaker.reset_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: key("CB_RESET_TIMEOUT_MS"),
                message: "must be greater than zero".to_string(),
            });
        }
        if !(self.retry.factor >= 1.0) {
            return Err(ConfigError::Invalid {
                key: key("RETRY_FACTOR"),
                message: "must be at least 1.0".to_string(),
            });
        }
        if self.cache_prefix.is_empty() {
            return Err(ConfigError::Missing("cache_prefix".to_string()));
        }

        // Credentials only matter when we actually hit the network
        if !self.features.mock_mode {
            if self.base_url.is_empty() {
                return Err(ConfigError::Missing(key("BASE_URL")));
            }
            if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
                return Err(ConfigError::Invalid {
                    key: key("BASE_URL"),
                    message: format!("'{}' is not an http(s) URL", self.base_url),
                });
            }
            if self.api_key.is_empty() {
                return Err(ConfigError::Missing(key("KEY")));
            }
        }

        Ok(())
    }
}

/// Both adapters' settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlanningConfig {
    pub workout: ServiceConfig,
    pub diet: ServiceConfig,
}

impl PlanningConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let workout = ServiceConfig::from_env(WORKOUT_ENV_PREFIX, "workout")?;
        let diet = ServiceConfig::from_env(DIET_ENV_PREFIX, "diet")?;

        // The diet service rejects unsigned requests
        if !diet.features.mock_mode && diet.api_secret.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::Missing(format!("{}_SECRET", DIET_ENV_PREFIX)));
        }

        Ok(Self { workout, diet })
    }

    pub fn mock() -> Self {
        Self {
            workout: ServiceConfig::mock("workout"),
            diet: ServiceConfig::mock("diet"),
        }
    }
}

struct EnvSource<'a, F> {
    prefix: &'a str,
    lookup: F,
}

impl<'a, F> EnvSource<'a, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn key(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }

    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(&self.key(name))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, name: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key: self.key(name),
                message: format!("'{}': {}", raw, e),
            }),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = ServiceConfig::from_lookup(
            "WORKOUT_API",
            "workout",
            lookup(&[
                ("WORKOUT_API_BASE_URL", "https://plans.example.com/"),
                ("WORKOUT_API_KEY", "secret-key"),
            ]),
        )
        .unwrap();

        assert_eq!(config.base_url, "https://plans.example.com");
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.reset_timeout_ms, 120_000);
        assert_eq!(config.cache.plan_secs, 86_400);
        assert_eq!(config.cache.library_secs, 604_800);
        assert!(config.features.enable_caching);
        assert!(!config.features.mock_mode);
    }

    #[test]
    fn test_overrides_parsed() {
        let config = ServiceConfig::from_lookup(
            "DIET_API",
            "diet",
            lookup(&[
                ("DIET_API_BASE_URL", "http://diet.local"),
                ("DIET_API_KEY", "k"),
                ("DIET_API_CB_FAILURE_THRESHOLD", "3"),
                ("DIET_API_ENABLE_CACHING", "false"),
                ("DIET_API_RETRY_FACTOR", "1.5"),
            ]),
        )
        .unwrap();

        assert_eq!(config.breaker.failure_threshold, 3);
        assert!(!config.features.enable_caching);
        assert_eq!(config.retry.factor, 1.5);
    }

    #[test]
    fn test_missing_key_rejected_outside_mock_mode() {
        let err = ServiceConfig::from_lookup(
            "WORKOUT_API",
            "workout",
            lookup(&[("WORKOUT_API_BASE_URL", "https://plans.example.com")]),
        )
        .unwrap_err();

        assert_eq!(err, ConfigError::Missing("WORKOUT_API_KEY".to_string()));
    }

    #[test]
    fn test_mock_mode_needs_no_credentials() {
        let config = ServiceConfig::from_lookup(
            "WORKOUT_API",
            "workout",
            lookup(&[("WORKOUT_API_MOCK_MODE", "true")]),
        )
        .unwrap();

        assert!(config.features.mock_mode);
    }

    #[test]
    fn test_garbage_numbers_rejected() {
        let err = ServiceConfig::from_lookup(
            "WORKOUT_API",
            "workout",
            lookup(&[
                ("WORKOUT_API_MOCK_MODE", "true"),
                ("WORKOUT_API_TIMEOUT_MS", "soon"),
            ]),
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "WORKOUT_API_TIMEOUT_MS"));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let err = ServiceConfig::from_lookup(
            "WORKOUT_API",
            "workout",
            lookup(&[
                ("WORKOUT_API_MOCK_MODE", "true"),
                ("WORKOUT_API_CB_FAILURE_THRESHOLD", "0"),
            ]),
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_unknown_fields_rejected_in_structured_config() {
        let result: std::result::Result<BreakerConfig, _> = serde_json::from_value(serde_json::json!({
            "failure_threshold": 5,
            "reset_timeout_ms": 1000,
            "half_open_max": 2
        }));

        assert!(result.is_err());
    }
}
