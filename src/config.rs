//! Configuration Module
//!
//! Handles loading and managing cache configuration. Scalar settings can
//! come from environment variables; the fallback callable and its extra
//! arguments are attached programmatically via the builder methods.

use std::env;

use serde_json::Value;

use crate::cache::Fallback;

/// Cache configuration parameters.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Default TTL in milliseconds for entries without an explicit TTL,
    /// None = entries never expire by default
    pub default_ttl: Option<u64>,
    /// Disables on-demand expiration checks at read time
    pub disable_ode: bool,
    /// Cache-wide fallback invoked on misses, if any
    pub default_fallback: Option<Fallback>,
    /// Extra arguments handed to a keyed-with-args fallback, in order
    pub fallback_args: Vec<Value>,
}

impl CacheConfig {
    /// Creates an empty configuration: no default TTL, on-demand
    /// expiration enabled, no fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a CacheConfig from environment variables.
    ///
    /// Only the scalar settings are read from the environment:
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (unset = no default TTL)
    /// - `DISABLE_ODE` - Set to `1` or `true` to disable on-demand expiration
    pub fn from_env() -> Self {
        Self {
            default_ttl: env::var("DEFAULT_TTL_MS").ok().and_then(|v| v.parse().ok()),
            disable_ode: env::var("DISABLE_ODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            default_fallback: None,
            fallback_args: Vec::new(),
        }
    }

    // == Builder Methods ==
    /// Sets the default TTL in milliseconds.
    pub fn with_default_ttl(mut self, ttl_ms: u64) -> Self {
        self.default_ttl = Some(ttl_ms);
        self
    }

    /// Disables on-demand expiration checks.
    pub fn with_ode_disabled(mut self) -> Self {
        self.disable_ode = true;
        self
    }

    /// Sets the cache-wide fallback.
    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.default_fallback = Some(fallback);
        self
    }

    /// Sets the extra arguments for a keyed-with-args fallback.
    pub fn with_fallback_args(mut self, args: Vec<Value>) -> Self {
        self.fallback_args = args;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert!(config.default_ttl.is_none());
        assert!(!config.disable_ode);
        assert!(config.default_fallback.is_none());
        assert!(config.fallback_args.is_empty());
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("DEFAULT_TTL_MS");
        env::remove_var("DISABLE_ODE");

        let config = CacheConfig::from_env();
        assert!(config.default_ttl.is_none());
        assert!(!config.disable_ode);
    }

    #[test]
    fn test_config_builder() {
        let config = CacheConfig::new()
            .with_default_ttl(5_000)
            .with_ode_disabled()
            .with_fallback(Fallback::nullary(|| Ok(json!(0))))
            .with_fallback_args(vec![json!("a"), json!("b")]);

        assert_eq!(config.default_ttl, Some(5_000));
        assert!(config.disable_ode);
        assert!(config.default_fallback.is_some());
        assert_eq!(config.fallback_args.len(), 2);
    }
}
