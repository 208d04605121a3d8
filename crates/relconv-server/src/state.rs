//! # Application State
//!
//! Shared state available to all HTTP request handlers. It is created once at startup
//! and shared via `Arc` across all concurrent requests.
//!
//! ## Components
//!
//! - **Planner**: wraps the process-wide rule registry. The registry is frozen, and each
//!   conversion allocates its own memo, so requests never contend on it.
//! - **Server Config**: listen address and planner tuning, read from the environment.

use relconv_core::{PlanError, Planner, PlannerConfig};
use std::str::FromStr;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Server-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub planner: PlannerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            planner: PlannerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read `RELCONV_LISTEN_ADDR`, `RELCONV_MAX_DEPTH` and `RELCONV_DEDUP`, falling back
    /// to the defaults for unset variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(addr) = lookup("RELCONV_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(depth) = lookup("RELCONV_MAX_DEPTH") {
            config.planner.max_depth = parse("RELCONV_MAX_DEPTH", &depth)?;
        }
        if let Some(dedup) = lookup("RELCONV_DEDUP") {
            config.planner.dedup_outputs = parse("RELCONV_DEDUP", &dedup)?;
        }
        Ok(config)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("invalid {key} value '{value}': {e}"))
}

/// Shared application state, accessible by all request handlers via Axum's State extractor.
pub struct AppState {
    pub planner: Planner,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, PlanError> {
        let registry = relconv_rules::shared_registry()?;
        Ok(Self {
            planner: Planner::new(registry, config.planner.clone()),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(
            ServerConfig::from_lookup(lookup(&[])).unwrap(),
            ServerConfig::default()
        );
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("RELCONV_LISTEN_ADDR", "127.0.0.1:8080"),
            ("RELCONV_MAX_DEPTH", "64"),
            ("RELCONV_DEDUP", "false"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.planner.max_depth, 64);
        assert!(!config.planner.dedup_outputs);
    }

    #[test]
    fn test_bad_value_names_variable() {
        let err = ServerConfig::from_lookup(lookup(&[("RELCONV_MAX_DEPTH", "deep")])).unwrap_err();
        assert!(err.contains("RELCONV_MAX_DEPTH"));
    }
}
