//! # Environment-Based Configuration Helpers
//!
//! Typed readers for `TERRAPILOT_*` environment variables shared by the
//! configuration builders of every crate. Readers take an [`EnvSource`] so
//! builders can be fed from the process environment or from a fixed map in
//! tests.

use std::collections::HashMap;
use std::env;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Source of configuration values keyed by variable name.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).map(|v| v.to_string())
    }
}

pub fn get_env_string(source: &impl EnvSource, key: &str) -> Option<String> {
    source.get(key).filter(|v| !v.trim().is_empty())
}

pub fn get_env_bool(source: &impl EnvSource, key: &str) -> Result<Option<bool>, ConfigError> {
    match source.get(key) {
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!(
                    "invalid boolean value '{val}', expected true/false/1/0/yes/no/on/off"
                ),
            }),
        },
        None => Ok(None),
    }
}

pub fn get_env_u64(source: &impl EnvSource, key: &str) -> Result<Option<u64>, ConfigError> {
    match source.get(key) {
        Some(val) => val
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u64 value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

pub fn get_env_usize(source: &impl EnvSource, key: &str) -> Result<Option<usize>, ConfigError> {
    match source.get(key) {
        Some(val) => val
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid usize value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}
