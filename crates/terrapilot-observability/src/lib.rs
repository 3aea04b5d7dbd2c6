//! Terrapilot Observability
//!
//! Log output setup shared by every Terrapilot binary. Logs always go to
//! stderr, leaving stdout free for the line-delimited protocol transport.

pub mod trace;

pub use trace::init_tracing;

use terrapilot_core::ConfigError;
use terrapilot_core::config::{EnvSource, ProcessEnv, get_env_string};

/// Default filter directive when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-field lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidEnvVar {
                key: "TERRAPILOT_LOG_FORMAT".to_string(),
                message: format!("unknown log format '{other}', expected json or pretty"),
            }),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive string, e.g. `info,terrapilot_agent=debug`
    pub filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn json() -> Self {
        Self {
            format: LogFormat::Json,
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Load from `TERRAPILOT_LOG_FORMAT` and `RUST_LOG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl EnvSource) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(format) = get_env_string(source, "TERRAPILOT_LOG_FORMAT") {
            config.format = format.parse()?;
        }
        if let Some(filter) = get_env_string(source, "RUST_LOG") {
            config.filter = filter;
        }
        Ok(config)
    }
}

/// Observability errors
#[derive(thiserror::Error, Debug)]
pub enum ObservabilityError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ObservabilityError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ObservabilityError::InvalidFilter(_) => "INVALID_FILTER",
            ObservabilityError::Config(_) => "CONFIG_ERROR",
        }
    }
}
