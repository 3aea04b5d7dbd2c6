//! Orchestrator and inference configuration
//!
//! Both configs follow the same shape: a builder seeded from defaults,
//! optionally overlaid from `TERRAPILOT_*` environment variables, and
//! validated on `build()`.

use std::time::Duration;
use terrapilot_core::ConfigError;
use terrapilot_core::config::{EnvSource, ProcessEnv, get_env_string, get_env_u64, get_env_usize};

/// Default maximum number of steps per run
pub const DEFAULT_MAX_STEPS: usize = 10;

/// Default wall-clock budget per run, in milliseconds
pub const DEFAULT_RUN_TIMEOUT_MS: u64 = 30_000;

/// Limits applied to every orchestration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Commands beyond this count are never attempted
    pub max_steps: usize,
    /// Budget measured from run start and checked before each step
    pub run_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            run_timeout: Duration::from_millis(DEFAULT_RUN_TIMEOUT_MS),
        }
    }
}

impl OrchestratorConfig {
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::new()
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        OrchestratorConfigBuilder::from_env()?.build()
    }
}

/// Builder for [`OrchestratorConfig`]
#[derive(Debug, Clone)]
pub struct OrchestratorConfigBuilder {
    max_steps: usize,
    run_timeout_ms: u64,
}

impl Default for OrchestratorConfigBuilder {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            run_timeout_ms: DEFAULT_RUN_TIMEOUT_MS,
        }
    }
}

impl OrchestratorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `TERRAPILOT_MAX_STEPS` and `TERRAPILOT_RUN_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl EnvSource) -> Result<Self, ConfigError> {
        let mut builder = Self::default();
        if let Some(max_steps) = get_env_usize(source, "TERRAPILOT_MAX_STEPS")? {
            builder = builder.max_steps(max_steps);
        }
        if let Some(timeout) = get_env_u64(source, "TERRAPILOT_RUN_TIMEOUT_MS")? {
            builder = builder.run_timeout_ms(timeout);
        }
        Ok(builder)
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn run_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.run_timeout_ms = timeout_ms;
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` when `max_steps` is outside
    /// `1..=100` or the run timeout is zero.
    pub fn build(self) -> Result<OrchestratorConfig, ConfigError> {
        if !(1..=100).contains(&self.max_steps) {
            return Err(ConfigError::ValidationError(
                "max_steps must be between 1 and 100".to_string(),
            ));
        }
        if self.run_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "run_timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(OrchestratorConfig {
            max_steps: self.max_steps,
            run_timeout: Duration::from_millis(self.run_timeout_ms),
        })
    }
}

/// Connection settings for an OpenAI-compatible chat endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceConfig {
    /// Base URL; `/chat/completions` is appended
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub api_key: Option<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            model: "globe-control".to_string(),
            timeout: Duration::from_secs(30),
            api_key: None,
        }
    }
}

impl InferenceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Load from `TERRAPILOT_INFERENCE_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl EnvSource) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = get_env_string(source, "TERRAPILOT_INFERENCE_URL") {
            config.base_url = url;
        }
        if let Some(model) = get_env_string(source, "TERRAPILOT_INFERENCE_MODEL") {
            config.model = model;
        }
        if let Some(secs) = get_env_u64(source, "TERRAPILOT_INFERENCE_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        config.api_key = get_env_string(source, "TERRAPILOT_INFERENCE_API_KEY");
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "inference base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout.is_zero() || self.timeout > Duration::from_secs(300) {
            return Err(ConfigError::ValidationError(
                "inference timeout must be between 1 and 300 seconds".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
