//! Bridge configuration

use std::path::PathBuf;
use terrapilot_core::ConfigError;
use terrapilot_core::config::{EnvSource, ProcessEnv, get_env_string, get_env_u64};

/// Where to load the module from and how much it may run per call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    pub module_path: Option<PathBuf>,
    /// Fuel granted to each export call; unlimited when `None`
    pub fuel: Option<u64>,
}

impl BridgeConfig {
    pub fn new(module_path: impl Into<PathBuf>) -> Self {
        Self {
            module_path: Some(module_path.into()),
            fuel: None,
        }
    }

    pub fn with_fuel(mut self, fuel: u64) -> Self {
        self.fuel = Some(fuel);
        self
    }

    /// Load from `TERRAPILOT_WASM_PATH` and `TERRAPILOT_WASM_FUEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl EnvSource) -> Result<Self, ConfigError> {
        let config = Self {
            module_path: get_env_string(source, "TERRAPILOT_WASM_PATH").map(PathBuf::from),
            fuel: get_env_u64(source, "TERRAPILOT_WASM_FUEL")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fuel == Some(0) {
            return Err(ConfigError::ValidationError(
                "wasm fuel must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn reads_path_and_fuel() {
        let env: HashMap<&str, &str> = [
            ("TERRAPILOT_WASM_PATH", "/opt/globe/protocol.wasm"),
            ("TERRAPILOT_WASM_FUEL", "5000000"),
        ]
        .into_iter()
        .collect();
        let config = BridgeConfig::from_source(&env).unwrap();
        assert_eq!(
            config,
            BridgeConfig::new("/opt/globe/protocol.wasm").with_fuel(5_000_000)
        );
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let env: HashMap<&str, &str> = HashMap::new();
        assert_eq!(BridgeConfig::from_source(&env).unwrap(), BridgeConfig::default());
    }

    #[test]
    fn zero_fuel_is_rejected() {
        let env: HashMap<&str, &str> = [("TERRAPILOT_WASM_FUEL", "0")].into_iter().collect();
        assert!(BridgeConfig::from_source(&env).is_err());
    }

    #[test]
    fn malformed_fuel_is_rejected() {
        let env: HashMap<&str, &str> = [("TERRAPILOT_WASM_FUEL", "lots")].into_iter().collect();
        assert!(matches!(
            BridgeConfig::from_source(&env),
            Err(ConfigError::InvalidEnvVar { .. })
        ));
    }
}
