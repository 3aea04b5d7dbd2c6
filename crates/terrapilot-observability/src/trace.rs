//! Tracing subscriber initialisation

use tracing_subscriber::EnvFilter;

use crate::{LogFormat, ObservabilityConfig, ObservabilityError};

/// Install the global subscriber described by `config`.
///
/// Returns `Ok(false)` when a subscriber was already installed; the existing
/// one is kept.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<bool, ObservabilityError> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| ObservabilityError::InvalidFilter(format!("{}: {e}", config.filter)))?;

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    }
    .is_ok();

    if installed {
        tracing::debug!(format = ?config.format, filter = %config.filter, "Initialized tracing");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_keeps_first_subscriber() {
        let config = ObservabilityConfig::json().with_filter("debug");
        init_tracing(&config).unwrap();
        let second = init_tracing(&ObservabilityConfig::default()).unwrap();
        assert!(!second);
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let config = ObservabilityConfig::default().with_filter("terrapilot=loudest");
        let err = init_tracing(&config).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FILTER");
    }
}
