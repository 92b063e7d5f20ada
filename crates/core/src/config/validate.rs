use super::{types::Config, ConfigError};
use crate::availability::RetryConfig;
use crate::run::MAX_TIMESTEP;
use crate::store::StoreBackend;

/// Validate configuration
/// Currently validates:
/// - Store bucket is set, and the local backend has a root
/// - Download concurrency is at least 1 and timesteps fit the key format
/// - Both retry sections have a usable budget and backoff
/// - A configured post-process command is not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Store validation
    if config.store.bucket.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "store.bucket cannot be empty".to_string(),
        ));
    }
    if config.store.backend == StoreBackend::Local && config.store.root.is_none() {
        return Err(ConfigError::ValidationError(
            "store.root is required for the local backend".to_string(),
        ));
    }

    // Download validation
    if config.download.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "download.max_concurrent must be at least 1".to_string(),
        ));
    }
    if let Some(timestep) = config.download.timesteps.iter().find(|t| **t > MAX_TIMESTEP) {
        return Err(ConfigError::ValidationError(format!(
            "download.timesteps: {} exceeds {}",
            timestep, MAX_TIMESTEP
        )));
    }

    validate_retry("retry.run", &config.retry.run)?;
    validate_retry("retry.timestep", &config.retry.timestep)?;

    if matches!(&config.post_process.command, Some(command) if command.is_empty()) {
        return Err(ConfigError::ValidationError(
            "post_process.command cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry(section: &str, retry: &RetryConfig) -> Result<(), ConfigError> {
    if retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(format!(
            "{}.max_attempts must be at least 1",
            section
        )));
    }
    if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "{}.backoff_multiplier must be at least 1.0",
            section
        )));
    }
    Ok(())
}
