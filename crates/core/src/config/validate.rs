use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - worker pool and limiter sizes are non-zero
/// - delivery thresholds are internally consistent
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.scheduler.max_concurrent_jobs == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.max_concurrent_jobs cannot be 0".to_string(),
        ));
    }
    if config.scheduler.max_per_identity == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.max_per_identity cannot be 0".to_string(),
        ));
    }
    if config.limiter.max_requests_per_window == 0 {
        return Err(ConfigError::ValidationError(
            "limiter.max_requests_per_window cannot be 0".to_string(),
        ));
    }
    if config.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "retry.max_attempts cannot be 0".to_string(),
        ));
    }
    if config.delivery.chunk_size_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "delivery.chunk_size_bytes cannot be 0".to_string(),
        ));
    }
    if config.delivery.size_threshold_bytes > config.delivery.max_size_bytes {
        return Err(ConfigError::ValidationError(
            "delivery.size_threshold_bytes cannot exceed delivery.max_size_bytes".to_string(),
        ));
    }

    Ok(())
}
