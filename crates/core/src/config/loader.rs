use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
/// (`CLIPFLOW_SCHEDULER__MAX_CONCURRENT_JOBS=5` overrides
/// `scheduler.max_concurrent_jobs`).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("CLIPFLOW_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[scheduler]
max_concurrent_jobs = 5

[limiter]
max_requests_per_window = 20
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.scheduler.max_concurrent_jobs, 5);
        assert_eq!(config.limiter.max_requests_per_window, 20);
        // Unset sections fall back to defaults.
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_load_config_from_str_empty_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.scheduler.max_per_identity, 2);
        assert_eq!(config.delivery.size_threshold_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn test_load_config_from_str_invalid() {
        let result = load_config_from_str("[scheduler]\nmax_concurrent_jobs = \"three\"");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[story_api]
base_url = "http://stories.internal:3000"
api_token = "abc"

[storage]
download_dir = "/var/lib/clipflow/downloads"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.story_api.base_url, "http://stories.internal:3000");
        assert_eq!(config.story_api.api_token.as_deref(), Some("abc"));
        assert_eq!(
            config.storage.download_dir.to_string_lossy(),
            "/var/lib/clipflow/downloads"
        );
    }
}
