//! services/cli/src/config.rs
//!
//! Client configuration, read from the environment (and `.env` outside tests).

use std::path::PathBuf;
use tracing::Level;

use burner_core::session::STORAGE_KEY;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the Burner API, without a trailing slash.
    pub api_url: String,
    pub session_file: PathBuf,
    pub log_level: Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok(), dirs::config_dir())
    }

    /// Builds the configuration from any key lookup and the platform config directory.
    pub fn from_lookup<F>(lookup: F, config_dir: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("BURNER_API_URL")
            .unwrap_or_else(|| "http://127.0.0.1:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "BURNER_API_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_url),
            ));
        }

        let session_file = match lookup("BURNER_SESSION_FILE") {
            Some(path) => PathBuf::from(path),
            None => config_dir
                .map(|dir| dir.join("burner").join(format!("{}.json", STORAGE_KEY)))
                .ok_or_else(|| ConfigError::MissingVar("BURNER_SESSION_FILE".to_string()))?,
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "WARN".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            api_url,
            session_file,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_the_platform_config_dir() {
        let config = Config::from_lookup(|_| None, Some(PathBuf::from("/home/u/.config"))).unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:8000");
        assert_eq!(
            config.session_file,
            PathBuf::from("/home/u/.config/burner/auth-storage.json")
        );
        assert_eq!(config.log_level, Level::WARN);
    }

    #[test]
    fn session_file_needs_a_home_when_not_set() {
        let err = Config::from_lookup(|_| None, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "BURNER_SESSION_FILE"));

        let config = Config::from_lookup(
            |key| (key == "BURNER_SESSION_FILE").then(|| "/tmp/s.json".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(config.session_file, PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn api_url_is_normalised_and_checked() {
        let config = Config::from_lookup(
            |key| (key == "BURNER_API_URL").then(|| "https://api.burner.dev/".to_string()),
            Some(PathBuf::from("/c")),
        )
        .unwrap();
        assert_eq!(config.api_url, "https://api.burner.dev");

        let err = Config::from_lookup(
            |key| (key == "BURNER_API_URL").then(|| "ftp://x".to_string()),
            Some(PathBuf::from("/c")),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "BURNER_API_URL"));
    }
}
