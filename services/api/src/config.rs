//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Object-storage (Cloudflare R2) settings.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_base_url: String,
    pub presign_ttl_secs: u64,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub auth_token_ttl_minutes: i64,
    pub storage: StorageConfig,
    pub google_client_id: Option<String>,
    pub oauth_redirect_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Load Server and Database Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        let auth_token_ttl_minutes = parse_number(&lookup, "AUTH_TOKEN_TTL_MINUTES", 30)?;

        // --- Load Object Storage Settings ---
        let account_id = required("R2_ACCOUNT_ID")?;
        let access_key = required("R2_ACCESS_KEY")?;
        let secret_key = required("R2_SECRET_KEY")?;
        let bucket = lookup("R2_BUCKET").unwrap_or_else(|| "burner-video".to_string());
        let endpoint = lookup("R2_ENDPOINT")
            .unwrap_or_else(|| format!("https://{}.r2.cloudflarestorage.com", account_id));
        let endpoint = endpoint.trim_end_matches('/').to_string();
        url::Url::parse(&endpoint)
            .map_err(|e| ConfigError::InvalidValue("R2_ENDPOINT".to_string(), e.to_string()))?;
        let public_base_url = lookup("R2_PUBLIC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{}/{}", endpoint, bucket));
        let presign_ttl_secs = parse_number(&lookup, "PRESIGN_TTL_SECS", 3600)?;

        // --- Load OAuth Settings (as optional) ---
        let google_client_id = lookup("GOOGLE_CLIENT_ID");
        let oauth_redirect_url = lookup("OAUTH_REDIRECT_URL");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            auth_token_ttl_minutes,
            storage: StorageConfig {
                endpoint,
                bucket,
                access_key,
                secret_key,
                region: "auto".to_string(),
                public_base_url,
                presign_ttl_secs,
            },
            google_client_id,
            oauth_redirect_url,
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("DATABASE_URL", "postgres://localhost/burner"),
        ("R2_ACCOUNT_ID", "acct"),
        ("R2_ACCESS_KEY", "AK"),
        ("R2_SECRET_KEY", "SK"),
    ];

    #[test]
    fn defaults_fill_optional_settings() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert_eq!(config.bind_address.port(), 8000);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.auth_token_ttl_minutes, 30);
        assert_eq!(config.storage.bucket, "burner-video");
        assert_eq!(config.storage.endpoint, "https://acct.r2.cloudflarestorage.com");
        assert_eq!(
            config.storage.public_base_url,
            "https://acct.r2.cloudflarestorage.com/burner-video"
        );
        assert_eq!(config.storage.presign_ttl_secs, 3600);
        assert!(config.google_client_id.is_none());
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PRESIGN_TTL_SECS", "soon"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "PRESIGN_TTL_SECS"));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BIND_ADDRESS", "nowhere"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("R2_ENDPOINT", "not a url"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "R2_ENDPOINT"));
    }
}
