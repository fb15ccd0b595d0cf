//! Application configuration loaded from environment variables.

use std::str::FromStr;

use domain::DEFAULT_MAX_SHOPKEEPERS_PER_SELLER;
use jsonwebtoken::Algorithm;
use thiserror::Error;

pub const DEFAULT_APP_NAME: &str = "MS-USER - User Management Service";
pub const DEFAULT_API_PREFIX: &str = "/api/v1/users";
pub const DEFAULT_SECRET_KEY: &str = "your-secret-key-here-change-in-production";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:8080,http://localhost";
pub const DEFAULT_GEO_URL: &str = "http://ms-geo:8000";
pub const DEFAULT_PRODUCT_URL: &str = "http://localhost:8005";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("ALGORITHM must be one of HS256, HS384, HS512, got '{0}'")]
    InvalidAlgorithm(String),

    #[error("LOG_FORMAT must be 'json' or 'pretty', got '{0}'")]
    InvalidLogFormat(String),

    #[error("API_PREFIX must start with '/' and name a path, got '{0}'")]
    InvalidPrefix(String),
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidLogFormat(s.to_string())),
        }
    }
}

/// Service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `APP_NAME`, `APP_VERSION`: reported by `/health`
/// - `API_PREFIX`: mount point of the business routes (default: `/api/v1/users`)
/// - `HOST`, `PORT`: bind address (default: `0.0.0.0:8000`)
/// - `DATABASE_URL`: PostgreSQL URL; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `SECRET_KEY`, `ALGORITHM`: JWT verification (default algorithm: `HS256`)
/// - `CORS_ORIGINS`: comma-separated allowed origins
/// - `MS_GEO_URL`: base URL of the geo service
/// - `PRODUCT_SERVICE_URL`: base URL of the product service
/// - `MAX_SHOPKEEPERS_PER_SELLER`: soft assignment cap (default: `80`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub cors_origins: Vec<String>,
    pub geo_url: String,
    pub product_url: String,
    pub max_shopkeepers_per_seller: i64,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let api_prefix = match get("API_PREFIX") {
            Some(prefix) => parse_prefix(&prefix)?,
            None => defaults.api_prefix,
        };

        let algorithm = match get("ALGORITHM") {
            Some(label) => parse_algorithm(&label)?,
            None => defaults.algorithm,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(label) => label.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            app_name: get("APP_NAME").unwrap_or(defaults.app_name),
            app_version: get("APP_VERSION").unwrap_or(defaults.app_version),
            api_prefix,
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_number("PORT", get("PORT"), defaults.port)?,
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_number(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                defaults.database_max_connections,
            )?,
            secret_key: get("SECRET_KEY").unwrap_or(defaults.secret_key),
            algorithm,
            cors_origins: get("CORS_ORIGINS")
                .map(|raw| split_origins(&raw))
                .unwrap_or(defaults.cors_origins),
            geo_url: get("MS_GEO_URL").unwrap_or(defaults.geo_url),
            product_url: get("PRODUCT_SERVICE_URL").unwrap_or(defaults.product_url),
            max_shopkeepers_per_seller: parse_number(
                "MAX_SHOPKEEPERS_PER_SELLER",
                get("MAX_SHOPKEEPERS_PER_SELLER"),
                defaults.max_shopkeepers_per_seller,
            )?,
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when the JWT secret was left at its placeholder value.
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_url: None,
            database_max_connections: 10,
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            algorithm: Algorithm::HS256,
            cors_origins: split_origins(DEFAULT_CORS_ORIGINS),
            geo_url: DEFAULT_GEO_URL.to_string(),
            product_url: DEFAULT_PRODUCT_URL.to_string(),
            max_shopkeepers_per_seller: DEFAULT_MAX_SHOPKEEPERS_PER_SELLER,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn parse_number<T: FromStr>(
    var: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        None => Ok(default),
    }
}

/// Only the HMAC family can be verified with a shared secret.
fn parse_algorithm(label: &str) -> Result<Algorithm, ConfigError> {
    match Algorithm::from_str(label.trim()) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
        _ => Err(ConfigError::InvalidAlgorithm(label.to_string())),
    }
}

fn parse_prefix(raw: &str) -> Result<String, ConfigError> {
    let prefix = raw.trim().trim_end_matches('/');
    if !prefix.starts_with('/') || prefix.len() < 2 {
        return Err(ConfigError::InvalidPrefix(raw.to_string()));
    }
    Ok(prefix.to_string())
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serial_test::serial;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.api_prefix, "/api/v1/users");
        assert_eq!(config.algorithm, Algorithm::HS256);
        assert_eq!(config.max_shopkeepers_per_seller, 80);
        assert_eq!(config.cors_origins.len(), 3);
        assert!(config.database_url.is_none());
        assert_eq!(config.product_url, "http://localhost:8005");
        assert!(config.uses_default_secret());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://u:p@db/users"),
            ("CORS_ORIGINS", " https://a.example , ,https://b.example"),
            ("ALGORITHM", "HS512"),
            ("LOG_FORMAT", "JSON"),
            ("API_PREFIX", "/users/"),
            ("PRODUCT_SERVICE_URL", "http://ms-product:8000"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url.as_deref(), Some("postgres://u:p@db/users"));
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.algorithm, Algorithm::HS512);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.api_prefix, "/users");
        assert_eq!(config.product_url, "http://ms-product:8000");
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            from_pairs(&[("PORT", "eighty")]).unwrap_err(),
            ConfigError::InvalidNumber {
                var: "PORT",
                value: "eighty".to_string()
            }
        );
        assert!(matches!(
            from_pairs(&[("ALGORITHM", "RS256")]),
            Err(ConfigError::InvalidAlgorithm(_))
        ));
        assert!(matches!(
            from_pairs(&[("API_PREFIX", "/")]),
            Err(ConfigError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_empty_database_url_means_memory() {
        let config = from_pairs(&[("DATABASE_URL", "  ")]).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    #[serial]
    fn test_reads_process_environment() {
        // SAFETY: serialised with every other test that touches the environment.
        unsafe {
            std::env::set_var("MAX_SHOPKEEPERS_PER_SELLER", "25");
        }
        let config = Config::from_env();
        unsafe {
            std::env::remove_var("MAX_SHOPKEEPERS_PER_SELLER");
        }
        assert_eq!(config.unwrap().max_shopkeepers_per_seller, 25);
    }
}
