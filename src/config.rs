// Process configuration loaded once at startup

use chrono::Duration;
use thiserror::Error;

const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 3600;
const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 604_800;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{0} is invalid: {1}")]
    Invalid(&'static str, String),
}

/// Signing secret and token lifetimes.
///
/// Built once and passed by value into the token codec and the session
/// service; nothing reads `JWT_SECRET` after this point.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_token_ttl: Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::seconds(DEFAULT_REFRESH_TOKEN_TTL_SECS),
        }
    }
}

// The secret must never reach the logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

/// Full application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub auth: AuthConfig,
    /// Postgres connection string; the in-memory store is used when absent
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let access_secs = parse_positive(
            "ACCESS_TOKEN_TTL_SECS",
            lookup("ACCESS_TOKEN_TTL_SECS"),
            DEFAULT_ACCESS_TOKEN_TTL_SECS,
        )?;
        let refresh_secs = parse_positive(
            "REFRESH_TOKEN_TTL_SECS",
            lookup("REFRESH_TOKEN_TTL_SECS"),
            DEFAULT_REFRESH_TOKEN_TTL_SECS,
        )?;
        if refresh_secs <= access_secs {
            return Err(ConfigError::Invalid(
                "REFRESH_TOKEN_TTL_SECS",
                "must be longer than ACCESS_TOKEN_TTL_SECS".to_string(),
            ));
        }

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid("PORT", e.to_string()))?,
            None => 8080,
        };

        Ok(Self {
            auth: AuthConfig {
                jwt_secret,
                access_token_ttl: Duration::seconds(access_secs),
                refresh_token_ttl: Duration::seconds(refresh_secs),
            },
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }
}

fn parse_positive(name: &'static str, raw: Option<String>, default: i64) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|e| ConfigError::Invalid(name, e.to_string()))?;
    if value <= 0 {
        return Err(ConfigError::Invalid(name, "must be positive".to_string()));
    }
    Ok(value)
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
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.auth.access_token_ttl, Duration::hours(1));
        assert_eq!(config.auth.refresh_token_ttl, Duration::days(7));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_missing_secret_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("JWT_SECRET"));

        let result = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "   ")]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn test_ttl_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("ACCESS_TOKEN_TTL_SECS", "60"),
            ("REFRESH_TOKEN_TTL_SECS", "120"),
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/goalify"),
        ]))
        .unwrap();
        assert_eq!(config.auth.access_token_ttl, Duration::seconds(60));
        assert_eq!(config.auth.refresh_token_ttl, Duration::seconds(120));
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/goalify"));
    }

    #[test]
    fn test_invalid_ttls_rejected() {
        for (access, refresh) in [("0", "100"), ("-5", "100"), ("abc", "100"), ("100", "100")] {
            let result = AppConfig::from_lookup(lookup_from(&[
                ("JWT_SECRET", "s3cret"),
                ("ACCESS_TOKEN_TTL_SECS", access),
                ("REFRESH_TOKEN_TTL_SECS", refresh),
            ]));
            assert!(matches!(result, Err(ConfigError::Invalid(..))), "{access}/{refresh} should fail");
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = AuthConfig::new("super-secret-value");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret-value"));
    }
}
