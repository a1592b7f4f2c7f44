/// Configuration management for the Sakan identity core
use crate::error::{SakanError, SakanResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub verification: VerificationConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub account_db: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    /// Access token lifetime, seconds
    pub access_token_ttl: i64,
    /// Refresh token lifetime, seconds
    pub refresh_token_ttl: i64,
}

/// Remote national-id verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    pub base_url: String,
    pub api_key: String,
    /// Request timeout, seconds
    pub timeout_secs: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> SakanResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("SAKAN_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("SAKAN_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| SakanError::Validation("Invalid port number".to_string()))?;
        let version = env::var("SAKAN_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("SAKAN_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let account_db = env::var("SAKAN_ACCOUNT_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("sakan.sqlite"));

        let jwt_secret = env::var("SAKAN_JWT_SECRET")
            .map_err(|_| SakanError::Validation("JWT secret required".to_string()))?;
        let jwt_issuer =
            env::var("SAKAN_JWT_ISSUER").unwrap_or_else(|_| "sakan".to_string());
        let jwt_audience =
            env::var("SAKAN_JWT_AUDIENCE").unwrap_or_else(|_| "sakan-clients".to_string());
        let access_token_ttl = env::var("SAKAN_ACCESS_TOKEN_TTL")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);
        let refresh_token_ttl = env::var("SAKAN_REFRESH_TOKEN_TTL")
            .unwrap_or_else(|_| "604800".to_string())
            .parse()
            .unwrap_or(604800);

        let verification_base_url = env::var("SAKAN_NATIONAL_ID_API_URL")
            .unwrap_or_else(|_| "https://id-verify.example.gov.eg/api".to_string());
        let verification_api_key =
            env::var("SAKAN_NATIONAL_ID_API_KEY").unwrap_or_else(|_| String::new());
        let verification_timeout = env::var("SAKAN_NATIONAL_ID_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let rate_limit_enabled = env::var("SAKAN_RATE_LIMIT_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let rate_limit_max = env::var("SAKAN_RATE_LIMIT_MAX_REQUESTS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let rate_limit_window = env::var("SAKAN_RATE_LIMIT_WINDOW_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                account_db,
            },
            authentication: AuthConfig {
                jwt_secret,
                jwt_issuer,
                jwt_audience,
                access_token_ttl,
                refresh_token_ttl,
            },
            verification: VerificationConfig {
                base_url: verification_base_url,
                api_key: verification_api_key,
                timeout_secs: verification_timeout,
            },
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                max_requests: rate_limit_max,
                window_secs: rate_limit_window,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> SakanResult<()> {
        if self.service.hostname.is_empty() {
            return Err(SakanError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(SakanError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.jwt_issuer.is_empty()
            || self.authentication.jwt_audience.is_empty()
        {
            return Err(SakanError::Validation(
                "JWT issuer and audience cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8080,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                account_db: PathBuf::from(":memory:"),
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-key-that-is-long-enough-0000".to_string(),
                jwt_issuer: "sakan".to_string(),
                jwt_audience: "sakan-clients".to_string(),
                access_token_ttl: 3600,
                refresh_token_ttl: 604800,
            },
            verification: VerificationConfig {
                base_url: "http://127.0.0.1:1/api".to_string(),
                api_key: "test".to_string(),
                timeout_secs: 1,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                max_requests: 100,
                window_secs: 60,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_validate_accepts_good_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_jwt_secret() {
        let mut config = test_config();
        config.authentication.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_issuer() {
        let mut config = test_config();
        config.authentication.jwt_issuer = String::new();
        assert!(config.validate().is_err());
    }
}
