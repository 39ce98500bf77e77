/// Configuration management for the giftwish backend
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub autofill: AutofillConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    /// Allowed CORS origins for the browser frontend
    pub cors_origins: Vec<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    /// OAuth client id expected in the `aud` claim of Google ID tokens.
    /// Google login is disabled when unset.
    pub google_client_id: Option<String>,
}

/// Autofill (metadata scraping) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutofillConfig {
    /// Ceiling for the outbound page fetch, in seconds
    pub fetch_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("GIFTWISH_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("GIFTWISH_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| ApiError::InvalidInput("Invalid port number".to_string()))?;
        let version = env::var("GIFTWISH_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let cors_origins = env::var("GIFTWISH_CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let data_directory: PathBuf = env::var("GIFTWISH_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("GIFTWISH_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("giftwish.sqlite"));

        let jwt_secret = env::var("GIFTWISH_JWT_SECRET")
            .map_err(|_| ApiError::InvalidInput("JWT secret required".to_string()))?;
        let access_token_expire_minutes = env::var("GIFTWISH_ACCESS_TOKEN_EXPIRE_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .unwrap_or(15);
        let refresh_token_expire_days = env::var("GIFTWISH_REFRESH_TOKEN_EXPIRE_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);
        let google_client_id = env::var("GIFTWISH_GOOGLE_CLIENT_ID")
            .ok()
            .filter(|s| !s.is_empty());

        let fetch_timeout_secs = env::var("GIFTWISH_AUTOFILL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                cors_origins,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            auth: AuthConfig {
                jwt_secret,
                access_token_expire_minutes,
                refresh_token_expire_days,
                google_client_id,
            },
            autofill: AutofillConfig { fetch_timeout_secs },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::InvalidInput("Hostname cannot be empty".to_string()));
        }

        if self.auth.jwt_secret.len() < 32 {
            return Err(ApiError::InvalidInput(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 8000,
            version: "0.1.0".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        },
        storage: StorageConfig {
            data_directory: PathBuf::from("./data"),
            database: PathBuf::from(":memory:"),
        },
        auth: AuthConfig {
            jwt_secret: "test-secret-key-for-testing-only-0123456789".to_string(),
            access_token_expire_minutes: 15,
            refresh_token_expire_days: 7,
            google_client_id: Some("test-client".to_string()),
        },
        autofill: AutofillConfig {
            fetch_timeout_secs: 10,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut config = test_config();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_is_valid() {
        assert!(test_config().validate().is_ok());
    }
}
