use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// HS256 secret used to verify session tokens
    pub auth_jwt_secret: Option<String>,

    /// Name of the cookie carrying the session token
    #[serde(default = "default_auth_cookie_name")]
    pub auth_cookie_name: String,

    /// Database URL
    pub db_url: Option<String>,

    /// Language tag a fresh room or document starts with
    #[serde(default = "default_language")]
    pub default_language: String,

    // Remote code execution provider
    #[serde(default = "default_execution_api_url")]
    pub execution_api_url: String,
    pub execution_client_id: Option<String>,
    pub execution_client_secret: Option<String>,
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "prod" || env == "production"
    }

    /// Parsed list of allowed CORS origins; empty when none are configured.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Credentials for the execution provider, when both halves are set.
    pub fn execution_credentials(&self) -> Option<(String, String)> {
        match (&self.execution_client_id, &self.execution_client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.clone(), secret.clone()))
            }
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            service_name: default_service_name(),
            auth_jwt_secret: None,
            auth_cookie_name: default_auth_cookie_name(),
            db_url: None,
            default_language: default_language(),
            execution_api_url: default_execution_api_url(),
            execution_client_id: None,
            execution_client_secret: None,
            execution_timeout_secs: default_execution_timeout_secs(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "colab-code".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_auth_cookie_name() -> String {
    "token".to_string()
}

fn default_language() -> String {
    "javascript".to_string()
}

fn default_execution_api_url() -> String {
    "https://api.jdoodle.com/v1/execute".to_string()
}

fn default_execution_timeout_secs() -> u64 {
    10
}
