use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Configuration for the ufw bridge service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General configuration
    pub general: GeneralConfig,

    /// ufw invocation configuration
    pub ufw: UfwConfig,

    /// Service configurations
    pub services: ServiceConfig,

    /// Authentication configuration
    pub auth: AuthConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// The log level
    pub log_level: String,
}

/// How the external ufw binary is invoked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UfwConfig {
    /// Path to the privilege-elevation wrapper
    #[serde(default = "default_sudo_path")]
    pub sudo_path: String,

    /// Absolute path to the ufw binary
    #[serde(default = "default_ufw_path")]
    pub ufw_path: String,

    /// Bounded wait for any single ufw invocation, in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// REST API configuration
    pub rest: RestConfig,
}

/// REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestConfig {
    /// Whether the REST API is enabled
    pub enabled: bool,

    /// The binding address for the REST API
    pub bind_address: String,

    /// The port for the REST API
    pub port: u16,

    /// Origins allowed by the CORS layer
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing bearer tokens
    pub secret_key: String,

    /// Token lifetime in minutes
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: u64,

    /// Accounts allowed to authenticate
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

/// A single account entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,

    /// Hex-encoded SHA-256 of the password
    pub password_sha256: String,
}

fn default_sudo_path() -> String {
    "/usr/bin/sudo".to_string()
}

fn default_ufw_path() -> String {
    "/usr/sbin/ufw".to_string()
}

fn default_command_timeout() -> u64 {
    10
}

fn default_token_ttl() -> u64 {
    30
}

impl Config {
    /// Load the configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => config::Config::builder()
                .add_source(config::File::from_str(&contents, config::FileFormat::Toml))
                .build()?,
            Some("json") => config::Config::builder()
                .add_source(config::File::from_str(&contents, config::FileFormat::Json))
                .build()?,
            _ => return Err(anyhow::anyhow!("Unsupported config file format")),
        };

        let config: Self = config.try_deserialize()?;
        Ok(config)
    }

    /// Get the default configuration
    pub fn get_default_configuration() -> Self {
        Self {
            general: GeneralConfig {
                log_level: "info".to_string(),
            },
            ufw: UfwConfig {
                sudo_path: default_sudo_path(),
                ufw_path: default_ufw_path(),
                command_timeout_secs: default_command_timeout(),
            },
            services: ServiceConfig {
                rest: RestConfig {
                    enabled: true,
                    bind_address: "127.0.0.1".to_string(),
                    port: 8080,
                    allowed_origins: vec!["http://localhost".to_string()],
                },
            },
            auth: AuthConfig {
                secret_key: "change-me".to_string(),
                token_ttl_minutes: default_token_ttl(),
                users: Vec::new(),
            },
        }
    }
}
