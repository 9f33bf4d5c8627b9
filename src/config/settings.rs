//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub invoke: InvokeConfig,
    pub edit: EditConfig,
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Model-invoke endpoint shared by the synchronous image backends and the
/// text models used for prompt enhancement
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvokeConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_invoke_timeout")]
    pub timeout_ms: u64,
}

fn default_invoke_timeout() -> u64 {
    60000
}

/// Edit-style backend configuration (submit/poll protocol)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EditConfig {
    #[serde(default = "default_edit_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout_ms: u64,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_ms: u64,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_ms: u64,
}

fn default_edit_base_url() -> String {
    "https://api.bfl.ai/v1".to_string()
}

fn default_poll_interval() -> u64 {
    500
}

fn default_max_poll_attempts() -> u32 {
    60
}

fn default_submit_timeout() -> u64 {
    30000
}

fn default_poll_timeout() -> u64 {
    10000
}

fn default_download_timeout() -> u64 {
    30000
}

/// Persistence configuration for the record and object stores
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_mode")]
    pub mode: String,
    #[serde(default)]
    pub records_url: Option<String>,
    #[serde(default)]
    pub objects_url: Option<String>,
    #[serde(default)]
    pub public_url_prefix: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_storage_timeout")]
    pub timeout_ms: u64,
}

fn default_storage_mode() -> String {
    "memory".to_string()
}

fn default_storage_timeout() -> u64 {
    10000
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("invoke.base_url", "http://127.0.0.1:8091")?
            .set_default("edit.base_url", "https://api.bfl.ai/v1")?
            .set_default("storage.mode", "memory")?
            // Load from configuration file
            .add_source(File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false))
            // Override with environment variables (prefixed with STUDIO_)
            .add_source(
                Environment::with_prefix("STUDIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Server port cannot be 0".to_string(),
            )));
        }

        if self.invoke.base_url.is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "Invoke endpoint base_url cannot be empty".to_string(),
            )));
        }

        if self.edit.max_poll_attempts == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "edit.max_poll_attempts must be at least 1".to_string(),
            )));
        }

        match self.storage.mode.as_str() {
            "memory" => {}
            "http" => {
                if self.storage.records_url.is_none() || self.storage.objects_url.is_none() {
                    return Err(AppError::Config(config::ConfigError::Message(
                        "storage.records_url and storage.objects_url are required when storage.mode is 'http'"
                            .to_string(),
                    )));
                }
            }
            other => {
                return Err(AppError::Config(config::ConfigError::Message(format!(
                    "Invalid storage mode '{}'. Must be 'memory' or 'http'",
                    other
                ))));
            }
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
            invoke: InvokeConfig {
                base_url: "http://127.0.0.1:8091".to_string(),
                api_token: None,
                timeout_ms: default_invoke_timeout(),
            },
            edit: EditConfig {
                base_url: default_edit_base_url(),
                api_key: None,
                poll_interval_ms: default_poll_interval(),
                max_poll_attempts: default_max_poll_attempts(),
                submit_timeout_ms: default_submit_timeout(),
                poll_timeout_ms: default_poll_timeout(),
                download_timeout_ms: default_download_timeout(),
            },
            storage: StorageConfig {
                mode: default_storage_mode(),
                records_url: None,
                objects_url: None,
                public_url_prefix: None,
                api_token: None,
                timeout_ms: default_storage_timeout(),
            },
        }
    }
}
