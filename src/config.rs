use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "git-gateway.toml";

/// Main configuration structure for the gateway
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Repository session settings
    pub repository: RepositoryConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Name reported by the health endpoint
    pub service_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Path of the repository the session binds to
    pub path: String,
    /// Branch HEAD points at in newly initialized repositories
    pub initial_branch: String,
    /// Upper bound for push and pull
    pub remote_timeout_seconds: u64,
    /// Commit identity used when the repository has none configured
    pub default_author_name: String,
    pub default_author_email: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level, overridden by `LOG_LEVEL` and by `RUST_LOG` directives
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                service_name: "AI Dev Platform".to_string(),
            },
            repository: RepositoryConfig {
                path: ".".to_string(),
                initial_branch: "main".to_string(),
                remote_timeout_seconds: 60,
                default_author_name: "Git Gateway".to_string(),
                default_author_email: "gateway@localhost".to_string(),
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: true,
            },
        }
    }
}

impl GatewayConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`file`, or git-gateway.toml when present)
    /// 3. Environment variables (prefixed with GIT_GATEWAY__)
    /// 4. LOG_LEVEL for the log level
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&GatewayConfig::default())?);

        match file {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        // Override with environment variables
        builder = builder.add_source(
            Environment::with_prefix("GIT_GATEWAY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut gateway_config: GatewayConfig = builder.build()?.try_deserialize()?;

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            if !level.trim().is_empty() {
                gateway_config.observability.log_level = level.trim().to_lowercase();
            }
        }

        Ok(gateway_config)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load .env file if it exists, returning its path when one was read.
    ///
    /// Runs before telemetry is up, so the caller logs the result.
    pub fn load_env_file() -> Result<Option<PathBuf>> {
        Self::load_env_file_from(Path::new(".env"))
    }

    pub fn load_env_file_from(path: &Path) -> Result<Option<PathBuf>> {
        if !path.exists() {
            return Ok(None);
        }
        dotenvy::from_path(path)?;
        Ok(Some(path.to_path_buf()))
    }
}
