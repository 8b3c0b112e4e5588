//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod database;
pub mod logging;
pub mod pagination;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::database::{DatabaseConfig, StorageBackend};
pub use self::logging::LoggingConfig;
pub use self::pagination::PaginationConfig;

use crate::error::AppError;

/// Prefix for environment variable overrides (`CRUDKIT__SERVER__PORT=9000`).
pub const ENV_PREFIX: &str = "CRUDKIT";

/// Deployment environment tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Developer workstation.
    Local,
    /// Automated test runs.
    Test,
    /// Production deployment.
    #[default]
    Production,
}

impl Environment {
    /// Debug behaviour (verbose errors in logs, pretty output) is enabled
    /// outside production.
    pub fn is_debug(&self) -> bool {
        matches!(self, Self::Local | Self::Test)
    }

    /// Name used to locate the `config/{env}.toml` overlay.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "development" | "dev" => Ok(Self::Local),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(AppError::configuration(format!(
                "Unknown environment '{other}'"
            ))),
        }
    }
}

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
    /// Service title reported by the health endpoint.
    #[serde(default = "default_title")]
    pub title: String,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// List endpoint paging limits.
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            title: default_title(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            pagination: PaginationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `CRUDKIT__`.
    pub fn load(env: Environment) -> Result<Self, AppError> {
        Self::load_from("config", env)
    }

    /// Load configuration from an explicit directory.
    pub fn load_from(dir: &str, env: Environment) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(
                config::File::with_name(&format!("{dir}/{}", env.as_str())).required(false),
            )
            .set_override("environment", env.as_str())?
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

fn default_title() -> String {
    "CrudKit".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!("LOCAL".parse::<Environment>().ok(), Some(Environment::Local));
        assert_eq!("prod".parse::<Environment>().ok(), Some(Environment::Production));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_debug_flag() {
        assert!(Environment::Local.is_debug());
        assert!(Environment::Test.is_debug());
        assert!(!Environment::Production.is_debug());
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let config = AppConfig::load_from("does-not-exist", Environment::Test).expect("load");
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.pagination.max_size, 100);
        assert_eq!(config.server.docs(), Some("/docs"));
    }

    #[test]
    fn test_docs_path_normalization() {
        let mut server = ServerConfig::default();
        server.docs_path = "/reference/".to_string();
        assert_eq!(server.docs(), Some("/reference"));
        server.docs_path = String::new();
        assert_eq!(server.docs(), None);
    }
}
