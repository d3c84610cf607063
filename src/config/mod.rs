//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod logger;
mod server;
mod storage;

pub use logger::LoggerConfig;
pub use server::{ListenConfig, ServerConfig, ServerKind};
pub use storage::{PostgresConfig, SqliteConfig, StorageConfig, StorageType};

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "calendar.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "CALENDAR_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "CALENDAR";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "CALENDAR_LOG";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Unsupported value for {setting}: '{value}'")]
    Unsupported { setting: &'static str, value: String },
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration.
    pub logger: LoggerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Server configuration.
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `calendar.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    /// 5. `POSTGRES_*` variables, for the relational connection only
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = Self::load_sources(path, std::env::var(CONFIG_ENV_VAR).ok())?;
        config
            .storage
            .postgres
            .apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_sources(path: Option<&str>, env_path: Option<String>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Some(config_path) = env_path {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.protocols")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.logger.level, "info");
        assert!(config.logger.path.is_none());
        assert_eq!(config.storage.backend().unwrap(), StorageType::Memory);
        assert_eq!(config.server.grpc.port, 50051);
        assert_eq!(config.server.http.port, 8080);
    }

    #[test]
    fn test_load_yaml_file() {
        let file = write_yaml(
            r#"
logger:
  level: debug
  path: /tmp/calendar-logs
storage:
  type: sql
  postgres:
    host: db
    port: 5433
    user: cal
    password: pw
    dbname: events
server:
  protocols: [http]
  http:
    host: 127.0.0.1
    port: 9000
"#,
        );

        let config = Config::load_sources(file.path().to_str(), None).unwrap();

        assert_eq!(config.logger.level, "debug");
        assert_eq!(config.logger.path.as_deref(), Some("/tmp/calendar-logs"));
        assert_eq!(config.storage.backend().unwrap(), StorageType::Postgres);
        assert_eq!(config.storage.postgres.url(), "postgres://cal:pw@db:5433/events");
        assert_eq!(config.server.kinds().unwrap(), vec![ServerKind::Http]);
        assert_eq!(config.server.http.addr(), "127.0.0.1:9000");
        // Unmentioned sections keep their defaults.
        assert_eq!(config.server.grpc.port, 50051);
        assert_eq!(config.storage.sqlite.path, "calendar.db");
    }

    #[test]
    fn test_env_path_overrides_argument() {
        let base = write_yaml("storage:\n  type: sqlite\n  sqlite:\n    path: a.db\n");
        let overlay = write_yaml("storage:\n  sqlite:\n    path: b.db\n");

        let config = Config::load_sources(
            base.path().to_str(),
            Some(overlay.path().to_string_lossy().into_owned()),
        )
        .unwrap();

        assert_eq!(config.storage.backend().unwrap(), StorageType::Sqlite);
        assert_eq!(config.storage.sqlite.path, "b.db");
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = Config::load_sources(Some("/nonexistent/calendar.yaml"), None);
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_unknown_storage_type_loads_but_is_unsupported() {
        let file = write_yaml("storage:\n  type: cassandra\n");
        let config = Config::load_sources(file.path().to_str(), None).unwrap();
        assert!(matches!(
            config.storage.backend(),
            Err(ConfigError::Unsupported { .. })
        ));
    }
}
