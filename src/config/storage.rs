//! Storage configuration types.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::ConfigError;

/// Storage backend selected by `storage.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Memory,
    Sqlite,
    Postgres,
}

impl FromStr for StorageType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageType::Memory),
            "sqlite" => Ok(StorageType::Sqlite),
            // Older deployments name the relational store "sql".
            "postgres" | "sql" => Ok(StorageType::Postgres),
            _ => Err(ConfigError::Unsupported {
                setting: "storage.type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageType::Memory => "memory",
            StorageType::Sqlite => "sqlite",
            StorageType::Postgres => "postgres",
        })
    }
}

/// Storage configuration (discriminated union).
///
/// The type is kept as text until [`StorageConfig::backend`] so that an
/// unknown name is reported as an unsupported setting rather than a parse
/// failure of the whole file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator: memory, sqlite, postgres (alias: sql).
    #[serde(rename = "type")]
    pub storage_type: String,
    /// SQLite-specific configuration.
    pub sqlite: SqliteConfig,
    /// PostgreSQL-specific configuration.
    pub postgres: PostgresConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Memory.to_string(),
            sqlite: SqliteConfig::default(),
            postgres: PostgresConfig::default(),
        }
    }
}

impl StorageConfig {
    pub fn backend(&self) -> Result<StorageType, ConfigError> {
        self.storage_type.parse()
    }
}

/// SQLite-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file. Created, along with its directory, if missing.
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "calendar.db".to_string(),
        }
    }
}

impl SqliteConfig {
    /// Connection URL that creates the file on first open.
    pub fn url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path)
    }
}

/// PostgreSQL-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "calendar".to_string(),
        }
    }
}

impl PostgresConfig {
    pub fn url(&self) -> String {
        if self.password.is_empty() {
            format!(
                "postgres://{}@{}:{}/{}",
                self.user, self.host, self.port, self.dbname
            )
        } else {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.dbname
            )
        }
    }

    /// Apply the `POSTGRES_*` variables used by container images.
    ///
    /// `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(user) = lookup("POSTGRES_USER") {
            self.user = user;
        }
        if let Some(password) = lookup("POSTGRES_PASSWORD") {
            self.password = password;
        }
        if let Some(dbname) = lookup("POSTGRES_DB") {
            self.dbname = dbname;
        }
        if let Some(host) = lookup("POSTGRES_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("POSTGRES_PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::Unsupported {
                setting: "POSTGRES_PORT",
                value: port,
            })?;
        }
        Ok(())
    }
}
