//! Server and networking configuration types.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::ConfigError;

/// Protocol front end that can be enabled under `server.protocols`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerKind {
    Grpc,
    Http,
}

impl FromStr for ServerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grpc" => Ok(ServerKind::Grpc),
            "http" => Ok(ServerKind::Http),
            _ => Err(ConfigError::Unsupported {
                setting: "server.protocols",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServerKind::Grpc => "grpc",
            ServerKind::Http => "http",
        })
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Front ends to start. Duplicates are ignored.
    pub protocols: Vec<String>,
    /// gRPC listener.
    pub grpc: ListenConfig,
    /// REST/JSON listener.
    pub http: ListenConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocols: vec![ServerKind::Grpc.to_string(), ServerKind::Http.to_string()],
            grpc: ListenConfig::with_port(50051),
            http: ListenConfig::with_port(8080),
        }
    }
}

impl ServerConfig {
    /// Enabled front ends in configuration order.
    pub fn kinds(&self) -> Result<Vec<ServerKind>, ConfigError> {
        let mut kinds = Vec::with_capacity(self.protocols.len());
        for name in &self.protocols {
            let kind = name.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

/// Host and port to bind.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self::with_port(0)
    }
}

impl ListenConfig {
    fn with_port(port: u16) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port,
        }
    }

    /// `host:port` as accepted by `TcpListener::bind`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
