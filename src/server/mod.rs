//! Protocol front ends.
//!
//! Each server wraps the shared [`Calendar`] and owns a [`CancelToken`] that
//! doubles as its stop latch. Every request receives a clone of that token,
//! so `stop()` both ends the accept loop and cancels in-flight store work.
//!
//! `stop()` is idempotent and may be called before, during or after `start()`.
//! A server stopped before it starts returns from `start()` without binding.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tracing::info;

use crate::app::Calendar;
use crate::config::{ConfigError, ServerConfig};
pub use crate::config::ServerKind;

pub mod grpc;
pub mod http;

pub use grpc::GrpcServer;
pub use http::HttpServer;

/// Errors that end a server's `start()`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// A startable, stoppable listener.
#[async_trait]
pub trait Server: Send + Sync {
    fn kind(&self) -> ServerKind;

    /// Bind the configured address and serve until stopped.
    async fn start(&self) -> Result<(), ServerError>;

    /// Serve on an already bound listener until stopped.
    async fn start_with_listener(&self, listener: TcpListener) -> Result<(), ServerError>;

    fn stop(&self);
}

/// Bind `addr` and log the resolved local address.
pub(crate) async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    let listener = TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    if let Ok(local) = listener.local_addr() {
        info!(addr = %local, "Listening");
    }
    Ok(listener)
}

/// Build the servers enabled in configuration, in configuration order.
pub fn build_servers(
    app: Arc<Calendar>,
    config: &ServerConfig,
) -> Result<Vec<Arc<dyn Server>>, ConfigError> {
    let servers = config
        .kinds()?
        .into_iter()
        .map(|kind| -> Arc<dyn Server> {
            match kind {
                ServerKind::Grpc => Arc::new(GrpcServer::new(app.clone(), config.grpc.clone())),
                ServerKind::Http => Arc::new(HttpServer::new(app.clone(), config.http.clone())),
            }
        })
        .collect();
    Ok(servers)
}
