//! Event storage.
//!
//! [`EventStore`] is the single capability contract consumed by the
//! application layer. Two implementations are provided:
//! - [`MemoryEventStore`]: one lock around a vector plus a per-instance id counter
//! - [`SqlEventStore`]: PostgreSQL or SQLite, one fresh connection per call
//!
//! The backend is chosen once, at startup, by [`init_storage`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::config::{ConfigError, StorageConfig, StorageType};
use crate::utils::cancel::CancelToken;

pub mod date;
pub mod memory;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod sql;

pub use date::{InvalidDate, Window};
pub use memory::MemoryEventStore;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub use sql::SqlEventStore;
#[cfg(feature = "postgres")]
pub use sql::postgres::PostgresEventStore;
#[cfg(feature = "sqlite")]
pub use sql::sqlite::SqliteEventStore;

/// Server-assigned event identifier.
pub type EventId = i64;

/// A stored calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Assigned by the store at creation, never changed afterwards.
    pub id: EventId,
    /// Opaque owner tag.
    pub client_id: i64,
    pub title: String,
    pub time: DateTime<Utc>,
}

/// An event that has not been stored yet, and so has no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub client_id: i64,
    pub title: String,
    pub time: DateTime<Utc>,
}

impl NewEvent {
    /// Attach the id the store assigned.
    pub fn with_id(self, id: EventId) -> Event {
        Event {
            id,
            client_id: self.client_id,
            title: self.title,
            time: self.time,
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Event not found: id={id}")]
    NotFound { id: EventId },

    /// The execution token fired. Range queries on the memory store keep the
    /// events matched before cancellation was observed.
    #[error("Operation cancelled ({} partial results)", .partial.len())]
    Cancelled { partial: Vec<Event> },

    /// The database could not be reached or the connection broke.
    #[error("Database unavailable: {0}")]
    Connectivity(sqlx::Error),

    /// The database answered, but the statement or its result was rejected.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Stored event has an invalid date: {0}")]
    InvalidDate(#[from] InvalidDate),
}

impl StorageError {
    /// Cancellation with nothing accumulated.
    pub fn cancelled() -> Self {
        StorageError::Cancelled {
            partial: Vec::new(),
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StorageError::Connectivity(err),
            other => StorageError::Database(other),
        }
    }
}

/// Interface for calendar event persistence.
///
/// Every call takes an execution token. Implementations check it
/// cooperatively and return [`StorageError::Cancelled`] once it fires.
/// Range queries return events in creation order (for the memory store,
/// removals reorder the tail; see [`MemoryEventStore`]).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Store a new event and return the id assigned to it.
    async fn create_event(&self, token: &CancelToken, event: NewEvent) -> Result<EventId>;

    /// Replace client id, title and time of the live event carrying `event.id`.
    async fn update_event(&self, token: &CancelToken, event: Event) -> Result<()>;

    /// Delete the event immediately.
    async fn remove_event(&self, token: &CancelToken, id: EventId) -> Result<()>;

    /// Events on the same calendar day as `at`.
    async fn get_day_events(&self, token: &CancelToken, at: DateTime<Utc>) -> Result<Vec<Event>>;

    /// Events in the same ISO week (and month) as `at`.
    async fn get_week_events(&self, token: &CancelToken, at: DateTime<Utc>)
        -> Result<Vec<Event>>;

    /// Events in the same month as `at`.
    async fn get_month_events(
        &self,
        token: &CancelToken,
        at: DateTime<Utc>,
    ) -> Result<Vec<Event>>;
}

/// Errors raised while building the configured store.
#[derive(Debug, thiserror::Error)]
pub enum StorageInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Storage backend '{0}' requested but its feature is not enabled")]
    FeatureDisabled(StorageType),

    #[error("Failed to prepare storage directory: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Initialize storage based on configuration.
pub async fn init_storage(
    config: &StorageConfig,
) -> std::result::Result<Arc<dyn EventStore>, StorageInitError> {
    let storage_type = config.backend()?;
    info!(storage = %storage_type, "Initializing storage");

    match storage_type {
        StorageType::Memory => Ok(Arc::new(MemoryEventStore::new())),
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            if let Some(parent) = std::path::Path::new(&config.sqlite.path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let store = SqliteEventStore::connect(config.sqlite.url()).await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "postgres")]
        StorageType::Postgres => {
            let store = PostgresEventStore::connect(config.postgres.url()).await?;
            Ok(Arc::new(store))
        }
        #[allow(unreachable_patterns)]
        other => {
            error!(storage = %other, "Storage backend compiled out");
            Err(StorageInitError::FeatureDisabled(other))
        }
    }
}
