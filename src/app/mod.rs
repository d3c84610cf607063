//! Calendar application layer.
//!
//! Both protocol servers delegate to one shared [`Calendar`]. It validates the
//! wire request, converts it to storage types, calls the store, and converts
//! the result back. It holds no state of its own.

use std::sync::Arc;

use tonic::{Code, Status};
use tracing::{debug, warn};

use crate::proto;
use crate::proto_ext::{EventExt, TimeExt};
use crate::storage::{EventStore, StorageError, Window};
use crate::utils::cancel::CancelToken;

/// Errors returned by [`Calendar`] operations.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AppError {
    /// Status code shared by the gRPC and HTTP front ends.
    pub fn code(&self) -> Code {
        match self {
            AppError::InvalidArgument(_) => Code::InvalidArgument,
            AppError::Storage(StorageError::NotFound { .. }) => Code::NotFound,
            AppError::Storage(StorageError::Cancelled { .. }) => Code::Cancelled,
            AppError::Storage(StorageError::Connectivity(_)) => Code::Unavailable,
            AppError::Storage(StorageError::Database(_)) => Code::Internal,
            AppError::Storage(StorageError::InvalidDate(_)) => Code::Internal,
        }
    }
}

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        Status::new(err.code(), err.to_string())
    }
}

fn missing_time(message: &str) -> AppError {
    AppError::InvalidArgument(format!("{message} requires a valid time"))
}

/// Calendar service shared by the gRPC and HTTP servers.
pub struct Calendar {
    store: Arc<dyn EventStore>,
}

impl Calendar {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub async fn create_event(
        &self,
        token: &CancelToken,
        request: proto::Event,
    ) -> Result<proto::EventId, AppError> {
        let event = request.to_new_event().ok_or_else(|| missing_time("CreateEvent"))?;
        debug!(client_id = event.client_id, time = %event.time, "CreateEvent");

        let id = self
            .store
            .create_event(token, event)
            .await
            .inspect_err(|e| warn!(error = %e, "CreateEvent failed"))?;
        Ok(proto::EventId { id })
    }

    pub async fn update_event(&self, token: &CancelToken, request: proto::Event) -> Result<(), AppError> {
        let event = request.to_event().ok_or_else(|| missing_time("UpdateEvent"))?;
        let id = event.id;
        debug!(id, time = %event.time, "UpdateEvent");

        self.store
            .update_event(token, event)
            .await
            .inspect_err(|e| warn!(id, error = %e, "UpdateEvent failed"))?;
        Ok(())
    }

    pub async fn remove_event(&self, token: &CancelToken, request: proto::EventId) -> Result<(), AppError> {
        let id = request.id;
        debug!(id, "RemoveEvent");

        self.store
            .remove_event(token, id)
            .await
            .inspect_err(|e| warn!(id, error = %e, "RemoveEvent failed"))?;
        Ok(())
    }

    pub async fn get_day_events(
        &self,
        token: &CancelToken,
        request: proto::TimeQuery,
    ) -> Result<proto::Events, AppError> {
        self.get_window_events(token, request, Window::Day).await
    }

    pub async fn get_week_events(
        &self,
        token: &CancelToken,
        request: proto::TimeQuery,
    ) -> Result<proto::Events, AppError> {
        self.get_window_events(token, request, Window::Week).await
    }

    pub async fn get_month_events(
        &self,
        token: &CancelToken,
        request: proto::TimeQuery,
    ) -> Result<proto::Events, AppError> {
        self.get_window_events(token, request, Window::Month).await
    }

    async fn get_window_events(
        &self,
        token: &CancelToken,
        request: proto::TimeQuery,
        window: Window,
    ) -> Result<proto::Events, AppError> {
        let at = request
            .utc_time()
            .ok_or_else(|| missing_time("TimeQuery"))?;
        debug!(%window, %at, "Range query");

        let events = match window {
            Window::Day => self.store.get_day_events(token, at).await,
            Window::Week => self.store.get_week_events(token, at).await,
            Window::Month => self.store.get_month_events(token, at).await,
        }
        .inspect_err(|e| warn!(%window, %at, error = %e, "Range query failed"))?;

        Ok(events.into())
    }
}
