//! In-memory EventStore implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::storage::date::{explode, Window};
use crate::storage::{Event, EventId, EventStore, NewEvent, Result, StorageError};
use crate::utils::cancel::CancelToken;


struct Inner {
    events: Vec<Event>,
    /// Last id handed out; starts below the first valid id.
    last_id: EventId,
}

/// Event store backed by a vector behind one exclusive lock.
///
/// Every operation, reads included, holds the same lock, so calls on one
/// instance never overlap. Ids come from a counter owned by the instance and
/// are never reused. Removal swaps the last event into the freed slot, so
/// after a removal range queries return events in that swapped order.
pub struct MemoryEventStore {
    inner: Mutex<Inner>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                events: Vec::new(),
                last_id: -1,
            }),
        }
    }

    async fn get_window_events(
        &self,
        token: &CancelToken,
        at: DateTime<Utc>,
        window: Window,
    ) -> Result<Vec<Event>> {
        let inner = self.inner.lock().await;
        let query = explode(&at);

        let mut matched = Vec::new();
        if token.is_cancelled() {
            return Err(StorageError::Cancelled { partial: matched });
        }
        for event in &inner.events {
            if token.is_cancelled() {
                debug!(%window, partial = matched.len(), "Range query cancelled");
                return Err(StorageError::Cancelled { partial: matched });
            }
            if window.contains(&query, &explode(&event.time)) {
                matched.push(event.clone());
            }
        }
        Ok(matched)
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create_event(&self, token: &CancelToken, event: NewEvent) -> Result<EventId> {
        let mut inner = self.inner.lock().await;
        if token.is_cancelled() {
            return Err(StorageError::cancelled());
        }

        inner.last_id += 1;
        let id = inner.last_id;
        inner.events.push(event.with_id(id));
        Ok(id)
    }

    async fn update_event(&self, token: &CancelToken, event: Event) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if token.is_cancelled() {
            return Err(StorageError::cancelled());
        }

        let slot = inner
            .events
            .iter_mut()
            .find(|e| e.id == event.id)
            .ok_or(StorageError::NotFound { id: event.id })?;
        slot.client_id = event.client_id;
        slot.title = event.title;
        slot.time = event.time;
        Ok(())
    }

    async fn remove_event(&self, token: &CancelToken, id: EventId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if token.is_cancelled() {
            return Err(StorageError::cancelled());
        }

        let index = inner
            .events
            .iter()
            .position(|e| e.id == id)
            .ok_or(StorageError::NotFound { id })?;
        inner.events.swap_remove(index);
        Ok(())
    }

    async fn get_day_events(&self, token: &CancelToken, at: DateTime<Utc>) -> Result<Vec<Event>> {
        self.get_window_events(token, at, Window::Day).await
    }

    async fn get_week_events(
        &self,
        token: &CancelToken,
        at: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        self.get_window_events(token, at, Window::Week).await
    }

    async fn get_month_events(
        &self,
        token: &CancelToken,
        at: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        self.get_window_events(token, at, Window::Month).await
    }
}
