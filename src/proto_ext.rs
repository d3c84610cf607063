//! Conversions between wire messages and storage types.
//!
//! Wire timestamps are truncated to whole seconds on the way in, which is the
//! precision the relational store keeps.

use chrono::{DateTime, Utc};
use prost_types::Timestamp;

use crate::proto;
use crate::storage::{Event, NewEvent};

/// Whole-second UTC instant for a wire timestamp.
///
/// `None` when the seconds fall outside what `chrono` can represent.
pub fn timestamp_to_utc(ts: &Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.seconds, 0)
}

pub fn utc_to_timestamp(t: &DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: t.timestamp(),
        nanos: t.timestamp_subsec_nanos() as i32,
    }
}

/// Accessors for messages carrying an optional timestamp.
pub trait TimeExt {
    fn timestamp(&self) -> Option<&Timestamp>;

    /// The carried instant, if present and representable.
    fn utc_time(&self) -> Option<DateTime<Utc>> {
        self.timestamp().and_then(timestamp_to_utc)
    }
}

impl TimeExt for proto::Event {
    fn timestamp(&self) -> Option<&Timestamp> {
        self.time.as_ref()
    }
}

impl TimeExt for proto::TimeQuery {
    fn timestamp(&self) -> Option<&Timestamp> {
        self.time.as_ref()
    }
}

/// Storage form of a wire event.
pub trait EventExt {
    /// Drops the wire id; the store assigns one.
    fn to_new_event(&self) -> Option<NewEvent>;

    fn to_event(&self) -> Option<Event>;
}

impl EventExt for proto::Event {
    fn to_new_event(&self) -> Option<NewEvent> {
        Some(NewEvent {
            client_id: self.client_id,
            title: self.title.clone(),
            time: self.utc_time()?,
        })
    }

    fn to_event(&self) -> Option<Event> {
        Some(Event {
            id: self.id,
            client_id: self.client_id,
            title: self.title.clone(),
            time: self.utc_time()?,
        })
    }
}

impl From<Event> for proto::Event {
    fn from(event: Event) -> Self {
        proto::Event {
            id: event.id,
            client_id: event.client_id,
            title: event.title,
            time: Some(utc_to_timestamp(&event.time)),
        }
    }
}

impl From<Vec<Event>> for proto::Events {
    fn from(events: Vec<Event>) -> Self {
        proto::Events {
            events: events.into_iter().map(proto::Event::from).collect(),
        }
    }
}
