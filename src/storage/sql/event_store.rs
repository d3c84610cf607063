//! SQL EventStore implementation.
//!
//! A macro generates the implementation for each SQL backend.
//!
//! Every call opens its own connection and closes it before returning.
//! There is no pool and no retry: a database that cannot be reached
//! surfaces immediately as [`StorageError::Connectivity`].

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use sea_query::{Expr, Order, Query, SelectStatement};

use super::schema::Events;
use super::SqlDatabase;
use crate::storage::date::{explode, iso_weekday, Window};
use crate::storage::{Result, StorageError};
use crate::utils::cancel::CancelToken;

/// SQL-based implementation of EventStore.
///
/// This generic implementation works with any SQL database that implements
/// the `SqlDatabase` trait (PostgreSQL, SQLite).
pub struct SqlEventStore<DB: SqlDatabase> {
    url: String,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlEventStore<DB> {
    /// Create a store for the given connection URL without touching the database.
    ///
    /// Use `connect` to also verify reachability and create the table.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            _marker: PhantomData,
        }
    }
}

/// SELECT for the events matching `window` around `at`, oldest id first.
///
/// Day and month are exact column matches. The week is approximated by a day
/// range inside the query's month: from `day - weekday + 1` to
/// `day + 7 - weekday`, weekday being ISO (Monday = 1). Days of the same ISO
/// week that fall in the neighbouring month are not returned.
pub fn window_query(window: Window, at: &DateTime<Utc>) -> SelectStatement {
    let date = explode(at);
    let day = date.day as i32;

    let mut stmt = Query::select()
        .columns([
            Events::Id,
            Events::ClientId,
            Events::Title,
            Events::Year,
            Events::Month,
            Events::Day,
            Events::Hour,
            Events::Minute,
            Events::Second,
        ])
        .from(Events::Table)
        .and_where(Expr::col(Events::Year).eq(date.year))
        .and_where(Expr::col(Events::Month).eq(date.month as i32))
        .order_by(Events::Id, Order::Asc)
        .to_owned();

    match window {
        Window::Day => {
            stmt.and_where(Expr::col(Events::Day).eq(day));
        }
        Window::Week => {
            let weekday = iso_weekday(at) as i32;
            stmt.and_where(Expr::col(Events::Day).between(day - weekday + 1, day + (7 - weekday)));
        }
        Window::Month => {}
    }

    stmt
}

/// Fail with [`StorageError::Cancelled`] if `token` has already fired.
///
/// Every call checks once, before connecting, and then runs to completion:
/// a statement that reached the database is never reported as cancelled.
fn ensure_live(token: &CancelToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(StorageError::cancelled());
    }
    Ok(())
}

/// Macro to implement EventStore for a specific SQL backend.
macro_rules! impl_event_store {
    ($db_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl SqlEventStore<$db_type> {
            /// Verify the database is reachable and create the events table.
            ///
            /// The connection used for this is closed before returning.
            pub async fn connect(url: impl Into<String>) -> Result<Self> {
                use sqlx::Connection;

                let store = Self::new(url);
                let mut conn = store.open().await?;
                let created = sqlx::raw_sql(<$db_type as SqlDatabase>::CREATE_EVENTS_TABLE)
                    .execute(&mut conn)
                    .await;
                conn.close().await?;
                created?;

                tracing::info!(backend = $feature, "Events table ready");
                Ok(store)
            }

            async fn open(&self) -> Result<<$db_type as SqlDatabase>::Connection> {
                use sqlx::Connection;

                <$db_type as SqlDatabase>::Connection::connect(&self.url)
                    .await
                    .map_err(StorageError::Connectivity)
            }

            fn decode_event(
                row: &<<<$db_type as SqlDatabase>::Connection as sqlx::Connection>::Database
                    as sqlx::Database>::Row,
            ) -> Result<crate::storage::Event> {
                use sqlx::Row;

                use crate::storage::date::{compose, ExplodedDate};

                let date = ExplodedDate {
                    year: row.try_get::<i32, _>("year")?,
                    month: row.try_get::<i32, _>("month")? as u32,
                    // Not stored; compose ignores it.
                    week: 0,
                    day: row.try_get::<i32, _>("day")? as u32,
                    hour: row.try_get::<i32, _>("hour")? as u32,
                    minute: row.try_get::<i32, _>("minute")? as u32,
                    second: row.try_get::<i32, _>("second")? as u32,
                };

                Ok(crate::storage::Event {
                    id: row.try_get("id")?,
                    client_id: row.try_get("client_id")?,
                    title: row.try_get("title")?,
                    time: compose(&date)?,
                })
            }

            async fn insert(&self, event: crate::storage::NewEvent) -> Result<crate::storage::EventId> {
                use sqlx::{Connection, Row};

                let date = explode(&event.time);
                let stmt = Query::insert()
                    .into_table(Events::Table)
                    .columns([
                        Events::ClientId,
                        Events::Title,
                        Events::Year,
                        Events::Month,
                        Events::Day,
                        Events::Hour,
                        Events::Minute,
                        Events::Second,
                    ])
                    .values_panic([
                        event.client_id.into(),
                        event.title.into(),
                        date.year.into(),
                        (date.month as i32).into(),
                        (date.day as i32).into(),
                        (date.hour as i32).into(),
                        (date.minute as i32).into(),
                        (date.second as i32).into(),
                    ])
                    .returning_col(Events::Id)
                    .to_owned();
                let (sql, values) = <$db_type>::build_insert(stmt);

                let mut conn = self.open().await?;
                let row = sqlx::query_with(&sql, values).fetch_one(&mut conn).await;
                conn.close().await?;

                let id: i64 = row?.try_get(0)?;
                tracing::debug!(id, "Inserted event");
                Ok(id)
            }

            async fn update(&self, event: crate::storage::Event) -> Result<()> {
                use sqlx::Connection;

                let date = explode(&event.time);
                let stmt = Query::update()
                    .table(Events::Table)
                    .values([
                        (Events::ClientId, event.client_id.into()),
                        (Events::Title, event.title.into()),
                        (Events::Year, date.year.into()),
                        (Events::Month, (date.month as i32).into()),
                        (Events::Day, (date.day as i32).into()),
                        (Events::Hour, (date.hour as i32).into()),
                        (Events::Minute, (date.minute as i32).into()),
                        (Events::Second, (date.second as i32).into()),
                    ])
                    .and_where(Expr::col(Events::Id).eq(event.id))
                    .to_owned();
                let (sql, values) = <$db_type>::build_update(stmt);

                let mut conn = self.open().await?;
                let result = sqlx::query_with(&sql, values).execute(&mut conn).await;
                conn.close().await?;

                if result?.rows_affected() == 0 {
                    return Err(StorageError::NotFound { id: event.id });
                }
                Ok(())
            }

            async fn delete(&self, id: crate::storage::EventId) -> Result<()> {
                use sqlx::Connection;

                let stmt = Query::delete()
                    .from_table(Events::Table)
                    .and_where(Expr::col(Events::Id).eq(id))
                    .to_owned();
                let (sql, values) = <$db_type>::build_delete(stmt);

                let mut conn = self.open().await?;
                let result = sqlx::query_with(&sql, values).execute(&mut conn).await;
                conn.close().await?;

                if result?.rows_affected() == 0 {
                    return Err(StorageError::NotFound { id });
                }
                Ok(())
            }

            async fn select(
                &self,
                window: Window,
                at: DateTime<Utc>,
            ) -> Result<Vec<crate::storage::Event>> {
                use sqlx::Connection;

                let (sql, values) = <$db_type>::build_select(window_query(window, &at));

                let mut conn = self.open().await?;
                let rows = sqlx::query_with(&sql, values).fetch_all(&mut conn).await;
                conn.close().await?;

                let events = rows?
                    .iter()
                    .map(Self::decode_event)
                    .collect::<Result<Vec<_>>>()?;
                tracing::debug!(%window, %at, count = events.len(), "Range query");
                Ok(events)
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::storage::EventStore for SqlEventStore<$db_type> {
            async fn create_event(
                &self,
                token: &CancelToken,
                event: crate::storage::NewEvent,
            ) -> Result<crate::storage::EventId> {
                ensure_live(token)?;
                self.insert(event).await
            }

            async fn update_event(
                &self,
                token: &CancelToken,
                event: crate::storage::Event,
            ) -> Result<()> {
                ensure_live(token)?;
                self.update(event).await
            }

            async fn remove_event(
                &self,
                token: &CancelToken,
                id: crate::storage::EventId,
            ) -> Result<()> {
                ensure_live(token)?;
                self.delete(id).await
            }

            async fn get_day_events(
                &self,
                token: &CancelToken,
                at: DateTime<Utc>,
            ) -> Result<Vec<crate::storage::Event>> {
                ensure_live(token)?;
                self.select(Window::Day, at).await
            }

            async fn get_week_events(
                &self,
                token: &CancelToken,
                at: DateTime<Utc>,
            ) -> Result<Vec<crate::storage::Event>> {
                ensure_live(token)?;
                self.select(Window::Week, at).await
            }

            async fn get_month_events(
                &self,
                token: &CancelToken,
                at: DateTime<Utc>,
            ) -> Result<Vec<crate::storage::Event>> {
                ensure_live(token)?;
                self.select(Window::Month, at).await
            }
        }
    };
}

// Generate implementations for each SQL backend
#[cfg(feature = "postgres")]
impl_event_store!(super::postgres::Postgres, "postgres");
#[cfg(feature = "sqlite")]
impl_event_store!(super::sqlite::Sqlite, "sqlite");
