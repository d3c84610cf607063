//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Events table schema.
///
/// The instant is stored exploded into calendar columns; sub-second
/// precision is not kept.
#[derive(Iden)]
pub enum Events {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "client_id"]
    ClientId,
    #[iden = "title"]
    Title,
    #[iden = "year"]
    Year,
    #[iden = "month"]
    Month,
    #[iden = "day"]
    Day,
    #[iden = "hour"]
    Hour,
    #[iden = "minute"]
    Minute,
    #[iden = "second"]
    Second,
}

/// SQL for creating the events table on PostgreSQL.
pub const CREATE_EVENTS_TABLE_POSTGRES: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id BIGSERIAL PRIMARY KEY,
    client_id BIGINT NOT NULL,
    title TEXT NOT NULL,
    "year" INTEGER NOT NULL,
    "month" INTEGER NOT NULL,
    "day" INTEGER NOT NULL,
    "hour" INTEGER NOT NULL,
    "minute" INTEGER NOT NULL,
    "second" INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_year_month_day ON events("year", "month", "day");
"#;

/// SQL for creating the events table on SQLite.
///
/// AUTOINCREMENT keeps ids of deleted rows from being handed out again.
pub const CREATE_EVENTS_TABLE_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    "year" INTEGER NOT NULL,
    "month" INTEGER NOT NULL,
    "day" INTEGER NOT NULL,
    "hour" INTEGER NOT NULL,
    "minute" INTEGER NOT NULL,
    "second" INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_year_month_day ON events("year", "month", "day");
"#;
