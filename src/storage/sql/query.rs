//! SQL database abstraction trait.

use sea_query_binder::SqlxValues;

/// Trait for SQL database backends.
///
/// This trait abstracts over different SQL databases (PostgreSQL, SQLite)
/// by providing the connection type, the table DDL and parameterized query
/// building.
pub trait SqlDatabase: Send + Sync + 'static {
    /// Connection type opened for each store call.
    type Connection: sqlx::Connection;

    /// DDL creating the events table (and its index) if absent.
    const CREATE_EVENTS_TABLE: &'static str;

    /// Build a SQL string and bound values from a sea-query SELECT statement.
    fn build_select(stmt: sea_query::SelectStatement) -> (String, SqlxValues);

    /// Build a SQL string and bound values from a sea-query INSERT statement.
    fn build_insert(stmt: sea_query::InsertStatement) -> (String, SqlxValues);

    /// Build a SQL string and bound values from a sea-query UPDATE statement.
    fn build_update(stmt: sea_query::UpdateStatement) -> (String, SqlxValues);

    /// Build a SQL string and bound values from a sea-query DELETE statement.
    fn build_delete(stmt: sea_query::DeleteStatement) -> (String, SqlxValues);
}
