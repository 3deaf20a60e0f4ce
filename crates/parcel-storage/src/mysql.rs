//! MySQL implementations of the repository contracts.
//!
//! Timestamps are stored as unix seconds in `BIGINT` columns and unsigned
//! counters as signed `BIGINT`; conversion happens at the row boundary.
//! Short code columns use a binary collation so that codes differing only
//! in case are distinct.

mod access_log;
mod content;
mod link;
mod usage;

pub use access_log::MySqlAccessLog;
pub use content::MySqlContentRepository;
pub use link::MySqlLinkRepository;
pub use usage::MySqlUsageRepository;

use jiff::Timestamp;
use parcel_core::error::Result;
use parcel_core::StorageError;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::info;

/// Table definitions, one statement each, in creation order.
pub const SCHEMA: &[(&str, &str)] = &[
    ("contents", include_str!("../ddl/mysql/contents.sql")),
    ("short_links", include_str!("../ddl/mysql/short_links.sql")),
    ("usage_counters", include_str!("../ddl/mysql/usage_counters.sql")),
    ("access_logs", include_str!("../ddl/mysql/access_logs.sql")),
];

/// Opens a connection pool.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
        .map_err(map_sqlx_error)
}

/// Creates any missing tables. Every statement is idempotent.
pub async fn migrate(pool: &MySqlPool) -> Result<()> {
    for (table, ddl) in SCHEMA {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(map_sqlx_error)?;
        info!(table = *table, "schema ensured");
    }
    Ok(())
}

fn parse_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn parse_optional_timestamp(column: &str, seconds: Option<i64>) -> Result<Option<Timestamp>> {
    seconds
        .map(|value| parse_timestamp(column, value))
        .transpose()
}

fn to_unsigned(column: &str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| StorageError::InvalidData(format!("negative {column}: {value}")))
}

fn to_signed(column: &str, value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| StorageError::InvalidData(format!("{column} out of range: {value}")))
}

fn last_insert_id(id: u64) -> Result<i64> {
    i64::try_from(id)
        .map_err(|_| StorageError::InvalidData(format!("insert id out of range: {id}")))
}

/// Cuts `value` to at most `max` characters so it fits its column.
fn truncated(value: Option<String>, max: usize) -> Option<String> {
    value.map(|value| match value.char_indices().nth(max) {
        Some((end, _)) => value[..end].to_string(),
        None => value,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}
