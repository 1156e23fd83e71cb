//! Database access layer for guild-roster
//!
//! One module per table. Single-statement helpers are generic over the sqlx
//! executor so they run against the pool or inside a transaction; helpers
//! issuing several statements take `&mut SqliteConnection` and are meant to
//! be called with a transaction.

use guild_common::db::RoleLabel;
use guild_common::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

pub mod callers;
pub mod participants;
pub mod players;
pub mod priority;
pub mod raids;
pub mod settings;

/// Open a transaction that takes the write lock up front
///
/// A deferred transaction that reads first and then writes gets
/// `SQLITE_BUSY` immediately when another writer holds the lock, without
/// waiting on the busy timeout. `BEGIN IMMEDIATE` queues on the timeout
/// instead.
pub async fn begin_write(db: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(db.begin_with("BEGIN IMMEDIATE").await?)
}

/// Parse a TEXT uuid column
pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid uuid in {}: '{}' ({})", column, value, e)))
}

/// Parse a stored role label
pub(crate) fn parse_role(column: &str, value: &str) -> Result<RoleLabel> {
    value
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid {}: {}", column, e)))
}
