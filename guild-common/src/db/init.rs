//! Database initialization
//!
//! Creates the database on first run and applies the schema idempotently on
//! every start.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(connect_options(db_path))
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_settings_table(&pool).await?;
    create_callers_table(&pool).await?;
    create_raids_table(&pool).await?;
    create_players_table(&pool).await?;
    create_raid_registrations_table(&pool).await?;
    create_mor_status_table(&pool).await?;

    Ok(pool)
}

/// Connection options applied to every pooled connection
///
/// Foreign keys are a per-connection setting in SQLite, so they are set here
/// rather than with a one-off PRAGMA.
pub fn connect_options(db_path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000))
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_callers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS callers (
            id TEXT PRIMARY KEY,
            discord_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            avatar_url TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_raids_table(pool: &SqlitePool) -> Result<()> {
    // raid_helper_id is the idempotency key for sync; NULL for manual raids
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raids (
            id TEXT PRIMARY KEY,
            raid_helper_id TEXT UNIQUE,
            title TEXT NOT NULL,
            description TEXT,
            date TEXT NOT NULL,
            caller_id TEXT NOT NULL REFERENCES callers(discord_id) ON DELETE CASCADE,
            caller_name TEXT,
            image_url TEXT,
            last_synced TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_raids_caller_date ON raids(caller_id, date)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_players_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            discord_id TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Verified players are keyed by external identity
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_players_discord_id ON players(discord_id) WHERE discord_id IS NOT NULL",
    )
    .execute(pool)
    .await?;

    // Unverified players are keyed by display name, only among themselves
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_players_unverified_name ON players(name) WHERE discord_id IS NULL",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_raid_registrations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raid_registrations (
            id TEXT PRIMARY KEY,
            raid_id TEXT NOT NULL REFERENCES raids(id) ON DELETE CASCADE,
            player_id TEXT NOT NULL REFERENCES players(id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            secondary_role TEXT,
            ip INTEGER NOT NULL DEFAULT 0,
            selected INTEGER NOT NULL DEFAULT 0,
            mor INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(raid_id, player_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_mor_status_table(pool: &SqlitePool) -> Result<()> {
    // UNIQUE(player_id): at most one active priority record per player
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mor_status (
            id TEXT PRIMARY KEY,
            player_id TEXT NOT NULL UNIQUE REFERENCES players(id) ON DELETE CASCADE,
            raid_id TEXT NOT NULL REFERENCES raids(id) ON DELETE CASCADE,
            caller_id TEXT NOT NULL REFERENCES callers(discord_id) ON DELETE CASCADE,
            date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_mor_status_raid ON mor_status(raid_id)")
        .execute(pool)
        .await?;

    Ok(())
}
