//! guild-roster library
//!
//! Mirrors Raid Helper events into the guild database, manages raid
//! rosters and tracks MOR priority for passed-over players.

use std::sync::Arc;

use axum::Router;
use guild_common::config::TomlConfig;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod roles;
pub mod services;

pub use error::{ApiError, ApiResult};

use services::RaidHelperClient;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Secret signing caller session tokens
    pub session_secret: i64,
    /// Bootstrap configuration
    pub config: Arc<TomlConfig>,
    /// Shared caller password; `None` disables caller login
    pub caller_password: Option<String>,
    pub feed: Arc<RaidHelperClient>,
    /// Held for the duration of one sync batch
    pub sync_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: SqlitePool,
        session_secret: i64,
        config: TomlConfig,
        caller_password: Option<String>,
    ) -> guild_common::Result<Self> {
        let feed = RaidHelperClient::new(&config.raid_helper)?;

        Ok(Self {
            db,
            session_secret,
            config: Arc::new(config),
            caller_password,
            feed: Arc::new(feed),
            sync_lock: Arc::new(Mutex::new(())),
        })
    }
}

/// Build application router
///
/// Health, listings, raid info and the signup form are public. Roster
/// management, raid creation, sync and settings need a caller session.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    // Protected routes (require a caller session)
    let protected = Router::new()
        .merge(api::protected_raid_routes())
        .merge(api::roster_routes())
        .merge(api::sync_routes())
        .merge(api::settings_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no session)
    let public = Router::new()
        .merge(api::health_routes())
        .merge(api::caller_routes())
        .merge(api::public_raid_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
