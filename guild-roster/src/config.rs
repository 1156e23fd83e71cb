//! Runtime configuration resolution for guild-roster
//!
//! The Raid Helper API key is resolved Database → ENV → TOML.

use guild_common::config::{TomlConfig, API_KEY_ENV_VAR};
use guild_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

/// Resolve the Raid Helper API key
///
/// Returns `None` when no source holds a usable key; a sync cannot start
/// without one.
pub async fn resolve_raid_helper_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_raid_helper_api_key(db)
        .await?
        .filter(|k| is_valid_key(k));
    let env_key = std::env::var(API_KEY_ENV_VAR).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .raid_helper
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    let sources: Vec<&str> = [
        db_key.as_ref().map(|_| "database"),
        env_key.as_ref().map(|_| "environment"),
        toml_key.as_ref().map(|_| "TOML"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if sources.len() > 1 {
        warn!(
            "Raid Helper API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(source) = sources.first() {
        info!("Raid Helper API key loaded from {}", source);
    }

    Ok(db_key.or(env_key).or(toml_key))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
