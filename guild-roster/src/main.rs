//! guild-roster - raid roster and MOR priority service
//!
//! Startup order: configuration, tracing, database, caller seeding,
//! session secret, HTTP server.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use guild_common::api::load_session_secret;
use guild_common::config::{
    database_path, load_toml_config, locate_config_file, resolve_caller_password,
    resolve_root_folder,
};
use guild_common::db::init_database;
use guild_roster::{build_router, db, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "guild-roster", version, about = "Guild raid roster and MOR priority service")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "GUILD_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding guild.db
    #[arg(long, env = "GUILD_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// HTTP port (overrides the config file)
    #[arg(long, env = "GUILD_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = locate_config_file(cli.config.as_deref());
    let config = load_toml_config(config_path.as_deref());

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            subscriber.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => subscriber.init(),
    }

    // Build identification right after tracing init
    info!(
        "Starting guild-roster v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let root_folder = resolve_root_folder(cli.root_folder.as_deref(), &config);
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let seeded = db::callers::seed_callers(&pool, &config.callers).await?;
    info!("Seeded {} caller(s) from configuration", seeded);

    let session_secret = load_session_secret(&pool).await?;
    info!("✓ Loaded session secret");

    let caller_password = resolve_caller_password(&config);
    if caller_password.is_none() {
        warn!("No caller password configured; caller login is disabled");
    }

    let bind_address = config.bind_address.clone();
    let port = cli.port.unwrap_or(config.port);

    let state = AppState::new(pool, session_secret, config, caller_password)?;
    let app = build_router(state);

    let addr = format!("{}:{}", bind_address, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("guild-roster listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
