//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration lives in a TOML file. Runtime settings that the
//! web UI can change (the Raid Helper API key, the session secret) live in the
//! database `settings` table and take priority over the file.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--config, --root-folder, --port)
//! 2. Environment variables (GUILD_CONFIG, GUILD_ROOT_FOLDER, ...)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "GUILD_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "GUILD_ROOT_FOLDER";

/// Environment variable holding the Raid Helper API key
pub const API_KEY_ENV_VAR: &str = "GUILD_RAID_HELPER_API_KEY";

/// Environment variable holding the shared caller password
pub const CALLER_PASSWORD_ENV_VAR: &str = "GUILD_CALLER_PASSWORD";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "guild.db";

const APP_DIR_NAME: &str = "guild-roster";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. The service must restart
/// to pick up changes to the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the SQLite database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Shared password callers use to open a roster session
    #[serde(default)]
    pub caller_password: Option<String>,

    /// Raid Helper feed settings
    #[serde(default)]
    pub raid_helper: RaidHelperConfig,

    /// Callers upserted at startup
    #[serde(default)]
    pub callers: Vec<CallerSeed>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: default_bind_address(),
            port: default_port(),
            logging: LoggingConfig::default(),
            caller_password: None,
            raid_helper: RaidHelperConfig::default(),
            callers: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Raid Helper event feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaidHelperConfig {
    /// Bearer credential (lowest priority source, see `resolve_raid_helper_api_key`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Discord server whose events are mirrored
    #[serde(default)]
    pub server_id: Option<String>,

    /// API base URL, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RaidHelperConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            server_id: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// A caller registered at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallerSeed {
    pub discord_id: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5740
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://raid-helper.dev/api/v2".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Locate the TOML config file
///
/// Priority: CLI argument, `GUILD_CONFIG`, user config dir, `/etc`.
/// Returns `None` when no candidate exists.
pub fn locate_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc").join(APP_DIR_NAME).join("config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Parse TOML configuration text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Load configuration, falling back to defaults
///
/// A missing or unreadable file is not fatal: a warning is logged and the
/// built-in defaults are returned. A file that exists but fails to parse is
/// also downgraded to defaults so the service can still start.
pub fn load_toml_config(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        warn!("No config file found, using built-in defaults");
        return TomlConfig::default();
    };

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Config file {} unreadable ({}), using built-in defaults", path.display(), e);
            return TomlConfig::default();
        }
    };

    match parse_toml_config(&content) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} in {}, using built-in defaults", e, path.display());
            TomlConfig::default()
        }
    }
}

/// Root folder resolution
///
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./guild_data"))
}

/// Database file inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Resolve the caller password: environment first, then TOML
pub fn resolve_caller_password(config: &TomlConfig) -> Option<String> {
    std::env::var(CALLER_PASSWORD_ENV_VAR)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .or_else(|| config.caller_password.clone().filter(|p| !p.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = parse_toml_config("").unwrap();
        assert_eq!(config.port, 5740);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.raid_helper.base_url, "https://raid-helper.dev/api/v2");
        assert_eq!(config.raid_helper.timeout_secs, 30);
        assert!(config.callers.is_empty());
    }

    #[test]
    fn test_database_path_joins_file_name() {
        let path = database_path(Path::new("/srv/guild"));
        assert_eq!(path, PathBuf::from("/srv/guild/guild.db"));
    }

    #[test]
    fn test_cli_root_folder_wins() {
        let config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..TomlConfig::default()
        };
        let resolved = resolve_root_folder(Some(Path::new("/from/cli")), &config);
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }
}
