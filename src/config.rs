use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Urgencia";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn default_log_filter() -> String {
    "info,urgencia=debug".into()
}

/// Get the application data directory
/// ~/Urgencia/ on all platforms (user-visible, holds config + local db)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Urgencia")
}

pub fn config_path() -> PathBuf {
    app_data_dir().join("config.json")
}

/// Key-value configuration file. Every field has a default so a missing
/// or partial file still yields a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `"localhost"` keeps the database in the local app data directory;
    /// any other value is a shared directory path that several
    /// installations point at together.
    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { host: default_host() }
    }
}

fn default_host() -> String {
    "localhost".into()
}

/// Bootstrap admin credentials, used only to provision the first staff
/// account on an empty database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_user")]
    pub user: String,
    #[serde(default = "default_admin_password")]
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self { user: default_admin_user(), password: default_admin_password() }
    }
}

fn default_admin_user() -> String {
    "admin".into()
}

fn default_admin_password() -> String {
    "admin".into()
}

/// Load the configuration from the app data directory. A missing file is
/// normal on first run; an unreadable one is logged and replaced by
/// defaults rather than blocking startup.
pub fn load_config() -> AppConfig {
    read_config(&config_path())
}

fn read_config(path: &Path) -> AppConfig {
    match std::fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Config file {} unreadable ({e}), using defaults", path.display());
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    }
}

/// Resolve the database file location for this configuration.
pub fn database_path(config: &AppConfig) -> PathBuf {
    if config.database.host == "localhost" {
        app_data_dir().join("urgencia.db")
    } else {
        PathBuf::from(&config.database.host).join("urgencia.db")
    }
}
