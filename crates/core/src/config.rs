//! Application configuration.
//!
//! Values are layered with the `config` crate: built-in defaults first, then
//! the optional `config.toml` under the platform configuration directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use ::config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::StorePaths;

/// Directory name used under the platform config and data roots.
pub const APP_DIR: &str = "rentacar";
/// Name of the configuration file inside [`APP_DIR`].
pub const CONFIG_FILE: &str = "config.toml";
/// File name of the access log (bitácora) inside the data directory.
pub const ACCESS_LOG_FILE: &str = "bitacora.txt";

const DEFAULT_MAX_LOGIN_ATTEMPTS: u32 = 3;
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin1234";

/// Credentials used to seed the first administrator on an empty user store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BootstrapAdmin {
    /// Login name of the seeded administrator.
    pub username: String,
    /// Initial password of the seeded administrator.
    pub password: String,
}

/// Runtime configuration handed to [`crate::RentalSystem::open`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding the four JSON stores.
    pub data_dir: PathBuf,
    /// Explicit access log location; defaults to `<data_dir>/bitacora.txt`.
    #[serde(default)]
    pub access_log: Option<PathBuf>,
    /// Failed logins allowed before the frontend gives up.
    pub max_login_attempts: u32,
    /// Administrator created when no users exist yet.
    pub bootstrap_admin: BootstrapAdmin,
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load configuration, reading `path` if it exists.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::for_data_dir(default_data_dir());
        let settings = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
            .set_default("max_login_attempts", i64::from(defaults.max_login_attempts))?
            .set_default("bootstrap_admin.username", defaults.bootstrap_admin.username)?
            .set_default("bootstrap_admin.password", defaults.bootstrap_admin.password)?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("failed to parse configuration {}", path.display()))
    }

    /// Configuration with default settings rooted at `data_dir`.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            access_log: None,
            max_login_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
            bootstrap_admin: BootstrapAdmin {
                username: DEFAULT_ADMIN_USERNAME.to_string(),
                password: DEFAULT_ADMIN_PASSWORD.to_string(),
            },
        }
    }

    /// Resolved path of the access log.
    pub fn access_log_path(&self) -> PathBuf {
        self.access_log
            .clone()
            .unwrap_or_else(|| self.data_dir.join(ACCESS_LOG_FILE))
    }

    /// Locations of the JSON stores inside [`AppConfig::data_dir`].
    pub fn store_paths(&self) -> StorePaths {
        StorePaths::new(&self.data_dir)
    }
}

/// Default configuration file path under the user's config directory.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// Default data directory under the user's data directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Write the default configuration file when none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let defaults = AppConfig::for_data_dir(default_data_dir());
    fs::write(path, render_toml(&defaults))
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

fn render_toml(config: &AppConfig) -> String {
    format!(
        "data_dir = {:?}\nmax_login_attempts = {}\n\n[bootstrap_admin]\nusername = {:?}\npassword = {:?}\n",
        config.data_dir.to_string_lossy(),
        config.max_login_attempts,
        config.bootstrap_admin.username,
        config.bootstrap_admin.password,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.max_login_attempts, 3);
        assert_eq!(config.bootstrap_admin.username, "admin");
        assert_eq!(config.access_log_path(), config.data_dir.join(ACCESS_LOG_FILE));
        Ok(())
    }

    #[test]
    fn file_overrides_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "data_dir = \"/srv/rentacar\"\nmax_login_attempts = 5\naccess_log = \"/var/log/bitacora.txt\"\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.data_dir, PathBuf::from("/srv/rentacar"));
        assert_eq!(config.max_login_attempts, 5);
        assert_eq!(
            config.access_log_path(),
            PathBuf::from("/var/log/bitacora.txt")
        );
        assert_eq!(config.bootstrap_admin.password, "admin1234");
        Ok(())
    }

    #[test]
    fn default_file_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(CONFIG_FILE);
        write_default_config(&path)?;
        assert!(path.exists());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config, AppConfig::for_data_dir(default_data_dir()));
        Ok(())
    }
}
