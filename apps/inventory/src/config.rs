//! # Application Configuration
//!
//! Loaded once at startup and passed by reference from then on.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`INVENTORY_*`)
//! 2. Config file (`inventory.toml`)
//! 3. Defaults (this file)
//!
//! ```toml
//! # inventory.toml
//! data_dir = "/var/lib/inventory"
//! cache_dir = "/var/cache/inventory"
//! store_file_name = "item_database"
//! store_passphrase = "..."
//!
//! [kdf]
//! m_cost = 19456
//! t_cost = 2
//! p_cost = 1
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use inventory_db::{DbConfig, KdfParams, Passphrase};

/// Default store file name inside the data directory.
pub const STORE_FILE_NAME: &str = "item_database";

/// Default config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "inventory.toml";

pub const ENV_DATA_DIR: &str = "INVENTORY_DATA_DIR";
pub const ENV_CACHE_DIR: &str = "INVENTORY_CACHE_DIR";
pub const ENV_STORE_PASSPHRASE: &str = "INVENTORY_STORE_PASSPHRASE";

const MASTER_KEY_FILE: &str = "master.key";
const PREFERENCES_FILE: &str = "preferences.toml.sealed";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "example", "inventory")
}

/// Argon2id cost for newly created stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Memory cost in KiB.
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        let params = KdfParams::default();
        KdfConfig {
            m_cost: params.m_cost,
            t_cost: params.t_cost,
            p_cost: params.p_cost,
        }
    }
}

impl From<KdfConfig> for KdfParams {
    fn from(config: KdfConfig) -> Self {
        KdfParams::new(config.m_cost, config.t_cost, config.p_cost)
    }
}

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Holds the store file, the master key and the preferences.
    pub data_dir: PathBuf,

    /// Staging area for exports.
    pub cache_dir: PathBuf,

    /// Store file name within `data_dir`.
    pub store_file_name: String,

    /// Store passphrase. Required.
    #[serde(skip_serializing)]
    pub store_passphrase: Option<String>,

    pub kdf: KdfConfig,
}

impl Default for AppConfig {
    /// Platform data/cache directories, falling back to `./data` and
    /// `./cache` when the platform has none.
    fn default() -> Self {
        let (data_dir, cache_dir) = match project_dirs() {
            Some(dirs) => (dirs.data_dir().to_path_buf(), dirs.cache_dir().to_path_buf()),
            None => (PathBuf::from("data"), PathBuf::from("cache")),
        };

        AppConfig {
            data_dir,
            cache_dir,
            store_file_name: STORE_FILE_NAME.to_string(),
            store_passphrase: None,
            kdf: KdfConfig::default(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("data_dir", &self.data_dir)
            .field("cache_dir", &self.cache_dir)
            .field("store_file_name", &self.store_file_name)
            .field(
                "store_passphrase",
                &self.store_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .field("kdf", &self.kdf)
            .finish()
    }
}

impl AppConfig {
    /// Configuration rooted in a single directory (tests, portable installs).
    pub fn in_dir(root: impl AsRef<Path>, passphrase: impl Into<String>) -> Self {
        let root = root.as_ref();
        AppConfig {
            data_dir: root.join("data"),
            cache_dir: root.join("cache"),
            store_file_name: STORE_FILE_NAME.to_string(),
            store_passphrase: Some(passphrase.into()),
            kdf: KdfConfig::default(),
        }
    }

    /// Loads defaults, then the config file, then the environment.
    ///
    /// An explicit `path` must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => AppConfig::default(),
            },
        };

        config.apply_env_from(|key| std::env::var(key).ok());
        config.validate()?;

        info!(
            data_dir = %config.data_dir.display(),
            store = %config.store_file_name,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// `<platform config dir>/inventory.toml`.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        debug!(path = %path.display(), "Reading config file");
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> AppResult<Self> {
        toml::from_str(text).map_err(|e| AppError::config(format!("invalid config file: {}", e)))
    }

    /// Overrides fields from `INVENTORY_*` variables.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(passphrase) = lookup(ENV_STORE_PASSPHRASE) {
            self.store_passphrase = Some(passphrase);
        }
    }

    /// Rejects a configuration the app cannot start with.
    pub fn validate(&self) -> AppResult<()> {
        match &self.store_passphrase {
            None => {
                return Err(AppError::config(format!(
                    "store passphrase is required (set {})",
                    ENV_STORE_PASSPHRASE
                )))
            }
            Some(p) if p.is_empty() => {
                return Err(AppError::config("store passphrase must not be empty"))
            }
            Some(_) => {}
        }

        let name = self.store_file_name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(AppError::config("store file name must be a plain file name"));
        }

        if self.kdf.m_cost < 8 * self.kdf.p_cost.max(1) || self.kdf.t_cost == 0 {
            return Err(AppError::config("KDF parameters are too weak to be valid"));
        }

        Ok(())
    }

    /// Creates the data and cache directories.
    pub fn ensure_dirs(&self) -> AppResult<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file_name)
    }

    pub fn master_key_path(&self) -> PathBuf {
        self.data_dir.join(MASTER_KEY_FILE)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join(PREFERENCES_FILE)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.store_path()).kdf(self.kdf.into())
    }

    pub fn passphrase(&self) -> AppResult<Passphrase> {
        self.store_passphrase
            .as_deref()
            .map(Passphrase::new)
            .ok_or_else(|| AppError::config("store passphrase is required"))
    }
}
