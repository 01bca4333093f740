//! # Preferences
//!
//! User privacy and form-default settings, persisted as TOML sealed with a
//! sub-key of the device master key.
//!
//! ```text
//! Preferences ──toml──► bytes ──AES-GCM(HKDF(master, "inventory-preferences-v1"))──►
//!     <data_dir>/preferences.toml.sealed
//! ```
//!
//! Loaded once by the composition root; written only on explicit save.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use inventory_core::ItemEntry;
use inventory_db::{cipher, SecretKey};

const PREFERENCES_KEY_INFO: &[u8] = b"inventory-preferences-v1";

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Mask provider fields on the detail view.
    pub hide_sensitive_data: bool,

    /// Disable the share action.
    pub forbid_sharing: bool,

    /// Prefill provider fields on the add-item form.
    pub use_default_provider: bool,

    pub default_provider_name: String,
    pub default_provider_email: String,
    pub default_provider_phone: String,
}

impl Default for Preferences {
    /// Sensitive data hidden and sharing forbidden until the user opts in.
    fn default() -> Self {
        Preferences {
            hide_sensitive_data: true,
            forbid_sharing: true,
            use_default_provider: false,
            default_provider_name: String::new(),
            default_provider_email: String::new(),
            default_provider_phone: String::new(),
        }
    }
}

impl Preferences {
    /// Reads the sealed preferences file; defaults when it does not exist.
    pub fn load(path: &Path, master: &SecretKey) -> AppResult<Self> {
        let sealed = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No preferences file, using defaults");
                return Ok(Preferences::default());
            }
            Err(e) => return Err(e.into()),
        };

        let plain = cipher::open(&preferences_key(master)?, &sealed)
            .map_err(|_| AppError::config("preferences file could not be decrypted"))?;
        let text = String::from_utf8(plain)
            .map_err(|_| AppError::config("preferences file is not UTF-8"))?;

        toml::from_str(&text).map_err(|e| AppError::config(format!("invalid preferences: {}", e)))
    }

    /// Seals and writes the preferences, replacing the previous file.
    pub fn save(&self, path: &Path, master: &SecretKey) -> AppResult<()> {
        let text = toml::to_string(self)
            .map_err(|e| AppError::config(format!("could not encode preferences: {}", e)))?;
        let sealed = cipher::seal(&preferences_key(master)?, text.as_bytes())?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = path.with_extension("sealed.tmp");
        fs::write(&staging, sealed)?;
        fs::rename(&staging, path)?;

        info!("Preferences saved");
        Ok(())
    }

    /// A blank add-item form, with provider fields filled in when default
    /// provider values are enabled.
    pub fn prefill_entry(&self) -> ItemEntry {
        if !self.use_default_provider {
            return ItemEntry::default();
        }

        ItemEntry {
            provider_name: self.default_provider_name.clone(),
            provider_email: self.default_provider_email.clone(),
            provider_phone: self.default_provider_phone.clone(),
            ..ItemEntry::default()
        }
    }

    #[inline]
    pub fn sharing_allowed(&self) -> bool {
        !self.forbid_sharing
    }
}

fn preferences_key(master: &SecretKey) -> AppResult<SecretKey> {
    Ok(master.derive_subkey(None, PREFERENCES_KEY_INFO)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom() -> Preferences {
        Preferences {
            hide_sensitive_data: false,
            forbid_sharing: false,
            use_default_provider: true,
            default_provider_name: "Acme".to_string(),
            default_provider_email: "a@acme.com".to_string(),
            default_provider_phone: "+15551234567".to_string(),
        }
    }

    #[test]
    fn test_defaults_are_private() {
        let prefs = Preferences::default();
        assert!(prefs.hide_sensitive_data);
        assert!(!prefs.sharing_allowed());
        assert_eq!(prefs.prefill_entry(), ItemEntry::default());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs =
            Preferences::load(&dir.path().join("preferences.toml.sealed"), &SecretKey::generate())
                .unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml.sealed");
        let master = SecretKey::generate();

        custom().save(&path, &master).unwrap();
        assert_eq!(Preferences::load(&path, &master).unwrap(), custom());

        let on_disk = fs::read(&path).unwrap();
        assert!(!on_disk.windows(4).any(|w| w == b"Acme"));
    }

    #[test]
    fn test_other_device_cannot_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml.sealed");
        custom().save(&path, &SecretKey::generate()).unwrap();

        let err = Preferences::load(&path, &SecretKey::generate()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_prefill_uses_default_provider() {
        let entry = custom().prefill_entry();
        assert_eq!(entry.provider_name, "Acme");
        assert_eq!(entry.provider_phone, "+15551234567");
        assert!(entry.name.is_empty());
        assert!(entry.price.is_empty());
    }
}
