//! # Device Master Key
//!
//! A random 256-bit key kept in `<data_dir>/master.key`, created on first
//! use. Export files and the preferences file are sealed with sub-keys of
//! it, so both are bound to this device.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

use crate::error::{AppError, AppResult};
use inventory_db::cipher::KEY_LEN;
use inventory_db::SecretKey;

/// Loads the master key, generating and persisting it if absent.
pub fn load_or_create(path: &Path) -> AppResult<SecretKey> {
    match fs::read(path) {
        Ok(bytes) => SecretKey::from_slice(&bytes).map_err(|_| {
            AppError::config(format!(
                "master key at {} is not {} bytes",
                path.display(),
                KEY_LEN
            ))
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let key = SecretKey::generate();
            write_key(path, &key)?;
            info!(path = %path.display(), "Created device master key");
            Ok(key)
        }
        Err(e) => Err(e.into()),
    }
}

fn write_key(path: &Path, key: &SecretKey) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(key.as_bytes())?;
    file.sync_all()?;

    #[cfg(not(unix))]
    tracing::warn!("Master key file permissions are not restricted on this platform");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("master.key");

        let first = load_or_create(&path).unwrap();
        let second = load_or_create(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read(&path).unwrap().len(), KEY_LEN);
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.key");
        load_or_create(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.key");
        fs::write(&path, b"short").unwrap();

        assert!(matches!(load_or_create(&path), Err(AppError::Config(_))));
    }
}
