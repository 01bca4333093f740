//! # Store Opener
//!
//! One-shot initialization of the item store.
//!
//! ```text
//! caller A ─┐
//! caller B ─┼─► StoreOpener::open() ──► OnceCell::get_or_try_init
//! caller C ─┘                               │ (first caller only)
//!                                           ├── ensure_encrypted
//!                                           ├── Database::new (unlock)
//!                                           ├── remove_leftover_backup
//!                                           └── ItemStore::new
//!                                           │
//!            every caller ◄── clone of the same ItemStore
//! ```
//!
//! A failed initialization is not cached; the next `open()` starts over.

use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::cipher::Passphrase;
use crate::encryption::{ensure_encrypted, remove_leftover_backup, FileOps, OsFileOps};
use crate::error::DbResult;
use crate::pool::{Database, DbConfig};
use crate::store::ItemStore;

/// Opens the store at most once and hands out clones of it.
pub struct StoreOpener {
    config: DbConfig,
    passphrase: Passphrase,
    file_ops: Arc<dyn FileOps>,
    store: OnceCell<ItemStore>,
}

impl StoreOpener {
    pub fn new(config: DbConfig, passphrase: Passphrase) -> Self {
        StoreOpener {
            config,
            passphrase,
            file_ops: Arc::new(OsFileOps),
            store: OnceCell::new(),
        }
    }

    /// Replaces the file system seam used by the encryption migration.
    pub fn with_file_ops(mut self, file_ops: Arc<dyn FileOps>) -> Self {
        self.file_ops = file_ops;
        self
    }

    /// Returns the store, migrating and unlocking it on first call.
    pub async fn open(&self) -> DbResult<ItemStore> {
        let store = self.store.get_or_try_init(|| self.initialize()).await?;
        Ok(store.clone())
    }

    /// The store if it has been opened already.
    pub fn get(&self) -> Option<&ItemStore> {
        self.store.get()
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    async fn initialize(&self) -> DbResult<ItemStore> {
        let outcome =
            ensure_encrypted(&self.config, &self.passphrase, self.file_ops.as_ref()).await?;
        info!(outcome = %outcome, "Store encryption state checked");

        let db = Database::new(self.config.clone(), &self.passphrase).await?;
        if !self.config.is_in_memory() {
            remove_leftover_backup(&self.config.database_path, self.file_ops.as_ref());
        }
        Ok(ItemStore::new(db))
    }
}

impl fmt::Debug for StoreOpener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOpener")
            .field("config", &self.config)
            .field("opened", &self.store.initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::tests::{write_legacy_store, RecordingOps};
    use crate::encryption::{sibling_path, MigrationOutcome, BACKUP_SUFFIX};
    use crate::error::DbError;
    use crate::pool::tests::test_config;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_concurrent_opens_migrate_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item_database");
        write_legacy_store(&path, &[(1, "Widget", 9.99, 5)]).await;

        let ops = Arc::new(RecordingOps::default());
        let opener = Arc::new(
            StoreOpener::new(test_config(&path), Passphrase::new("pw"))
                .with_file_ops(ops.clone()),
        );

        let mut handles = Vec::new();
        for _ in 0..8 {
            let opener = Arc::clone(&opener);
            handles.push(tokio::spawn(async move { opener.open().await }));
        }

        let mut stores = Vec::new();
        for handle in handles {
            stores.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(ops.renames.load(Ordering::SeqCst), 1);
        assert!(stores.iter().all(|s| s.ptr_eq(&stores[0])));
        assert_eq!(stores[0].count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_open_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item_database");

        let db = Database::new(test_config(&path), &Passphrase::new("right"))
            .await
            .unwrap();
        db.close().await;

        let wrong = StoreOpener::new(test_config(&path), Passphrase::new("wrong"));
        assert!(matches!(wrong.open().await, Err(DbError::WrongPassphrase)));
        assert!(matches!(wrong.open().await, Err(DbError::WrongPassphrase)));
        assert!(wrong.get().is_none());

        let right = StoreOpener::new(test_config(&path), Passphrase::new("right"));
        let store = right.open().await.unwrap();
        assert!(right.get().unwrap().ptr_eq(&store));
    }

    #[tokio::test]
    async fn test_open_sweeps_backup_left_by_migration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item_database");
        let backup = sibling_path(&path, BACKUP_SUFFIX);
        write_legacy_store(&path, &[(1, "Widget", 9.99, 5)]).await;

        let stuck = RecordingOps {
            fail_remove_backup: true,
            ..RecordingOps::default()
        };
        let outcome = ensure_encrypted(&test_config(&path), &Passphrase::new("pw"), &stuck)
            .await
            .unwrap();
        assert_eq!(outcome, MigrationOutcome::Migrated { rows: 1 });
        assert!(backup.exists());

        let opener = StoreOpener::new(test_config(&path), Passphrase::new("pw"));
        let store = opener.open().await.unwrap();
        assert!(!backup.exists());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_wrong_passphrase_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item_database");
        let backup = sibling_path(&path, BACKUP_SUFFIX);

        let db = Database::new(test_config(&path), &Passphrase::new("right"))
            .await
            .unwrap();
        db.close().await;
        std::fs::write(&backup, b"plaintext copy").unwrap();

        let wrong = StoreOpener::new(test_config(&path), Passphrase::new("wrong"));
        assert!(wrong.open().await.is_err());
        assert!(backup.exists());
    }
}
