//! # Store Encryption Migration
//!
//! Converts a legacy plaintext store into the encrypted layout, in place,
//! before anything else opens it.
//!
//! ## File Dance
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  item_database (plaintext)                                              │
//! │       │                                                                 │
//! │  1.   remove stale item_database-encrypting                            │
//! │  2.   encrypt_to ──► item_database-encrypting   (ids preserved)        │
//! │  3.   copy item_database ──► item_database-backup                      │
//! │  4.   rename item_database-encrypting ──► item_database   (atomic)     │
//! │  5.   remove item_database-backup                                      │
//! │                                                                         │
//! │  Steps 1-4 failing: canonical file is still the plaintext original.    │
//! │  Step 5 failing: canonical file is encrypted, backup lingers (logged). │
//! │                  Swept by remove_leftover_backup on the next open.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection, Row};
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::cipher::Passphrase;
use crate::error::{DbError, DbResult};
use crate::pool::{Database, DbConfig};
use crate::state::{detect_state, DatabaseState};
use inventory_core::{Item, ItemOrigin, Money};

/// Suffix of the in-progress encrypted copy.
pub const TEMP_SUFFIX: &str = "-encrypting";

/// Suffix of the copy kept while the swap happens.
pub const BACKUP_SUFFIX: &str = "-backup";

// =============================================================================
// File Operations
// =============================================================================

/// The file system calls the migration makes.
pub trait FileOps: Send + Sync {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// [`FileOps`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileOps;

impl FileOps for OsFileOps {
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::copy(from, to).map(|_| ())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// `<path><suffix>`, next to the store file.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_present(ops: &dyn FileOps, path: &Path) -> DbResult<()> {
    match ops.remove(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed stale file");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DbError::MigrationFailed(format!(
            "could not remove {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Deletes a plaintext `-backup` copy that a completed migration could not
/// remove. Only call once the canonical store has been unlocked.
///
/// Returns true when a backup was removed.
pub fn remove_leftover_backup(path: &Path, ops: &dyn FileOps) -> bool {
    let backup = sibling_path(path, BACKUP_SUFFIX);
    if !backup.exists() {
        return false;
    }

    match ops.remove(&backup) {
        Ok(()) => {
            warn!(backup = %backup.display(), "Removed plaintext backup left by an earlier migration");
            true
        }
        Err(e) => {
            error!(
                backup = %backup.display(),
                error = %e,
                "Plaintext backup still present and could not be removed"
            );
            false
        }
    }
}

// =============================================================================
// Migration
// =============================================================================

/// What [`ensure_encrypted`] found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Store was already encrypted; nothing touched.
    AlreadyEncrypted,
    /// No store yet; it will be created encrypted.
    Fresh,
    /// Legacy store was converted.
    Migrated { rows: u64 },
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationOutcome::AlreadyEncrypted => f.write_str("already encrypted"),
            MigrationOutcome::Fresh => f.write_str("fresh store"),
            MigrationOutcome::Migrated { rows } => write!(f, "migrated {} rows", rows),
        }
    }
}

/// Makes sure the store at `config.database_path` is encrypted.
///
/// ## Errors
/// - `MigrationFailed` when the copy or rename step fails; the message names
///   the paths and any backup is left on disk
/// - `UnrecognizedStore` when the file is not a SQLite database
pub async fn ensure_encrypted(
    config: &DbConfig,
    passphrase: &Passphrase,
    ops: &dyn FileOps,
) -> DbResult<MigrationOutcome> {
    if config.is_in_memory() {
        return Ok(MigrationOutcome::Fresh);
    }

    let path = &config.database_path;
    match detect_state(path).await? {
        DatabaseState::Encrypted => Ok(MigrationOutcome::AlreadyEncrypted),
        DatabaseState::DoesNotExist => Ok(MigrationOutcome::Fresh),
        DatabaseState::Unencrypted => {
            info!(path = %path.display(), "Encrypting legacy store");
            let rows = migrate(config, passphrase, ops).await?;
            info!(rows = rows, "Legacy store encrypted");
            Ok(MigrationOutcome::Migrated { rows })
        }
    }
}

async fn migrate(config: &DbConfig, passphrase: &Passphrase, ops: &dyn FileOps) -> DbResult<u64> {
    let path = config.database_path.as_path();
    let temp = sibling_path(path, TEMP_SUFFIX);
    let backup = sibling_path(path, BACKUP_SUFFIX);

    remove_if_present(ops, &temp)?;
    // A hot journal from an interrupted earlier attempt would be replayed
    // into the fresh temp file.
    remove_if_present(ops, &sibling_path(&temp, "-journal"))?;

    let rows = match encrypt_to(path, &temp, config, passphrase).await {
        Ok(rows) => rows,
        Err(e) => {
            let _ = remove_if_present(ops, &temp);
            return Err(e);
        }
    };

    if let Err(e) = ops.copy(path, &backup) {
        let _ = remove_if_present(ops, &temp);
        return Err(DbError::migration_step("copy", path, &backup, e));
    }

    ops.rename(&temp, path)
        .map_err(|e| DbError::migration_step("rename", &temp, path, e))?;

    if let Err(e) = ops.remove(&backup) {
        error!(
            backup = %backup.display(),
            error = %e,
            "Store encrypted but backup could not be removed"
        );
    }

    Ok(rows)
}

/// Writes every row of the plaintext store at `source` into a new
/// encrypted store at `target`, keeping identifiers.
///
/// The source is switched out of WAL mode first so its contents live in
/// the main file only.
pub async fn encrypt_to(
    source: &Path,
    target: &Path,
    config: &DbConfig,
    passphrase: &Passphrase,
) -> DbResult<u64> {
    let items = read_legacy_items(source).await?;
    debug!(count = items.len(), "Read legacy rows");

    let target_config = config
        .with_path(target)
        .journal_mode(SqliteJournalMode::Delete)
        .run_migrations(true);
    let db = Database::new(target_config, passphrase).await?;

    let written = db.items().insert_with_ids(&items).await;
    db.close().await;
    written
}

async fn read_legacy_items(source: &Path) -> DbResult<Vec<Item>> {
    let mut conn = SqliteConnectOptions::new()
        .filename(source)
        .create_if_missing(false)
        .connect()
        .await
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

    sqlx::query("PRAGMA journal_mode = DELETE")
        .execute(&mut conn)
        .await?;

    let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('item')")
        .fetch_all(&mut conn)
        .await?;

    if columns.is_empty() {
        conn.close().await?;
        return Ok(Vec::new());
    }

    let origin_column = if columns.iter().any(|c| c == "item_type_record") {
        "COALESCE(item_type_record, '')"
    } else {
        "''"
    };

    let sql = format!(
        r#"
        SELECT
            id,
            COALESCE(name, '') AS name,
            CAST(COALESCE(price, 0) AS REAL) AS price,
            CAST(COALESCE(quantity, 0) AS INTEGER) AS quantity,
            COALESCE(provider_name, '') AS provider_name,
            COALESCE(provider_email, '') AS provider_email,
            COALESCE(provider_phone_number, '') AS provider_phone_number,
            {} AS item_type_record
        FROM item
        ORDER BY id
        "#,
        origin_column
    );

    let rows = sqlx::query(&sql).fetch_all(&mut conn).await?;
    conn.close().await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let id: i64 = row.try_get("id")?;
        let price: f64 = row.try_get("price")?;
        let quantity: i64 = row.try_get("quantity")?;
        let origin: String = row.try_get("item_type_record")?;

        let price = Money::from_decimal(price).unwrap_or_else(|| {
            warn!(id = id, "Legacy price out of range, stored as zero");
            Money::zero()
        });
        let quantity = u32::try_from(quantity).unwrap_or_else(|_| {
            warn!(id = id, quantity = quantity, "Legacy quantity out of range, clamped");
            if quantity < 0 {
                0
            } else {
                u32::MAX
            }
        });

        items.push(Item {
            id,
            name: row.try_get("name")?,
            price,
            quantity,
            provider_name: row.try_get("provider_name")?,
            provider_email: row.try_get("provider_email")?,
            provider_phone: row.try_get("provider_phone_number")?,
            origin: legacy_origin(&origin),
        });
    }

    Ok(items)
}

fn legacy_origin(label: &str) -> ItemOrigin {
    if label.eq_ignore_ascii_case("file") {
        ItemOrigin::File
    } else {
        ItemOrigin::Form
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
