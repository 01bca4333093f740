//! # Store State Detection
//!
//! Classifies the file at the store path before anything opens it with the
//! encrypted schema.
//!
//! ```text
//! path missing ............................ DoesNotExist
//! 0 bytes ................................. Unencrypted (empty legacy file)
//! header != "SQLite format 3\0" ........... UnrecognizedStore error
//! SQLite file with a store_keyring table .. Encrypted
//! any other SQLite file ................... Unencrypted
//! ```

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// First 16 bytes of every SQLite 3 database file.
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// On-disk state of the store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseState {
    DoesNotExist,
    Unencrypted,
    Encrypted,
}

impl fmt::Display for DatabaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DatabaseState::DoesNotExist => "does not exist",
            DatabaseState::Unencrypted => "unencrypted",
            DatabaseState::Encrypted => "encrypted",
        };
        f.write_str(label)
    }
}

/// Inspects the file at `path`.
///
/// ## Errors
/// - `UnrecognizedStore` when the file is neither empty nor a SQLite database
/// - `Io` / `ConnectionFailed` when the file cannot be read
pub async fn detect_state(path: &Path) -> DbResult<DatabaseState> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(DatabaseState::DoesNotExist);
        }
        Err(e) => return Err(e.into()),
    };

    if metadata.len() == 0 {
        return Ok(DatabaseState::Unencrypted);
    }

    let mut header = [0u8; SQLITE_HEADER.len()];
    let header_ok = match File::open(path)?.read_exact(&mut header) {
        Ok(()) => &header == SQLITE_HEADER,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e.into()),
    };
    if !header_ok {
        return Err(DbError::UnrecognizedStore(format!(
            "{} is not a SQLite database",
            path.display()
        )));
    }

    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(false)
        .connect()
        .await
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

    let keyring_tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'store_keyring'",
    )
    .fetch_one(&mut conn)
    .await?;
    conn.close().await?;

    let state = if keyring_tables > 0 {
        DatabaseState::Encrypted
    } else {
        DatabaseState::Unencrypted
    };
    debug!(path = %path.display(), state = %state, "Detected store state");
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::Passphrase;
    use crate::pool::tests::test_config;
    use crate::pool::Database;

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = detect_state(&dir.path().join("item_database")).await.unwrap();
        assert_eq!(state, DatabaseState::DoesNotExist);
    }

    #[tokio::test]
    async fn test_empty_file_is_unencrypted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item_database");
        std::fs::write(&path, b"").unwrap();

        assert_eq!(detect_state(&path).await.unwrap(), DatabaseState::Unencrypted);
    }

    #[tokio::test]
    async fn test_foreign_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item_database");
        std::fs::write(&path, b"definitely not sqlite, just some bytes").unwrap();

        let err = detect_state(&path).await.unwrap_err();
        assert!(matches!(err, DbError::UnrecognizedStore(_)));

        std::fs::write(&path, b"short").unwrap();
        assert!(detect_state(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_plain_and_encrypted_sqlite() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("plain.db");
        let mut conn = SqliteConnectOptions::new()
            .filename(&plain)
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();
        sqlx::query("CREATE TABLE item (id INTEGER PRIMARY KEY, name TEXT)")
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
        assert_eq!(detect_state(&plain).await.unwrap(), DatabaseState::Unencrypted);

        let sealed = dir.path().join("sealed.db");
        let db = Database::new(test_config(&sealed), &Passphrase::new("pw"))
            .await
            .unwrap();
        db.close().await;
        assert_eq!(detect_state(&sealed).await.unwrap(), DatabaseState::Encrypted);
    }
}
