//! # Database Pool Management
//!
//! Connection pool creation and store unlocking for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Opening an Encrypted Store                         │
//! │                                                                         │
//! │  DbConfig::new(path) ← Configure pool + KDF settings                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config, &passphrase).await                              │
//! │       │                                                                 │
//! │       ├── create pool (file created if missing)                        │
//! │       ├── run schema migrations (store_keyring, item)                  │
//! │       └── unlock keyring                                               │
//! │             ├── no row yet? new salt → derive key → write key check    │
//! │             └── row present? derive with stored salt/params            │
//! │                    └── key check opens? ok : WrongPassphrase           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database { SqlitePool, store key } → db.items()                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Journal Mode
//! Stores open in WAL mode by default. The encryption migration writes its
//! temporary copy with `DELETE` so that no `-wal` sidecar is left behind
//! when the file is renamed into place.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cipher::{self, KdfParams, Passphrase, SecretKey, SALT_LEN, STORE_CIPHER};
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::item::ItemRepository;

/// Plaintext sealed into `store_keyring.key_check`.
const KEY_CHECK: &[u8] = b"inventory-store-key-check-v1";

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/item_database")
///     .max_connections(5)
///     .kdf(KdfParams::default());
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run schema migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// SQLite journal mode.
    /// Default: WAL
    pub journal_mode: SqliteJournalMode,

    /// Argon2id parameters used when this store's keyring is first created.
    pub kdf: KdfParams,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            journal_mode: SqliteJournalMode::Wal,
            kdf: KdfParams::default(),
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets the journal mode.
    pub fn journal_mode(mut self, mode: SqliteJournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    /// Sets the key derivation cost.
    pub fn kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// Same settings pointed at a different file.
    pub fn with_path(&self, path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            ..self.clone()
        }
    }

    /// Creates an in-memory database configuration (for testing).
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
            journal_mode: SqliteJournalMode::Memory,
            kdf: KdfParams::default(),
        }
    }

    /// True for the `:memory:` configuration.
    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(MEMORY_PATH)
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let base = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
        };

        Ok(base
            .journal_mode(self.journal_mode)
            // NORMAL synchronous: durable enough for a local single-user store
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Unlocked store handle: the connection pool plus the derived store key.
///
/// Cloning is cheap; clones share the pool and the key.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    key: Arc<SecretKey>,
}

impl Database {
    /// Opens (creating if needed) and unlocks an encrypted store.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Creates the connection pool
    /// 3. Runs schema migrations (if enabled)
    /// 4. Creates the keyring on first use, or verifies the passphrase
    ///    against the stored key check
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError::WrongPassphrase)` - Keyring exists and the passphrase
    ///   does not open it
    /// * `Err(DbError)` - Connection or migration failed
    pub async fn new(config: DbConfig, passphrase: &Passphrase) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        if config.run_migrations {
            info!("Running database migrations");
            migrations::run_migrations(&pool).await?;
        }

        let key = match unlock(&pool, passphrase, config.kdf).await {
            Ok(key) => key,
            Err(e) => {
                pool.close().await;
                return Err(e);
            }
        };

        Ok(Database {
            pool,
            key: Arc::new(key),
        })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the item repository.
    pub fn items(&self) -> ItemRepository {
        ItemRepository::new(self.pool.clone(), Arc::clone(&self.key))
    }

    /// Closes the database connection pool.
    ///
    /// ## Note
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Keyring
// =============================================================================

type KeyringRow = (Vec<u8>, i64, i64, i64, Vec<u8>);

/// Derives the store key, creating the keyring row on first use.
async fn unlock(pool: &SqlitePool, passphrase: &Passphrase, kdf: KdfParams) -> DbResult<SecretKey> {
    let row: Option<KeyringRow> = sqlx::query_as(
        r#"
        SELECT kdf_salt, kdf_m_cost, kdf_t_cost, kdf_p_cost, key_check
        FROM store_keyring
        WHERE id = 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    match row {
        Some((salt, m_cost, t_cost, p_cost, key_check)) => {
            let params = KdfParams::new(
                cost_param(m_cost)?,
                cost_param(t_cost)?,
                cost_param(p_cost)?,
            );
            let key = cipher::derive_store_key(passphrase, &salt, params)?;

            match cipher::open(&key, &key_check) {
                Ok(check) if check == KEY_CHECK => {
                    debug!("Store keyring verified");
                    Ok(key)
                }
                _ => {
                    warn!("Store key check failed");
                    Err(DbError::WrongPassphrase)
                }
            }
        }
        None => {
            let salt: [u8; SALT_LEN] = cipher::random_salt();
            let key = cipher::derive_store_key(passphrase, &salt, kdf)?;
            let key_check = cipher::seal(&key, KEY_CHECK)?;

            sqlx::query(
                r#"
                INSERT INTO store_keyring (
                    id, cipher, kdf_salt, kdf_m_cost, kdf_t_cost, kdf_p_cost, key_check, created_at
                ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(STORE_CIPHER)
            .bind(&salt[..])
            .bind(i64::from(kdf.m_cost))
            .bind(i64::from(kdf.t_cost))
            .bind(i64::from(kdf.p_cost))
            .bind(key_check)
            .bind(Utc::now().to_rfc3339())
            .execute(pool)
            .await?;

            info!(
                m_cost = kdf.m_cost,
                t_cost = kdf.t_cost,
                "Created store keyring"
            );
            Ok(key)
        }
    }
}

fn cost_param(value: i64) -> DbResult<u32> {
    u32::try_from(value)
        .map_err(|_| DbError::UnrecognizedStore(format!("invalid KDF parameter {}", value)))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const FAST_KDF: KdfParams = KdfParams::new(8, 1, 1);

    pub(crate) fn test_config(path: impl Into<PathBuf>) -> DbConfig {
        DbConfig::new(path).kdf(FAST_KDF)
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let config = DbConfig::in_memory().kdf(FAST_KDF);
        let db = Database::new(config, &Passphrase::new("pw")).await.unwrap();

        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .journal_mode(SqliteJournalMode::Delete);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(matches!(config.journal_mode, SqliteJournalMode::Delete));
        assert!(!config.is_in_memory());
        assert_eq!(config.with_path("/tmp/other.db").max_connections, 10);
    }

    #[tokio::test]
    async fn test_reopen_with_same_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item_database");

        let db = Database::new(test_config(&path), &Passphrase::new("pw"))
            .await
            .unwrap();
        db.close().await;

        let db = Database::new(test_config(&path), &Passphrase::new("pw"))
            .await
            .unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_wrong_passphrase_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item_database");

        let db = Database::new(test_config(&path), &Passphrase::new("pw"))
            .await
            .unwrap();
        db.close().await;

        let err = Database::new(test_config(&path), &Passphrase::new("not it"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::WrongPassphrase));
    }
}
