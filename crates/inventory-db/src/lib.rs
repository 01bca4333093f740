//! # inventory-db: Encrypted Item Store
//!
//! Persistence for the inventory tracker: a SQLite file (via sqlx) whose
//! item rows are sealed with a passphrase-derived key.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Inventory Data Flow                              │
//! │                                                                         │
//! │  View-model worker (inventory-app)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   inventory-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │  StoreOpener ──► encryption (legacy file?) ──► Database        │   │
//! │  │       │                                          │              │   │
//! │  │       ▼                                          ▼              │   │
//! │  │  ItemStore ── write gate ── ItemRepository ── cipher            │   │
//! │  │       │                                                         │   │
//! │  │       └── ChangeFeed ──► Subscription (live views)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  <data dir>/item_database                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`cipher`] - Argon2id / HKDF key derivation, AES-GCM sealing
//! - [`pool`] - Connection pool creation and keyring unlock
//! - [`migrations`] - Embedded schema migrations
//! - [`state`] - Detects whether the store file is encrypted
//! - [`encryption`] - Converts a legacy plaintext store in place
//! - [`opener`] - One-shot store initialization
//! - [`store`] - CRUD and live views
//! - [`watch`] - Observer registry and subscription handles
//! - [`repository`] - SQL for sealed rows
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use inventory_db::{DbConfig, Passphrase, StoreOpener};
//!
//! let opener = StoreOpener::new(DbConfig::new(path), Passphrase::new(secret));
//! let store = opener.open().await?;
//! let _sub = store.watch_items(|items| println!("{} items", items.len())).await?;
//! store.insert(&item).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cipher;
pub mod encryption;
pub mod error;
pub mod migrations;
pub mod opener;
pub mod pool;
pub mod repository;
pub mod state;
pub mod store;
pub mod watch;

// =============================================================================
// Re-exports
// =============================================================================

pub use cipher::{KdfParams, Passphrase, SecretKey};
pub use encryption::{ensure_encrypted, FileOps, MigrationOutcome, OsFileOps};
pub use error::{DbError, DbResult};
pub use opener::StoreOpener;
pub use pool::{Database, DbConfig};
pub use repository::item::ItemRepository;
pub use state::{detect_state, DatabaseState};
pub use store::ItemStore;
pub use watch::{ChangeFeed, Subscription};
