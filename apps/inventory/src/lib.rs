//! # Inventory Application Core
//!
//! Everything the screens need, wired together once at startup.
//!
//! ## Module Organization
//! ```text
//! inventory_app/
//! ├── lib.rs          ◄─── You are here (composition root & tracing)
//! ├── config.rs       ◄─── AppConfig: defaults → TOML → environment
//! ├── keystore.rs     ◄─── Device master key
//! ├── preferences.rs  ◄─── Sealed user preferences
//! ├── view_model.rs   ◄─── Screen operations + store worker
//! ├── transfer.rs     ◄─── Sealed JSON import / export
//! ├── detail.rs       ◄─── Detail view strings
//! └── error.rs        ◄─── AppError / TransferError
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. AppConfig::load          defaults, inventory.toml, INVENTORY_*      │
//! │  2. ensure_dirs              data + cache directories                   │
//! │  3. keystore                 load or create master.key                  │
//! │  4. Preferences::load        preferences.toml.sealed or defaults        │
//! │  5. StoreOpener::open        migrate plaintext store, unlock, pool      │
//! │  6. InventoryViewModel::new  spawn the store worker                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod detail;
pub mod error;
pub mod keystore;
pub mod preferences;
pub mod transfer;
pub mod view_model;

use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

pub use config::AppConfig;
pub use detail::ItemDetail;
pub use error::{AppError, AppResult, TransferError};
pub use preferences::Preferences;
pub use transfer::ExportReceipt;
pub use view_model::InventoryViewModel;

use inventory_core::{Item, ItemEntry};
use inventory_db::{ItemStore, SecretKey, StoreOpener};

/// Installs the global fmt subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=inventory_db=trace` - Trace the store only
/// - Default: `info,inventory=debug,sqlx=warn`
///
/// Calling it again after a subscriber is installed does nothing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,inventory=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .try_init();
}

/// The composition root: configuration, keys, preferences and the opened
/// store, owned in one place and lent out by reference.
pub struct Inventory {
    config: AppConfig,
    master: SecretKey,
    preferences: Preferences,
    opener: StoreOpener,
    view_model: InventoryViewModel,
}

impl Inventory {
    /// Runs the startup sequence. Must be called inside a tokio runtime.
    pub async fn bootstrap(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        config.ensure_dirs()?;

        let master = keystore::load_or_create(&config.master_key_path())?;
        let preferences = Preferences::load(&config.preferences_path(), &master)?;

        let opener = StoreOpener::new(config.db_config(), config.passphrase()?);
        let store = opener.open().await?;
        let view_model = InventoryViewModel::new(store);

        info!(store = %config.store_path().display(), "Inventory ready");

        Ok(Inventory {
            config,
            master,
            preferences,
            opener,
            view_model,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn view_model(&self) -> &InventoryViewModel {
        &self.view_model
    }

    pub fn store(&self) -> &ItemStore {
        self.view_model.store()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Persists `preferences` and makes them current.
    pub fn save_preferences(&mut self, preferences: Preferences) -> AppResult<()> {
        preferences.save(&self.config.preferences_path(), &self.master)?;
        self.preferences = preferences;
        Ok(())
    }

    /// A blank add-item form, prefilled per preferences.
    pub fn new_item_entry(&self) -> ItemEntry {
        self.preferences.prefill_entry()
    }

    pub fn detail(&self, item: &Item) -> ItemDetail {
        ItemDetail::render(item, &self.preferences)
    }

    /// Text for the share sheet, or `None` when sharing is forbidden.
    pub fn share_text(&self, item: &Item) -> Option<String> {
        self.preferences
            .sharing_allowed()
            .then(|| item.share_text())
    }

    pub fn suggested_export_name(&self, item: &Item) -> String {
        transfer::suggested_file_name(item)
    }

    /// Seals `item` and writes it to `destination`.
    pub fn export_item(&self, item: &Item, destination: &Path) -> AppResult<ExportReceipt> {
        transfer::export_item(item, &self.master, &self.config.cache_dir, destination)
    }

    /// Decodes an export file and queues its item as a new record.
    ///
    /// Returns the decoded item (not yet carrying a store identifier).
    pub fn import_item(&self, source: &Path) -> AppResult<Item> {
        let item = transfer::import_item(source, &self.master)?;
        self.view_model.add_imported_item(item.clone())?;
        Ok(item)
    }

    /// Waits for queued writes, then closes the store.
    pub async fn shutdown(self) {
        self.view_model.idle().await;
        if let Some(store) = self.opener.get() {
            store.close().await;
        }
        info!("Inventory shut down");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
