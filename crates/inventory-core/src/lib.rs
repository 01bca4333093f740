//! # inventory-core: Pure Domain Logic for the Inventory Tracker
//!
//! This crate holds everything about an inventory item that does not touch
//! a disk, a key or a runtime.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Inventory Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Screens (external collaborators)                │   │
//! │  │    Item list ──► Item detail ──► Add / Edit form ──► Settings   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          inventory-app (view-model, transfer, config)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ inventory-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────────────────────┐  │   │
//! │  │   │   item    │  │   money   │  │        validation         │  │   │
//! │  │   │   Item    │  │   Money   │  │  ItemEntry → ItemDraft    │  │   │
//! │  │   │ ItemOrigin│  │  parsing  │  │  email / phone patterns   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO KEYS • PURE FUNCTIONS               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               inventory-db (encrypted item store)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`item`] - The `Item` record and its origin tag
//! - [`money`] - Integer-cent price type with decimal parsing
//! - [`validation`] - The entry gate used before create/update
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use inventory_core::validation::{is_entry_valid, ItemEntry};
//!
//! let entry = ItemEntry::new("Widget", "9.99", "5", "Acme", "a@acme.com", "+15551234567");
//! assert!(is_entry_valid(&entry));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod item;
pub mod money;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use item::{Item, ItemOrigin, NEW_ITEM_ID};
pub use money::Money;
pub use validation::{
    is_entry_valid, validate_entry, validate_item, ItemDraft, ItemEntry, ValidationResult,
};
