//! # Repository Module
//!
//! SQL for the encrypted store lives here and nowhere else.
//!
//! ```text
//! ItemStore (write gate, observers)
//!      │  items().insert(&item)
//!      ▼
//! ItemRepository ── seal / open payloads ── SQLite `item` table
//! ```
//!
//! ## Available Repositories
//!
//! - [`ItemRepository`](item::ItemRepository) - sealed item rows

pub mod item;
