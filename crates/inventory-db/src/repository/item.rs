//! # Item Repository
//!
//! Database operations for sealed item rows.
//!
//! ## Row Layout
//! ```text
//! ┌──────┬──────────────────────────────────────────────────────────────┐
//! │ id   │ payload                                                      │
//! ├──────┼──────────────────────────────────────────────────────────────┤
//! │ 1    │ nonce(12) ‖ AES-GCM( {"name":"Widget","price":999,...} )     │
//! │ 2    │ nonce(12) ‖ AES-GCM( {...} )                                 │
//! └──────┴──────────────────────────────────────────────────────────────┘
//! ```
//! Only the identifier is stored in clear. Everything else, including the
//! origin tag, is inside the sealed JSON.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use crate::cipher::{self, SecretKey};
use crate::error::{DbError, DbResult};
use inventory_core::{Item, ItemOrigin, Money};

const ENTITY: &str = "Item";

/// Sealed row contents.
#[derive(Debug, Serialize, Deserialize)]
struct ItemPayload {
    name: String,
    price: Money,
    quantity: u32,
    provider_name: String,
    provider_email: String,
    provider_phone: String,
    #[serde(default)]
    origin: ItemOrigin,
}

impl ItemPayload {
    fn from_item(item: &Item) -> Self {
        ItemPayload {
            name: item.name.clone(),
            price: item.price,
            quantity: item.quantity,
            provider_name: item.provider_name.clone(),
            provider_email: item.provider_email.clone(),
            provider_phone: item.provider_phone.clone(),
            origin: item.origin,
        }
    }

    fn into_item(self, id: i64) -> Item {
        Item {
            id,
            name: self.name,
            price: self.price,
            quantity: self.quantity,
            provider_name: self.provider_name,
            provider_email: self.provider_email,
            provider_phone: self.provider_phone,
            origin: self.origin,
        }
    }
}

/// Repository for item rows.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.items();
/// let saved = repo.insert(&item).await?;
/// let again = repo.get_by_id(saved.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
    key: Arc<SecretKey>,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool, key: Arc<SecretKey>) -> Self {
        ItemRepository { pool, key }
    }

    fn seal(&self, item: &Item) -> DbResult<Vec<u8>> {
        let json = serde_json::to_vec(&ItemPayload::from_item(item))?;
        cipher::seal(&self.key, &json)
    }

    fn open(&self, id: i64, payload: &[u8]) -> DbResult<Item> {
        let json = cipher::open(&self.key, payload)
            .map_err(|e| DbError::Decryption(format!("item {}: {}", id, e)))?;
        let payload: ItemPayload = serde_json::from_slice(&json)?;
        Ok(payload.into_item(id))
    }

    /// Inserts a new row; the store assigns the identifier.
    ///
    /// Any identifier already on `item` is ignored.
    pub async fn insert(&self, item: &Item) -> DbResult<Item> {
        let payload = self.seal(item)?;

        let id = sqlx::query("INSERT INTO item (payload) VALUES (?1)")
            .bind(payload)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        debug!(id = id, "Inserted item");
        Ok(Item {
            id,
            ..item.clone()
        })
    }

    /// Inserts rows keeping their existing identifiers, in one transaction.
    ///
    /// Used when re-encrypting a legacy store.
    pub async fn insert_with_ids(&self, items: &[Item]) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for item in items {
            let payload = self.seal(item)?;
            written += sqlx::query("INSERT INTO item (id, payload) VALUES (?1, ?2)")
                .bind(item.id)
                .bind(payload)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;
        debug!(count = written, "Inserted items with identifiers");
        Ok(written)
    }

    /// Replaces the row with `item.id`.
    ///
    /// ## Errors
    /// - `NotFound` when no row has that identifier
    pub async fn update(&self, item: &Item) -> DbResult<()> {
        let payload = self.seal(item)?;

        let result = sqlx::query("UPDATE item SET payload = ?1 WHERE id = ?2")
            .bind(payload)
            .bind(item.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, item.id));
        }

        debug!(id = item.id, "Updated item");
        Ok(())
    }

    /// Deletes the row with `id`.
    ///
    /// ## Errors
    /// - `NotFound` when no row has that identifier
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM item WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, id));
        }

        debug!(id = id, "Deleted item");
        Ok(())
    }

    /// Gets an item by its identifier.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Item>> {
        let row: Option<(i64, Vec<u8>)> =
            sqlx::query_as("SELECT id, payload FROM item WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(id, payload)| self.open(id, &payload)).transpose()
    }

    /// Lists every item in insertion order.
    pub async fn list(&self) -> DbResult<Vec<Item>> {
        let rows: Vec<(i64, Vec<u8>)> = sqlx::query_as("SELECT id, payload FROM item ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|(id, payload)| self.open(*id, payload))
            .collect()
    }

    /// Number of rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM item")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::Passphrase;
    use crate::pool::tests::FAST_KDF;
    use crate::pool::{Database, DbConfig};
    use inventory_core::NEW_ITEM_ID;

    fn widget() -> Item {
        Item {
            id: NEW_ITEM_ID,
            name: "Widget".to_string(),
            price: Money::from_cents(999),
            quantity: 5,
            provider_name: "Acme".to_string(),
            provider_email: "a@acme.com".to_string(),
            provider_phone: "+15551234567".to_string(),
            origin: ItemOrigin::Form,
        }
    }

    async fn repo() -> ItemRepository {
        let config = DbConfig::in_memory().kdf(FAST_KDF);
        Database::new(config, &Passphrase::new("pw"))
            .await
            .unwrap()
            .items()
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_in_order() {
        let repo = repo().await;

        let first = repo.insert(&widget()).await.unwrap();
        let second = repo.insert(&widget()).await.unwrap();
        assert!(first.id > 0);
        assert!(second.id > first.id);

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], first);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = repo().await;
        let saved = repo.insert(&widget()).await.unwrap();

        let edited = Item {
            quantity: 4,
            ..saved.clone()
        };
        repo.update(&edited).await.unwrap();
        assert_eq!(repo.get_by_id(saved.id).await.unwrap(), Some(edited));

        repo.delete(saved.id).await.unwrap();
        assert_eq!(repo.get_by_id(saved.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_id_is_not_found() {
        let repo = repo().await;
        let ghost = Item {
            id: 42,
            ..widget()
        };

        assert!(matches!(
            repo.update(&ghost).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(repo.delete(42).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_rows_are_sealed() {
        let repo = repo().await;
        repo.insert(&widget()).await.unwrap();

        let payload: Vec<u8> = sqlx::query_scalar("SELECT payload FROM item")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        let needle = b"Widget";
        assert!(!payload.windows(needle.len()).any(|w| w == needle));
    }

    #[tokio::test]
    async fn test_insert_with_ids_preserves_identifiers() {
        let repo = repo().await;
        let rows = vec![
            Item { id: 7, ..widget() },
            Item {
                id: 9,
                origin: ItemOrigin::File,
                ..widget()
            },
        ];

        assert_eq!(repo.insert_with_ids(&rows).await.unwrap(), 2);
        assert_eq!(repo.list().await.unwrap(), rows);

        let next = repo.insert(&widget()).await.unwrap();
        assert_eq!(next.id, 10);
    }
}
