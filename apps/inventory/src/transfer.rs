//! # Import / Export
//!
//! Single-item JSON documents, sealed for the device that wrote them.
//!
//! ## File Layout
//! ```text
//! ┌────────┬─────────┬──────────────┬───────────┬──────────────────────────┐
//! │ "INVX" │ version │ salt (32)    │ nonce (12)│ AES-256-GCM(json) + tag  │
//! │ 4 B    │ 1 B     │ per file     │           │                          │
//! └────────┴─────────┴──────────────┴───────────┴──────────────────────────┘
//! file key = HKDF-SHA256(master key, salt, "inventory-export-v1")
//! ```
//!
//! ## Document
//! ```json
//! {
//!   "id": 3,
//!   "itemName": "Widget",
//!   "itemPrice": 9.99,
//!   "quantityInStock": 5,
//!   "providerName": "Acme",
//!   "providerEmail": "a@acme.com",
//!   "providerPhoneNumber": "+15551234567",
//!   "itemTypeRecord": "form"
//! }
//! ```
//! `id` and `itemTypeRecord` are written for reference and ignored on import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppResult, TransferError};
use inventory_core::{Item, ItemOrigin, Money, NEW_ITEM_ID};
use inventory_db::{cipher, SecretKey};

const MAGIC: &[u8; 4] = b"INVX";
const FORMAT_VERSION: u8 = 1;
const FILE_SALT_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + 1 + FILE_SALT_LEN;
const EXPORT_KEY_INFO: &[u8] = b"inventory-export-v1";

// =============================================================================
// Document
// =============================================================================

/// Interchange form of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub item_name: String,
    pub item_price: f64,
    pub quantity_in_stock: i64,
    pub provider_name: String,
    pub provider_email: String,
    pub provider_phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type_record: Option<String>,
}

impl ItemDocument {
    pub fn from_item(item: &Item) -> Self {
        ItemDocument {
            id: item.is_persisted().then_some(item.id),
            item_name: item.name.clone(),
            item_price: item.price.to_decimal(),
            quantity_in_stock: i64::from(item.quantity),
            provider_name: item.provider_name.clone(),
            provider_email: item.provider_email.clone(),
            provider_phone_number: item.provider_phone.clone(),
            item_type_record: Some(item.origin.as_str().to_string()),
        }
    }

    /// A new, unsaved item tagged as imported.
    pub fn into_item(self) -> Result<Item, TransferError> {
        let price = Money::from_decimal(self.item_price)
            .ok_or(TransferError::InvalidPrice(self.item_price))?;
        let quantity = u32::try_from(self.quantity_in_stock)
            .map_err(|_| TransferError::InvalidQuantity(self.quantity_in_stock))?;

        Ok(Item {
            id: NEW_ITEM_ID,
            name: self.item_name,
            price,
            quantity,
            provider_name: self.provider_name,
            provider_email: self.provider_email,
            provider_phone: self.provider_phone_number,
            origin: ItemOrigin::File,
        })
    }
}

// =============================================================================
// Sealing
// =============================================================================

fn file_key(master: &SecretKey, salt: &[u8]) -> Result<SecretKey, TransferError> {
    master
        .derive_subkey(Some(salt), EXPORT_KEY_INFO)
        .map_err(|e| TransferError::Seal(e.to_string()))
}

/// Encodes and seals a document into the export file format.
pub fn seal_document(master: &SecretKey, document: &ItemDocument) -> Result<Vec<u8>, TransferError> {
    let json = serde_json::to_vec(document)?;
    let salt: [u8; FILE_SALT_LEN] = cipher::random_salt();
    let body = cipher::seal(&file_key(master, &salt)?, &json)
        .map_err(|e| TransferError::Seal(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(MAGIC);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Checks the header, decrypts and decodes an export file.
pub fn open_document(master: &SecretKey, bytes: &[u8]) -> Result<ItemDocument, TransferError> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err(TransferError::BadMagic);
    }
    if bytes.len() < HEADER_LEN {
        return Err(TransferError::Truncated);
    }

    let version = bytes[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(TransferError::UnsupportedVersion(version));
    }

    let (header, body) = bytes.split_at(HEADER_LEN);
    let salt = &header[MAGIC.len() + 1..];
    if body.len() < cipher::NONCE_LEN {
        return Err(TransferError::Truncated);
    }

    let json =
        cipher::open(&file_key(master, salt)?, body).map_err(|_| TransferError::Decryption)?;
    Ok(serde_json::from_slice(&json)?)
}

// =============================================================================
// Files
// =============================================================================

/// What an export produced.
#[derive(Debug, Clone)]
pub struct ExportReceipt {
    pub export_id: Uuid,
    pub exported_at: DateTime<Utc>,
    pub destination: PathBuf,
    pub bytes: u64,
}

/// Default file name offered to the save dialog: the item name, made safe
/// for file systems, with a `.json` extension.
pub fn suggested_file_name(item: &Item) -> String {
    let stem: String = item
        .name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let stem = stem.trim();
    if stem.is_empty() {
        "item.json".to_string()
    } else {
        format!("{}.json", stem)
    }
}

/// Seals `item` in the cache directory, then copies it to `destination`.
pub fn export_item(
    item: &Item,
    master: &SecretKey,
    cache_dir: &Path,
    destination: &Path,
) -> AppResult<ExportReceipt> {
    let export_id = Uuid::new_v4();
    let sealed = seal_document(master, &ItemDocument::from_item(item))?;

    fs::create_dir_all(cache_dir)?;
    let staging = cache_dir.join(format!("{}.json.sealed", export_id));
    fs::write(&staging, &sealed)?;
    debug!(staging = %staging.display(), "Staged export");

    let copied = fs::copy(&staging, destination);
    if let Err(e) = fs::remove_file(&staging) {
        warn!(staging = %staging.display(), error = %e, "Could not remove staged export");
    }
    let bytes = copied?;

    let receipt = ExportReceipt {
        export_id,
        exported_at: Utc::now(),
        destination: destination.to_path_buf(),
        bytes,
    };
    info!(
        export_id = %receipt.export_id,
        item_id = item.id,
        bytes = receipt.bytes,
        "Exported item"
    );
    Ok(receipt)
}

/// Reads an export file and returns the item it holds, unsaved and tagged
/// [`ItemOrigin::File`].
pub fn import_item(source: &Path, master: &SecretKey) -> AppResult<Item> {
    let bytes = fs::read(source)?;
    let item = open_document(master, &bytes)?.into_item()?;
    info!(source = %source.display(), "Decoded imported item");
    Ok(item)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn widget() -> Item {
        Item {
            id: 3,
            name: "Widget".to_string(),
            price: Money::from_cents(999),
            quantity: 5,
            provider_name: "Acme".to_string(),
            provider_email: "a@acme.com".to_string(),
            provider_phone: "+15551234567".to_string(),
            origin: ItemOrigin::Form,
        }
    }

    #[test]
    fn test_export_then_import_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let master = SecretKey::generate();
        let destination = dir.path().join("Widget.json");

        let receipt = export_item(&widget(), &master, &dir.path().join("cache"), &destination)
            .unwrap();
        assert_eq!(receipt.destination, destination);
        assert!(receipt.bytes > HEADER_LEN as u64);

        let imported = import_item(&destination, &master).unwrap();
        let original = widget();
        assert_eq!(imported.name, original.name);
        assert_eq!(imported.price, original.price);
        assert_eq!(imported.quantity, original.quantity);
        assert_eq!(imported.provider_name, original.provider_name);
        assert_eq!(imported.provider_email, original.provider_email);
        assert_eq!(imported.provider_phone, original.provider_phone);
        assert_eq!(imported.id, NEW_ITEM_ID);
        assert_eq!(imported.origin, ItemOrigin::File);
    }

    #[test]
    fn test_staging_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("cache");
        export_item(
            &widget(),
            &SecretKey::generate(),
            &cache,
            &dir.path().join("out.json"),
        )
        .unwrap();

        assert_eq!(fs::read_dir(&cache).unwrap().count(), 0);
    }

    #[test]
    fn test_other_device_cannot_import() {
        let sealed = seal_document(&SecretKey::generate(), &ItemDocument::from_item(&widget()))
            .unwrap();
        let err = open_document(&SecretKey::generate(), &sealed).unwrap_err();
        assert!(matches!(err, TransferError::Decryption));
    }

    #[test]
    fn test_header_checks() {
        let master = SecretKey::generate();
        assert!(matches!(
            open_document(&master, b"{\"itemName\":\"x\"}"),
            Err(TransferError::BadMagic)
        ));
        assert!(matches!(
            open_document(&master, b"INVX\x01abc"),
            Err(TransferError::Truncated)
        ));

        let mut sealed = seal_document(&master, &ItemDocument::from_item(&widget())).unwrap();
        sealed[MAGIC.len()] = 9;
        assert!(matches!(
            open_document(&master, &sealed),
            Err(TransferError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_document_uses_interchange_names() {
        let json = serde_json::to_value(ItemDocument::from_item(&widget())).unwrap();
        assert_eq!(json["itemName"], "Widget");
        assert_eq!(json["itemPrice"], 9.99);
        assert_eq!(json["quantityInStock"], 5);
        assert_eq!(json["providerPhoneNumber"], "+15551234567");
    }

    #[test]
    fn test_document_without_optional_fields() {
        let doc: ItemDocument = serde_json::from_str(
            r#"{"itemName":"Gadget","itemPrice":0.5,"quantityInStock":2,
                "providerName":"Acme","providerEmail":"a@acme.com",
                "providerPhoneNumber":"555-1234"}"#,
        )
        .unwrap();
        let item = doc.into_item().unwrap();
        assert_eq!(item.price.cents(), 50);
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let mut doc = ItemDocument::from_item(&widget());
        doc.quantity_in_stock = -1;
        assert!(matches!(
            doc.into_item(),
            Err(TransferError::InvalidQuantity(-1))
        ));

        let mut doc = ItemDocument::from_item(&widget());
        doc.item_price = -2.0;
        assert!(matches!(doc.into_item(), Err(TransferError::InvalidPrice(_))));
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = import_item(&dir.path().join("nope.json"), &SecretKey::generate()).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }

    #[test]
    fn test_suggested_file_name() {
        assert_eq!(suggested_file_name(&widget()), "Widget.json");
        let odd = Item {
            name: "a/b:c".to_string(),
            ..widget()
        };
        assert_eq!(suggested_file_name(&odd), "a_b_c.json");
        let blank = Item {
            name: "   ".to_string(),
            ..widget()
        };
        assert_eq!(suggested_file_name(&blank), "item.json");
    }
}
