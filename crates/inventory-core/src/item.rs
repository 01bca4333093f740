//! # Item Types
//!
//! The inventory record and its origin tag.
//!
//! ## Item Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Item                                       │
//! │                                                                         │
//! │  id ............ i64, assigned by the store (0 = not yet persisted)    │
//! │  name .......... "Widget"                                              │
//! │  price ......... Money (cents)                                         │
//! │  quantity ...... u32, never negative                                   │
//! │  provider_* .... name / email / phone of the supplier                  │
//! │  origin ........ Form (typed in) | File (imported)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// Identifier carried by an item that has not been inserted yet.
pub const NEW_ITEM_ID: i64 = 0;

// =============================================================================
// Item Origin
// =============================================================================

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemOrigin {
    /// Created through the add-item form.
    #[default]
    Form,
    /// Decoded from an imported file.
    File,
}

impl ItemOrigin {
    /// Stable lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOrigin::Form => "form",
            ItemOrigin::File => "file",
        }
    }
}

impl fmt::Display for ItemOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Item
// =============================================================================

/// A single inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Item {
    /// Store-assigned identifier; [`NEW_ITEM_ID`] until inserted.
    #[ts(type = "number")]
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Unit price.
    pub price: Money,

    /// Units in stock.
    pub quantity: u32,

    /// Supplier name (or organisation).
    pub provider_name: String,

    /// Supplier email.
    pub provider_email: String,

    /// Supplier phone number.
    pub provider_phone: String,

    /// Form-created or imported.
    pub origin: ItemOrigin,
}

impl Item {
    /// Returns true once the store has assigned an identifier.
    #[inline]
    pub fn is_persisted(&self) -> bool {
        self.id != NEW_ITEM_ID
    }

    /// Returns true when at least one unit can be sold.
    #[inline]
    pub fn is_stock_available(&self) -> bool {
        self.quantity > 0
    }

    /// Returns a copy with one unit fewer in stock.
    ///
    /// ## Errors
    /// - `OutOfStock` when quantity is already zero (the quantity is never
    ///   driven below zero)
    pub fn sold_one(&self) -> CoreResult<Item> {
        let quantity = self
            .quantity
            .checked_sub(1)
            .ok_or(CoreError::OutOfStock { id: self.id })?;

        Ok(Item {
            quantity,
            ..self.clone()
        })
    }

    /// Returns a copy tagged with a different origin and no identifier,
    /// ready to be inserted as a new record.
    pub fn as_new(&self, origin: ItemOrigin) -> Item {
        Item {
            id: NEW_ITEM_ID,
            origin,
            ..self.clone()
        }
    }

    /// Human-readable summary handed to the share sheet.
    ///
    /// ## Example
    /// ```rust
    /// use inventory_core::{Item, ItemOrigin, Money};
    ///
    /// let item = Item {
    ///     id: 1,
    ///     name: "Widget".into(),
    ///     price: Money::from_cents(999),
    ///     quantity: 5,
    ///     provider_name: "Acme".into(),
    ///     provider_email: "a@acme.com".into(),
    ///     provider_phone: "+15551234567".into(),
    ///     origin: ItemOrigin::Form,
    /// };
    /// assert!(item.share_text().starts_with("Item details:\nName: Widget\n"));
    /// ```
    pub fn share_text(&self) -> String {
        format!(
            "Item details:\n\
             Name: {}\n\
             Price: {}\n\
             Quantity in stock: {}\n\
             \n\
             Provider details:\n\
             Name (organisation): {}\n\
             Email: {}\n\
             Phone number: {}",
            self.name,
            self.price,
            self.quantity,
            self.provider_name,
            self.provider_email,
            self.provider_phone
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(quantity: u32) -> Item {
        Item {
            id: 3,
            name: "Widget".to_string(),
            price: Money::from_cents(999),
            quantity,
            provider_name: "Acme".to_string(),
            provider_email: "a@acme.com".to_string(),
            provider_phone: "+15551234567".to_string(),
            origin: ItemOrigin::Form,
        }
    }

    #[test]
    fn test_sold_one_decrements_by_exactly_one() {
        for quantity in [1_u32, 2, 5, 1000] {
            let sold = widget(quantity).sold_one().unwrap();
            assert_eq!(sold.quantity, quantity - 1);
            assert_eq!(sold.id, 3);
            assert_eq!(sold.name, "Widget");
        }
    }

    #[test]
    fn test_sold_one_at_zero_is_out_of_stock() {
        let err = widget(0).sold_one().unwrap_err();
        assert!(matches!(err, CoreError::OutOfStock { id: 3 }));
    }

    #[test]
    fn test_stock_availability() {
        assert!(widget(1).is_stock_available());
        assert!(!widget(0).is_stock_available());
    }

    #[test]
    fn test_as_new_resets_identity() {
        let imported = widget(2).as_new(ItemOrigin::File);
        assert!(!imported.is_persisted());
        assert_eq!(imported.origin, ItemOrigin::File);
        assert_eq!(imported.quantity, 2);
    }

    #[test]
    fn test_share_text_lists_every_field() {
        let text = widget(5).share_text();
        assert!(text.contains("Price: $9.99"));
        assert!(text.contains("Quantity in stock: 5"));
        assert!(text.contains("Email: a@acme.com"));
        assert!(text.ends_with("Phone number: +15551234567"));
    }

    #[test]
    fn test_origin_serialization() {
        assert_eq!(serde_json::to_string(&ItemOrigin::File).unwrap(), "\"file\"");
        assert_eq!(ItemOrigin::default(), ItemOrigin::Form);
    }
}
