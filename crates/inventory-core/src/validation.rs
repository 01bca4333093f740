//! # Validation Module
//!
//! The entry gate for item data.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Where Items Come From                              │
//! │                                                                         │
//! │  Add / Edit form                     Imported file                     │
//! │  six raw strings (ItemEntry)         decoded Item                      │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  validate_entry() ← THIS MODULE      validate_item() ← THIS MODULE     │
//! │       │  blank? number? email? phone?     │  same field rules           │
//! │       ▼                                   ▼                             │
//! │  ItemDraft (typed fields)            Item (unchanged)                  │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │               view-model → store                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use inventory_core::validation::{validate_entry, ItemEntry};
//!
//! let entry = ItemEntry::new("Widget", "9.99", "5", "Acme", "a@acme.com", "+15551234567");
//! let draft = validate_entry(&entry).unwrap();
//! assert_eq!(draft.price.cents(), 999);
//! assert_eq!(draft.quantity, 5);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::item::{Item, ItemOrigin, NEW_ITEM_ID};
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Patterns
// =============================================================================

/// Email addresses: local part, `@`, at least one dotted domain label.
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9+._%\-]{1,256}@[a-zA-Z0-9][a-zA-Z0-9\-]{0,64}(\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,25})+$",
    )
    .unwrap_or_else(|e| panic!("email pattern must compile: {e}"))
});

/// Phone numbers: optional `+country`, optional `(area)`, then digits with
/// dashes, spaces or dots between them.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\+[0-9]+[\- .]*)?(\([0-9]+\)[\- .]*)?([0-9][0-9\- .]+[0-9])$")
        .unwrap_or_else(|e| panic!("phone pattern must compile: {e}"))
});

// =============================================================================
// Entry / Draft
// =============================================================================

/// The six raw strings of the add/edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemEntry {
    pub name: String,
    pub price: String,
    pub quantity: String,
    pub provider_name: String,
    pub provider_email: String,
    pub provider_phone: String,
}

impl ItemEntry {
    /// Builds an entry from the form's text fields.
    pub fn new(
        name: impl Into<String>,
        price: impl Into<String>,
        quantity: impl Into<String>,
        provider_name: impl Into<String>,
        provider_email: impl Into<String>,
        provider_phone: impl Into<String>,
    ) -> Self {
        ItemEntry {
            name: name.into(),
            price: price.into(),
            quantity: quantity.into(),
            provider_name: provider_name.into(),
            provider_email: provider_email.into(),
            provider_phone: provider_phone.into(),
        }
    }

    /// Fills the form from a stored item (edit screen).
    pub fn from_item(item: &Item) -> Self {
        ItemEntry {
            name: item.name.clone(),
            price: format!("{}.{:02}", item.price.dollars(), item.price.cents_part()),
            quantity: item.quantity.to_string(),
            provider_name: item.provider_name.clone(),
            provider_email: item.provider_email.clone(),
            provider_phone: item.provider_phone.clone(),
        }
    }
}

/// Typed fields parsed out of a valid [`ItemEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub name: String,
    pub price: Money,
    pub quantity: u32,
    pub provider_name: String,
    pub provider_email: String,
    pub provider_phone: String,
}

impl ItemDraft {
    /// A new, not yet persisted item.
    pub fn into_item(self, origin: ItemOrigin) -> Item {
        Item {
            id: NEW_ITEM_ID,
            name: self.name,
            price: self.price,
            quantity: self.quantity,
            provider_name: self.provider_name,
            provider_email: self.provider_email,
            provider_phone: self.provider_phone,
            origin,
        }
    }

    /// Amends an existing item, keeping its identifier and origin.
    pub fn apply_to(self, item: &Item) -> Item {
        Item {
            id: item.id,
            origin: item.origin,
            ..self.into_item(item.origin)
        }
    }
}

// =============================================================================
// Field Validators
// =============================================================================

/// Non-blank text. Returns the trimmed value.
fn validate_text(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    Ok(value.to_string())
}

/// Parses a stock quantity.
///
/// ## Rules
/// - Must not be blank
/// - Must be a whole, non-negative number that fits in `u32`
pub fn parse_quantity(value: &str) -> ValidationResult<u32> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required("quantity"));
    }

    if value.starts_with('-') {
        return Err(ValidationError::Negative {
            field: "quantity".to_string(),
        });
    }

    value
        .parse::<u32>()
        .map_err(|_| ValidationError::invalid("quantity", "must be a whole number"))
}

/// Validates a provider email address. Returns the trimmed value.
///
/// ## Example
/// ```rust
/// use inventory_core::validation::validate_email;
///
/// assert!(validate_email("a@acme.com").is_ok());
/// assert!(validate_email("a@acme").is_err());
/// ```
pub fn validate_email(value: &str) -> ValidationResult<String> {
    let value = validate_text("provider_email", value)?;

    if !EMAIL_PATTERN.is_match(&value) {
        return Err(ValidationError::invalid(
            "provider_email",
            "not an email address",
        ));
    }

    Ok(value)
}

/// Validates a provider phone number. Returns the trimmed value.
///
/// ## Example
/// ```rust
/// use inventory_core::validation::validate_phone;
///
/// assert!(validate_phone("+1 (555) 123-4567").is_ok());
/// assert!(validate_phone("call me").is_err());
/// ```
pub fn validate_phone(value: &str) -> ValidationResult<String> {
    let value = validate_text("provider_phone", value)?;

    if !PHONE_PATTERN.is_match(&value) {
        return Err(ValidationError::invalid(
            "provider_phone",
            "not a phone number",
        ));
    }

    Ok(value)
}

// =============================================================================
// Gates
// =============================================================================

/// Validates the six form fields and parses them into typed values.
///
/// ## Rules
/// ```text
/// name ............ non-blank
/// price ........... non-negative decimal, rounded half-up to cents
/// quantity ........ non-negative whole number
/// provider_name ... non-blank
/// provider_email .. non-blank, email pattern
/// provider_phone .. non-blank, phone pattern
/// ```
/// The first failing field is reported.
pub fn validate_entry(entry: &ItemEntry) -> ValidationResult<ItemDraft> {
    Ok(ItemDraft {
        name: validate_text("name", &entry.name)?,
        price: Money::parse_decimal(&entry.price)?,
        quantity: parse_quantity(&entry.quantity)?,
        provider_name: validate_text("provider_name", &entry.provider_name)?,
        provider_email: validate_email(&entry.provider_email)?,
        provider_phone: validate_phone(&entry.provider_phone)?,
    })
}

/// Returns true when the form may be submitted.
#[inline]
pub fn is_entry_valid(entry: &ItemEntry) -> bool {
    validate_entry(entry).is_ok()
}

/// Applies the same field rules to an already-typed item (import path).
pub fn validate_item(item: &Item) -> ValidationResult<()> {
    validate_text("name", &item.name)?;

    if item.price.is_negative() {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    validate_text("provider_name", &item.provider_name)?;
    validate_email(&item.provider_email)?;
    validate_phone(&item.provider_phone)?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_entry() -> ItemEntry {
        ItemEntry::new("Widget", "9.99", "5", "Acme", "a@acme.com", "+15551234567")
    }

    #[test]
    fn test_valid_entry_passes() {
        assert!(is_entry_valid(&valid_entry()));

        let draft = validate_entry(&valid_entry()).unwrap();
        assert_eq!(draft.name, "Widget");
        assert_eq!(draft.price, Money::from_cents(999));
        assert_eq!(draft.quantity, 5);
    }

    #[test]
    fn test_any_blank_field_fails() {
        let blanks: [fn(&mut ItemEntry); 6] = [
            |e| e.name = "  ".into(),
            |e| e.price = String::new(),
            |e| e.quantity = String::new(),
            |e| e.provider_name = "\t".into(),
            |e| e.provider_email = String::new(),
            |e| e.provider_phone = " ".into(),
        ];

        for blank in blanks {
            let mut entry = valid_entry();
            blank(&mut entry);
            assert!(!is_entry_valid(&entry), "{:?} should be rejected", entry);
            assert!(matches!(
                validate_entry(&entry),
                Err(ValidationError::Required { .. })
            ));
        }
    }

    #[test]
    fn test_numbers_must_parse() {
        let mut entry = valid_entry();
        entry.price = "nine".into();
        assert!(!is_entry_valid(&entry));

        let mut entry = valid_entry();
        entry.quantity = "2.5".into();
        assert!(!is_entry_valid(&entry));

        let mut entry = valid_entry();
        entry.quantity = "-1".into();
        assert_eq!(
            validate_entry(&entry).unwrap_err(),
            ValidationError::Negative {
                field: "quantity".into()
            }
        );
    }

    #[test]
    fn test_long_text_and_extra_price_digits_pass() {
        let entry = ItemEntry {
            name: "W".repeat(300),
            price: "9.999".into(),
            ..valid_entry()
        };
        assert!(is_entry_valid(&entry));

        let draft = validate_entry(&entry).unwrap();
        assert_eq!(draft.name.chars().count(), 300);
        assert_eq!(draft.price, Money::from_cents(1000));

        // The import path accepts and rounds the same price identically.
        let mut imported = draft.into_item(ItemOrigin::File);
        imported.price = Money::from_decimal(9.999).unwrap();
        assert!(validate_item(&imported).is_ok());
        assert_eq!(imported.price, Money::from_cents(1000));
    }

    #[test]
    fn test_malformed_email_fails() {
        for email in ["acme.com", "a@", "a@acme", "a b@acme.com", "@acme.com"] {
            let mut entry = valid_entry();
            entry.provider_email = email.into();
            assert!(!is_entry_valid(&entry), "{email} should be rejected");
        }
    }

    #[test]
    fn test_malformed_phone_fails() {
        for phone in ["phone", "12", "+", "555-CALL-NOW", "(555"] {
            let mut entry = valid_entry();
            entry.provider_phone = phone.into();
            assert!(!is_entry_valid(&entry), "{phone} should be rejected");
        }
    }

    #[test]
    fn test_phone_formats_accepted() {
        for phone in ["+15551234567", "555-1234", "+1 (555) 123-4567", "8 800 555.35.35"] {
            assert!(validate_phone(phone).is_ok(), "{phone} should be accepted");
        }
    }

    #[test]
    fn test_entry_round_trips_through_item() {
        let item = validate_entry(&valid_entry())
            .unwrap()
            .into_item(ItemOrigin::Form);
        assert_eq!(ItemEntry::from_item(&item), valid_entry());
    }

    #[test]
    fn test_apply_to_keeps_identity() {
        let mut stored = validate_entry(&valid_entry())
            .unwrap()
            .into_item(ItemOrigin::File);
        stored.id = 42;

        let mut edit = valid_entry();
        edit.name = "Gadget".into();
        let updated = validate_entry(&edit).unwrap().apply_to(&stored);

        assert_eq!(updated.id, 42);
        assert_eq!(updated.origin, ItemOrigin::File);
        assert_eq!(updated.name, "Gadget");
    }

    #[test]
    fn test_validate_item_for_imports() {
        let item = validate_entry(&valid_entry())
            .unwrap()
            .into_item(ItemOrigin::File);
        assert!(validate_item(&item).is_ok());

        let mut bad = item.clone();
        bad.provider_email = "nobody".into();
        assert!(validate_item(&bad).is_err());

        let mut bad = item;
        bad.price = Money::from_cents(-1);
        assert!(validate_item(&bad).is_err());
    }
}
