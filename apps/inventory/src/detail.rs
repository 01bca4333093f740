//! Item detail view strings.

use serde::Serialize;

use crate::preferences::Preferences;
use inventory_core::Item;

const MASK: char = '•';

/// Everything the detail screen displays for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDetail {
    pub id: i64,
    pub name: String,
    pub price: String,
    pub quantity: String,
    pub provider_name: String,
    pub provider_email: String,
    pub provider_phone: String,
    /// Sell button enabled.
    pub can_sell: bool,
    /// Share button enabled.
    pub can_share: bool,
}

impl ItemDetail {
    /// Provider fields are masked when `hide_sensitive_data` is set.
    pub fn render(item: &Item, preferences: &Preferences) -> Self {
        let provider = |value: &str| {
            if preferences.hide_sensitive_data {
                mask(value)
            } else {
                value.to_string()
            }
        };

        ItemDetail {
            id: item.id,
            name: item.name.clone(),
            price: item.price.to_string(),
            quantity: item.quantity.to_string(),
            provider_name: provider(&item.provider_name),
            provider_email: provider(&item.provider_email),
            provider_phone: provider(&item.provider_phone),
            can_sell: item.is_stock_available(),
            can_share: preferences.sharing_allowed(),
        }
    }
}

/// One mask character per character of `value`.
fn mask(value: &str) -> String {
    value.chars().map(|_| MASK).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory_core::{ItemOrigin, Money};

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
    fn test_defaults_mask_and_forbid() {
        let detail = ItemDetail::render(&widget(5), &Preferences::default());
        assert_eq!(detail.price, "$9.99");
        assert_eq!(detail.quantity, "5");
        assert_eq!(detail.provider_name, "••••");
        assert_eq!(detail.provider_email.chars().count(), "a@acme.com".len());
        assert!(detail.provider_phone.chars().all(|c| c == MASK));
        assert!(detail.can_sell);
        assert!(!detail.can_share);
    }

    #[test]
    fn test_visible_when_allowed() {
        let prefs = Preferences {
            hide_sensitive_data: false,
            forbid_sharing: false,
            ..Preferences::default()
        };
        let detail = ItemDetail::render(&widget(0), &prefs);
        assert_eq!(detail.provider_email, "a@acme.com");
        assert_eq!(detail.provider_phone, "+15551234567");
        assert!(!detail.can_sell);
        assert!(detail.can_share);
    }
}
