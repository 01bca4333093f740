//! # Money Module
//!
//! Provides the `Money` type for item prices.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  A price typed as "0.10" and stored as a double comes back as          │
//! │  0.1000000000000000055511151231257827 - fine for display, wrong for    │
//! │  equality checks after an export/import round trip.                    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    "9.99" is parsed digit by digit into 999 cents.                     │
//! │    Floats only appear at the JSON interchange boundary.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use inventory_core::money::Money;
//!
//! let price = Money::parse_decimal("9.99").unwrap();
//! assert_eq!(price.cents(), 999);
//! assert_eq!(price.to_string(), "$9.99");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;

/// Number of fractional digits a price may carry.
pub const PRICE_SCALE: u32 = 2;

const CENTS_PER_UNIT: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: matches the SQLite INTEGER affinity; item prices are
///   kept non-negative by the entry gate, not by the type
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / CENTS_PER_UNIT
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % CENTS_PER_UNIT).abs()
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Parses a decimal price as typed into the form.
    ///
    /// ## Accepted Input
    /// ```text
    /// "9.99"  → 999      "9"   → 900      "9." → 900
    /// ".5"    → 50       " 12.30 " → 1230 (surrounding whitespace trimmed)
    ///
    /// "9.999" → 1000     "9.994" → 999 (rounded half-up to cents)
    ///
    /// "-1"    → Negative          "abc" → InvalidFormat
    /// ""      → Required
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Money, ValidationError> {
        const FIELD: &str = "price";

        let text = input.trim();
        if text.is_empty() {
            return Err(ValidationError::required(FIELD));
        }
        if text.starts_with('-') {
            return Err(ValidationError::Negative {
                field: FIELD.to_string(),
            });
        }

        let (whole, fraction) = match text.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (text, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(ValidationError::invalid(FIELD, "not a number"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid(FIELD, "not a number"));
        }

        let whole_units: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| ValidationError::invalid(FIELD, "number is too large"))?
        };

        // Right-pad the fraction: "5" means 50 cents, not 5.
        let scale = PRICE_SCALE as usize;
        let mut minor: i64 = 0;
        for (i, digit) in fraction.bytes().take(scale).enumerate() {
            minor += i64::from(digit - b'0') * 10_i64.pow(PRICE_SCALE - 1 - i as u32);
        }
        // Half-up on the first dropped digit, matching `from_decimal`.
        if fraction.as_bytes().get(scale).is_some_and(|d| *d >= b'5') {
            minor += 1;
        }

        whole_units
            .checked_mul(CENTS_PER_UNIT)
            .and_then(|c| c.checked_add(minor))
            .map(Money)
            .ok_or_else(|| ValidationError::invalid(FIELD, "number is too large"))
    }

    /// Converts an interchange decimal (JSON number) into cents.
    ///
    /// Returns `None` for NaN, infinities, negatives and values that do not
    /// fit in `i64` cents.
    pub fn from_decimal(value: f64) -> Option<Money> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let cents = (value * CENTS_PER_UNIT as f64).round();
        if cents > i64::MAX as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    /// Returns the value as a decimal number for the JSON interchange format.
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / CENTS_PER_UNIT as f64
    }

    /// Formats with an arbitrary currency symbol, two decimals.
    ///
    /// ## Example
    /// ```rust
    /// use inventory_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1234).format_with_symbol("€"), "€12.34");
    /// ```
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!(
            "{}{}{}.{:02}",
            sign,
            symbol,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money with a `$` symbol.
///
/// ## Note
/// Locale-aware currency formatting belongs to the screens layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with_symbol("$"))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_parse_decimal_accepts_form_input() {
        assert_eq!(Money::parse_decimal("9.99").unwrap().cents(), 999);
        assert_eq!(Money::parse_decimal("9").unwrap().cents(), 900);
        assert_eq!(Money::parse_decimal("9.").unwrap().cents(), 900);
        assert_eq!(Money::parse_decimal(".5").unwrap().cents(), 50);
        assert_eq!(Money::parse_decimal("0.05").unwrap().cents(), 5);
        assert_eq!(Money::parse_decimal(" 12.30 ").unwrap().cents(), 1230);
        assert_eq!(Money::parse_decimal("0").unwrap(), Money::zero());
    }

    #[test]
    fn test_parse_decimal_rejects_bad_input() {
        assert!(matches!(
            Money::parse_decimal(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            Money::parse_decimal("-1"),
            Err(ValidationError::Negative { .. })
        ));
        assert!(Money::parse_decimal("abc").is_err());
        assert!(Money::parse_decimal(".").is_err());
        assert!(Money::parse_decimal("1.2.3").is_err());
        assert!(Money::parse_decimal("1e3").is_err());
        assert!(Money::parse_decimal("99999999999999999999").is_err());
    }

    #[test]
    fn test_parse_decimal_rounds_extra_digits() {
        assert_eq!(Money::parse_decimal("9.999").unwrap().cents(), 1000);
        assert_eq!(Money::parse_decimal("9.994").unwrap().cents(), 999);
        assert_eq!(Money::parse_decimal("0.125").unwrap().cents(), 13);
        assert_eq!(Money::parse_decimal("1.00499").unwrap().cents(), 100);
        assert_eq!(
            Money::parse_decimal("9.999").ok(),
            Money::from_decimal(9.999)
        );
    }

    #[test]
    fn test_decimal_interchange() {
        assert_eq!(Money::from_decimal(9.99), Some(Money::from_cents(999)));
        assert_eq!(Money::from_decimal(0.1), Some(Money::from_cents(10)));
        assert_eq!(Money::from_decimal(-0.01), None);
        assert_eq!(Money::from_decimal(f64::NAN), None);
        assert_eq!(Money::from_cents(999).to_decimal(), 9.99);
    }
}
