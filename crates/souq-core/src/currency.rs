//! # Currency Module
//!
//! Conversion between the three storefront currencies and price formatting.
//!
//! ## Pivot Conversion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    All conversions route through IQD                    │
//! │                                                                         │
//! │        USD ──(× usd_to_iqd)──┐           ┌──(÷ usd_to_iqd)──► USD       │
//! │                              ▼           │                              │
//! │        IQD ─────(× 1)──────► IQD ────────┼──(÷ 1)───────────► IQD       │
//! │                              ▲           │                              │
//! │        SAR ──(× sar_to_iqd)──┘           └──(÷ sar_to_iqd)──► SAR       │
//! │                                                                         │
//! │  usd_to_sar is stored and editable but is not used by the pivot path.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Catalog prices are stored in USD; the dashboards show them in the
//! customer's selected currency via [`ExchangeRateSet::format_price`].
//! Conversion is display-only, so it uses `f64` and plain rounding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::validate_positive_rate;

// =============================================================================
// Currency
// =============================================================================

/// Currencies the storefront can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US dollar. Catalog prices are stored in this currency.
    #[default]
    Usd,
    /// Iraqi dinar. The pivot currency.
    Iqd,
    /// Saudi riyal.
    Sar,
}

impl Currency {
    /// Every supported currency, in display order.
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Iqd, Currency::Sar];

    /// ISO 4217 code.
    pub const fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Iqd => "IQD",
            Currency::Sar => "SAR",
        }
    }

    /// Number of decimals shown for this currency.
    pub const fn display_decimals(&self) -> u32 {
        match self {
            Currency::Iqd => 0,
            Currency::Usd | Currency::Sar => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "IQD" => Ok(Currency::Iqd),
            "SAR" => Ok(Currency::Sar),
            _ => Err(ValidationError::NotAllowed {
                field: "currency".to_string(),
                allowed: Currency::ALL.iter().map(|c| c.code().to_string()).collect(),
            }),
        }
    }
}

// =============================================================================
// Exchange Rates
// =============================================================================

/// The process-wide exchange rate triangle.
///
/// ## Invariant
/// All three rates are positive and finite. The constructor enforces this;
/// the rates are NOT cross-checked against each other (see
/// [`ExchangeRateSet::triangle_deviation`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateSet {
    /// IQD per 1 USD.
    pub usd_to_iqd: f64,
    /// IQD per 1 SAR.
    pub sar_to_iqd: f64,
    /// SAR per 1 USD.
    pub usd_to_sar: f64,
}

impl ExchangeRateSet {
    /// Creates a validated rate set.
    ///
    /// ```rust
    /// use souq_core::currency::ExchangeRateSet;
    ///
    /// assert!(ExchangeRateSet::new(1320.0, 352.0, 3.75).is_ok());
    /// assert!(ExchangeRateSet::new(0.0, 352.0, 3.75).is_err());
    /// ```
    pub fn new(usd_to_iqd: f64, sar_to_iqd: f64, usd_to_sar: f64) -> Result<Self, ValidationError> {
        validate_positive_rate("usd_to_iqd", usd_to_iqd)?;
        validate_positive_rate("sar_to_iqd", sar_to_iqd)?;
        validate_positive_rate("usd_to_sar", usd_to_sar)?;

        Ok(ExchangeRateSet {
            usd_to_iqd,
            sar_to_iqd,
            usd_to_sar,
        })
    }

    /// Re-checks the positivity invariant, e.g. after deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ExchangeRateSet::new(self.usd_to_iqd, self.sar_to_iqd, self.usd_to_sar).map(|_| ())
    }

    /// Returns how many IQD one unit of `currency` is worth.
    #[inline]
    pub fn rate_to_iqd(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => self.usd_to_iqd,
            Currency::Sar => self.sar_to_iqd,
            Currency::Iqd => 1.0,
        }
    }

    /// Converts `amount` from one currency to another through IQD.
    ///
    /// ```rust
    /// use souq_core::currency::{Currency, ExchangeRateSet};
    ///
    /// let rates = ExchangeRateSet::default();
    /// assert_eq!(rates.convert(10.0, Currency::Usd, Currency::Usd), 10.0);
    /// assert_eq!(rates.convert(10.0, Currency::Usd, Currency::Iqd), 13_200.0);
    /// ```
    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> f64 {
        if from == to {
            return amount;
        }

        let amount_in_iqd = match from {
            Currency::Iqd => amount,
            other => amount * self.rate_to_iqd(other),
        };

        match to {
            Currency::Iqd => amount_in_iqd,
            other => amount_in_iqd / self.rate_to_iqd(other),
        }
    }

    /// Formats a USD amount in the target currency.
    ///
    /// - USD: `1,234.50`
    /// - SAR: `1,234.50 SAR`
    /// - IQD: `1,629,540 IQD`
    ///
    /// A missing or non-finite amount renders as that currency's zero string.
    ///
    /// ```rust
    /// use souq_core::currency::{Currency, ExchangeRateSet};
    ///
    /// let rates = ExchangeRateSet::default();
    /// assert_eq!(rates.format_price(Some(0.0), Currency::Usd), "0.00");
    /// assert_eq!(rates.format_price(Some(0.0), Currency::Iqd), "0 IQD");
    /// assert_eq!(rates.format_price(None, Currency::Sar), "0.00 SAR");
    /// ```
    pub fn format_price(&self, amount: Option<f64>, currency: Currency) -> String {
        let amount = match amount {
            Some(value) if value.is_finite() => value,
            _ => 0.0,
        };

        let converted = self.convert(amount, Currency::Usd, currency);
        render(converted, currency)
    }

    /// Formats a cent amount (cart totals, order totals) in the target currency.
    pub fn format_money(&self, money: Money, currency: Currency) -> String {
        self.format_price(Some(money.as_major_f64()), currency)
    }

    /// Relative gap between the stored `usd_to_sar` and the one implied by
    /// the IQD rates (`usd_to_iqd / sar_to_iqd`).
    ///
    /// Zero means the triangle is consistent. Used for admin warnings only.
    pub fn triangle_deviation(&self) -> f64 {
        let implied = self.usd_to_iqd / self.sar_to_iqd;
        ((self.usd_to_sar - implied) / implied).abs()
    }
}

impl Default for ExchangeRateSet {
    /// Development defaults: 1 USD = 1320 IQD, 1 SAR = 352 IQD, 1 USD = 3.75 SAR.
    fn default() -> Self {
        ExchangeRateSet {
            usd_to_iqd: 1320.0,
            sar_to_iqd: 352.0,
            usd_to_sar: 3.75,
        }
    }
}

// =============================================================================
// Formatting Helpers
// =============================================================================

fn render(value: f64, currency: Currency) -> String {
    let number = match currency.display_decimals() {
        0 => format_grouped_integer(value),
        _ => format_grouped_decimal(value),
    };

    match currency {
        Currency::Usd => number,
        other => format!("{} {}", number, other.code()),
    }
}

fn format_grouped_integer(value: f64) -> String {
    let rounded = value.round() as i128;
    let sign = if rounded < 0 { "-" } else { "" };
    format!("{}{}", sign, group_thousands(rounded.unsigned_abs()))
}

fn format_grouped_decimal(value: f64) -> String {
    let hundredths = (value * 100.0).round() as i128;
    let sign = if hundredths < 0 { "-" } else { "" };
    let abs = hundredths.unsigned_abs();
    format!("{}{}.{:02}", sign, group_thousands(abs / 100), abs % 100)
}

/// `1234567` → `"1,234,567"`.
fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

// =============================================================================
// Unit Tests
// =============================================================================
