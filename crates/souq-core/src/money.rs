//! # Money
//!
//! `Money` holds US cents in an `i64`. Every price, discount, fee and total
//! in the cart is summed as integers; floats appear only when a total is
//! converted for display (see `currency`). `DiscountRate` is basis points.
//!
//! ## Usage
//! ```rust
//! use souq_core::money::{DiscountRate, Money};
//!
//! let scarf = Money::from_cents(1_250); // $12.50
//! assert_eq!((scarf * 3).cents(), 3_750);
//!
//! let ten_percent = DiscountRate::from_bps(1000);
//! assert_eq!(Money::from_cents(10000).percentage_of(ten_percent).cents(), 1000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;

/// Basis points in 100%.
pub const FULL_BPS: u32 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in US cents.
///
/// ## Where Money is Used
/// ```text
/// Product.price_cents ──► CartLineItem.price ──► line subtotal
///                                   │
///                                   └──► discount amount (DiscountRate)
///
/// Cart.subtotal - Cart.discount_total + delivery fee ──► Cart.total
///                                                          │
///                                                          ▼
///                                          format_money(total, IQD) for display
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Whole dollars plus cents.
    ///
    /// For negative amounts only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -$5.50.
    ///
    /// ```rust
    /// use souq_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value in dollars as a float.
    ///
    /// Only for display and currency conversion. Never feed the result back
    /// into cart arithmetic.
    #[inline]
    pub fn as_major_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Line total for `qty` units.
    ///
    /// ```rust
    /// use souq_core::money::Money;
    ///
    /// let line_total = Money::from_cents(299).multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns the portion of this amount that a discount rate removes.
    ///
    /// Rounds half up: `(cents * bps + 5000) / 10000`, computed in i128 so
    /// large amounts cannot overflow.
    ///
    /// ```rust
    /// use souq_core::money::{DiscountRate, Money};
    ///
    /// let price = Money::from_cents(999); // $9.99
    /// let off = price.percentage_of(DiscountRate::from_bps(1500)); // 15%
    /// // $9.99 × 15% = $1.4985 → $1.50
    /// assert_eq!(off.cents(), 150);
    /// ```
    pub fn percentage_of(&self, rate: DiscountRate) -> Money {
        let amount = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(amount as i64)
    }

    /// Applies a discount rate and returns the discounted amount.
    ///
    /// ```rust
    /// use souq_core::money::{DiscountRate, Money};
    ///
    /// let subtotal = Money::from_cents(10000);
    /// let discounted = subtotal.apply_discount(DiscountRate::from_bps(1000));
    /// assert_eq!(discounted.cents(), 9000);
    /// ```
    pub fn apply_discount(&self, rate: DiscountRate) -> Money {
        *self - self.percentage_of(rate)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-style display in dollars. Dashboards use `currency::format_price`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Discount Rate
// =============================================================================

/// Discount rate in basis points (1 bps = 0.01%).
///
/// A line discount of "10%" is `DiscountRate::from_bps(1000)`. Valid rates
/// are 0..=10000 (0%..=100%); the cart rejects anything above 100%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a discount rate from a percentage in `[0, 100]`.
    ///
    /// ```rust
    /// use souq_core::money::DiscountRate;
    ///
    /// assert_eq!(DiscountRate::from_percentage(12.5).unwrap().bps(), 1250);
    /// assert!(DiscountRate::from_percentage(120.0).is_err());
    /// ```
    pub fn from_percentage(pct: f64) -> Result<Self, ValidationError> {
        if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
            return Err(ValidationError::OutOfRange {
                field: "discount".to_string(),
                min: 0,
                max: 100,
            });
        }
        Ok(DiscountRate((pct * 100.0).round() as u32))
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// True when the rate is within 0%..=100%.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 <= FULL_BPS
    }

    /// Zero discount.
    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for DiscountRate {
    fn default() -> Self {
        DiscountRate::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
