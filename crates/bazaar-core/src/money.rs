//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With binary floats:                                                    │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A 20% coupon on 333.33 computed in floats can land on 66.66599...     │
//! │  and round differently on two machines.                                │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    33333 × 2000 bps = 66666000 → (66666000 + 5000) / 10000 = 6667      │
//! │    Exact, reproducible, and rounded once.                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::money::Money;
//! use bazaar_core::types::Percent;
//!
//! let price = Money::from_cents(50000);            // 500.00
//! let off = price.percentage_of(Percent::from_whole(10));
//! assert_eq!(off.cents(), 5000);                   // 50.00
//!
//! let payable = Money::from_cents(300).saturating_sub(Money::from_cents(1000));
//! assert!(payable.is_zero());                      // never negative
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Percent;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents, paise, ...).
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate results may be negative (e.g. a discount
///   larger than a subtotal before it is clamped). Payable amounts are clamped
///   with [`Money::saturating_sub`] / [`Money::clamp_non_negative`].
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **No validation**: Money never fails. Callers (cart lines, coupon
///   policies) reject negative prices and out-of-range percentages.
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price ──► CartLine.unit_price ──► line_subtotal                │
/// │                                                  │                      │
/// │                              Cart.bag_total ◄────┘                      │
/// │                                  │                                      │
/// │       - product_discount - coupon_discount + delivery_fee               │
/// │                                  │                                      │
/// │                                  ▼                                      │
/// │                       Cart.amount_payable ──► Order.total_amount        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the value, or zero if it is negative.
    ///
    /// Used for every amount shown to a customer as payable.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Subtracts `other`, flooring the result at zero.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let a = Money::from_cents(300);
    /// assert_eq!(a.saturating_sub(Money::from_cents(100)).cents(), 200);
    /// assert_eq!(a.saturating_sub(Money::from_cents(1000)).cents(), 0);
    /// ```
    #[inline]
    pub const fn saturating_sub(&self, other: Money) -> Self {
        Money(self.0 - other.0).clamp_non_negative()
    }

    /// Calculates `percent` of this amount, rounded half-up to the minor unit.
    ///
    /// ## Rounding
    /// Half-up on magnitude (half away from zero), so a refund computed on a
    /// negative amount mirrors the charge exactly:
    /// ```text
    /// 1005 × 50%  = 502.5  → 503
    /// -1005 × 50% = -502.5 → -503
    /// ```
    ///
    /// ## Implementation
    /// Integer math in i128: `(|amount| × bps + 5000) / 10000`, sign restored.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    /// use bazaar_core::types::Percent;
    ///
    /// let subtotal = Money::from_cents(100000);                 // 1000.00
    /// let discount = subtotal.percentage_of(Percent::from_whole(20));
    /// assert_eq!(discount.cents(), 20000);                      // 200.00
    /// ```
    pub fn percentage_of(&self, percent: Percent) -> Money {
        let magnitude = (self.0 as i128).abs();
        let scaled = (magnitude * percent.bps() as i128 + 5000) / 10000;
        let signed = if self.0 < 0 { -scaled } else { scaled };
        Money::from_cents(signed as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(45000);
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 90000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain `major.minor` rendering, for logs and debugging.
///
/// Currency symbols and localization belong to the presentation layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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

/// Multiplication by quantity.
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

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
