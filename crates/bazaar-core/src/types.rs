//! # Domain Types
//!
//! Core domain types used throughout Bazaar.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Order      │   │   OrderItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  collection_id  │   │  order_number   │   │  order_id (FK)  │       │
//! │  │  price_cents    │   │  subtotal       │   │  name snapshot  │       │
//! │  │  discount_bps   │   │  total          │   │  price snapshot │       │
//! │  │  stock          │   │  address (JSON) │   │  line_total     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Percent      │   │   CartStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Active         │   │  Card, Upi      │       │
//! │  │  1250 = 12.5%   │   │  CheckedOut     │   │  Wallet, Cod    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cart and coupon types live in [`crate::cart`] and [`crate::coupon`].
//!
//! ## Snapshot Pattern
//! Orders never reference live catalog rows for display. Every OrderItem
//! copies name, price, discount and image at checkout, and the order copies
//! the shipping address. Editing a product later never rewrites history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::DEFAULT_TENANT_ID;

// =============================================================================
// Percent
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1250 bps = 12.5%, 10000 bps = 100%
///
/// Product discounts and percentage coupons both use this, so a 12.5% coupon
/// is exact and never goes through a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    /// 100% in basis points.
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a percentage from a whole number (`20` → 20%).
    #[inline]
    pub const fn from_whole(pct: u32) -> Self {
        Percent(pct * 100)
    }

    /// Returns the value in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// 0%.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    /// 100%.
    #[inline]
    pub const fn full() -> Self {
        Percent(Self::MAX_BPS)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// True for 0%..=100%.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 <= Self::MAX_BPS
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}%", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

// =============================================================================
// Store Settings
// =============================================================================

/// Per-store pricing settings.
///
/// Loaded from the environment by `bazaar-db` and handed to the services.
/// Kept here so cart math never depends on how settings were obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StoreSettings {
    /// Tenant every cart, coupon and order is scoped to.
    pub tenant_id: String,

    /// Flat delivery fee added to every cart.
    pub delivery_fee: Money,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            delivery_fee: Money::zero(),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product, as read by the cart and checkout.
///
/// The catalog itself is managed elsewhere. This core reads price, discount
/// and stock, and decrements stock at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Collection (category) the product is listed under.
    pub collection_id: Option<String>,

    /// Display name, copied onto cart lines and order items.
    pub name: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Per-product discount in basis points (1000 = 10%).
    pub discount_bps: u32,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Primary image URL.
    pub image: Option<String>,

    /// Whether the product can be added to carts.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the per-product discount.
    #[inline]
    pub fn discount(&self) -> Percent {
        Percent::from_bps(self.discount_bps)
    }

    /// Checks if `quantity` units can be sold right now.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.stock >= quantity
    }
}

// =============================================================================
// Address
// =============================================================================

/// A shipping address from the user directory.
///
/// Snapshotted onto the order as JSON at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Address {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

// =============================================================================
// Cart Status
// =============================================================================

/// Lifecycle of a cart.
///
/// ```text
/// Active ──(checkout commit)──► CheckedOut
/// ```
/// The transition happens exactly once and is never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Cart accepts mutations.
    Active,
    /// Cart produced an order and is kept for audit.
    CheckedOut,
}

impl Default for CartStatus {
    fn default() -> Self {
        CartStatus::Active
    }
}

// =============================================================================
// Payment
// =============================================================================

/// How the customer paid. Gateway integration happens before checkout.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Upi,
    Wallet,
    CashOnDelivery,
}

/// Payment state recorded on an order. Checkout always records `Paid`.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
}

/// Vendor/admin-managed shipped flag, independent of payment.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Unfulfilled,
    Fulfilled,
}

impl Default for FulfillmentStatus {
    fn default() -> Self {
        FulfillmentStatus::Unfulfilled
    }
}

// =============================================================================
// Order
// =============================================================================

/// An immutable order created by checkout.
///
/// ## Money Invariant
/// `total_cents == subtotal_cents - discount_cents + delivery_fee_cents`
/// holds for every order (also a CHECK constraint on the table).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub tenant_id: String,
    /// Human-facing unique number, e.g. `BZ-20260101-120000-3F9A1C2B`.
    pub order_number: String,
    pub user_id: String,
    pub cart_id: String,
    /// Address as it was at checkout.
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    /// Upper-cased code of the coupon consumed, if any.
    pub coupon_code: Option<String>,
    /// Bag total minus product discounts (pre-coupon).
    pub subtotal_cents: i64,
    /// Coupon discount.
    pub discount_cents: i64,
    pub delivery_fee_cents: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn delivery_fee(&self) -> Money {
        Money::from_cents(self.delivery_fee_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Checks the money invariant.
    pub fn is_balanced(&self) -> bool {
        self.total() == self.subtotal() - self.discount() + self.delivery_fee()
    }
}

/// A line item in an order.
/// Uses snapshot pattern to freeze product data at time of purchase.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of purchase (frozen).
    pub product_name: String,
    /// Unit price in cents at time of purchase (frozen).
    pub unit_price_cents: i64,
    /// Per-product discount at time of purchase (frozen).
    pub discount_bps: u32,
    pub discounted_unit_price_cents: i64,
    pub quantity: i64,
    /// discounted_unit_price × quantity.
    pub line_total_cents: i64,
    pub product_image: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Coupon Usage
// =============================================================================

/// One coupon redemption. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CouponUsageRecord {
    pub id: String,
    pub coupon_id: String,
    pub user_id: String,
    pub order_id: String,
    pub discount_cents: i64,
    /// Coupon base the discount was computed on.
    pub order_amount_cents: i64,
    #[ts(as = "String")]
    pub used_at: DateTime<Utc>,
}

/// Aggregate usage figures for one coupon.
///
/// Computed in a single query, so the fields agree with each other at a point
/// in time. Averages are rounded to the nearest cent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CouponUsageStats {
    pub total_uses: i64,
    pub total_discount: Money,
    pub total_order_value: Money,
    pub average_discount: Money,
    pub average_order_value: Money,
}

impl CouponUsageStats {
    /// Builds stats from raw sums, deriving the averages.
    pub fn from_totals(total_uses: i64, total_discount_cents: i64, total_order_cents: i64) -> Self {
        let avg = |sum: i64| {
            if total_uses == 0 {
                0
            } else {
                (sum + total_uses / 2) / total_uses
            }
        };
        CouponUsageStats {
            total_uses,
            total_discount: Money::from_cents(total_discount_cents),
            total_order_value: Money::from_cents(total_order_cents),
            average_discount: Money::from_cents(avg(total_discount_cents)),
            average_order_value: Money::from_cents(avg(total_order_cents)),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
