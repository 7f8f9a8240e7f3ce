//! # bazaar-core: Pure Business Logic for Bazaar
//!
//! This crate is the **heart** of Bazaar's commerce core. It contains the
//! cart pricing and coupon rules as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Controllers (HTTP, auth, catalog admin)            │   │
//! │  │      add to bag ──► apply coupon ──► place order ──► orders    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bazaar-db (services)                         │   │
//! │  │    CartService, CouponService, CheckoutService, CouponLedger   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bazaar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │  coupon   │  │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │  Coupon   │  │   │
//! │  │   │   Order   │  │  Percent  │  │ CartLine  │  │  Quote    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, Percent, statuses)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Cart aggregate, lines, totals, snapshots
//! - [`coupon`] - Coupon policy: eligibility and discount computation
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation for coupon administration
//!
//! ## Example Usage
//!
//! ```rust
//! use bazaar_core::money::Money;
//! use bazaar_core::types::Percent;
//!
//! // 10% off a 500.00 item
//! let price = Money::from_cents(50000);
//! let off = price.percentage_of(Percent::from_whole(10));
//! assert_eq!((price - off).cents(), 45000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod coupon;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use bazaar_core::Money` instead of
// `use bazaar_core::money::Money`

pub use cart::{Cart, CartLine, CartNotice, CartSnapshot, CartTotals, CouponApplication, PaymentDetails};
pub use coupon::{Coupon, CouponContext, CouponKind, CouponQuote, CouponScope, CouponState};
pub use error::{CoreError, CoreResult, ErrorClass, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tenant ID when none is configured.
///
/// The schema is multi-tenant; a single deployment usually serves one tenant.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in a cart.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;
