//! # Error Types
//!
//! Domain-specific error types for bazaar-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bazaar-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bazaar-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  ├── StoreError       - Service errors (CoreError | DbError)           │
//! │  └── ErrorResponse    - What callers see (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → ErrorResponse        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Classes
//! Every [`CoreError`] belongs to an [`ErrorClass`]:
//! - `Precondition`: the client can fix the request (bad quantity, expired
//!   coupon, empty cart).
//! - `Conflict`: the request was fine but lost a race for a shared resource
//!   (stock, coupon redemptions, the cart itself). Re-reading may help.
//!
//! Storage failures are `Internal` and only exist in `bazaar-db`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Error Class
// =============================================================================

/// Coarse classification of an error for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Precondition,
    Conflict,
    Internal,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. None of them carry
/// monetary amounts in their messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Quantity is zero or negative.
    #[error("Quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// Unit price is negative.
    #[error("Price must not be negative")]
    InvalidPrice,

    /// Discount outside 0%..=100%.
    #[error("Discount must be between 0% and 100%, got {bps} bps")]
    InvalidDiscount { bps: u32 },

    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but is not for sale.
    #[error("Product is not available: {0}")]
    ProductUnavailable(String),

    /// Insufficient stock to fulfil the requested quantity.
    ///
    /// ## When This Occurs
    /// ```text
    /// add_item (qty: 5)          checkout (qty: 2, stock: 1)
    ///      │                           │
    ///      ▼                           ▼
    /// stock=3 < 5              guarded decrement misses
    ///      │                           │
    ///      └───────────┬───────────────┘
    ///                  ▼
    /// InsufficientStock { product_id, available, requested }
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// No line for this product in the cart.
    #[error("Product {0} is not in the cart")]
    LineNotFound(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Checkout or coupon on a cart with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart was checked out concurrently (or by an earlier request).
    #[error("Cart {0} is no longer active")]
    CartNotActive(String),

    /// Address missing or owned by someone else.
    #[error("Address not found for this user: {0}")]
    InvalidAddress(String),

    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    #[error("Coupon {0} has expired")]
    CouponExpired(String),

    #[error("Coupon {0} is not active")]
    CouponInactive(String),

    /// All redemptions are used up.
    #[error("Coupon {0} has reached its usage limit")]
    CouponLimitReached(String),

    /// Order amount is under the coupon's minimum.
    #[error("Order amount is below the minimum required for coupon {0}")]
    BelowMinimumOrder(String),

    /// Coupon targets a product or collection not in the cart.
    #[error("Coupon {0} does not apply to the items in this cart")]
    ScopeMismatch(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Machine-readable error code (`SCREAMING_SNAKE_CASE`).
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidQuantity { .. } => "INVALID_QUANTITY",
            CoreError::InvalidPrice => "INVALID_PRICE",
            CoreError::InvalidDiscount { .. } => "INVALID_DISCOUNT",
            CoreError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            CoreError::ProductUnavailable(_) => "PRODUCT_UNAVAILABLE",
            CoreError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            CoreError::LineNotFound(_) => "LINE_NOT_FOUND",
            CoreError::CartTooLarge { .. } => "CART_TOO_LARGE",
            CoreError::QuantityTooLarge { .. } => "QUANTITY_TOO_LARGE",
            CoreError::EmptyCart => "EMPTY_CART",
            CoreError::CartNotActive(_) => "CART_NOT_ACTIVE",
            CoreError::InvalidAddress(_) => "INVALID_ADDRESS",
            CoreError::CouponNotFound(_) => "COUPON_NOT_FOUND",
            CoreError::CouponExpired(_) => "COUPON_EXPIRED",
            CoreError::CouponInactive(_) => "COUPON_INACTIVE",
            CoreError::CouponLimitReached(_) => "COUPON_LIMIT_REACHED",
            CoreError::BelowMinimumOrder(_) => "BELOW_MINIMUM_ORDER",
            CoreError::ScopeMismatch(_) => "SCOPE_MISMATCH",
            CoreError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// Whether the client should fix the request or retry after re-reading.
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::InsufficientStock { .. }
            | CoreError::CouponLimitReached(_)
            | CoreError::CartNotActive(_) => ErrorClass::Conflict,
            _ => ErrorClass::Precondition,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid coupon code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., coupon code already taken).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
