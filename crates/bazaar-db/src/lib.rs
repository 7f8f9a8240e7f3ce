//! # bazaar-db: Storage and Services for Bazaar
//!
//! This crate provides database access and the cart, coupon and checkout
//! services. It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar Data Flow                                 │
//! │                                                                         │
//! │  Controller (POST /cart/items, POST /checkout, ...)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     bazaar-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌───────────────┐  ┌──────────────────┐   │   │
//! │  │   │   Services    │  │  Repositories │  │    Database      │   │   │
//! │  │   │               │  │               │  │   (pool.rs)      │   │   │
//! │  │   │ CartService   │  │ ProductRepo   │  │                  │   │   │
//! │  │   │ CouponService │─►│ CartRepo      │─►│ SqlitePool       │   │   │
//! │  │   │ Checkout      │  │ CouponRepo    │  │ Migrations       │   │   │
//! │  │   │               │  │ OrderRepo     │  │ StoreConfig      │   │   │
//! │  │   │               │  │ CouponLedger  │  │                  │   │   │
//! │  │   └───────────────┘  └───────────────┘  └──────────────────┘   │   │
//! │  │            │                                                    │   │
//! │  │            ▼                                                    │   │
//! │  │      bazaar-core rules (Cart, Coupon, Money)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and service error types
//! - [`repository`] - Repository implementations (product, cart, coupon, ...)
//! - [`ledger`] - Coupon redemption counter and usage log
//! - [`service`] - Cart and coupon services
//! - [`checkout`] - The checkout transaction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bazaar_db::{Database, StoreConfig};
//! use bazaar_core::PaymentMethod;
//!
//! let db = Database::new(StoreConfig::load()?.db_config()).await?;
//!
//! db.cart_service().add_item("user-1", &product_id, 2).await?;
//! db.cart_service().apply_coupon("user-1", "save20").await?;
//! let summary = db.checkout().complete("user-1", &address_id, PaymentMethod::Upi).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutService, CheckoutStage, OrderSummary, StockLevel};
pub use config::{ConfigError, StoreConfig};
pub use error::{DbError, DbResult, ErrorResponse, StoreError, StoreResult};
pub use ledger::CouponLedger;
pub use pool::{Database, DbConfig};
pub use service::cart::CartService;
pub use service::coupon::{CouponRemoval, CouponService, NewCoupon};

// Repository re-exports for convenience
pub use repository::address::AddressRepository;
pub use repository::cart::CartRepository;
pub use repository::coupon::CouponRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
