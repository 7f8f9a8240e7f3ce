//! # Repository Module
//!
//! SQL access for each table, one repository per aggregate.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Service (CartService, CheckoutService, CouponService)                  │
//! │       │                                                                 │
//! │       │  repos.carts.find_active(tenant, user)                         │
//! │       │  repos.products.decrement_stock_tx(&mut tx, id, qty)           │
//! │       ▼                                                                 │
//! │  Repository                                                            │
//! │  ├── pool methods    one statement, autocommit                         │
//! │  └── *_tx methods    run on the caller's Transaction                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Rows are mapped into bazaar-core types here; the services never see   │
//! │  a JSON column or a discount_kind string.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog reads and stock decrement
//! - [`AddressRepository`](address::AddressRepository) - Address book lookups
//! - [`CartRepository`](cart::CartRepository) - Active carts and checkout close
//! - [`CouponRepository`](coupon::CouponRepository) - Coupon CRUD
//! - [`OrderRepository`](order::OrderRepository) - Orders and order items

pub mod address;
pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;
