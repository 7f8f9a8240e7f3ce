//! # Services
//!
//! Operations exposed to controllers. Each service owns a clone of the pool
//! and the store settings, loads aggregates through the repositories, runs
//! the rules in `bazaar-core`, and persists the result.
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────┐
//! │ CartService  │   │ CouponService │   │ Checkout     │
//! │ bag + coupon │   │ admin + quote │   │ (checkout.rs)│
//! └──────┬───────┘   └──────┬────────┘   └──────┬───────┘
//!        └──────────────────┼───────────────────┘
//!                           ▼
//!                  repositories / ledger
//! ```
//!
//! Every service returns `StoreResult`, so callers see one error type with a
//! code and a class.

pub mod cart;
pub mod coupon;
