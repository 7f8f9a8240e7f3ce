//! # Coupon Policy
//!
//! Eligibility rules and discount computation for coupons.
//!
//! ## Evaluation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  compute_discount(order_amount, cart context, now)                      │
//! │                                                                         │
//! │  1. state(now)          Inactive / Expired / LimitReached → reject      │
//! │            │                                                            │
//! │  2. minimum order       order_amount < minimum → BelowMinimumOrder      │
//! │            │                                                            │
//! │  3. scope               product / collection not in cart                │
//! │            │            → ScopeMismatch                                 │
//! │            ▼                                                            │
//! │  4. kind                Percentage → round_half_up(amount × pct)        │
//! │                         FlatAmount → min(value, amount)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first failing rule wins, so a caller always gets the most fundamental
//! reason a coupon does not apply.
//!
//! Nothing here touches the clock: `now` is always passed in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Percent;

// =============================================================================
// Scope & Kind
// =============================================================================

/// What a coupon targets. Exactly one scope, enforced by the type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponScope {
    Product { product_id: String },
    Collection { collection_id: String },
}

/// How the discount is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponKind {
    /// Percentage of the order amount, 0% < value <= 100%.
    Percentage { percent: Percent },
    /// Fixed amount off, never more than the order amount.
    FlatAmount { amount: Money },
}

impl CouponKind {
    /// Discount this kind yields on `order_amount`, never above it.
    pub fn discount_on(&self, order_amount: Money) -> Money {
        let order_amount = order_amount.clamp_non_negative();
        match self {
            CouponKind::Percentage { percent } => order_amount.percentage_of(*percent),
            CouponKind::FlatAmount { amount } => (*amount).min(order_amount),
        }
    }
}

/// Derived coupon state. Never stored.
///
/// ```text
/// Active ──(now >= expires_at)──────► Expired
///    └────(used_count >= limit)─────► LimitReached
/// is_active = false ────────────────► Inactive
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CouponState {
    Active,
    Expired,
    LimitReached,
    Inactive,
}

// =============================================================================
// Cart Context
// =============================================================================

/// The parts of a cart a coupon's scope is matched against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CouponContext {
    pub product_ids: HashSet<String>,
    pub collection_ids: HashSet<String>,
}

impl CouponContext {
    /// Builds a context from `(product_id, collection_id)` pairs.
    pub fn from_products<'a, I>(products: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut ctx = CouponContext::default();
        for (product_id, collection_id) in products {
            ctx.product_ids.insert(product_id.to_string());
            if let Some(collection_id) = collection_id {
                ctx.collection_ids.insert(collection_id.to_string());
            }
        }
        ctx
    }

    pub fn matches(&self, scope: &CouponScope) -> bool {
        match scope {
            CouponScope::Product { product_id } => self.product_ids.contains(product_id),
            CouponScope::Collection { collection_id } => {
                self.collection_ids.contains(collection_id)
            }
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// A coupon record.
///
/// `used_count` is only ever incremented by the coupon ledger inside a
/// checkout transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Coupon {
    pub id: String,
    pub tenant_id: String,
    /// Upper-cased; unique per tenant.
    pub code: String,
    pub scope: CouponScope,
    pub kind: CouponKind,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    pub minimum_order: Option<Money>,
    pub is_active: bool,
    /// Vendor or admin user who created it.
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Derived state at `now`.
    ///
    /// When several apply, `Inactive` wins over `Expired`, which wins over
    /// `LimitReached`.
    pub fn state(&self, now: DateTime<Utc>) -> CouponState {
        if !self.is_active {
            CouponState::Inactive
        } else if now >= self.expires_at {
            CouponState::Expired
        } else if self.is_limit_reached() {
            CouponState::LimitReached
        } else {
            CouponState::Active
        }
    }

    pub fn is_limit_reached(&self) -> bool {
        matches!(self.usage_limit, Some(limit) if self.used_count >= limit)
    }

    /// True iff active, unexpired and under its usage limit.
    pub fn can_be_applied(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == CouponState::Active
    }

    /// Remaining redemptions, if limited.
    pub fn remaining_uses(&self) -> Option<i64> {
        self.usage_limit.map(|limit| (limit - self.used_count).max(0))
    }

    /// Computes the discount for `order_amount` (the post-product-discount
    /// subtotal), checking every eligibility rule in order.
    ///
    /// ## Example
    /// ```rust,ignore
    /// // SAVE20: 20%, minimum 500.00
    /// let discount = save20.compute_discount(Money::from_cents(100000), &ctx, now)?;
    /// assert_eq!(discount.cents(), 20000);
    /// ```
    pub fn compute_discount(
        &self,
        order_amount: Money,
        ctx: &CouponContext,
        now: DateTime<Utc>,
    ) -> CoreResult<Money> {
        match self.state(now) {
            CouponState::Active => {}
            CouponState::Inactive => return Err(CoreError::CouponInactive(self.code.clone())),
            CouponState::Expired => return Err(CoreError::CouponExpired(self.code.clone())),
            CouponState::LimitReached => {
                return Err(CoreError::CouponLimitReached(self.code.clone()))
            }
        }

        if let Some(minimum) = self.minimum_order {
            if order_amount < minimum {
                return Err(CoreError::BelowMinimumOrder(self.code.clone()));
            }
        }

        if !ctx.matches(&self.scope) {
            return Err(CoreError::ScopeMismatch(self.code.clone()));
        }

        Ok(self.kind.discount_on(order_amount))
    }

    /// Read-only preview of what this coupon would do to `order_amount`.
    pub fn quote(
        &self,
        order_amount: Money,
        ctx: &CouponContext,
        now: DateTime<Utc>,
    ) -> CoreResult<CouponQuote> {
        let discount = self.compute_discount(order_amount, ctx, now)?;
        Ok(CouponQuote {
            code: self.code.clone(),
            kind: self.kind,
            order_amount,
            discount_amount: discount,
            final_amount: order_amount.saturating_sub(discount),
        })
    }
}

/// Result of a coupon preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CouponQuote {
    pub code: String,
    pub kind: CouponKind,
    pub order_amount: Money,
    pub discount_amount: Money,
    pub final_amount: Money,
}

/// Canonical form of a coupon code: trimmed and upper-cased.
///
/// ```rust
/// use bazaar_core::coupon::normalize_code;
///
/// assert_eq!(normalize_code("  save20 "), "SAVE20");
/// ```
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(kind: CouponKind, scope: CouponScope) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: "c-1".to_string(),
            tenant_id: "t".to_string(),
            code: "SAVE20".to_string(),
            scope,
            kind,
            expires_at: now + Duration::days(7),
            usage_limit: None,
            used_count: 0,
            minimum_order: None,
            is_active: true,
            created_by: "vendor-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn product_scope() -> CouponScope {
        CouponScope::Product {
            product_id: "p-7".to_string(),
        }
    }

    fn ctx_with(product: &str, collection: Option<&str>) -> CouponContext {
        CouponContext::from_products([(product, collection)])
    }

    #[test]
    fn test_percentage_with_minimum() {
        let mut c = coupon(
            CouponKind::Percentage { percent: Percent::from_whole(20) },
            product_scope(),
        );
        c.minimum_order = Some(Money::from_cents(500));
        let ctx = ctx_with("p-7", None);

        let discount = c.compute_discount(Money::from_cents(1000), &ctx, Utc::now()).unwrap();
        assert_eq!(discount.cents(), 200);

        let err = c.compute_discount(Money::from_cents(400), &ctx, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::BelowMinimumOrder(_)));
    }

    #[test]
    fn test_flat_amount_clamped_to_order() {
        let c = coupon(
            CouponKind::FlatAmount { amount: Money::from_cents(1000) },
            product_scope(),
        );
        let quote = c
            .quote(Money::from_cents(300), &ctx_with("p-7", None), Utc::now())
            .unwrap();
        assert_eq!(quote.discount_amount.cents(), 300);
        assert!(quote.final_amount.is_zero());
    }

    #[test]
    fn test_state_precedence() {
        let now = Utc::now();
        let mut c = coupon(
            CouponKind::FlatAmount { amount: Money::from_cents(100) },
            product_scope(),
        );
        assert_eq!(c.state(now), CouponState::Active);

        c.usage_limit = Some(1);
        c.used_count = 1;
        assert_eq!(c.state(now), CouponState::LimitReached);

        c.expires_at = now;
        assert_eq!(c.state(now), CouponState::Expired);

        c.is_active = false;
        assert_eq!(c.state(now), CouponState::Inactive);
        assert!(!c.can_be_applied(now));
    }

    #[test]
    fn test_limit_reached_is_rejected() {
        let mut c = coupon(
            CouponKind::FlatAmount { amount: Money::from_cents(100) },
            product_scope(),
        );
        c.usage_limit = Some(3);
        c.used_count = 3;
        assert_eq!(c.remaining_uses(), Some(0));

        let err = c
            .compute_discount(Money::from_cents(1000), &ctx_with("p-7", None), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::CouponLimitReached(_)));
    }

    #[test]
    fn test_expired_checked_before_minimum() {
        let mut c = coupon(
            CouponKind::FlatAmount { amount: Money::from_cents(100) },
            product_scope(),
        );
        c.minimum_order = Some(Money::from_cents(10_000));
        let later = c.expires_at + Duration::seconds(1);

        let err = c
            .compute_discount(Money::from_cents(1), &ctx_with("p-7", None), later)
            .unwrap_err();
        assert!(matches!(err, CoreError::CouponExpired(_)));
    }

    #[test]
    fn test_product_scope_mismatch() {
        let c = coupon(
            CouponKind::Percentage { percent: Percent::from_whole(10) },
            product_scope(),
        );
        let err = c
            .compute_discount(Money::from_cents(1000), &ctx_with("p-8", None), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::ScopeMismatch(_)));
    }

    #[test]
    fn test_collection_scope_enforced() {
        let c = coupon(
            CouponKind::Percentage { percent: Percent::from_whole(10) },
            CouponScope::Collection {
                collection_id: "shoes".to_string(),
            },
        );

        let hit = c.compute_discount(Money::from_cents(1000), &ctx_with("p-1", Some("shoes")), Utc::now());
        assert_eq!(hit.unwrap().cents(), 100);

        let miss = c.compute_discount(Money::from_cents(1000), &ctx_with("p-1", Some("hats")), Utc::now());
        assert!(matches!(miss, Err(CoreError::ScopeMismatch(_))));
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        let c = coupon(
            CouponKind::Percentage { percent: Percent::from_bps(1250) },
            product_scope(),
        );
        // 999 × 12.5% = 124.875 → 125
        let discount = c
            .compute_discount(Money::from_cents(999), &ctx_with("p-7", None), Utc::now())
            .unwrap();
        assert_eq!(discount.cents(), 125);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("save20"), "SAVE20");
        assert_eq!(normalize_code("  New-User "), "NEW-USER");
    }

    #[test]
    fn test_kind_serde_shape() {
        let kind = CouponKind::Percentage { percent: Percent::from_whole(20) };
        let json = serde_json::to_value(kind).unwrap();
        assert_eq!(json["type"], "percentage");
        assert_eq!(json["percent"], 2000);
    }
}
