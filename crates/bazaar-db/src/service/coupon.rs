//! # Coupon Service
//!
//! Coupon administration for vendors and admins, plus the read-only
//! quote used by storefronts before a coupon is applied.
//!
//! ## Removal Policy
//! ```text
//! delete(id)
//!   ├── never redeemed  → row deleted               CouponRemoval::Deleted
//!   └── redeemed        → is_active = false         CouponRemoval::Deactivated
//!                         (usage ledger keeps its coupon)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{DbError, StoreResult};
use crate::ledger::CouponLedger;
use crate::repository::coupon::CouponRepository;
use crate::repository::product::ProductRepository;
use bazaar_core::coupon::{normalize_code, CouponContext};
use bazaar_core::validation::{
    validate_amount_cents, validate_coupon_code, validate_expiry, validate_flat_amount_cents,
    validate_percentage_bps, validate_usage_limit, validate_uuid,
};
use bazaar_core::{
    CoreError, Coupon, CouponKind, CouponQuote, CouponScope, CouponUsageRecord, CouponUsageStats,
    Money, StoreSettings, ValidationError,
};

/// Input for [`CouponService::create`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCoupon {
    pub code: String,
    pub scope: CouponScope,
    pub kind: CouponKind,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    pub usage_limit: Option<i64>,
    pub minimum_order: Option<Money>,
    pub created_by: String,
}

/// What [`CouponService::delete`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CouponRemoval {
    Deleted,
    Deactivated,
}

#[derive(Debug, Clone)]
pub struct CouponService {
    settings: StoreSettings,
    coupons: CouponRepository,
    products: ProductRepository,
    ledger: CouponLedger,
}

impl CouponService {
    pub fn new(pool: SqlitePool, settings: StoreSettings) -> Self {
        CouponService {
            settings,
            coupons: CouponRepository::new(pool.clone()),
            products: ProductRepository::new(pool.clone()),
            ledger: CouponLedger::new(pool),
        }
    }

    /// Previews what a coupon would do to an order, without applying it.
    ///
    /// `product_ids` are the products in the order; their collections are
    /// looked up for collection-scoped coupons. Unknown ids only match
    /// product scopes.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let quote = db.coupon_service()
    ///     .validate("save20", Money::from_cents(100000), &[product_id])
    ///     .await?;
    /// assert_eq!(quote.discount_amount.cents(), 20000);
    /// ```
    pub async fn validate(
        &self,
        code: &str,
        order_amount: Money,
        product_ids: &[String],
    ) -> StoreResult<CouponQuote> {
        let coupon = self.get_by_code(code).await?;

        let mut pairs = Vec::with_capacity(product_ids.len());
        for id in product_ids {
            let collection = self
                .products
                .get_by_id(&self.settings.tenant_id, id)
                .await?
                .and_then(|p| p.collection_id);
            pairs.push((id.as_str(), collection));
        }
        let ctx = CouponContext::from_products(pairs.iter().map(|(id, c)| (*id, c.as_deref())));

        Ok(coupon.quote(order_amount, &ctx, Utc::now())?)
    }

    /// Creates a coupon.
    ///
    /// ## Validation
    /// - code: 3..=32 of `[A-Za-z0-9_-]`, stored upper-cased, unique per tenant
    /// - percentage: 0% < value <= 100%; flat amount: > 0
    /// - usage limit > 0 when set; minimum order >= 0 when set
    /// - expiry in the future
    pub async fn create(&self, input: NewCoupon) -> StoreResult<Coupon> {
        let now = Utc::now();
        let code = normalize_code(&input.code);

        validate_coupon_code(&code)?;
        match input.kind {
            CouponKind::Percentage { percent } => validate_percentage_bps(percent.bps())?,
            CouponKind::FlatAmount { amount } => validate_flat_amount_cents(amount.cents())?,
        }
        validate_usage_limit(input.usage_limit)?;
        if let Some(minimum) = input.minimum_order {
            validate_amount_cents("minimum_order", minimum.cents())?;
        }
        validate_expiry(input.expires_at, now)?;

        let scope_id = match &input.scope {
            CouponScope::Product { product_id } => product_id,
            CouponScope::Collection { collection_id } => collection_id,
        };
        if scope_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "scope".to_string(),
            }
            .into());
        }
        if input.created_by.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "created_by".to_string(),
            }
            .into());
        }

        let coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            tenant_id: self.settings.tenant_id.clone(),
            code,
            scope: input.scope,
            kind: input.kind,
            expires_at: input.expires_at,
            usage_limit: input.usage_limit,
            used_count: 0,
            minimum_order: input.minimum_order,
            is_active: true,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        };

        match self.coupons.insert(&coupon).await {
            Ok(()) => {}
            Err(DbError::UniqueViolation { .. }) => {
                return Err(ValidationError::Duplicate {
                    field: "code".to_string(),
                    value: coupon.code,
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        }

        info!(code = %coupon.code, created_by = %coupon.created_by, "Coupon created");
        Ok(coupon)
    }

    /// Looks up a coupon by code (case-insensitive).
    pub async fn get_by_code(&self, code: &str) -> StoreResult<Coupon> {
        let code = normalize_code(code);
        let coupon = self
            .coupons
            .get_by_code(&self.settings.tenant_id, &code)
            .await?
            .ok_or(CoreError::CouponNotFound(code))?;
        Ok(coupon)
    }

    /// Coupons created by one vendor or admin, newest first.
    pub async fn list_for_creator(&self, created_by: &str) -> StoreResult<Vec<Coupon>> {
        Ok(self
            .coupons
            .list_for_creator(&self.settings.tenant_id, created_by)
            .await?)
    }

    /// Stops a coupon from being applied. Carts holding it drop it on their
    /// next change; checkouts reject it.
    pub async fn deactivate(&self, coupon_id: &str) -> StoreResult<Coupon> {
        let coupon = self.get_by_id(coupon_id).await?;

        self.coupons.deactivate(&self.settings.tenant_id, &coupon.id, Utc::now()).await?;
        info!(code = %coupon.code, "Coupon deactivated");

        self.get_by_id(coupon_id).await
    }

    /// Deletes an unused coupon, or deactivates a redeemed one.
    pub async fn delete(&self, coupon_id: &str) -> StoreResult<CouponRemoval> {
        let coupon = self.get_by_id(coupon_id).await?;

        if self.coupons.delete_unused(&self.settings.tenant_id, &coupon.id).await? {
            info!(code = %coupon.code, "Coupon deleted");
            return Ok(CouponRemoval::Deleted);
        }

        self.coupons.deactivate(&self.settings.tenant_id, &coupon.id, Utc::now()).await?;
        info!(code = %coupon.code, used_count = coupon.used_count, "Redeemed coupon deactivated instead of deleted");
        Ok(CouponRemoval::Deactivated)
    }

    /// Aggregate usage for a coupon.
    pub async fn usage_stats(&self, coupon_id: &str) -> StoreResult<CouponUsageStats> {
        let coupon = self.get_by_id(coupon_id).await?;
        Ok(self.ledger.usage_stats(&coupon.id).await?)
    }

    /// Redemption history for a coupon, newest first.
    pub async fn usages(&self, coupon_id: &str, limit: i64) -> StoreResult<Vec<CouponUsageRecord>> {
        let coupon = self.get_by_id(coupon_id).await?;
        Ok(self.ledger.list_usages(&coupon.id, limit.max(0)).await?)
    }

    async fn get_by_id(&self, coupon_id: &str) -> StoreResult<Coupon> {
        validate_uuid(coupon_id)?;
        let coupon = self
            .coupons
            .get_by_id(&self.settings.tenant_id, coupon_id)
            .await?
            .ok_or_else(|| CoreError::CouponNotFound(coupon_id.to_string()))?;
        Ok(coupon)
    }
}
