//! # Coupon Ledger
//!
//! Redemption bookkeeping: the `used_count` counter and the append-only
//! `coupon_usages` table.
//!
//! ## Redemption
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_usage(tx, ...)        runs inside the checkout transaction      │
//! │                                                                         │
//! │  1. UPDATE coupons SET used_count = used_count + 1                     │
//! │     WHERE id = ? AND is_active = 1                                     │
//! │       AND (usage_limit IS NULL OR used_count < usage_limit)            │
//! │                                                                         │
//! │     0 rows → CouponLimitReached, checkout rolls back                   │
//! │                                                                         │
//! │  2. INSERT INTO coupon_usages (...)                                     │
//! │                                                                         │
//! │  Both or neither: a counted redemption always has its usage row.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult, StoreResult};
use bazaar_core::{CoreError, CouponUsageRecord, CouponUsageStats, Money};

/// A redemption to record.
#[derive(Debug, Clone)]
pub struct Redemption<'a> {
    pub coupon_id: &'a str,
    pub coupon_code: &'a str,
    pub user_id: &'a str,
    pub order_id: &'a str,
    pub discount: Money,
    pub order_amount: Money,
    pub used_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CouponLedger {
    pool: SqlitePool,
}

impl CouponLedger {
    pub fn new(pool: SqlitePool) -> Self {
        CouponLedger { pool }
    }

    /// Counts one redemption and appends its usage row.
    ///
    /// ## Errors
    /// `CouponLimitReached` when the guarded increment matched no row: the
    /// limit was hit by a concurrent checkout, or the coupon was deactivated.
    pub async fn record_usage(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        redemption: &Redemption<'_>,
    ) -> StoreResult<CouponUsageRecord> {
        debug!(
            coupon_id = %redemption.coupon_id,
            order_id = %redemption.order_id,
            discount = %redemption.discount,
            "Recording coupon usage"
        );

        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET used_count = used_count + 1, updated_at = ?2
            WHERE id = ?1
              AND is_active = 1
              AND (usage_limit IS NULL OR used_count < usage_limit)
            "#,
        )
        .bind(redemption.coupon_id)
        .bind(redemption.used_at)
        .execute(&mut **tx)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CouponLimitReached(redemption.coupon_code.to_string()).into());
        }

        let record = CouponUsageRecord {
            id: Uuid::new_v4().to_string(),
            coupon_id: redemption.coupon_id.to_string(),
            user_id: redemption.user_id.to_string(),
            order_id: redemption.order_id.to_string(),
            discount_cents: redemption.discount.cents(),
            order_amount_cents: redemption.order_amount.cents(),
            used_at: redemption.used_at,
        };

        sqlx::query(
            r#"
            INSERT INTO coupon_usages (
                id, coupon_id, user_id, order_id, discount_cents, order_amount_cents, used_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.id)
        .bind(&record.coupon_id)
        .bind(&record.user_id)
        .bind(&record.order_id)
        .bind(record.discount_cents)
        .bind(record.order_amount_cents)
        .bind(record.used_at)
        .execute(&mut **tx)
        .await
        .map_err(DbError::from)?;

        Ok(record)
    }

    /// Aggregate usage for one coupon, read in a single statement.
    pub async fn usage_stats(&self, coupon_id: &str) -> DbResult<CouponUsageStats> {
        let (uses, discount, order_value): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(discount_cents), 0),
                   COALESCE(SUM(order_amount_cents), 0)
            FROM coupon_usages
            WHERE coupon_id = ?1
            "#,
        )
        .bind(coupon_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(CouponUsageStats::from_totals(uses, discount, order_value))
    }

    /// Redemptions of one coupon, newest first.
    pub async fn list_usages(&self, coupon_id: &str, limit: i64) -> DbResult<Vec<CouponUsageRecord>> {
        let usages = sqlx::query_as::<_, CouponUsageRecord>(
            r#"
            SELECT id, coupon_id, user_id, order_id, discount_cents, order_amount_cents, used_at
            FROM coupon_usages
            WHERE coupon_id = ?1
            ORDER BY used_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(coupon_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(usages)
    }
}
