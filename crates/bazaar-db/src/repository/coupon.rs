//! # Coupon Repository
//!
//! Coupon rows and their mapping to the typed `Coupon`.
//!
//! ## Column Mapping
//! ```text
//! CouponScope::Product { product_id }        → scope_product_id
//! CouponScope::Collection { collection_id }  → scope_collection_id
//!
//! CouponKind::Percentage { percent }         → ('percentage', bps)
//! CouponKind::FlatAmount { amount }          → ('flat_amount', cents)
//! ```
//!
//! `used_count` is never written here. Redemptions go through the coupon
//! ledger inside the checkout transaction.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::types::Percent;
use bazaar_core::{Coupon, CouponKind, CouponScope, Money};

const COUPON_COLUMNS: &str = r#"
    id, tenant_id, code, scope_product_id, scope_collection_id,
    discount_kind, discount_value, expires_at, usage_limit, used_count,
    minimum_order_cents, is_active, created_by, created_at, updated_at
"#;

const KIND_PERCENTAGE: &str = "percentage";
const KIND_FLAT_AMOUNT: &str = "flat_amount";

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct CouponRow {
    id: String,
    tenant_id: String,
    code: String,
    scope_product_id: Option<String>,
    scope_collection_id: Option<String>,
    discount_kind: String,
    discount_value: i64,
    expires_at: DateTime<Utc>,
    usage_limit: Option<i64>,
    used_count: i64,
    minimum_order_cents: Option<i64>,
    is_active: bool,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DbError;

    fn try_from(row: CouponRow) -> DbResult<Coupon> {
        let scope = match (row.scope_product_id, row.scope_collection_id) {
            (Some(product_id), None) => CouponScope::Product { product_id },
            (None, Some(collection_id)) => CouponScope::Collection { collection_id },
            _ => {
                return Err(DbError::corrupt(
                    format!("coupon {}", row.code),
                    "exactly one scope column must be set",
                ))
            }
        };

        let kind = match row.discount_kind.as_str() {
            KIND_PERCENTAGE => {
                let bps = u32::try_from(row.discount_value)
                    .map_err(|e| DbError::corrupt(format!("coupon {}", row.code), e))?;
                CouponKind::Percentage {
                    percent: Percent::from_bps(bps),
                }
            }
            KIND_FLAT_AMOUNT => CouponKind::FlatAmount {
                amount: Money::from_cents(row.discount_value),
            },
            other => {
                return Err(DbError::corrupt(
                    format!("coupon {}", row.code),
                    format!("unknown discount kind '{}'", other),
                ))
            }
        };

        Ok(Coupon {
            id: row.id,
            tenant_id: row.tenant_id,
            code: row.code,
            scope,
            kind,
            expires_at: row.expires_at,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            minimum_order: row.minimum_order_cents.map(Money::from_cents),
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn kind_columns(kind: &CouponKind) -> (&'static str, i64) {
    match kind {
        CouponKind::Percentage { percent } => (KIND_PERCENTAGE, i64::from(percent.bps())),
        CouponKind::FlatAmount { amount } => (KIND_FLAT_AMOUNT, amount.cents()),
    }
}

fn scope_columns(scope: &CouponScope) -> (Option<&str>, Option<&str>) {
    match scope {
        CouponScope::Product { product_id } => (Some(product_id.as_str()), None),
        CouponScope::Collection { collection_id } => (None, Some(collection_id.as_str())),
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Looks up a coupon by its normalized code.
    pub async fn get_by_code(&self, tenant_id: &str, code: &str) -> DbResult<Option<Coupon>> {
        debug!(code = %code, "Loading coupon by code");

        let sql = format!(
            "SELECT {} FROM coupons WHERE tenant_id = ?1 AND code = ?2",
            COUPON_COLUMNS
        );
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(tenant_id)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Coupon>> {
        let sql = format!(
            "SELECT {} FROM coupons WHERE tenant_id = ?1 AND id = ?2",
            COUPON_COLUMNS
        );
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Coupons created by one vendor/admin, newest first.
    pub async fn list_for_creator(&self, tenant_id: &str, created_by: &str) -> DbResult<Vec<Coupon>> {
        let sql = format!(
            "SELECT {} FROM coupons WHERE tenant_id = ?1 AND created_by = ?2 ORDER BY created_at DESC",
            COUPON_COLUMNS
        );
        let rows = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(tenant_id)
            .bind(created_by)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// Inserts a new coupon.
    ///
    /// ## Errors
    /// `UniqueViolation` when the code already exists for the tenant.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(code = %coupon.code, created_by = %coupon.created_by, "Inserting coupon");

        let (scope_product_id, scope_collection_id) = scope_columns(&coupon.scope);
        let (discount_kind, discount_value) = kind_columns(&coupon.kind);

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, tenant_id, code, scope_product_id, scope_collection_id,
                discount_kind, discount_value, expires_at, usage_limit, used_count,
                minimum_order_cents, is_active, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.tenant_id)
        .bind(&coupon.code)
        .bind(scope_product_id)
        .bind(scope_collection_id)
        .bind(discount_kind)
        .bind(discount_value)
        .bind(coupon.expires_at)
        .bind(coupon.usage_limit)
        .bind(coupon.used_count)
        .bind(coupon.minimum_order.map(|m| m.cents()))
        .bind(coupon.is_active)
        .bind(&coupon.created_by)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: coupon.code.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    /// Sets `is_active = false`. Returns `false` if the coupon doesn't exist.
    pub async fn deactivate(&self, tenant_id: &str, id: &str, now: DateTime<Utc>) -> DbResult<bool> {
        debug!(id = %id, "Deactivating coupon");

        let result = sqlx::query(
            "UPDATE coupons SET is_active = 0, updated_at = ?3 WHERE tenant_id = ?1 AND id = ?2",
        )
        .bind(tenant_id)
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Deletes a coupon that has never been redeemed.
    ///
    /// Returns `false` when the coupon has redemptions (or doesn't exist);
    /// redeemed coupons stay for the usage ledger.
    pub async fn delete_unused(&self, tenant_id: &str, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting unused coupon");

        let result = sqlx::query(
            r#"
            DELETE FROM coupons
            WHERE tenant_id = ?1
              AND id = ?2
              AND used_count = 0
              AND NOT EXISTS (SELECT 1 FROM coupon_usages WHERE coupon_id = ?2)
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Transaction-scoped operations (checkout)
    // =========================================================================

    /// Re-reads a coupon inside the checkout transaction.
    pub async fn get_by_id_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
    ) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {} FROM coupons WHERE id = ?1", COUPON_COLUMNS);
        let row = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        row.map(Coupon::try_from).transpose()
    }
}
