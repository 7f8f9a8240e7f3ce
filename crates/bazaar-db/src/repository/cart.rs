//! # Cart Repository
//!
//! Persists carts as one row with typed JSON columns.
//!
//! ## Row Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  carts                                                                  │
//! │  ├── lines_json            [CartLine, ...]   unique by product_id      │
//! │  ├── applied_coupon_json   CouponApplication | NULL                    │
//! │  ├── *_cents               persisted totals (never computed on read)   │
//! │  ├── status                'active' | 'checked_out'                    │
//! │  └── order_id              set when checked out                        │
//! │                                                                         │
//! │  UNIQUE (tenant_id, user_id) WHERE status = 'active'                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! JSON columns are validated on read: malformed JSON or duplicate product
//! ids surface as `DbError::Corrupt` instead of a silently wrong cart.
//!
//! Every write is guarded by `status = 'active'`, so a checked-out cart is
//! never modified again.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::{Cart, CartLine, CartStatus, CartTotals, CouponApplication, Money};

const CART_COLUMNS: &str = r#"
    id, tenant_id, user_id, lines_json, applied_coupon_json,
    bag_total_cents, product_discount_cents, coupon_discount_cents,
    delivery_fee_cents, amount_payable_cents, status, order_id,
    created_at, updated_at, checked_out_at
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct CartRow {
    id: String,
    tenant_id: String,
    user_id: String,
    lines_json: String,
    applied_coupon_json: Option<String>,
    bag_total_cents: i64,
    product_discount_cents: i64,
    coupon_discount_cents: i64,
    delivery_fee_cents: i64,
    amount_payable_cents: i64,
    status: CartStatus,
    order_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    checked_out_at: Option<DateTime<Utc>>,
}

impl TryFrom<CartRow> for Cart {
    type Error = DbError;

    fn try_from(row: CartRow) -> DbResult<Cart> {
        let lines: Vec<CartLine> = serde_json::from_str(&row.lines_json)
            .map_err(|e| DbError::corrupt(format!("cart {} lines", row.id), e))?;

        let applied_coupon: Option<CouponApplication> = row
            .applied_coupon_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| DbError::corrupt(format!("cart {} coupon", row.id), e))?;

        let cart = Cart {
            id: row.id,
            tenant_id: row.tenant_id,
            user_id: row.user_id,
            lines,
            applied_coupon,
            delivery_fee: Money::from_cents(row.delivery_fee_cents),
            status: row.status,
            totals: CartTotals {
                bag_total: Money::from_cents(row.bag_total_cents),
                product_discount_total: Money::from_cents(row.product_discount_cents),
                coupon_discount: Money::from_cents(row.coupon_discount_cents),
                delivery_fee: Money::from_cents(row.delivery_fee_cents),
                amount_payable: Money::from_cents(row.amount_payable_cents),
            },
            order_id: row.order_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            checked_out_at: row.checked_out_at,
        };

        if !cart.has_unique_lines() {
            return Err(DbError::corrupt(
                format!("cart {} lines", cart.id),
                "duplicate product_id",
            ));
        }

        Ok(cart)
    }
}

struct CartJson {
    lines: String,
    coupon: Option<String>,
}

fn encode(cart: &Cart) -> DbResult<CartJson> {
    let lines = serde_json::to_string(&cart.lines).map_err(|e| DbError::Internal(e.to_string()))?;
    let coupon = cart
        .applied_coupon
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DbError::Internal(e.to_string()))?;
    Ok(CartJson { lines, coupon })
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for cart persistence.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// The user's active cart, if any.
    pub async fn find_active(&self, tenant_id: &str, user_id: &str) -> DbResult<Option<Cart>> {
        debug!(user_id = %user_id, "Loading active cart");

        let sql = format!(
            "SELECT {} FROM carts WHERE tenant_id = ?1 AND user_id = ?2 AND status = 'active'",
            CART_COLUMNS
        );
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(tenant_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Cart::try_from).transpose()
    }

    /// Any cart by id, including checked-out ones.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Cart>> {
        let sql = format!("SELECT {} FROM carts WHERE id = ?1", CART_COLUMNS);
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Cart::try_from).transpose()
    }

    /// Inserts a new cart.
    ///
    /// A second active cart for the same user fails with `UniqueViolation`.
    pub async fn insert(&self, cart: &Cart) -> DbResult<()> {
        debug!(cart_id = %cart.id, user_id = %cart.user_id, "Inserting cart");

        let json = encode(cart)?;
        sqlx::query(
            r#"
            INSERT INTO carts (
                id, tenant_id, user_id, lines_json, applied_coupon_json,
                bag_total_cents, product_discount_cents, coupon_discount_cents,
                delivery_fee_cents, amount_payable_cents, status, order_id,
                created_at, updated_at, checked_out_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&cart.id)
        .bind(&cart.tenant_id)
        .bind(&cart.user_id)
        .bind(&json.lines)
        .bind(&json.coupon)
        .bind(cart.totals.bag_total.cents())
        .bind(cart.totals.product_discount_total.cents())
        .bind(cart.totals.coupon_discount.cents())
        .bind(cart.delivery_fee.cents())
        .bind(cart.totals.amount_payable.cents())
        .bind(cart.status)
        .bind(&cart.order_id)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .bind(cart.checked_out_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Saves lines, coupon and totals of an active cart.
    ///
    /// ## Returns
    /// `false` if the cart is no longer active (checked out meanwhile).
    pub async fn save(&self, cart: &Cart) -> DbResult<bool> {
        debug!(cart_id = %cart.id, lines = cart.lines.len(), "Saving cart");

        let json = encode(cart)?;
        let result = sqlx::query(
            r#"
            UPDATE carts SET
                lines_json = ?2,
                applied_coupon_json = ?3,
                bag_total_cents = ?4,
                product_discount_cents = ?5,
                coupon_discount_cents = ?6,
                delivery_fee_cents = ?7,
                amount_payable_cents = ?8,
                updated_at = ?9
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(&cart.id)
        .bind(&json.lines)
        .bind(&json.coupon)
        .bind(cart.totals.bag_total.cents())
        .bind(cart.totals.product_discount_total.cents())
        .bind(cart.totals.coupon_discount.cents())
        .bind(cart.delivery_fee.cents())
        .bind(cart.totals.amount_payable.cents())
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Transaction-scoped operations (checkout)
    // =========================================================================

    /// Write-first lock on an active cart.
    ///
    /// Bumping `updated_at` makes this transaction the SQLite writer before
    /// it reads anything. Returns `false` when the cart is no longer active.
    pub async fn lock_active_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        cart_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE carts SET updated_at = ?2 WHERE id = ?1 AND status = 'active'",
        )
        .bind(cart_id)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Reads a cart inside the checkout transaction.
    pub async fn get_by_id_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
    ) -> DbResult<Option<Cart>> {
        let sql = format!("SELECT {} FROM carts WHERE id = ?1", CART_COLUMNS);
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        row.map(Cart::try_from).transpose()
    }

    /// Active → CheckedOut, storing the final totals and the order id.
    ///
    /// `cart` must already be marked checked out in memory.
    pub async fn close_tx(&self, tx: &mut Transaction<'_, Sqlite>, cart: &Cart) -> DbResult<bool> {
        debug!(cart_id = %cart.id, order_id = ?cart.order_id, "Closing cart");

        let json = encode(cart)?;
        let result = sqlx::query(
            r#"
            UPDATE carts SET
                lines_json = ?2,
                applied_coupon_json = ?3,
                bag_total_cents = ?4,
                product_discount_cents = ?5,
                coupon_discount_cents = ?6,
                amount_payable_cents = ?7,
                status = ?8,
                order_id = ?9,
                checked_out_at = ?10,
                updated_at = ?10
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(&cart.id)
        .bind(&json.lines)
        .bind(&json.coupon)
        .bind(cart.totals.bag_total.cents())
        .bind(cart.totals.product_discount_total.cents())
        .bind(cart.totals.coupon_discount.cents())
        .bind(cart.totals.amount_payable.cents())
        .bind(cart.status)
        .bind(&cart.order_id)
        .bind(cart.checked_out_at)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
