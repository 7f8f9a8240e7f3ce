//! # Order Repository
//!
//! Orders are written once, inside the checkout transaction, and read
//! afterwards. The only later change is the fulfillment flag.
//!
//! ## Snapshot Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  orders.shipping_address_json   address as it was at checkout          │
//! │  order_items.product_name       name as it was at checkout             │
//! │  order_items.unit_price_cents   price as it was at checkout            │
//! │  order_items.discount_bps       discount as it was at checkout         │
//! │                                                                         │
//! │  Later catalog or address edits never change a placed order.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::{Address, FulfillmentStatus, Order, OrderItem, PaymentMethod, PaymentStatus};

const ORDER_COLUMNS: &str = r#"
    id, tenant_id, order_number, user_id, cart_id, shipping_address_json,
    payment_method, payment_status, fulfillment_status, coupon_code,
    subtotal_cents, discount_cents, delivery_fee_cents, total_cents,
    created_at, updated_at
"#;

const ORDER_ITEM_COLUMNS: &str = r#"
    id, order_id, product_id, product_name, unit_price_cents, discount_bps,
    discounted_unit_price_cents, quantity, line_total_cents, product_image,
    created_at
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    tenant_id: String,
    order_number: String,
    user_id: String,
    cart_id: String,
    shipping_address_json: String,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    fulfillment_status: FulfillmentStatus,
    coupon_code: Option<String>,
    subtotal_cents: i64,
    discount_cents: i64,
    delivery_fee_cents: i64,
    total_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Order> {
        let shipping_address: Address = serde_json::from_str(&row.shipping_address_json)
            .map_err(|e| DbError::corrupt(format!("order {} address", row.order_number), e))?;

        Ok(Order {
            id: row.id,
            tenant_id: row.tenant_id,
            order_number: row.order_number,
            user_id: row.user_id,
            cart_id: row.cart_id,
            shipping_address,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            fulfillment_status: row.fulfillment_status,
            coupon_code: row.coupon_code,
            subtotal_cents: row.subtotal_cents,
            discount_cents: row.discount_cents,
            delivery_fee_cents: row.delivery_fee_cents,
            total_cents: row.total_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by its ID.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Order>> {
        debug!(id = %id, "Loading order");

        let sql = format!(
            "SELECT {} FROM orders WHERE tenant_id = ?1 AND id = ?2",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Gets an order by its human-facing number.
    pub async fn get_by_number(&self, tenant_id: &str, order_number: &str) -> DbResult<Option<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE tenant_id = ?1 AND order_number = ?2",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(tenant_id)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// A user's orders, newest first.
    pub async fn list_for_user(&self, tenant_id: &str, user_id: &str) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE tenant_id = ?1 AND user_id = ?2 ORDER BY created_at DESC",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(tenant_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Gets all items for an order, in cart line order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let sql = format!(
            "SELECT {} FROM order_items WHERE order_id = ?1 ORDER BY rowid",
            ORDER_ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Sets the fulfillment flag. Payment status is untouched.
    pub async fn set_fulfillment_status(
        &self,
        tenant_id: &str,
        id: &str,
        status: FulfillmentStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, status = ?status, "Updating fulfillment status");

        let result = sqlx::query(
            "UPDATE orders SET fulfillment_status = ?3, updated_at = ?4 WHERE tenant_id = ?1 AND id = ?2",
        )
        .bind(tenant_id)
        .bind(id)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    // =========================================================================
    // Transaction-scoped operations (checkout)
    // =========================================================================

    /// Inserts an order and its items.
    ///
    /// The orders table CHECKs the money invariant, so an unbalanced order
    /// fails here with `CheckViolation`.
    pub async fn insert_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        order: &Order,
        items: &[OrderItem],
    ) -> DbResult<()> {
        debug!(
            order_number = %order.order_number,
            items = items.len(),
            total = order.total_cents,
            "Inserting order"
        );

        let address_json = serde_json::to_string(&order.shipping_address)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, tenant_id, order_number, user_id, cart_id, shipping_address_json,
                payment_method, payment_status, fulfillment_status, coupon_code,
                subtotal_cents, discount_cents, delivery_fee_cents, total_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&order.id)
        .bind(&order.tenant_id)
        .bind(&order.order_number)
        .bind(&order.user_id)
        .bind(&order.cart_id)
        .bind(&address_json)
        .bind(order.payment_method)
        .bind(order.payment_status)
        .bind(order.fulfillment_status)
        .bind(&order.coupon_code)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.delivery_fee_cents)
        .bind(order.total_cents)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut **tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, product_name, unit_price_cents, discount_bps,
                    discounted_unit_price_cents, quantity, line_total_cents, product_image,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.unit_price_cents)
            .bind(item.discount_bps)
            .bind(item.discounted_unit_price_cents)
            .bind(item.quantity)
            .bind(item.line_total_cents)
            .bind(&item.product_image)
            .bind(item.created_at)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}
