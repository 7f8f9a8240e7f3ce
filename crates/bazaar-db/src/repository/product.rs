//! # Product Repository
//!
//! Reads catalog products and decrements stock at checkout.
//!
//! The catalog is owned by another service; this repository only inserts
//! rows for seeding and tests.
//!
//! ## Guarded Stock Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products SET stock = stock - :qty                              │
//! │  WHERE id = :id AND stock >= :qty                                      │
//! │                                                                         │
//! │  rows_affected = 1  → decremented                                      │
//! │  rows_affected = 0  → someone else got there first: InsufficientStock  │
//! │                                                                         │
//! │  The WHERE clause is a compare-and-swap; stock can never go below 0    │
//! │  even if two writers raced past the validation read.                   │
//! │  CHECK (stock >= 0) backs it up at the schema level.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bazaar_core::Product;

const PRODUCT_COLUMNS: &str = r#"
    id, tenant_id, collection_id, name, price_cents, discount_bps,
    stock, image, is_active, created_at, updated_at
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID, scoped to a tenant.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        debug!(id = %id, "Loading product");

        let sql = format!(
            "SELECT {} FROM products WHERE id = ?1 AND tenant_id = ?2",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, collection_id, name, price_cents, discount_bps,
                stock, image, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.collection_id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.discount_bps)
        .bind(product.stock)
        .bind(&product.image)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Sets the stock level (restocking from the catalog side).
    pub async fn set_stock(&self, id: &str, stock: i64) -> DbResult<()> {
        debug!(id = %id, stock = %stock, "Setting stock");

        let result = sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(stock)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Current stock for a product, or `None` if it doesn't exist.
    pub async fn stock(&self, id: &str) -> DbResult<Option<i64>> {
        let stock = sqlx::query_scalar::<_, i64>("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(stock)
    }

    // =========================================================================
    // Transaction-scoped operations (checkout)
    // =========================================================================

    /// Reads stock inside the checkout transaction.
    pub async fn stock_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
    ) -> DbResult<Option<i64>> {
        let stock = sqlx::query_scalar::<_, i64>("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(stock)
    }

    /// Reads `(stock, is_active)` inside the checkout transaction.
    pub async fn availability_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
    ) -> DbResult<Option<(i64, bool)>> {
        let row = sqlx::query_as::<_, (i64, bool)>(
            "SELECT stock, is_active FROM products WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    /// Guarded decrement. Returns `false` when the guard missed.
    pub async fn decrement_stock_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        debug!(id = %id, quantity = %quantity, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
