//! # Checkout
//!
//! Turns the user's active cart into an order in one SQLite transaction.
//!
//! ## Stages
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pre-checks (pool)     active non-empty cart, address owned by user    │
//! │       │                                                                 │
//! │  BEGIN ────────────────────────────────────────────────────────────┐   │
//! │       │                                                             │   │
//! │  Validating            lock cart row (write first), re-read cart,  │   │
//! │       │                read stock of every line                    │   │
//! │       ▼                                                             │   │
//! │  StockReserved         guarded decrement per line                  │   │
//! │       ▼                                                             │   │
//! │  OrderCreated          coupon re-checked, order + items inserted   │   │
//! │       ▼                                                             │   │
//! │  CouponRecorded        guarded used_count increment + usage row    │   │
//! │       ▼                                                             │   │
//! │  CartClosed            Active → CheckedOut, order_id stored        │   │
//! │       ▼                                                             │   │
//! │  COMMIT → Committed         any error → ROLLBACK → Aborted ────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! SQLite has one writer at a time. The first statement of the transaction
//! is an UPDATE on the cart row, so the transaction holds the write lock
//! before it reads stock or the coupon; concurrent checkouts queue on the
//! busy timeout and see each other's committed decrements. The guarded
//! updates (`stock >= q`, `used_count < usage_limit`) and the table CHECKs
//! back this up.
//!
//! While the transaction is open no other pool connection is used: an
//! in-memory database has exactly one connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, error, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{DbError, StoreError, StoreResult};
use crate::ledger::{CouponLedger, Redemption};
use crate::repository::address::AddressRepository;
use crate::repository::cart::CartRepository;
use crate::repository::coupon::CouponRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;
use bazaar_core::{
    Address, Cart, CoreError, FulfillmentStatus, Order, OrderItem, PaymentDetails, PaymentMethod,
    PaymentStatus, StoreSettings,
};

// =============================================================================
// Types
// =============================================================================

/// Where a checkout got to. Logged when a checkout aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    Validating,
    StockReserved,
    OrderCreated,
    CouponRecorded,
    CartClosed,
    Committed,
    Aborted,
}

/// Stock left for a product after the checkout committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockLevel {
    pub product_id: String,
    pub remaining: i64,
}

/// What a successful checkout returns.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderSummary {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: PaymentDetails,
    pub shipping_address: Address,
    pub remaining_stock: Vec<StockLevel>,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
    settings: StoreSettings,
    products: ProductRepository,
    addresses: AddressRepository,
    carts: CartRepository,
    coupons: CouponRepository,
    orders: OrderRepository,
    ledger: CouponLedger,
}

impl CheckoutService {
    pub fn new(pool: SqlitePool, settings: StoreSettings) -> Self {
        CheckoutService {
            products: ProductRepository::new(pool.clone()),
            addresses: AddressRepository::new(pool.clone()),
            carts: CartRepository::new(pool.clone()),
            coupons: CouponRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            ledger: CouponLedger::new(pool.clone()),
            pool,
            settings,
        }
    }

    /// Places an order for the user's active cart.
    ///
    /// ## Errors
    /// - `EmptyCart`: no active cart, or no lines
    /// - `InvalidAddress`: address missing or owned by someone else
    /// - `InsufficientStock`: a line exceeds stock; nothing is decremented
    /// - coupon errors when the applied coupon no longer qualifies
    /// - `CouponLimitReached`: a concurrent checkout took the last redemption
    /// - `CartNotActive`: the cart was checked out concurrently
    ///
    /// Every error leaves stock, coupons, orders and the cart untouched.
    pub async fn complete(
        &self,
        user_id: &str,
        address_id: &str,
        payment_method: PaymentMethod,
    ) -> StoreResult<OrderSummary> {
        let tenant_id = &self.settings.tenant_id;

        let cart = self
            .carts
            .find_active(tenant_id, user_id)
            .await?
            .ok_or(CoreError::EmptyCart)?;
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let address = self
            .addresses
            .find_for_user(tenant_id, user_id, address_id)
            .await?
            .ok_or_else(|| CoreError::InvalidAddress(address_id.to_string()))?;

        info!(cart_id = %cart.id, user_id = %user_id, lines = cart.lines.len(), "Checkout started");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;
        let mut stage = CheckoutStage::Validating;

        match self
            .run(&mut tx, &cart.id, address, payment_method, &mut stage)
            .await
        {
            Ok(summary) => {
                tx.commit().await.map_err(DbError::from)?;
                info!(
                    order_number = %summary.order.order_number,
                    total = summary.order.total_cents,
                    stage = ?CheckoutStage::Committed,
                    "Checkout committed"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(
                    cart_id = %cart.id,
                    stage = ?stage,
                    next = ?CheckoutStage::Aborted,
                    code = e.code(),
                    "Checkout aborted"
                );
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        cart_id: &str,
        address: Address,
        payment_method: PaymentMethod,
        stage: &mut CheckoutStage,
    ) -> StoreResult<OrderSummary> {
        let now = Utc::now();

        // Validating
        if !self.carts.lock_active_tx(tx, cart_id, now).await? {
            return Err(CoreError::CartNotActive(cart_id.to_string()).into());
        }
        let mut cart = self
            .carts
            .get_by_id_tx(tx, cart_id)
            .await?
            .ok_or_else(|| CoreError::CartNotActive(cart_id.to_string()))?;
        cart.ensure_active()?;
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        self.validate_stock(tx, &cart).await?;

        // StockReserved
        for line in &cart.lines {
            if !self
                .products
                .decrement_stock_tx(tx, &line.product_id, line.quantity)
                .await?
            {
                let available = self.products.stock_tx(tx, &line.product_id).await?.unwrap_or(0);
                return Err(insufficient(&line.product_id, available, line.quantity));
            }
        }
        *stage = CheckoutStage::StockReserved;

        // OrderCreated
        self.revalidate_coupon(tx, &mut cart, now).await?;

        let (order, items) = build_order(&cart, address, payment_method, now);
        if !order.is_balanced() {
            return Err(DbError::Internal(format!("unbalanced order {}", order.order_number)).into());
        }
        self.orders.insert_tx(tx, &order, &items).await?;
        *stage = CheckoutStage::OrderCreated;

        // CouponRecorded
        if let Some(applied) = &cart.applied_coupon {
            self.ledger
                .record_usage(
                    tx,
                    &Redemption {
                        coupon_id: &applied.coupon_id,
                        coupon_code: &applied.code,
                        user_id: &cart.user_id,
                        order_id: &order.id,
                        discount: applied.discount_amount,
                        order_amount: order.subtotal(),
                        used_at: now,
                    },
                )
                .await?;
            *stage = CheckoutStage::CouponRecorded;
        }

        // CartClosed
        let payment = cart.payment_details();
        cart.mark_checked_out(order.id.clone(), now)?;
        if !self.carts.close_tx(tx, &cart).await? {
            return Err(CoreError::CartNotActive(cart.id.clone()).into());
        }
        *stage = CheckoutStage::CartClosed;

        let mut remaining_stock = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let remaining = self.products.stock_tx(tx, &line.product_id).await?.unwrap_or(0);
            remaining_stock.push(StockLevel {
                product_id: line.product_id.clone(),
                remaining,
            });
        }

        Ok(OrderSummary {
            shipping_address: order.shipping_address.clone(),
            order,
            items,
            payment,
            remaining_stock,
        })
    }

    /// Reads stock for every line before anything is decremented.
    /// Products withdrawn from sale since they were added are rejected.
    async fn validate_stock(&self, tx: &mut Transaction<'_, Sqlite>, cart: &Cart) -> StoreResult<()> {
        for line in &cart.lines {
            let (available, is_active) = self
                .products
                .availability_tx(tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            if !is_active {
                return Err(CoreError::ProductUnavailable(line.product_id.clone()).into());
            }
            if available < line.quantity {
                return Err(insufficient(&line.product_id, available, line.quantity));
            }
        }
        debug!(cart_id = %cart.id, "Stock validated");
        Ok(())
    }

    /// Recomputes the applied coupon from its current row.
    ///
    /// A coupon that stopped qualifying since it was applied aborts the
    /// checkout with the rule that failed.
    async fn revalidate_coupon(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        cart: &mut Cart,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let (coupon_id, code) = match &cart.applied_coupon {
            Some(applied) => (applied.coupon_id.clone(), applied.code.clone()),
            None => {
                cart.recompute_totals();
                return Ok(());
            }
        };

        let coupon = self
            .coupons
            .get_by_id_tx(tx, &coupon_id)
            .await?
            .ok_or(CoreError::CouponNotFound(code))?;

        cart.recompute_totals();
        cart.apply_coupon(&coupon, now)?;
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn insufficient(product_id: &str, available: i64, requested: i64) -> StoreError {
    CoreError::InsufficientStock {
        product_id: product_id.to_string(),
        available,
        requested,
    }
    .into()
}

/// Snapshots the cart into an order and its items.
fn build_order(
    cart: &Cart,
    address: Address,
    payment_method: PaymentMethod,
    now: DateTime<Utc>,
) -> (Order, Vec<OrderItem>) {
    let order_id = Uuid::new_v4().to_string();
    let subtotal = cart.subtotal();
    let discount = cart.totals.coupon_discount;
    let delivery_fee = cart.totals.delivery_fee;

    let items = cart
        .lines
        .iter()
        .map(|line| OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.clone(),
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            unit_price_cents: line.unit_price.cents(),
            discount_bps: line.discount.bps(),
            discounted_unit_price_cents: line.discounted_unit_price().cents(),
            quantity: line.quantity,
            line_total_cents: line.line_subtotal().cents(),
            product_image: line.product_image.clone(),
            created_at: now,
        })
        .collect();

    let order = Order {
        id: order_id,
        tenant_id: cart.tenant_id.clone(),
        order_number: generate_order_number(now),
        user_id: cart.user_id.clone(),
        cart_id: cart.id.clone(),
        shipping_address: address,
        payment_method,
        payment_status: PaymentStatus::Paid,
        fulfillment_status: FulfillmentStatus::Unfulfilled,
        coupon_code: cart.applied_coupon.as_ref().map(|a| a.code.clone()),
        subtotal_cents: subtotal.cents(),
        discount_cents: discount.cents(),
        delivery_fee_cents: delivery_fee.cents(),
        total_cents: (subtotal - discount + delivery_fee).cents(),
        created_at: now,
        updated_at: now,
    };

    (order, items)
}

/// Generates an order number.
///
/// ## Format
/// `BZ-YYYYMMDD-HHMMSS-XXXXXXXX`
/// - date and time of checkout (UTC)
/// - 8 random hex digits, so concurrent checkouts in the same second differ
///
/// ## Example
/// `BZ-20260131-142501-3F9A1C2B`
fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "BZ-{}-{}",
        now.format("%Y%m%d-%H%M%S"),
        suffix[..8].to_ascii_uppercase()
    )
}
