//! # Cart Service
//!
//! The shopping bag: add, update and remove lines, apply and remove a
//! coupon, and read the payment breakdown.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load active cart (or start a new one)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  mutate lines in memory        Cart::add_line / update / remove         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  re-check applied coupon       dropped with a notice if it no longer   │
//! │       │                        qualifies                               │
//! │       ▼                                                                 │
//! │  persist                       INSERT (new) or UPDATE … status='active'│
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CartSnapshot { lines, payment, notices }                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A cart has one writer (its owner), so mutations are load-modify-save.
//! The save is guarded by `status = 'active'`: a cart checked out between
//! the load and the save is reported as `CartNotActive`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::repository::cart::CartRepository;
use crate::repository::coupon::CouponRepository;
use crate::repository::product::ProductRepository;
use bazaar_core::coupon::normalize_code;
use bazaar_core::{
    Cart, CartNotice, CartSnapshot, CoreError, PaymentDetails, Product, StoreSettings,
    MAX_ITEM_QUANTITY,
};

/// An active cart plus whether it still has to be inserted.
struct LoadedCart {
    cart: Cart,
    is_new: bool,
}

#[derive(Debug, Clone)]
pub struct CartService {
    settings: StoreSettings,
    products: ProductRepository,
    carts: CartRepository,
    coupons: CouponRepository,
}

impl CartService {
    pub fn new(pool: SqlitePool, settings: StoreSettings) -> Self {
        CartService {
            settings,
            products: ProductRepository::new(pool.clone()),
            carts: CartRepository::new(pool.clone()),
            coupons: CouponRepository::new(pool),
        }
    }

    // =========================================================================
    // Lines
    // =========================================================================

    /// Adds `quantity` units of a product to the user's cart.
    ///
    /// Adding a product already in the cart increases that line and refreshes
    /// its name, price and discount from the catalog.
    ///
    /// ## Errors
    /// - `InvalidQuantity` for `quantity <= 0`
    /// - `ProductNotFound` / `ProductUnavailable`
    /// - `InsufficientStock` when the resulting line quantity exceeds stock
    /// - `QuantityTooLarge` / `CartTooLarge`
    pub async fn add_item(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> StoreResult<CartSnapshot> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity { quantity }.into());
        }

        let product = self.sellable_product(product_id).await?;
        let mut loaded = self.load_or_new(user_id).await?;
        let now = Utc::now();

        let in_cart = loaded.cart.line(product_id).map(|l| l.quantity).unwrap_or(0);
        ensure_stock(&product, requested_quantity(in_cart, quantity)?)?;

        loaded.cart.add_line(&product, quantity)?;
        let notices = self.refresh_coupon(&mut loaded.cart, now).await?;
        self.persist(&mut loaded, now).await?;

        debug!(
            cart_id = %loaded.cart.id,
            product_id = %product_id,
            quantity = quantity,
            "Item added to cart"
        );

        Ok(CartSnapshot::from_cart(&loaded.cart, notices))
    }

    /// Sets the quantity of a line. `quantity <= 0` removes the line.
    ///
    /// ## Errors
    /// - `LineNotFound` if the product is not in the cart
    /// - `InsufficientStock` when `quantity` exceeds stock
    /// - `QuantityTooLarge`
    pub async fn update_item(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> StoreResult<CartSnapshot> {
        let mut loaded = self.load_or_new(user_id).await?;
        let now = Utc::now();

        if loaded.cart.line(product_id).is_none() {
            return Err(CoreError::LineNotFound(product_id.to_string()).into());
        }

        if quantity > 0 {
            let product = self.sellable_product(product_id).await?;
            ensure_stock(&product, quantity)?;
        }

        loaded.cart.update_line_quantity(product_id, quantity)?;
        let notices = self.refresh_coupon(&mut loaded.cart, now).await?;
        self.persist(&mut loaded, now).await?;

        debug!(cart_id = %loaded.cart.id, product_id = %product_id, quantity = quantity, "Line updated");

        Ok(CartSnapshot::from_cart(&loaded.cart, notices))
    }

    /// Removes a line. Removing a product that isn't there is not an error;
    /// the snapshot carries a `LineNotFound` notice instead.
    pub async fn remove_item(&self, user_id: &str, product_id: &str) -> StoreResult<CartSnapshot> {
        let mut loaded = self.load_or_new(user_id).await?;
        let now = Utc::now();

        let mut notices = Vec::new();
        if loaded.cart.remove_line(product_id) {
            notices.extend(self.refresh_coupon(&mut loaded.cart, now).await?);
            self.persist(&mut loaded, now).await?;
            debug!(cart_id = %loaded.cart.id, product_id = %product_id, "Line removed");
        } else {
            notices.push(CartNotice::LineNotFound {
                product_id: product_id.to_string(),
            });
            if loaded.is_new {
                self.persist(&mut loaded, now).await?;
            }
        }

        Ok(CartSnapshot::from_cart(&loaded.cart, notices))
    }

    // =========================================================================
    // Coupon
    // =========================================================================

    /// Applies a coupon code to the cart, replacing any previous coupon.
    ///
    /// On any error the stored cart is left as it was.
    pub async fn apply_coupon(&self, user_id: &str, code: &str) -> StoreResult<CartSnapshot> {
        let code = normalize_code(code);
        let coupon = self
            .coupons
            .get_by_code(&self.settings.tenant_id, &code)
            .await?
            .ok_or_else(|| CoreError::CouponNotFound(code.clone()))?;

        let mut loaded = self.load_or_new(user_id).await?;
        let now = Utc::now();

        let discount = loaded.cart.apply_coupon(&coupon, now)?;
        self.persist(&mut loaded, now).await?;

        info!(
            cart_id = %loaded.cart.id,
            code = %coupon.code,
            discount = %discount,
            "Coupon applied"
        );

        Ok(CartSnapshot::from_cart(&loaded.cart, Vec::new()))
    }

    /// Clears the applied coupon, if any.
    pub async fn remove_coupon(&self, user_id: &str) -> StoreResult<CartSnapshot> {
        let mut loaded = self.load_or_new(user_id).await?;
        let now = Utc::now();

        if let Some(removed) = loaded.cart.remove_coupon() {
            self.persist(&mut loaded, now).await?;
            info!(cart_id = %loaded.cart.id, code = %removed.code, "Coupon removed");
        } else if loaded.is_new {
            self.persist(&mut loaded, now).await?;
        }

        Ok(CartSnapshot::from_cart(&loaded.cart, Vec::new()))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The user's active cart, created on first access.
    ///
    /// An applied coupon that expired or was deactivated since it was applied
    /// is dropped here, with a notice.
    pub async fn get_cart(&self, user_id: &str) -> StoreResult<CartSnapshot> {
        let mut loaded = self.load_or_new(user_id).await?;
        let now = Utc::now();

        let notices = self.refresh_coupon(&mut loaded.cart, now).await?;
        if loaded.is_new || !notices.is_empty() {
            self.persist(&mut loaded, now).await?;
        }

        Ok(CartSnapshot::from_cart(&loaded.cart, notices))
    }

    /// Payment breakdown of the user's active cart.
    pub async fn get_payment_details(&self, user_id: &str) -> StoreResult<PaymentDetails> {
        let snapshot = self.get_cart(user_id).await?;
        Ok(snapshot.payment)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn sellable_product(&self, product_id: &str) -> StoreResult<Product> {
        let product = self
            .products
            .get_by_id(&self.settings.tenant_id, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if !product.is_active {
            return Err(CoreError::ProductUnavailable(product_id.to_string()).into());
        }

        Ok(product)
    }

    async fn load_or_new(&self, user_id: &str) -> StoreResult<LoadedCart> {
        if let Some(cart) = self
            .carts
            .find_active(&self.settings.tenant_id, user_id)
            .await?
        {
            return Ok(LoadedCart { cart, is_new: false });
        }

        let cart = Cart::new(
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            &self.settings,
            Utc::now(),
        );
        Ok(LoadedCart { cart, is_new: true })
    }

    /// Re-evaluates the applied coupon against its current row.
    async fn refresh_coupon(&self, cart: &mut Cart, now: DateTime<Utc>) -> StoreResult<Vec<CartNotice>> {
        let coupon_id = match &cart.applied_coupon {
            Some(applied) => applied.coupon_id.clone(),
            None => return Ok(Vec::new()),
        };

        let coupon = self.coupons.get_by_id(&cart.tenant_id, &coupon_id).await?;
        let notice = cart.refresh_coupon(coupon.as_ref(), now);

        if let Some(CartNotice::CouponRemoved { code, reason, .. }) = &notice {
            warn!(cart_id = %cart.id, code = %code, reason = %reason, "Coupon dropped from cart");
        }

        Ok(notice.into_iter().collect())
    }

    async fn persist(&self, loaded: &mut LoadedCart, now: DateTime<Utc>) -> StoreResult<()> {
        loaded.cart.updated_at = now;

        if loaded.is_new {
            self.carts.insert(&loaded.cart).await?;
            loaded.is_new = false;
            info!(cart_id = %loaded.cart.id, user_id = %loaded.cart.user_id, "Cart created");
            return Ok(());
        }

        if !self.carts.save(&loaded.cart).await? {
            return Err(StoreError::from(CoreError::CartNotActive(loaded.cart.id.clone())));
        }

        Ok(())
    }
}

/// Quantity a line would hold after adding `quantity` to `in_cart`.
fn requested_quantity(in_cart: i64, quantity: i64) -> StoreResult<i64> {
    in_cart
        .checked_add(quantity)
        .filter(|q| *q <= MAX_ITEM_QUANTITY)
        .ok_or_else(|| {
            CoreError::QuantityTooLarge {
                requested: in_cart.saturating_add(quantity),
                max: MAX_ITEM_QUANTITY,
            }
            .into()
        })
}

fn ensure_stock(product: &Product, requested: i64) -> StoreResult<()> {
    if product.can_sell(requested) {
        return Ok(());
    }

    Err(CoreError::InsufficientStock {
        product_id: product.id.clone(),
        available: product.stock,
        requested,
    }
    .into())
}
