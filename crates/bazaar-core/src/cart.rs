//! # Cart
//!
//! The cart aggregate: lines, an optional applied coupon, and totals.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Service Call              Cart Method             State Change         │
//! │  ────────────              ───────────             ────────────         │
//! │                                                                         │
//! │  add_item ───────────────► add_line() ──────────► lines.push / qty += n │
//! │  update_item ────────────► update_line_quantity ► qty = n (0 removes)   │
//! │  remove_item ────────────► remove_line() ───────► lines.retain          │
//! │  apply_coupon ───────────► apply_coupon() ──────► applied_coupon = Some │
//! │  remove_coupon ──────────► remove_coupon() ─────► applied_coupon = None │
//! │                                                                         │
//! │  Every mutation ends in recompute_totals(); after a line change the     │
//! │  service calls refresh_coupon() so the discount tracks the new bag.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! ```text
//! bag_total              = Σ unit_price × qty
//! product_discount_total = Σ (unit_price - discounted_unit_price) × qty
//! subtotal               = bag_total - product_discount_total   (coupon base)
//! amount_payable         = max(0, subtotal - coupon_discount + delivery_fee)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::coupon::{Coupon, CouponContext, CouponKind};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CartStatus, Percent, Product, StoreSettings};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// One product in a cart.
///
/// ## Snapshot
/// Name, price, discount, image and collection are copied from the product
/// when the line is added (and refreshed when more of the same product is
/// added). Checkout prices the order from these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: Money,
    pub discount: Percent,
    pub quantity: i64,
    pub product_image: Option<String>,
    pub collection_id: Option<String>,
}

impl CartLine {
    /// Creates a line from a product, validating price, discount and quantity.
    pub fn from_product(product: &Product, quantity: i64) -> CoreResult<Self> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity { quantity });
        }
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let mut line = CartLine {
            product_id: product.id.clone(),
            product_name: String::new(),
            unit_price: Money::zero(),
            discount: Percent::zero(),
            quantity,
            product_image: None,
            collection_id: None,
        };
        line.refresh_snapshot(product)?;
        Ok(line)
    }

    /// Re-copies the product's current name, price and discount.
    fn refresh_snapshot(&mut self, product: &Product) -> CoreResult<()> {
        if product.price_cents < 0 {
            return Err(CoreError::InvalidPrice);
        }
        if !product.discount().is_valid() {
            return Err(CoreError::InvalidDiscount {
                bps: product.discount_bps,
            });
        }

        self.product_name = product.name.clone();
        self.unit_price = product.price();
        self.discount = product.discount();
        self.product_image = product.image.clone();
        self.collection_id = product.collection_id.clone();
        Ok(())
    }

    /// `unit_price - round_half_up(unit_price × discount)`
    pub fn discounted_unit_price(&self) -> Money {
        self.unit_price - self.unit_price.percentage_of(self.discount)
    }

    /// Discounted price × quantity.
    pub fn line_subtotal(&self) -> Money {
        self.discounted_unit_price().multiply_quantity(self.quantity)
    }

    /// Undiscounted price × quantity.
    pub fn line_bag_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    pub fn line_discount(&self) -> Money {
        self.line_bag_total() - self.line_subtotal()
    }
}

// =============================================================================
// Coupon Application
// =============================================================================

/// A coupon applied to a cart, with the discount it currently yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CouponApplication {
    pub coupon_id: String,
    pub code: String,
    pub kind: CouponKind,
    pub discount_amount: Money,
    #[ts(as = "String")]
    pub applied_at: DateTime<Utc>,
}

// =============================================================================
// Totals & Notices
// =============================================================================

/// Persisted cart totals. Recomputed after every mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartTotals {
    pub bag_total: Money,
    pub product_discount_total: Money,
    pub coupon_discount: Money,
    pub delivery_fee: Money,
    pub amount_payable: Money,
}

/// Payment breakdown shown before checkout.
///
/// `bag_discount` is the total saved: product discounts plus coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentDetails {
    pub bag_total: Money,
    pub bag_discount: Money,
    pub product_discount: Money,
    pub coupon_discount: Money,
    pub delivery_fee: Money,
    pub amount_payable: Money,
    pub applied_coupon: Option<CouponApplication>,
}

/// Something the caller should tell the user about the last cart operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartNotice {
    /// `remove_item` found nothing to remove.
    LineNotFound { product_id: String },
    /// The applied coupon stopped qualifying and was dropped.
    CouponRemoved {
        code: String,
        /// Error code of the failed rule, e.g. `BELOW_MINIMUM_ORDER`.
        reason: String,
        message: String,
    },
}

// =============================================================================
// Cart
// =============================================================================

/// A user's cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product increases quantity)
/// - Quantity is in 1..=999
/// - At most 100 lines
/// - `totals` always reflects `lines`, `applied_coupon` and `delivery_fee`
/// - `status` goes Active → CheckedOut once
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub lines: Vec<CartLine>,
    pub applied_coupon: Option<CouponApplication>,
    pub delivery_fee: Money,
    pub status: CartStatus,
    pub totals: CartTotals,
    /// Order produced at checkout.
    pub order_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub checked_out_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Creates an empty active cart.
    pub fn new(id: String, user_id: String, settings: &StoreSettings, now: DateTime<Utc>) -> Self {
        let mut cart = Cart {
            id,
            tenant_id: settings.tenant_id.clone(),
            user_id,
            lines: Vec::new(),
            applied_coupon: None,
            delivery_fee: settings.delivery_fee,
            status: CartStatus::Active,
            totals: CartTotals::default(),
            order_id: None,
            created_at: now,
            updated_at: now,
            checked_out_at: None,
        };
        cart.recompute_totals();
        cart
    }

    /// Fails with `CartNotActive` once the cart is checked out.
    pub fn ensure_active(&self) -> CoreResult<()> {
        if self.status != CartStatus::Active {
            return Err(CoreError::CartNotActive(self.id.clone()));
        }
        Ok(())
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Adds `quantity` of a product, or increases the existing line.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity increases, snapshot refreshed
    /// - Otherwise: a new line is appended
    ///
    /// ## Errors
    /// `InvalidQuantity`, `InvalidPrice`, `InvalidDiscount`,
    /// `QuantityTooLarge`, `CartTooLarge`.
    pub fn add_line(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity { quantity });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let new_qty = line
                .quantity
                .checked_add(quantity)
                .filter(|q| *q <= MAX_ITEM_QUANTITY)
                .ok_or(CoreError::QuantityTooLarge {
                    requested: line.quantity.saturating_add(quantity),
                    max: MAX_ITEM_QUANTITY,
                })?;
            line.refresh_snapshot(product)?;
            line.quantity = new_qty;
        } else {
            if self.lines.len() >= MAX_CART_ITEMS {
                return Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS });
            }
            self.lines.push(CartLine::from_product(product, quantity)?);
        }

        self.recompute_totals();
        Ok(())
    }

    /// Sets the quantity of an existing line. Zero or less removes it.
    pub fn update_line_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        let index = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))?;

        if quantity <= 0 {
            self.lines.remove(index);
        } else if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        } else {
            self.lines[index].quantity = quantity;
        }

        self.recompute_totals();
        Ok(())
    }

    /// Removes a line. Idempotent; returns whether anything was removed.
    pub fn remove_line(&mut self, product_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        let removed = self.lines.len() != before;
        if removed {
            self.recompute_totals();
        }
        removed
    }

    /// Scope-matching view of the current lines.
    pub fn coupon_context(&self) -> CouponContext {
        CouponContext::from_products(
            self.lines
                .iter()
                .map(|l| (l.product_id.as_str(), l.collection_id.as_deref())),
        )
    }

    /// Applies `coupon` against the post-product-discount subtotal.
    ///
    /// On error the cart is left exactly as it was.
    pub fn apply_coupon(&mut self, coupon: &Coupon, now: DateTime<Utc>) -> CoreResult<Money> {
        if self.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let discount = coupon.compute_discount(self.subtotal(), &self.coupon_context(), now)?;
        self.applied_coupon = Some(CouponApplication {
            coupon_id: coupon.id.clone(),
            code: coupon.code.clone(),
            kind: coupon.kind,
            discount_amount: discount,
            applied_at: now,
        });
        self.recompute_totals();
        Ok(discount)
    }

    /// Clears the applied coupon, returning it.
    pub fn remove_coupon(&mut self) -> Option<CouponApplication> {
        let removed = self.applied_coupon.take();
        self.recompute_totals();
        removed
    }

    /// Re-evaluates the applied coupon after the cart changed.
    ///
    /// `coupon` is the current coupon row (`None` if it no longer exists).
    /// The discount is recomputed when it still qualifies; otherwise the
    /// application is dropped and a notice says why.
    pub fn refresh_coupon(&mut self, coupon: Option<&Coupon>, now: DateTime<Utc>) -> Option<CartNotice> {
        let applied = self.applied_coupon.as_ref()?;
        let code = applied.code.clone();
        let applied_at = applied.applied_at;

        let outcome = match coupon {
            Some(c) if self.is_empty() => Err((c, CoreError::EmptyCart)),
            Some(c) => c
                .compute_discount(self.subtotal(), &self.coupon_context(), now)
                .map(|d| (c, d))
                .map_err(|e| (c, e)),
            None => {
                self.applied_coupon = None;
                self.recompute_totals();
                return Some(CartNotice::CouponRemoved {
                    reason: CoreError::CouponNotFound(code.clone()).code().to_string(),
                    message: CoreError::CouponNotFound(code.clone()).to_string(),
                    code,
                });
            }
        };

        let notice = match outcome {
            Ok((c, discount)) => {
                self.applied_coupon = Some(CouponApplication {
                    coupon_id: c.id.clone(),
                    code: c.code.clone(),
                    kind: c.kind,
                    discount_amount: discount,
                    applied_at,
                });
                None
            }
            Err((_, err)) => {
                self.applied_coupon = None;
                Some(CartNotice::CouponRemoved {
                    code,
                    reason: err.code().to_string(),
                    message: err.to_string(),
                })
            }
        };

        self.recompute_totals();
        notice
    }

    /// Recalculates every persisted total from lines, coupon and fee.
    pub fn recompute_totals(&mut self) {
        let bag_total: Money = self.lines.iter().map(CartLine::line_bag_total).sum();
        let product_discount_total: Money = self.lines.iter().map(CartLine::line_discount).sum();
        let coupon_discount = self
            .applied_coupon
            .as_ref()
            .map(|a| a.discount_amount)
            .unwrap_or_default();

        let amount_payable =
            (bag_total - product_discount_total - coupon_discount + self.delivery_fee)
                .clamp_non_negative();

        self.totals = CartTotals {
            bag_total,
            product_discount_total,
            coupon_discount,
            delivery_fee: self.delivery_fee,
            amount_payable,
        };
    }

    /// Sum of quantities across lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// `bag_total - product_discount_total`: coupon base and order subtotal.
    pub fn subtotal(&self) -> Money {
        self.totals.bag_total - self.totals.product_discount_total
    }

    /// True when no two lines share a product id.
    pub fn has_unique_lines(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.lines.len());
        self.lines.iter().all(|l| seen.insert(l.product_id.as_str()))
    }

    pub fn payment_details(&self) -> PaymentDetails {
        let t = &self.totals;
        PaymentDetails {
            bag_total: t.bag_total,
            bag_discount: t.product_discount_total + t.coupon_discount,
            product_discount: t.product_discount_total,
            coupon_discount: t.coupon_discount,
            delivery_fee: t.delivery_fee,
            amount_payable: t.amount_payable,
            applied_coupon: self.applied_coupon.clone(),
        }
    }

    /// Active → CheckedOut. Fails if already checked out.
    pub fn mark_checked_out(&mut self, order_id: String, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_active()?;
        self.status = CartStatus::CheckedOut;
        self.order_id = Some(order_id);
        self.checked_out_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// A line with its derived prices, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLineView {
    pub product_id: String,
    pub product_name: String,
    pub product_image: Option<String>,
    pub unit_price: Money,
    pub discount: Percent,
    pub discounted_unit_price: Money,
    pub quantity: i64,
    pub line_subtotal: Money,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        CartLineView {
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            product_image: line.product_image.clone(),
            unit_price: line.unit_price,
            discount: line.discount,
            discounted_unit_price: line.discounted_unit_price(),
            quantity: line.quantity,
            line_subtotal: line.line_subtotal(),
        }
    }
}

/// What every cart operation returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartSnapshot {
    pub cart_id: String,
    pub status: CartStatus,
    pub lines: Vec<CartLineView>,
    pub item_count: i64,
    pub payment: PaymentDetails,
    pub notices: Vec<CartNotice>,
}

impl CartSnapshot {
    pub fn from_cart(cart: &Cart, notices: Vec<CartNotice>) -> Self {
        CartSnapshot {
            cart_id: cart.id.clone(),
            status: cart.status,
            lines: cart.lines.iter().map(CartLineView::from).collect(),
            item_count: cart.item_count(),
            payment: cart.payment_details(),
            notices,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupon::CouponScope;
    use crate::DEFAULT_TENANT_ID;
    use chrono::Duration;

    fn test_product(id: &str, price_cents: i64, discount_bps: u32) -> Product {
        Product {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            collection_id: Some("shoes".to_string()),
            name: format!("Product {}", id),
            price_cents,
            discount_bps,
            stock: 10,
            image: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_cart(fee_cents: i64) -> Cart {
        let settings = StoreSettings {
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            delivery_fee: Money::from_cents(fee_cents),
        };
        Cart::new("cart-1".to_string(), "user-1".to_string(), &settings, Utc::now())
    }

    fn save20() -> Coupon {
        let now = Utc::now();
        Coupon {
            id: "c-1".to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            code: "SAVE20".to_string(),
            scope: CouponScope::Product {
                product_id: "p-1".to_string(),
            },
            kind: CouponKind::Percentage {
                percent: Percent::from_whole(20),
            },
            expires_at: now + Duration::days(30),
            usage_limit: None,
            used_count: 0,
            minimum_order: Some(Money::from_cents(500)),
            is_active: true,
            created_by: "vendor-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_add_line_and_totals() {
        let mut cart = test_cart(50);
        cart.add_line(&test_product("p-7", 500, 1000), 2).unwrap();

        let line = cart.line("p-7").unwrap();
        assert_eq!(line.discounted_unit_price().cents(), 450);
        assert_eq!(line.line_subtotal().cents(), 900);

        assert_eq!(cart.totals.bag_total.cents(), 1000);
        assert_eq!(cart.totals.product_discount_total.cents(), 100);
        assert_eq!(cart.subtotal().cents(), 900);
        assert_eq!(cart.totals.amount_payable.cents(), 950);
    }

    #[test]
    fn test_add_same_product_increases_quantity() {
        let mut cart = test_cart(0);
        let product = test_product("p-1", 999, 0);

        cart.add_line(&product, 2).unwrap();
        cart.add_line(&product, 3).unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.item_count(), 5);
        assert!(cart.has_unique_lines());
    }

    #[test]
    fn test_add_line_rejects_bad_input() {
        let mut cart = test_cart(0);

        let err = cart.add_line(&test_product("p-1", 100, 0), 0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuantity { .. }));

        let err = cart.add_line(&test_product("p-1", -1, 0), 1).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPrice));

        let err = cart.add_line(&test_product("p-1", 100, 10_001), 1).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscount { .. }));

        let err = cart.add_line(&test_product("p-1", 100, 0), 1000).unwrap_err();
        assert!(matches!(err, CoreError::QuantityTooLarge { .. }));

        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_to_existing_line_does_not_overflow() {
        let mut cart = test_cart(0);
        cart.add_line(&test_product("p-1", 100, 0), 1).unwrap();

        let err = cart.add_line(&test_product("p-1", 100, 0), i64::MAX).unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuantityTooLarge { requested: i64::MAX, .. }
        ));
        assert_eq!(cart.line("p-1").unwrap().quantity, 1);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_cart_too_large() {
        let mut cart = test_cart(0);
        for i in 0..MAX_CART_ITEMS {
            cart.add_line(&test_product(&format!("p-{}", i), 100, 0), 1).unwrap();
        }
        let err = cart.add_line(&test_product("one-more", 100, 0), 1).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = test_cart(0);
        cart.add_line(&test_product("p-1", 100, 0), 2).unwrap();

        cart.update_line_quantity("p-1", 5).unwrap();
        assert_eq!(cart.item_count(), 5);

        cart.update_line_quantity("p-1", 0).unwrap();
        assert!(cart.is_empty());
        assert!(cart.totals.bag_total.is_zero());
    }

    #[test]
    fn test_update_missing_line() {
        let mut cart = test_cart(0);
        let err = cart.update_line_quantity("nope", 1).unwrap_err();
        assert!(matches!(err, CoreError::LineNotFound(_)));
    }

    #[test]
    fn test_remove_line_is_idempotent() {
        let mut cart = test_cart(0);
        cart.add_line(&test_product("p-1", 100, 0), 1).unwrap();

        assert!(cart.remove_line("p-1"));
        let after_first = cart.totals;
        assert!(!cart.remove_line("p-1"));
        assert_eq!(cart.totals, after_first);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_save20_on_1000() {
        let mut cart = test_cart(50);
        cart.add_line(&test_product("p-1", 1000, 0), 1).unwrap();

        let discount = cart.apply_coupon(&save20(), Utc::now()).unwrap();
        assert_eq!(discount.cents(), 200);
        assert_eq!(cart.totals.amount_payable.cents(), 850);
    }

    #[test]
    fn test_save20_below_minimum_leaves_cart_unchanged() {
        let mut cart = test_cart(50);
        cart.add_line(&test_product("p-1", 400, 0), 1).unwrap();
        let before = cart.totals;

        let err = cart.apply_coupon(&save20(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::BelowMinimumOrder(_)));
        assert_eq!(cart.totals, before);
        assert!(cart.applied_coupon.is_none());
    }

    #[test]
    fn test_flat_coupon_larger_than_subtotal() {
        let mut cart = test_cart(0);
        cart.add_line(&test_product("p-1", 300, 0), 1).unwrap();
        let mut flat = save20();
        flat.kind = CouponKind::FlatAmount {
            amount: Money::from_cents(1000),
        };
        flat.minimum_order = None;

        let discount = cart.apply_coupon(&flat, Utc::now()).unwrap();
        assert_eq!(discount.cents(), 300);
        assert!(cart.totals.amount_payable.is_zero());
    }

    #[test]
    fn test_apply_coupon_on_empty_cart() {
        let mut cart = test_cart(0);
        let err = cart.apply_coupon(&save20(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart));
    }

    #[test]
    fn test_refresh_coupon_drops_when_below_minimum() {
        let mut cart = test_cart(0);
        cart.add_line(&test_product("p-1", 300, 0), 2).unwrap();
        let coupon = save20();
        cart.apply_coupon(&coupon, Utc::now()).unwrap();
        assert_eq!(cart.totals.coupon_discount.cents(), 120);

        cart.update_line_quantity("p-1", 1).unwrap();
        let notice = cart.refresh_coupon(Some(&coupon), Utc::now());

        match notice {
            Some(CartNotice::CouponRemoved { code, reason, .. }) => {
                assert_eq!(code, "SAVE20");
                assert_eq!(reason, "BELOW_MINIMUM_ORDER");
            }
            other => panic!("expected CouponRemoved, got {:?}", other),
        }
        assert!(cart.applied_coupon.is_none());
        assert_eq!(cart.totals.amount_payable.cents(), 300);
    }

    #[test]
    fn test_refresh_coupon_recomputes_discount() {
        let mut cart = test_cart(0);
        cart.add_line(&test_product("p-1", 1000, 0), 1).unwrap();
        let coupon = save20();
        cart.apply_coupon(&coupon, Utc::now()).unwrap();

        cart.add_line(&test_product("p-1", 1000, 0), 1).unwrap();
        assert!(cart.refresh_coupon(Some(&coupon), Utc::now()).is_none());
        assert_eq!(cart.totals.coupon_discount.cents(), 400);
        assert_eq!(cart.totals.amount_payable.cents(), 1600);
    }

    #[test]
    fn test_refresh_coupon_when_scope_product_removed() {
        let mut cart = test_cart(0);
        cart.add_line(&test_product("p-1", 1000, 0), 1).unwrap();
        cart.add_line(&test_product("p-2", 1000, 0), 1).unwrap();
        let coupon = save20();
        cart.apply_coupon(&coupon, Utc::now()).unwrap();

        cart.remove_line("p-1");
        let notice = cart.refresh_coupon(Some(&coupon), Utc::now());
        assert!(matches!(notice, Some(CartNotice::CouponRemoved { ref reason, .. }) if reason == "SCOPE_MISMATCH"));
    }

    #[test]
    fn test_payment_details() {
        let mut cart = test_cart(50);
        cart.add_line(&test_product("p-1", 1000, 1000), 1).unwrap();
        cart.apply_coupon(&save20(), Utc::now()).unwrap();

        let details = cart.payment_details();
        assert_eq!(details.bag_total.cents(), 1000);
        assert_eq!(details.product_discount.cents(), 100);
        assert_eq!(details.coupon_discount.cents(), 180);
        assert_eq!(details.bag_discount.cents(), 280);
        assert_eq!(details.amount_payable.cents(), 770);
        assert!(details.applied_coupon.is_some());
    }

    #[test]
    fn test_mark_checked_out_once() {
        let mut cart = test_cart(0);
        cart.mark_checked_out("order-1".to_string(), Utc::now()).unwrap();
        assert_eq!(cart.status, CartStatus::CheckedOut);

        let err = cart.mark_checked_out("order-2".to_string(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::CartNotActive(_)));
        assert_eq!(cart.order_id.as_deref(), Some("order-1"));
    }

    #[test]
    fn test_lines_json_contract() {
        let mut cart = test_cart(0);
        cart.add_line(&test_product("p-1", 1000, 1250), 3).unwrap();

        let json = serde_json::to_string(&cart.lines).unwrap();
        let lines: Vec<CartLine> = serde_json::from_str(&json).unwrap();
        assert_eq!(lines, cart.lines);
    }
}
