//! Cart service against an in-memory database.

mod common;

use bazaar_core::types::Percent;
use bazaar_core::{CartNotice, CartStatus, CoreError, CouponKind, Money};
use common::*;

#[tokio::test]
async fn test_add_item_creates_cart_with_totals() {
    let db = test_db().await;
    let product = seed_product(&db, 500, 1000, 5, None).await;

    let snapshot = db.cart_service().add_item("user-1", &product.id, 2).await.unwrap();

    assert_eq!(snapshot.status, CartStatus::Active);
    assert_eq!(snapshot.lines.len(), 1);
    assert_eq!(snapshot.item_count, 2);
    assert_eq!(snapshot.lines[0].discounted_unit_price.cents(), 450);
    assert_eq!(snapshot.lines[0].line_subtotal.cents(), 900);
    assert_eq!(snapshot.payment.bag_total.cents(), 1000);
    assert_eq!(snapshot.payment.product_discount.cents(), 100);
    assert_eq!(snapshot.payment.delivery_fee.cents(), DELIVERY_FEE);
    assert_eq!(snapshot.payment.amount_payable.cents(), 950);

    // Persisted, not just computed
    let stored = db.carts().get_by_id(&snapshot.cart_id).await.unwrap().unwrap();
    assert_eq!(stored.totals.amount_payable.cents(), 950);
    assert_eq!(stored.user_id, "user-1");
}

#[tokio::test]
async fn test_add_same_product_merges_line() {
    let db = test_db().await;
    let product = seed_product(&db, 300, 0, 10, None).await;
    let carts = db.cart_service();

    carts.add_item("user-1", &product.id, 1).await.unwrap();
    let snapshot = carts.add_item("user-1", &product.id, 2).await.unwrap();

    assert_eq!(snapshot.lines.len(), 1);
    assert_eq!(snapshot.lines[0].quantity, 3);
    assert_eq!(snapshot.payment.bag_total.cents(), 900);
}

#[tokio::test]
async fn test_add_item_rejections() {
    let db = test_db().await;
    let product = seed_product(&db, 300, 0, 2, None).await;
    let carts = db.cart_service();

    let err = carts.add_item("user-1", "missing", 1).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::ProductNotFound(_))));

    let err = carts.add_item("user-1", &product.id, 0).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::InvalidQuantity { quantity: 0 })));

    carts.add_item("user-1", &product.id, 2).await.unwrap();
    let err = carts.add_item("user-1", &product.id, 1).await.unwrap_err();
    match err.as_core() {
        Some(CoreError::InsufficientStock { available, requested, .. }) => {
            assert_eq!(*available, 2);
            assert_eq!(*requested, 3);
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    // Rejected add left the cart alone
    let snapshot = carts.get_cart("user-1").await.unwrap();
    assert_eq!(snapshot.item_count, 2);
}

#[tokio::test]
async fn test_add_huge_quantity_to_existing_line_is_rejected() {
    let db = test_db().await;
    let product = seed_product(&db, 500, 0, 5, None).await;
    let carts = db.cart_service();

    carts.add_item("user-1", &product.id, 1).await.unwrap();
    let err = carts.add_item("user-1", &product.id, i64::MAX).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::QuantityTooLarge { .. })));

    let snapshot = carts.get_cart("user-1").await.unwrap();
    assert_eq!(snapshot.lines.len(), 1);
    assert_eq!(snapshot.lines[0].quantity, 1);
}

#[tokio::test]
async fn test_update_item_quantity_and_zero_removes() {
    let db = test_db().await;
    let a = seed_product(&db, 200, 0, 10, None).await;
    let b = seed_product(&db, 300, 0, 10, None).await;
    let carts = db.cart_service();

    carts.add_item("user-1", &a.id, 1).await.unwrap();
    carts.add_item("user-1", &b.id, 1).await.unwrap();

    let snapshot = carts.update_item("user-1", &a.id, 4).await.unwrap();
    assert_eq!(snapshot.item_count, 5);
    assert_eq!(snapshot.payment.bag_total.cents(), 1100);

    let snapshot = carts.update_item("user-1", &a.id, 0).await.unwrap();
    assert_eq!(snapshot.lines.len(), 1);
    assert_eq!(snapshot.lines[0].product_id, b.id);

    let err = carts.update_item("user-1", &a.id, 1).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::LineNotFound(_))));

    let err = carts.update_item("user-1", &b.id, 11).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::InsufficientStock { .. })));
}

#[tokio::test]
async fn test_remove_item_is_idempotent() {
    let db = test_db().await;
    let a = seed_product(&db, 200, 0, 10, None).await;
    let b = seed_product(&db, 300, 0, 10, None).await;
    let carts = db.cart_service();

    carts.add_item("user-1", &a.id, 1).await.unwrap();
    carts.add_item("user-1", &b.id, 2).await.unwrap();

    let first = carts.remove_item("user-1", &a.id).await.unwrap();
    assert!(first.notices.is_empty());

    let second = carts.remove_item("user-1", &a.id).await.unwrap();
    assert_eq!(
        second.notices,
        vec![CartNotice::LineNotFound {
            product_id: a.id.clone()
        }]
    );
    assert_eq!(first.lines, second.lines);
    assert_eq!(first.payment, second.payment);
}

#[tokio::test]
async fn test_percentage_coupon_with_minimum() {
    let db = test_db().await;
    let product = seed_product(&db, 1000, 0, 10, None).await;
    let mut input = new_coupon(
        "SAVE20",
        CouponKind::Percentage {
            percent: Percent::from_whole(20),
        },
        product_scope(&product),
    );
    input.minimum_order = Some(Money::from_cents(500));
    seed_coupon(&db, input).await;
    let carts = db.cart_service();

    carts.add_item("user-1", &product.id, 1).await.unwrap();
    let snapshot = carts.apply_coupon("user-1", "save20").await.unwrap();

    let payment = &snapshot.payment;
    assert_eq!(payment.coupon_discount.cents(), 200);
    assert_eq!(payment.bag_discount.cents(), 200);
    assert_eq!(payment.amount_payable.cents(), 800 + DELIVERY_FEE);
    assert_eq!(payment.applied_coupon.as_ref().unwrap().code, "SAVE20");
}

#[tokio::test]
async fn test_below_minimum_leaves_totals_unchanged() {
    let db = test_db().await;
    let product = seed_product(&db, 400, 0, 10, None).await;
    let mut input = new_coupon(
        "SAVE20",
        CouponKind::Percentage {
            percent: Percent::from_whole(20),
        },
        product_scope(&product),
    );
    input.minimum_order = Some(Money::from_cents(500));
    seed_coupon(&db, input).await;
    let carts = db.cart_service();

    let before = carts.add_item("user-1", &product.id, 1).await.unwrap();
    let err = carts.apply_coupon("user-1", "SAVE20").await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::BelowMinimumOrder(_))));

    let after = carts.get_payment_details("user-1").await.unwrap();
    assert_eq!(after, before.payment);
    assert!(after.applied_coupon.is_none());
}

#[tokio::test]
async fn test_flat_coupon_capped_at_subtotal() {
    let db = test_db().await;
    let product = seed_product(&db, 300, 0, 10, None).await;
    seed_coupon(
        &db,
        new_coupon(
            "FLAT1000",
            CouponKind::FlatAmount {
                amount: Money::from_cents(1000),
            },
            product_scope(&product),
        ),
    )
    .await;
    let carts = db.cart_service();

    carts.add_item("user-1", &product.id, 1).await.unwrap();
    let snapshot = carts.apply_coupon("user-1", "FLAT1000").await.unwrap();

    assert_eq!(snapshot.payment.coupon_discount.cents(), 300);
    assert_eq!(snapshot.payment.amount_payable.cents(), DELIVERY_FEE);
}

#[tokio::test]
async fn test_coupon_errors() {
    let db = test_db().await;
    let product = seed_product(&db, 300, 0, 10, None).await;
    let other = seed_product(&db, 300, 0, 10, None).await;
    seed_coupon(
        &db,
        new_coupon(
            "ONLYOTHER",
            CouponKind::FlatAmount {
                amount: Money::from_cents(100),
            },
            product_scope(&other),
        ),
    )
    .await;
    let carts = db.cart_service();

    let err = carts.apply_coupon("user-1", "ONLYOTHER").await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::EmptyCart)));

    carts.add_item("user-1", &product.id, 1).await.unwrap();

    let err = carts.apply_coupon("user-1", "NOPE").await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::CouponNotFound(_))));
    assert_eq!(err.code(), "COUPON_NOT_FOUND");

    let err = carts.apply_coupon("user-1", "ONLYOTHER").await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::ScopeMismatch(_))));
}

#[tokio::test]
async fn test_deactivated_coupon_is_rejected() {
    let db = test_db().await;
    let product = seed_product(&db, 300, 0, 10, None).await;
    let coupon = seed_coupon(
        &db,
        new_coupon(
            "GONE",
            CouponKind::FlatAmount {
                amount: Money::from_cents(100),
            },
            product_scope(&product),
        ),
    )
    .await;
    db.coupon_service().deactivate(&coupon.id).await.unwrap();
    let carts = db.cart_service();

    carts.add_item("user-1", &product.id, 1).await.unwrap();
    let err = carts.apply_coupon("user-1", "GONE").await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::CouponInactive(_))));
}

#[tokio::test]
async fn test_coupon_dropped_when_cart_falls_below_minimum() {
    let db = test_db().await;
    let product = seed_product(&db, 600, 0, 10, None).await;
    let mut input = new_coupon(
        "BIG10",
        CouponKind::Percentage {
            percent: Percent::from_whole(10),
        },
        product_scope(&product),
    );
    input.minimum_order = Some(Money::from_cents(1000));
    seed_coupon(&db, input).await;
    let carts = db.cart_service();

    carts.add_item("user-1", &product.id, 2).await.unwrap();
    let applied = carts.apply_coupon("user-1", "BIG10").await.unwrap();
    assert_eq!(applied.payment.coupon_discount.cents(), 120);

    let snapshot = carts.update_item("user-1", &product.id, 1).await.unwrap();
    assert!(snapshot.payment.applied_coupon.is_none());
    assert!(snapshot.payment.coupon_discount.is_zero());
    assert_eq!(snapshot.payment.amount_payable.cents(), 600 + DELIVERY_FEE);
    match &snapshot.notices[..] {
        [CartNotice::CouponRemoved { code, reason, .. }] => {
            assert_eq!(code, "BIG10");
            assert_eq!(reason, "BELOW_MINIMUM_ORDER");
        }
        other => panic!("expected a CouponRemoved notice, got {:?}", other),
    }
}

#[tokio::test]
async fn test_coupon_discount_follows_cart_changes() {
    let db = test_db().await;
    let product = seed_product(&db, 1000, 0, 10, None).await;
    seed_coupon(
        &db,
        new_coupon(
            "TEN",
            CouponKind::Percentage {
                percent: Percent::from_whole(10),
            },
            product_scope(&product),
        ),
    )
    .await;
    let carts = db.cart_service();

    carts.add_item("user-1", &product.id, 1).await.unwrap();
    carts.apply_coupon("user-1", "TEN").await.unwrap();
    let snapshot = carts.add_item("user-1", &product.id, 2).await.unwrap();

    assert!(snapshot.notices.is_empty());
    assert_eq!(snapshot.payment.coupon_discount.cents(), 300);
    assert_eq!(snapshot.payment.amount_payable.cents(), 2700 + DELIVERY_FEE);
}

#[tokio::test]
async fn test_remove_coupon_restores_totals() {
    let db = test_db().await;
    let product = seed_product(&db, 1000, 500, 10, None).await;
    seed_coupon(
        &db,
        new_coupon(
            "FLAT50",
            CouponKind::FlatAmount {
                amount: Money::from_cents(50),
            },
            product_scope(&product),
        ),
    )
    .await;
    let carts = db.cart_service();

    let before = carts.add_item("user-1", &product.id, 1).await.unwrap();
    let applied = carts.apply_coupon("user-1", "FLAT50").await.unwrap();
    assert_eq!(applied.payment.bag_discount.cents(), 50 + 50);

    let removed = carts.remove_coupon("user-1").await.unwrap();
    assert_eq!(removed.payment, before.payment);
}

#[tokio::test]
async fn test_get_cart_is_stable() {
    let db = test_db().await;

    let first = db.cart_service().get_cart("user-1").await.unwrap();
    let second = db.cart_service().get_cart("user-1").await.unwrap();

    assert_eq!(first.cart_id, second.cart_id);
    assert!(first.lines.is_empty());
    assert_eq!(first.payment.amount_payable.cents(), DELIVERY_FEE);

    let other_user = db.cart_service().get_cart("user-2").await.unwrap();
    assert_ne!(other_user.cart_id, first.cart_id);
}
