//! Coupon administration, quotes and usage statistics.

mod common;

use bazaar_core::types::Percent;
use bazaar_core::{CoreError, CouponKind, CouponScope, Money, PaymentMethod, ValidationError};
use bazaar_db::{CouponRemoval, CouponService};
use chrono::{Duration, Utc};
use common::*;

fn ten_percent() -> CouponKind {
    CouponKind::Percentage {
        percent: Percent::from_whole(10),
    }
}

#[tokio::test]
async fn test_create_normalizes_code() {
    let db = test_db().await;
    let product = seed_product(&db, 1000, 0, 10, None).await;

    let coupon = seed_coupon(&db, new_coupon("  welcome10 ", ten_percent(), product_scope(&product))).await;

    assert_eq!(coupon.code, "WELCOME10");
    assert_eq!(coupon.used_count, 0);
    assert!(coupon.is_active);

    let found = db.coupon_service().get_by_code("Welcome10").await.unwrap();
    assert_eq!(found.id, coupon.id);
    assert_eq!(found.scope, product_scope(&product));
    assert_eq!(found.kind, ten_percent());
}

#[tokio::test]
async fn test_create_rejects_duplicates_and_bad_input() {
    let db = test_db().await;
    let product = seed_product(&db, 1000, 0, 10, None).await;
    let coupons = db.coupon_service();

    seed_coupon(&db, new_coupon("SAVE10", ten_percent(), product_scope(&product))).await;

    let err = coupons
        .create(new_coupon("save10", ten_percent(), product_scope(&product)))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_core(),
        Some(CoreError::Validation(ValidationError::Duplicate { .. }))
    ));

    let err = coupons
        .create(new_coupon("X", ten_percent(), product_scope(&product)))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_core(),
        Some(CoreError::Validation(ValidationError::TooShort { .. }))
    ));

    let zero = CouponKind::Percentage {
        percent: Percent::zero(),
    };
    let err = coupons
        .create(new_coupon("ZERO", zero, product_scope(&product)))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let over = CouponKind::Percentage {
        percent: Percent::from_bps(10_001),
    };
    assert!(coupons
        .create(new_coupon("OVER", over, product_scope(&product)))
        .await
        .is_err());

    let free = CouponKind::FlatAmount {
        amount: Money::zero(),
    };
    assert!(coupons
        .create(new_coupon("FREE", free, product_scope(&product)))
        .await
        .is_err());

    let mut past = new_coupon("PAST", ten_percent(), product_scope(&product));
    past.expires_at = Utc::now() - Duration::days(1);
    assert!(coupons.create(past).await.is_err());

    let mut no_uses = new_coupon("NOUSES", ten_percent(), product_scope(&product));
    no_uses.usage_limit = Some(0);
    assert!(coupons.create(no_uses).await.is_err());
}

#[tokio::test]
async fn test_validate_quote_is_read_only() {
    let db = test_db().await;
    let shoe = seed_product(&db, 1000, 0, 10, Some("shoes")).await;
    let hat = seed_product(&db, 1000, 0, 10, Some("hats")).await;
    let mut input = new_coupon(
        "SHOES20",
        CouponKind::Percentage {
            percent: Percent::from_whole(20),
        },
        CouponScope::Collection {
            collection_id: "shoes".to_string(),
        },
    );
    input.minimum_order = Some(Money::from_cents(500));
    let coupon = seed_coupon(&db, input).await;
    let coupons = db.coupon_service();

    let quote = coupons
        .validate("shoes20", Money::from_cents(1000), &[shoe.id.clone()])
        .await
        .unwrap();
    assert_eq!(quote.code, "SHOES20");
    assert_eq!(quote.discount_amount.cents(), 200);
    assert_eq!(quote.final_amount.cents(), 800);

    let err = coupons
        .validate("SHOES20", Money::from_cents(1000), &[hat.id.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::ScopeMismatch(_))));

    let err = coupons
        .validate("SHOES20", Money::from_cents(400), &[shoe.id.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::BelowMinimumOrder(_))));

    let err = coupons
        .validate("MISSING", Money::from_cents(1000), &[shoe.id.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::CouponNotFound(_))));

    let unchanged = db.coupons().get_by_id(DEFAULT_TENANT_ID, &coupon.id).await.unwrap().unwrap();
    assert_eq!(unchanged.used_count, 0);
}

#[tokio::test]
async fn test_list_for_creator() {
    let db = test_db().await;
    let product = seed_product(&db, 1000, 0, 10, None).await;

    seed_coupon(&db, new_coupon("AAA", ten_percent(), product_scope(&product))).await;
    seed_coupon(&db, new_coupon("BBB", ten_percent(), product_scope(&product))).await;
    let mut other = new_coupon("CCC", ten_percent(), product_scope(&product));
    other.created_by = "vendor-2".to_string();
    seed_coupon(&db, other).await;

    let mine = db.coupon_service().list_for_creator("vendor-1").await.unwrap();
    let mut codes: Vec<_> = mine.iter().map(|c| c.code.as_str()).collect();
    codes.sort();
    assert_eq!(codes, vec!["AAA", "BBB"]);
}

#[tokio::test]
async fn test_delete_unused_and_used() {
    let db = test_db().await;
    let product = seed_product(&db, 1000, 0, 10, None).await;
    let address = seed_address(&db, "user-1").await;
    let coupons = db.coupon_service();

    let unused = seed_coupon(&db, new_coupon("UNUSED", ten_percent(), product_scope(&product))).await;
    assert_eq!(coupons.delete(&unused.id).await.unwrap(), CouponRemoval::Deleted);
    let err = coupons.get_by_code("UNUSED").await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::CouponNotFound(_))));

    let used = seed_coupon(&db, new_coupon("USED", ten_percent(), product_scope(&product))).await;
    db.cart_service().add_item("user-1", &product.id, 1).await.unwrap();
    db.cart_service().apply_coupon("user-1", "USED").await.unwrap();
    db.checkout()
        .complete("user-1", &address.id, PaymentMethod::Card)
        .await
        .unwrap();

    assert_eq!(coupons.delete(&used.id).await.unwrap(), CouponRemoval::Deactivated);
    let kept = coupons.get_by_code("USED").await.unwrap();
    assert!(!kept.is_active);
    assert_eq!(kept.used_count, 1);
    assert_eq!(coupons.usages(&used.id, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_operations_reject_unknown_ids() {
    let db = test_db().await;
    let coupons = db.coupon_service();

    let err = coupons.deactivate("not-a-uuid").await.unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");

    let err = coupons
        .delete("550e8400-e29b-41d4-a716-446655440000")
        .await
        .unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::CouponNotFound(_))));
}

#[tokio::test]
async fn test_usage_stats() {
    let db = test_db().await;
    let product = seed_product(&db, 1000, 0, 100, None).await;
    let coupon = seed_coupon(
        &db,
        new_coupon(
            "FLAT150",
            CouponKind::FlatAmount {
                amount: Money::from_cents(150),
            },
            product_scope(&product),
        ),
    )
    .await;

    let empty = db.coupon_service().usage_stats(&coupon.id).await.unwrap();
    assert_eq!(empty.total_uses, 0);
    assert!(empty.average_discount.is_zero());

    // Orders of 1000 and 2000, each 150 off
    for (user, qty) in [("user-1", 1), ("user-2", 2)] {
        let address = seed_address(&db, user).await;
        db.cart_service().add_item(user, &product.id, qty).await.unwrap();
        db.cart_service().apply_coupon(user, "FLAT150").await.unwrap();
        db.checkout()
            .complete(user, &address.id, PaymentMethod::Upi)
            .await
            .unwrap();
    }

    let stats = db.coupon_service().usage_stats(&coupon.id).await.unwrap();
    assert_eq!(stats.total_uses, 2);
    assert_eq!(stats.total_discount.cents(), 300);
    assert_eq!(stats.total_order_value.cents(), 3000);
    assert_eq!(stats.average_discount.cents(), 150);
    assert_eq!(stats.average_order_value.cents(), 1500);

    let usages = db.coupon_service().usages(&coupon.id, 1).await.unwrap();
    assert_eq!(usages.len(), 1);
}

#[tokio::test]
async fn test_admin_operations_stay_within_tenant() {
    let db = test_db().await;
    let product = seed_product(&db, 1000, 0, 10, None).await;
    let coupon = seed_coupon(&db, new_coupon("MINE", ten_percent(), product_scope(&product))).await;

    let mut other_settings = settings(DELIVERY_FEE);
    other_settings.tenant_id = "tenant-b".to_string();
    let other = CouponService::new(db.pool().clone(), other_settings);

    let err = other.delete(&coupon.id).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::CouponNotFound(_))));
    let err = other.deactivate(&coupon.id).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::CouponNotFound(_))));
    let err = other.usage_stats(&coupon.id).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::CouponNotFound(_))));
    let err = other.usages(&coupon.id, 10).await.unwrap_err();
    assert!(matches!(err.as_core(), Some(CoreError::CouponNotFound(_))));
    assert!(db.coupons().get_by_id("tenant-b", &coupon.id).await.unwrap().is_none());

    let kept = db.coupon_service().get_by_code("MINE").await.unwrap();
    assert!(kept.is_active);
}
