//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use bazaar_core::{Address, Coupon, CouponKind, CouponScope, Money, Product, StoreSettings};
use bazaar_db::{Database, DbConfig, NewCoupon};
use chrono::{Duration, Utc};
use std::path::Path;
use uuid::Uuid;

pub use bazaar_core::DEFAULT_TENANT_ID;

pub const DELIVERY_FEE: i64 = 50;

pub fn settings(delivery_fee_cents: i64) -> StoreSettings {
    StoreSettings {
        tenant_id: DEFAULT_TENANT_ID.to_string(),
        delivery_fee: Money::from_cents(delivery_fee_cents),
    }
}

/// Fresh in-memory database with a delivery fee of 50.
pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory().settings(settings(DELIVERY_FEE)))
        .await
        .unwrap()
}

/// File-backed database with a real multi-connection pool.
pub async fn file_db(path: &Path, max_connections: u32) -> Database {
    let config = DbConfig::new(path)
        .max_connections(max_connections)
        .busy_timeout(std::time::Duration::from_secs(30))
        .settings(settings(DELIVERY_FEE));
    Database::new(config).await.unwrap()
}

pub async fn seed_product(
    db: &Database,
    price_cents: i64,
    discount_bps: u32,
    stock: i64,
    collection: Option<&str>,
) -> Product {
    let now = Utc::now();
    let id = Uuid::new_v4().to_string();
    let product = Product {
        id: id.clone(),
        tenant_id: DEFAULT_TENANT_ID.to_string(),
        collection_id: collection.map(str::to_string),
        name: format!("Product {}", &id[..8]),
        price_cents,
        discount_bps,
        stock,
        image: Some(format!("https://img.test/{}.jpg", id)),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap();
    product
}

pub async fn seed_address(db: &Database, user_id: &str) -> Address {
    let address = Address {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        full_name: "Test User".to_string(),
        phone: "555-0100".to_string(),
        line1: "1 Test Street".to_string(),
        line2: Some("Apt 2".to_string()),
        city: "Testville".to_string(),
        state: "TS".to_string(),
        postal_code: "00001".to_string(),
        country: "US".to_string(),
    };
    db.addresses()
        .insert(DEFAULT_TENANT_ID, &address)
        .await
        .unwrap();
    address
}

pub fn new_coupon(code: &str, kind: CouponKind, scope: CouponScope) -> NewCoupon {
    NewCoupon {
        code: code.to_string(),
        scope,
        kind,
        expires_at: Utc::now() + Duration::days(30),
        usage_limit: None,
        minimum_order: None,
        created_by: "vendor-1".to_string(),
    }
}

pub async fn seed_coupon(db: &Database, input: NewCoupon) -> Coupon {
    db.coupon_service().create(input).await.unwrap()
}

pub fn product_scope(product: &Product) -> CouponScope {
    CouponScope::Product {
        product_id: product.id.clone(),
    }
}
