//! # Seed Data Generator
//!
//! Populates the database with a small demo storefront for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./bazaar.db (or $BAZAAR_DATABASE_PATH)
//! cargo run -p bazaar-db --bin seed
//!
//! # Specify database path
//! cargo run -p bazaar-db --bin seed -- --db ./data/bazaar.db
//!
//! # More logging
//! RUST_LOG=bazaar_db=debug cargo run -p bazaar-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Products in three collections (shoes, bags, watches), some discounted
//! - One address for the demo user `demo-user`
//! - Coupons: `SAVE20` (20%, min 500.00), `FLAT100` (100.00 off a product),
//!   `WATCHES15` (15% on the watches collection, 50 uses)

use bazaar_core::types::Percent;
use bazaar_core::{Address, CouponKind, CouponScope, Money, Product};
use bazaar_db::{Database, NewCoupon, StoreConfig};
use chrono::{Duration, Utc};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEMO_USER: &str = "demo-user";
const DEMO_VENDOR: &str = "demo-vendor";

/// (collection, name, price in cents, discount bps, stock)
const PRODUCTS: &[(&str, &str, i64, u32, i64)] = &[
    ("shoes", "Canvas Sneaker", 249_900, 1000, 40),
    ("shoes", "Leather Loafer", 499_900, 0, 15),
    ("shoes", "Trail Runner", 389_900, 1500, 25),
    ("bags", "Weekender Duffel", 329_900, 0, 10),
    ("bags", "Everyday Tote", 129_900, 2000, 60),
    ("watches", "Field Watch", 899_900, 500, 8),
    ("watches", "Dive Watch", 1_499_900, 0, 3),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = StoreConfig::load()?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bazaar Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $BAZAAR_DATABASE_PATH or ./bazaar.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %config.database_path, "Seeding database");
    let db = Database::new(config.db_config()).await?;
    let tenant_id = db.settings().tenant_id.clone();

    if db.coupon_service().get_by_code("SAVE20").await.is_ok() {
        warn!("Database already seeded; delete the file to regenerate");
        return Ok(());
    }

    let now = Utc::now();
    let mut first_product_id = None;
    for (collection, name, price_cents, discount_bps, stock) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.clone(),
            collection_id: Some(collection.to_string()),
            name: name.to_string(),
            price_cents: *price_cents,
            discount_bps: *discount_bps,
            stock: *stock,
            image: Some(format!("https://cdn.example.com/{}.jpg", name.to_lowercase().replace(' ', "-"))),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await?;
        first_product_id.get_or_insert(product.id.clone());
        info!(id = %product.id, name = %product.name, "Product created");
    }

    let address = Address {
        id: Uuid::new_v4().to_string(),
        user_id: DEMO_USER.to_string(),
        full_name: "Demo User".to_string(),
        phone: "+1-555-0100".to_string(),
        line1: "1 Market Street".to_string(),
        line2: None,
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        postal_code: "62701".to_string(),
        country: "US".to_string(),
    };
    db.addresses().insert(&tenant_id, &address).await?;
    info!(id = %address.id, user_id = DEMO_USER, "Address created");

    let coupons = db.coupon_service();
    let expires_at = now + Duration::days(90);

    coupons
        .create(NewCoupon {
            code: "SAVE20".to_string(),
            scope: CouponScope::Collection {
                collection_id: "shoes".to_string(),
            },
            kind: CouponKind::Percentage {
                percent: Percent::from_whole(20),
            },
            expires_at,
            usage_limit: None,
            minimum_order: Some(Money::from_major_minor(500, 0)),
            created_by: DEMO_VENDOR.to_string(),
        })
        .await?;

    if let Some(product_id) = first_product_id {
        coupons
            .create(NewCoupon {
                code: "FLAT100".to_string(),
                scope: CouponScope::Product { product_id },
                kind: CouponKind::FlatAmount {
                    amount: Money::from_major_minor(100, 0),
                },
                expires_at,
                usage_limit: Some(100),
                minimum_order: None,
                created_by: DEMO_VENDOR.to_string(),
            })
            .await?;
    }

    coupons
        .create(NewCoupon {
            code: "WATCHES15".to_string(),
            scope: CouponScope::Collection {
                collection_id: "watches".to_string(),
            },
            kind: CouponKind::Percentage {
                percent: Percent::from_whole(15),
            },
            expires_at,
            usage_limit: Some(50),
            minimum_order: None,
            created_by: DEMO_VENDOR.to_string(),
        })
        .await?;

    info!(
        products = PRODUCTS.len(),
        address_id = %address.id,
        "Seed complete"
    );

    Ok(())
}
