//! # Address Repository
//!
//! Read access to the user address book. Checkout only accepts an address
//! owned by the requesting user, so lookups always filter on `user_id`.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use bazaar_core::Address;

#[derive(Debug, Clone)]
pub struct AddressRepository {
    pool: SqlitePool,
}

impl AddressRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AddressRepository { pool }
    }

    /// Finds an address owned by `user_id`. Someone else's address is `None`.
    pub async fn find_for_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        address_id: &str,
    ) -> DbResult<Option<Address>> {
        debug!(user_id = %user_id, address_id = %address_id, "Loading address");

        let address = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, user_id, full_name, phone, line1, line2,
                   city, state, postal_code, country
            FROM addresses
            WHERE id = ?1 AND user_id = ?2 AND tenant_id = ?3
            "#,
        )
        .bind(address_id)
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    /// Inserts an address (seeding and tests; the directory owns this table).
    pub async fn insert(&self, tenant_id: &str, address: &Address) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO addresses (
                id, tenant_id, user_id, full_name, phone, line1, line2,
                city, state, postal_code, country, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&address.id)
        .bind(tenant_id)
        .bind(&address.user_id)
        .bind(&address.full_name)
        .bind(&address.phone)
        .bind(&address.line1)
        .bind(&address.line2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
