//! Idempotent loading into the destination store
//!
//! Every write is a single conditional upsert keyed by
//! `(database_source, natural key)`: one round trip, atomic under
//! concurrent writers. Insert stamps `created_at`/`updated_at`/`synced_at`;
//! update re-stamps `updated_at`/`synced_at` and leaves `created_at`
//! alone. Re-syncing an unchanged source row therefore touches only the
//! stamp columns.
//!
//! `RETURNING (xmax = 0)` distinguishes a fresh insert from a conflict
//! update so the table counters stay accurate.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::{CustomerRecord, LocationRecord, ProductRecord, SaleRecord};

/// Outcome of one upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl From<bool> for UpsertOutcome {
    fn from(inserted: bool) -> Self {
        if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        }
    }
}

pub async fn upsert_location(
    pool: &PgPool,
    record: &LocationRecord,
    now: DateTime<Utc>,
) -> Result<UpsertOutcome, sqlx::Error> {
    let inserted = sqlx::query_scalar::<_, bool>(
        r#"
        INSERT INTO locations
            (database_source, location_id, name, address, city, state, zip,
             created_at, updated_at, synced_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $8)
        ON CONFLICT (database_source, location_id) DO UPDATE SET
            name = EXCLUDED.name,
            address = EXCLUDED.address,
            city = EXCLUDED.city,
            state = EXCLUDED.state,
            zip = EXCLUDED.zip,
            updated_at = EXCLUDED.updated_at,
            synced_at = EXCLUDED.synced_at
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&record.database_source)
    .bind(record.location_id)
    .bind(&record.name)
    .bind(&record.address)
    .bind(&record.city)
    .bind(&record.state)
    .bind(&record.zip)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(inserted.into())
}

pub async fn upsert_customer(
    pool: &PgPool,
    record: &CustomerRecord,
    now: DateTime<Utc>,
) -> Result<UpsertOutcome, sqlx::Error> {
    let inserted = sqlx::query_scalar::<_, bool>(
        r#"
        INSERT INTO customers
            (database_source, customer_id, first_name, last_name, email, phone,
             birthday, license_number, license_exp_date, loyalty_points,
             member_status, location_code, location_name,
             created_at, updated_at, synced_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14, $14)
        ON CONFLICT (database_source, customer_id) DO UPDATE SET
            first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            email = EXCLUDED.email,
            phone = EXCLUDED.phone,
            birthday = EXCLUDED.birthday,
            license_number = EXCLUDED.license_number,
            license_exp_date = EXCLUDED.license_exp_date,
            loyalty_points = EXCLUDED.loyalty_points,
            member_status = EXCLUDED.member_status,
            location_code = EXCLUDED.location_code,
            location_name = EXCLUDED.location_name,
            updated_at = EXCLUDED.updated_at,
            synced_at = EXCLUDED.synced_at
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&record.database_source)
    .bind(record.customer_id)
    .bind(&record.first_name)
    .bind(&record.last_name)
    .bind(&record.email)
    .bind(&record.phone)
    .bind(record.birthday)
    .bind(&record.license_number)
    .bind(record.license_exp_date)
    .bind(record.loyalty_points)
    .bind(&record.member_status)
    .bind(record.location_code)
    .bind(&record.location_name)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(inserted.into())
}

pub async fn upsert_product(
    pool: &PgPool,
    record: &ProductRecord,
    now: DateTime<Utc>,
) -> Result<UpsertOutcome, sqlx::Error> {
    let inserted = sqlx::query_scalar::<_, bool>(
        r#"
        INSERT INTO products
            (database_source, product_id, name, strain, category,
             created_at, updated_at, synced_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6, $6)
        ON CONFLICT (database_source, product_id) DO UPDATE SET
            name = EXCLUDED.name,
            strain = EXCLUDED.strain,
            category = EXCLUDED.category,
            updated_at = EXCLUDED.updated_at,
            synced_at = EXCLUDED.synced_at
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&record.database_source)
    .bind(record.product_id)
    .bind(&record.name)
    .bind(&record.strain)
    .bind(&record.category)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(inserted.into())
}

pub async fn upsert_sale(
    pool: &PgPool,
    record: &SaleRecord,
    now: DateTime<Utc>,
) -> Result<UpsertOutcome, sqlx::Error> {
    let inserted = sqlx::query_scalar::<_, bool>(
        r#"
        INSERT INTO sales
            (database_source, sale_id, sold_at, customer_id, location_code,
             location_name, item_id, quantity, total, refunded,
             created_at, updated_at, synced_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11, $11)
        ON CONFLICT (database_source, sale_id) DO UPDATE SET
            sold_at = EXCLUDED.sold_at,
            customer_id = EXCLUDED.customer_id,
            location_code = EXCLUDED.location_code,
            location_name = EXCLUDED.location_name,
            item_id = EXCLUDED.item_id,
            quantity = EXCLUDED.quantity,
            total = EXCLUDED.total,
            refunded = EXCLUDED.refunded,
            updated_at = EXCLUDED.updated_at,
            synced_at = EXCLUDED.synced_at
        RETURNING (xmax = 0)
        "#,
    )
    .bind(&record.database_source)
    .bind(record.sale_id)
    .bind(record.sold_at)
    .bind(record.customer_id)
    .bind(record.location_code)
    .bind(&record.location_name)
    .bind(&record.item_id)
    .bind(record.quantity)
    .bind(record.total)
    .bind(record.refunded)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(inserted.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_insert_flag() {
        assert_eq!(UpsertOutcome::from(true), UpsertOutcome::Inserted);
        assert_eq!(UpsertOutcome::from(false), UpsertOutcome::Updated);
    }
}
