//! Table-specific extraction from the source database
//!
//! Queries are built per run: every optional column in a SELECT list must
//! be confirmed by the run's [`ColumnAvailability`] first, and the WHERE
//! clause depends on the sync mode. Numeric and date-like columns are
//! cast in SQL (`::bigint`, `::text`) so decoding does not depend on the
//! exact column types a given BioTrack release uses.

use biosync_common::SyncType;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};

use super::models::{RawCustomer, RawLocation, RawProduct, RawSale};
use super::registry::LicenseFilter;
use super::schema::ColumnAvailability;

/// Optional customer columns probed each run.
pub const CUSTOMER_OPTIONAL_COLUMNS: [&str; 6] = [
    "licensenum",
    "licenseexpyear",
    "licenseexpmonth",
    "licenseexpday",
    "loyaltypoints",
    "memberstatus",
];

/// Optional sale columns probed each run.
pub const SALE_OPTIONAL_COLUMNS: [&str; 1] = ["refunded"];

/// Fixed historical anchor for full sales syncs: 2024-01-01T00:00:00Z.
///
/// Full sync pulls from here regardless of the current date so upstream
/// year-over-year aggregates stay complete; incremental pulls only the
/// trailing window.
pub const FULL_SYNC_ANCHOR_EPOCH: i64 = 1_704_067_200;

/// Trailing window for incremental sales syncs.
pub const INCREMENTAL_WINDOW_DAYS: i64 = 30;

/// Start of the sales extraction window, as epoch seconds.
pub fn sales_window_start(mode: SyncType, now: DateTime<Utc>) -> i64 {
    match mode {
        SyncType::Full => FULL_SYNC_ANCHOR_EPOCH,
        SyncType::Incremental => (now - Duration::days(INCREMENTAL_WINDOW_DAYS)).timestamp(),
    }
}

/// Build the customers SELECT for the given mode and availability.
///
/// Base predicate: not soft-deleted, with at least one contact channel
/// (phone, cell, or email). When the license column exists and the
/// profile carries an eligibility pattern, the jurisdiction filter is
/// added as a bound regex (`$1`).
pub fn customers_query(
    mode: SyncType,
    cols: &ColumnAvailability,
    license_filter: Option<&LicenseFilter>,
    incremental_limit: i64,
) -> String {
    let mut select = String::from(
        "SELECT customerid::bigint AS customerid, \
         firstname::text AS firstname, lastname::text AS lastname, \
         email::text AS email, phone::text AS phone, cell::text AS cell, \
         birthday::text AS birthday, location::bigint AS location",
    );

    for column in CUSTOMER_OPTIONAL_COLUMNS {
        if cols.has(column) {
            select.push_str(&format!(", {col}::text AS {col}", col = column));
        }
    }

    select.push_str(
        " FROM customers WHERE deleted = 0 \
         AND (NULLIF(phone, '') IS NOT NULL \
          OR NULLIF(cell, '') IS NOT NULL \
          OR NULLIF(email, '') IS NOT NULL)",
    );

    if cols.has("licensenum") && license_filter.is_some() {
        select.push_str(" AND NULLIF(licensenum, '') IS NOT NULL AND licensenum ~ $1");
    }

    match mode {
        // Unbounded: full sync reconciles the complete eligible history.
        SyncType::Full => select.push_str(" ORDER BY customerid"),
        SyncType::Incremental => select.push_str(&format!(
            " ORDER BY customerid DESC LIMIT {}",
            incremental_limit
        )),
    }

    select
}

/// Build the sales SELECT; the time window arrives as bind `$1`.
pub fn sales_query(cols: &ColumnAvailability) -> String {
    let mut select = String::from(
        "SELECT id::bigint AS id, datetime::text AS datetime, \
         customerid::bigint AS customerid, location::bigint AS location, \
         itemid::text AS itemid, quantity::double precision AS quantity, \
         total::double precision AS total",
    );

    for column in SALE_OPTIONAL_COLUMNS {
        if cols.has(column) {
            select.push_str(&format!(", {col}::bigint AS {col}", col = column));
        }
    }

    select.push_str(" FROM sales WHERE deleted = 0 AND datetime >= $1 ORDER BY id");
    select
}

/// Build the locations SELECT.
pub fn locations_query(page_size: i64) -> String {
    format!(
        "SELECT id::bigint AS id, name::text AS name, address::text AS address, \
         city::text AS city, state::text AS state, zip::text AS zip \
         FROM locations WHERE deleted = 0 ORDER BY id LIMIT {}",
        page_size
    )
}

/// Build the products SELECT.
pub fn products_query(page_size: i64) -> String {
    format!(
        "SELECT id::bigint AS id, name::text AS name, strain::text AS strain, \
         category::text AS category \
         FROM products WHERE deleted = 0 ORDER BY id LIMIT {}",
        page_size
    )
}

// ============================================================================
// Fetch + decode
// ============================================================================

pub async fn fetch_locations(pool: &PgPool, page_size: i64) -> Result<Vec<RawLocation>, sqlx::Error> {
    let rows = sqlx::query(&locations_query(page_size)).fetch_all(pool).await?;

    rows.iter()
        .map(|row| {
            Ok(RawLocation {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                address: row.try_get("address")?,
                city: row.try_get("city")?,
                state: row.try_get("state")?,
                zip: row.try_get("zip")?,
            })
        })
        .collect()
}

pub async fn fetch_customers(
    pool: &PgPool,
    mode: SyncType,
    cols: &ColumnAvailability,
    license_filter: Option<&LicenseFilter>,
    incremental_limit: i64,
) -> Result<Vec<RawCustomer>, sqlx::Error> {
    let sql = customers_query(mode, cols, license_filter, incremental_limit);
    let mut query = sqlx::query(&sql);

    if cols.has("licensenum") {
        if let Some(filter) = license_filter {
            query = query.bind(filter.pattern.clone());
        }
    }

    let rows = query.fetch_all(pool).await?;

    rows.iter()
        .map(|row| {
            let optional = |column: &str| -> Result<Option<String>, sqlx::Error> {
                if cols.has(column) {
                    row.try_get(column)
                } else {
                    Ok(None)
                }
            };

            Ok(RawCustomer {
                customerid: row.try_get("customerid")?,
                firstname: row.try_get("firstname")?,
                lastname: row.try_get("lastname")?,
                email: row.try_get("email")?,
                phone: row.try_get("phone")?,
                cell: row.try_get("cell")?,
                birthday: row.try_get("birthday")?,
                licensenum: optional("licensenum")?,
                licenseexpyear: optional("licenseexpyear")?,
                licenseexpmonth: optional("licenseexpmonth")?,
                licenseexpday: optional("licenseexpday")?,
                loyaltypoints: optional("loyaltypoints")?,
                memberstatus: optional("memberstatus")?,
                location: row.try_get("location")?,
            })
        })
        .collect()
}

pub async fn fetch_products(pool: &PgPool, page_size: i64) -> Result<Vec<RawProduct>, sqlx::Error> {
    let rows = sqlx::query(&products_query(page_size)).fetch_all(pool).await?;

    rows.iter()
        .map(|row| {
            Ok(RawProduct {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                strain: row.try_get("strain")?,
                category: row.try_get("category")?,
            })
        })
        .collect()
}

pub async fn fetch_sales(
    pool: &PgPool,
    mode: SyncType,
    cols: &ColumnAvailability,
    now: DateTime<Utc>,
) -> Result<Vec<RawSale>, sqlx::Error> {
    let sql = sales_query(cols);
    let window_start = sales_window_start(mode, now);

    let rows = sqlx::query(&sql).bind(window_start).fetch_all(pool).await?;

    rows.iter()
        .map(|row| {
            Ok(RawSale {
                id: row.try_get("id")?,
                datetime: row.try_get("datetime")?,
                customerid: row.try_get("customerid")?,
                location: row.try_get("location")?,
                itemid: row.try_get("itemid")?,
                quantity: row.try_get("quantity")?,
                total: row.try_get("total")?,
                refunded: if cols.has("refunded") {
                    row.try_get("refunded")?
                } else {
                    None
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use biosync_common::SyncTable;
    use chrono::TimeZone;

    fn all_customer_columns() -> ColumnAvailability {
        ColumnAvailability::from_columns(SyncTable::Customers, &CUSTOMER_OPTIONAL_COLUMNS)
    }

    fn filter() -> LicenseFilter {
        LicenseFilter {
            pattern: "^OR-".to_string(),
        }
    }

    #[test]
    fn test_customers_query_includes_license_filter_when_column_present() {
        let sql = customers_query(SyncType::Full, &all_customer_columns(), Some(&filter()), 500);
        assert!(sql.contains("licensenum ~ $1"));
        assert!(sql.contains("licensenum::text AS licensenum"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_customers_query_skips_license_filter_when_column_absent() {
        let cols = ColumnAvailability::empty(SyncTable::Customers);
        let sql = customers_query(SyncType::Full, &cols, Some(&filter()), 500);
        assert!(!sql.contains("licensenum"));
    }

    #[test]
    fn test_customers_query_skips_filter_without_pattern() {
        let sql = customers_query(SyncType::Full, &all_customer_columns(), None, 500);
        assert!(!sql.contains("~ $1"));
        // The column itself is still selected for transformation.
        assert!(sql.contains("licensenum::text AS licensenum"));
    }

    #[test]
    fn test_customers_query_contact_predicate_always_present() {
        let sql = customers_query(SyncType::Incremental, &ColumnAvailability::empty(SyncTable::Customers), None, 250);
        assert!(sql.contains("NULLIF(phone, '') IS NOT NULL"));
        assert!(sql.contains("NULLIF(cell, '') IS NOT NULL"));
        assert!(sql.contains("NULLIF(email, '') IS NOT NULL"));
        assert!(sql.contains("deleted = 0"));
    }

    #[test]
    fn test_customers_incremental_is_bounded_and_newest_first() {
        let sql = customers_query(SyncType::Incremental, &all_customer_columns(), None, 250);
        assert!(sql.ends_with("ORDER BY customerid DESC LIMIT 250"));
    }

    #[test]
    fn test_sales_window_full_uses_fixed_anchor() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        assert_eq!(sales_window_start(SyncType::Full, now), FULL_SYNC_ANCHOR_EPOCH);
    }

    #[test]
    fn test_sales_window_incremental_is_trailing_30_days() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        let start = sales_window_start(SyncType::Incremental, now);
        assert_eq!(start, now.timestamp() - 30 * 24 * 3600);
    }

    #[test]
    fn test_sales_query_optional_refunded_column() {
        let with = ColumnAvailability::from_columns(SyncTable::Sales, &SALE_OPTIONAL_COLUMNS);
        let without = ColumnAvailability::empty(SyncTable::Sales);
        assert!(sales_query(&with).contains("refunded::bigint AS refunded"));
        assert!(!sales_query(&without).contains("refunded"));
    }

    #[test]
    fn test_bounded_queries_are_ordered_by_primary_key() {
        assert!(locations_query(100).contains("ORDER BY id LIMIT 100"));
        assert!(products_query(100).contains("ORDER BY id LIMIT 100"));
    }
}
