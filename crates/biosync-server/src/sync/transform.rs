//! Row transformation: raw BioTrack shapes → normalized target records
//!
//! All value repair lives here: epoch timestamps arrive as text (possibly
//! with grouping punctuation) and are clamped to a plausible range;
//! license expiration dates are rebuilt from fragmented year/month/day
//! fields; location codes resolve through the deployment's site map; and
//! columns the schema probe did not confirm get explicit defaults.
//!
//! A per-row failure is converted into a row-scoped error string by
//! [`transform_batch`] and the row is skipped; it never aborts the batch.

use biosync_common::SyncTable;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use thiserror::Error;

use super::models::{
    CustomerRecord, LocationRecord, ProductRecord, RawCustomer, RawLocation, RawProduct, RawSale,
    SaleRecord,
};
use super::registry::ConnectionProfile;

/// Earliest accepted epoch value, exclusive. Zero is a source sentinel
/// for "unset" and maps to null.
pub const MIN_EPOCH_EXCLUSIVE: i64 = 0;

/// Latest accepted epoch value: 2030-01-01T00:00:00Z, inclusive.
pub const MAX_EPOCH: i64 = 1_893_456_000;

/// Accepted year range for fragmented dates.
pub const YEAR_RANGE: std::ops::RangeInclusive<i64> = 1900..=2030;

/// Row-scoped transformation failure
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("malformed timestamp in {field}: {value:?}")]
    MalformedTimestamp { field: String, value: String },

    #[error("missing required field {field}")]
    MissingField { field: &'static str },
}

/// Parse an epoch-seconds value that may carry grouping punctuation.
///
/// Returns `Ok(None)` for empty input and for parsed values outside
/// `(0, 2030-01-01]`: corrupt source timestamps are clamped to null
/// with a warning, never propagated. Non-numeric input is an error.
pub fn parse_epoch(field: &str, raw: &str) -> Result<Option<DateTime<Utc>>, TransformError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();

    if cleaned.is_empty() {
        return Ok(None);
    }

    let seconds: i64 = cleaned.parse().map_err(|_| TransformError::MalformedTimestamp {
        field: field.to_string(),
        value: raw.to_string(),
    })?;

    if seconds <= MIN_EPOCH_EXCLUSIVE || seconds > MAX_EPOCH {
        tracing::warn!(field, value = seconds, "Epoch timestamp outside plausible range, dropping");
        return Ok(None);
    }

    match Utc.timestamp_opt(seconds, 0) {
        chrono::LocalResult::Single(ts) => Ok(Some(ts)),
        _ => Ok(None),
    }
}

fn parse_epoch_field(
    field: &str,
    raw: Option<&String>,
) -> Result<Option<DateTime<Utc>>, TransformError> {
    match raw {
        Some(value) => parse_epoch(field, value),
        None => Ok(None),
    }
}

/// Numeric date fragment; unparseable text degrades to "missing".
fn parse_date_part(raw: Option<&String>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next.and_then(|d| d.pred_opt())
}

/// Rebuild a calendar date from fragmented year/month/day fields.
///
/// Year or month missing → null. Year must fall in `[1900, 2030]`, month
/// in `[1, 12]`. A present day must be in `[1, 31]` and form a real
/// calendar date (Feb 30 rejects); an absent day resolves to the last
/// day of the month. The result is always a validated date, never an
/// unchecked string.
pub fn rebuild_date(year: Option<i64>, month: Option<i64>, day: Option<i64>) -> Option<NaiveDate> {
    let (year, month) = match (year, month) {
        (Some(y), Some(m)) => (y, m),
        _ => return None,
    };

    if !YEAR_RANGE.contains(&year) || !(1..=12).contains(&month) {
        tracing::warn!(year, month, "Fragmented date outside accepted range, dropping");
        return None;
    }

    let (year, month) = (year as i32, month as u32);

    match day {
        Some(day) => {
            if !(1..=31).contains(&day) {
                tracing::warn!(year, month, day, "Fragmented date day out of range, dropping");
                return None;
            }
            let date = NaiveDate::from_ymd_opt(year, month, day as u32);
            if date.is_none() {
                tracing::warn!(year, month, day, "Fragmented date is not a real calendar date, dropping");
            }
            date
        },
        None => last_day_of_month(year, month),
    }
}

/// Empty or whitespace-only text normalizes to `None`.
fn clean(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Loyalty points default to 0 when the column is absent or unparseable.
fn parse_loyalty_points(raw: Option<&String>) -> i64 {
    match raw {
        None => 0,
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return 0;
            }
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
                .unwrap_or_else(|_| {
                    tracing::warn!(value = trimmed, "Unparseable loyalty points, defaulting to 0");
                    0
                })
        },
    }
}

// ============================================================================
// Per-table transforms
// ============================================================================

pub fn transform_location(
    raw: &RawLocation,
    profile: &ConnectionProfile,
) -> Result<LocationRecord, TransformError> {
    // Prefer the deployment's site map over whatever the source row says;
    // an unmapped, unnamed location still gets a synthetic label.
    let name = clean(raw.name.clone()).unwrap_or_else(|| profile.location_name(raw.id));

    Ok(LocationRecord {
        location_id: raw.id,
        database_source: profile.id.clone(),
        name,
        address: clean(raw.address.clone()),
        city: clean(raw.city.clone()),
        state: clean(raw.state.clone()),
        zip: clean(raw.zip.clone()),
    })
}

pub fn transform_customer(
    raw: &RawCustomer,
    profile: &ConnectionProfile,
) -> Result<CustomerRecord, TransformError> {
    let phone = clean(raw.phone.clone()).or_else(|| clean(raw.cell.clone()));
    let birthday = parse_epoch_field("birthday", raw.birthday.as_ref())?;

    let license_exp_date = rebuild_date(
        parse_date_part(raw.licenseexpyear.as_ref()),
        parse_date_part(raw.licenseexpmonth.as_ref()),
        parse_date_part(raw.licenseexpday.as_ref()),
    );

    Ok(CustomerRecord {
        customer_id: raw.customerid,
        database_source: profile.id.clone(),
        first_name: clean(raw.firstname.clone()),
        last_name: clean(raw.lastname.clone()),
        email: clean(raw.email.clone()),
        phone,
        birthday,
        license_number: clean(raw.licensenum.clone()),
        license_exp_date,
        loyalty_points: parse_loyalty_points(raw.loyaltypoints.as_ref()),
        member_status: clean(raw.memberstatus.clone()),
        location_code: raw.location,
        location_name: raw.location.map(|code| profile.location_name(code)),
    })
}

pub fn transform_product(
    raw: &RawProduct,
    profile: &ConnectionProfile,
) -> Result<ProductRecord, TransformError> {
    let name = clean(raw.name.clone()).ok_or(TransformError::MissingField { field: "name" })?;

    Ok(ProductRecord {
        product_id: raw.id,
        database_source: profile.id.clone(),
        name,
        strain: clean(raw.strain.clone()),
        category: clean(raw.category.clone()),
    })
}

pub fn transform_sale(
    raw: &RawSale,
    profile: &ConnectionProfile,
) -> Result<SaleRecord, TransformError> {
    let sold_at = parse_epoch_field("datetime", raw.datetime.as_ref())?;

    Ok(SaleRecord {
        sale_id: raw.id,
        database_source: profile.id.clone(),
        sold_at,
        customer_id: raw.customerid,
        location_code: raw.location,
        location_name: raw.location.map(|code| profile.location_name(code)),
        item_id: clean(raw.itemid.clone()),
        quantity: raw.quantity,
        total: raw.total,
        refunded: matches!(raw.refunded, Some(v) if v != 0),
    })
}

// ============================================================================
// Batch transformation
// ============================================================================

/// Transformed records plus the row-scoped errors accumulated on the way.
#[derive(Debug)]
pub struct BatchResult<T> {
    pub records: Vec<T>,
    pub errors: Vec<String>,
    pub processed: u64,
}

/// Transform every row, skipping failures.
///
/// Each failure becomes one error string naming the table and the
/// offending row's natural key; the remaining rows still transform.
pub fn transform_batch<R, T>(
    rows: &[R],
    table: SyncTable,
    transform: impl Fn(&R) -> Result<T, TransformError>,
    key: impl Fn(&R) -> i64,
) -> BatchResult<T> {
    let mut records = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();

    for row in rows {
        match transform(row) {
            Ok(record) => records.push(record),
            Err(e) => errors.push(format!("Error transforming {} {}: {}", table, key(row), e)),
        }
    }

    BatchResult {
        records,
        errors,
        processed: rows.len() as u64,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn profile() -> ConnectionProfile {
        let mut locations = HashMap::new();
        locations.insert(1, "Main Street".to_string());
        ConnectionProfile {
            id: "primary".to_string(),
            name: "Primary".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            database: "biotrack".to_string(),
            user: "sync".to_string(),
            password: String::new(),
            ssl: false,
            locations,
            license_filter: None,
        }
    }

    // ------------------------------------------------------------------
    // Epoch clamping
    // ------------------------------------------------------------------

    #[test]
    fn test_epoch_negative_rejects_to_null() {
        assert_eq!(parse_epoch("t", "-5").unwrap(), None);
    }

    #[test]
    fn test_epoch_zero_rejects_to_null() {
        assert_eq!(parse_epoch("t", "0").unwrap(), None);
    }

    #[test]
    fn test_epoch_past_2030_rejects_to_null() {
        assert_eq!(parse_epoch("t", "1893456001").unwrap(), None);
    }

    #[test]
    fn test_epoch_upper_bound_inclusive() {
        let ts = parse_epoch("t", "1893456000").unwrap().unwrap();
        assert_eq!(ts.timestamp(), MAX_EPOCH);
    }

    #[test]
    fn test_epoch_with_grouping_punctuation_parses() {
        let ts = parse_epoch("t", "1,700,000,000").unwrap().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_epoch_garbage_is_malformed() {
        assert!(parse_epoch("t", "not-a-date").is_err());
    }

    #[test]
    fn test_epoch_empty_is_missing() {
        assert_eq!(parse_epoch("t", "   ").unwrap(), None);
    }

    // ------------------------------------------------------------------
    // Fragmented dates
    // ------------------------------------------------------------------

    #[test]
    fn test_rebuild_date_rejects_impossible_calendar_date() {
        assert_eq!(rebuild_date(Some(2025), Some(2), Some(30)), None);
    }

    #[test]
    fn test_rebuild_date_missing_day_resolves_to_month_end() {
        assert_eq!(
            rebuild_date(Some(2025), Some(2), None),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
    }

    #[test]
    fn test_rebuild_date_missing_day_leap_year() {
        assert_eq!(
            rebuild_date(Some(2024), Some(2), None),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }

    #[test]
    fn test_rebuild_date_december_month_end() {
        assert_eq!(
            rebuild_date(Some(2025), Some(12), None),
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
    }

    #[test]
    fn test_rebuild_date_requires_year_and_month() {
        assert_eq!(rebuild_date(None, Some(5), Some(1)), None);
        assert_eq!(rebuild_date(Some(2025), None, Some(1)), None);
    }

    #[test]
    fn test_rebuild_date_range_checks() {
        assert_eq!(rebuild_date(Some(1899), Some(5), Some(1)), None);
        assert_eq!(rebuild_date(Some(2031), Some(5), Some(1)), None);
        assert_eq!(rebuild_date(Some(2025), Some(13), Some(1)), None);
        assert_eq!(rebuild_date(Some(2025), Some(5), Some(0)), None);
        assert_eq!(rebuild_date(Some(2025), Some(5), Some(32)), None);
    }

    #[test]
    fn test_rebuild_date_valid() {
        assert_eq!(
            rebuild_date(Some(2027), Some(6), Some(15)),
            NaiveDate::from_ymd_opt(2027, 6, 15)
        );
    }

    // ------------------------------------------------------------------
    // Customer transform
    // ------------------------------------------------------------------

    #[test]
    fn test_customer_defaults_when_optional_columns_absent() {
        let raw = RawCustomer {
            customerid: 42,
            firstname: Some("Ada".to_string()),
            lastname: Some("Byron".to_string()),
            email: Some("ada@example.com".to_string()),
            ..Default::default()
        };
        let record = transform_customer(&raw, &profile()).unwrap();
        assert_eq!(record.loyalty_points, 0);
        assert_eq!(record.member_status, None);
        assert_eq!(record.license_number, None);
        assert_eq!(record.license_exp_date, None);
        assert_eq!(record.birthday, None);
    }

    #[test]
    fn test_customer_phone_falls_back_to_cell() {
        let raw = RawCustomer {
            customerid: 1,
            phone: Some("  ".to_string()),
            cell: Some("555-0100".to_string()),
            ..Default::default()
        };
        let record = transform_customer(&raw, &profile()).unwrap();
        assert_eq!(record.phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn test_customer_expiration_date_derived_from_fragments() {
        let raw = RawCustomer {
            customerid: 7,
            licenseexpyear: Some("2026".to_string()),
            licenseexpmonth: Some("4".to_string()),
            licenseexpday: None,
            ..Default::default()
        };
        let record = transform_customer(&raw, &profile()).unwrap();
        assert_eq!(record.license_exp_date, NaiveDate::from_ymd_opt(2026, 4, 30));
    }

    #[test]
    fn test_customer_location_resolution_with_fallback() {
        let mapped = RawCustomer {
            customerid: 1,
            location: Some(1),
            ..Default::default()
        };
        let unmapped = RawCustomer {
            customerid: 2,
            location: Some(9),
            ..Default::default()
        };
        let p = profile();
        assert_eq!(
            transform_customer(&mapped, &p).unwrap().location_name.as_deref(),
            Some("Main Street")
        );
        assert_eq!(
            transform_customer(&unmapped, &p).unwrap().location_name.as_deref(),
            Some("Location 9")
        );
    }

    #[test]
    fn test_customer_garbage_birthday_is_row_error() {
        let raw = RawCustomer {
            customerid: 5,
            birthday: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(transform_customer(&raw, &profile()).is_err());
    }

    // ------------------------------------------------------------------
    // Sale / product / location transforms
    // ------------------------------------------------------------------

    #[test]
    fn test_sale_out_of_range_datetime_nulls_sold_at() {
        let raw = RawSale {
            id: 10,
            datetime: Some("1893456001".to_string()),
            ..Default::default()
        };
        let record = transform_sale(&raw, &profile()).unwrap();
        assert_eq!(record.sold_at, None);
    }

    #[test]
    fn test_sale_refunded_defaults_false() {
        let raw = RawSale {
            id: 11,
            datetime: Some("1700000000".to_string()),
            ..Default::default()
        };
        let record = transform_sale(&raw, &profile()).unwrap();
        assert!(!record.refunded);

        let refunded = RawSale {
            refunded: Some(1),
            ..raw
        };
        assert!(transform_sale(&refunded, &profile()).unwrap().refunded);
    }

    #[test]
    fn test_product_without_name_is_row_error() {
        let raw = RawProduct {
            id: 3,
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(transform_product(&raw, &profile()).is_err());
    }

    #[test]
    fn test_location_name_defaults_to_site_map() {
        let raw = RawLocation {
            id: 1,
            name: None,
            ..Default::default()
        };
        let record = transform_location(&raw, &profile()).unwrap();
        assert_eq!(record.name, "Main Street");
    }

    // ------------------------------------------------------------------
    // Batch isolation
    // ------------------------------------------------------------------

    #[test]
    fn test_batch_isolates_single_malformed_row() {
        let mut rows: Vec<RawSale> = (1..=10)
            .map(|id| RawSale {
                id,
                datetime: Some("1700000000".to_string()),
                ..Default::default()
            })
            .collect();
        // Row 5 carries a malformed date.
        rows[4].datetime = Some("garbage".to_string());

        let p = profile();
        let batch = transform_batch(&rows, SyncTable::Sales, |r| transform_sale(r, &p), |r| r.id);

        assert_eq!(batch.processed, 10);
        assert_eq!(batch.records.len(), 9);
        assert_eq!(batch.errors.len(), 1);
        assert!(batch.errors[0].contains("sales 5"));
    }
}
