//! Core types for the sync engine
//!
//! Raw source rows are ephemeral: they exist only between extraction and
//! transformation within one run. Target records carry the natural key,
//! the originating database id, and the derived fields the destination
//! schema stores.

use biosync_common::{RunStatus, SyncTable, SyncType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Run request / report
// ============================================================================

/// One sync invocation as requested by the API, CLI, or scheduler.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub database_id: String,
    pub sync_type: SyncType,
    pub tables: Vec<SyncTable>,
}

/// Outcome of one table within one run.
///
/// `success` holds iff `errors` is empty. `records_processed` is not
/// required to equal `inserted + updated + errors.len()`: a transform
/// failure short-circuits before any write is attempted, and it is
/// counted as an error, never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSyncResult {
    pub table: SyncTable,
    pub records_processed: u64,
    pub records_inserted: u64,
    pub records_updated: u64,
    pub errors: Vec<String>,
    pub success: bool,
    pub completed_at: DateTime<Utc>,
}

impl TableSyncResult {
    /// Result for a table that was never attempted (cancelled run,
    /// expired deadline).
    pub fn aborted(table: SyncTable, reason: &str) -> Self {
        Self {
            table,
            records_processed: 0,
            records_inserted: 0,
            records_updated: 0,
            errors: vec![format!("Table {} not synced: {}", table, reason)],
            success: false,
            completed_at: Utc::now(),
        }
    }
}

/// Accumulator for a table sync in progress; `finish` seals it into a
/// [`TableSyncResult`].
#[derive(Debug)]
pub struct TableOutcome {
    table: SyncTable,
    processed: u64,
    inserted: u64,
    updated: u64,
    errors: Vec<String>,
}

impl TableOutcome {
    pub fn new(table: SyncTable) -> Self {
        Self {
            table,
            processed: 0,
            inserted: 0,
            updated: 0,
            errors: Vec::new(),
        }
    }

    pub fn table(&self) -> SyncTable {
        self.table
    }

    pub fn note_processed(&mut self, count: u64) {
        self.processed += count;
    }

    pub fn record_insert(&mut self) {
        self.inserted += 1;
    }

    pub fn record_update(&mut self) {
        self.updated += 1;
    }

    pub fn record_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn finish(self) -> TableSyncResult {
        TableSyncResult {
            table: self.table,
            records_processed: self.processed,
            records_inserted: self.inserted,
            records_updated: self.updated,
            success: self.errors.is_empty(),
            errors: self.errors,
            completed_at: Utc::now(),
        }
    }
}

/// Aggregate counts across all table results of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_records: u64,
    pub total_inserted: u64,
    pub total_updated: u64,
    pub total_errors: u64,
}

impl RunSummary {
    pub fn aggregate(results: &[TableSyncResult]) -> Self {
        let mut summary = RunSummary {
            total_records: 0,
            total_inserted: 0,
            total_updated: 0,
            total_errors: 0,
        };
        for result in results {
            summary.total_records += result.records_processed;
            summary.total_inserted += result.records_inserted;
            summary.total_updated += result.records_updated;
            summary.total_errors += result.errors.len() as u64;
        }
        summary
    }

    pub fn status(&self) -> RunStatus {
        RunStatus::classify(self.total_records, self.total_errors)
    }
}

/// Finalized report for one run. Persisted to `sync_history` after
/// completion and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunReport {
    pub run_id: Uuid,
    pub database_id: String,
    pub database_name: String,
    pub sync_type: SyncType,
    pub tables: Vec<SyncTable>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<TableSyncResult>,
    pub summary: RunSummary,
    pub status: RunStatus,
}

impl SyncRunReport {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

// ============================================================================
// Raw source rows (BioTrack shapes)
// ============================================================================

/// Raw row from the BioTrack `locations` table.
#[derive(Debug, Clone, Default)]
pub struct RawLocation {
    pub id: i64,
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

/// Raw row from the BioTrack `customers` table.
///
/// `licensenum`, `loyaltypoints`, and `memberstatus` are drift-prone
/// optional columns; they are `None` whenever the run's schema probe did
/// not confirm them.
#[derive(Debug, Clone, Default)]
pub struct RawCustomer {
    pub customerid: i64,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub cell: Option<String>,
    /// Epoch seconds as text; some deployments store it with grouping
    /// punctuation.
    pub birthday: Option<String>,
    pub licensenum: Option<String>,
    pub licenseexpyear: Option<String>,
    pub licenseexpmonth: Option<String>,
    pub licenseexpday: Option<String>,
    pub loyaltypoints: Option<String>,
    pub memberstatus: Option<String>,
    pub location: Option<i64>,
}

/// Raw row from the BioTrack `products` table.
#[derive(Debug, Clone, Default)]
pub struct RawProduct {
    pub id: i64,
    pub name: Option<String>,
    pub strain: Option<String>,
    pub category: Option<String>,
}

/// Raw row from the BioTrack `sales` table.
#[derive(Debug, Clone, Default)]
pub struct RawSale {
    pub id: i64,
    /// Epoch seconds as text, same caveat as [`RawCustomer::birthday`].
    pub datetime: Option<String>,
    pub customerid: Option<i64>,
    pub location: Option<i64>,
    pub itemid: Option<String>,
    pub quantity: Option<f64>,
    pub total: Option<f64>,
    pub refunded: Option<i64>,
}

// ============================================================================
// Target records (destination shapes)
// ============================================================================

/// Normalized location row for the destination store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    pub location_id: i64,
    pub database_source: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

/// Normalized customer row for the destination store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: i64,
    pub database_source: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<DateTime<Utc>>,
    pub license_number: Option<String>,
    pub license_exp_date: Option<NaiveDate>,
    pub loyalty_points: i64,
    pub member_status: Option<String>,
    pub location_code: Option<i64>,
    pub location_name: Option<String>,
}

/// Normalized product row for the destination store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: i64,
    pub database_source: String,
    pub name: String,
    pub strain: Option<String>,
    pub category: Option<String>,
}

/// Normalized sale row for the destination store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    pub sale_id: i64,
    pub database_source: String,
    pub sold_at: Option<DateTime<Utc>>,
    pub customer_id: Option<i64>,
    pub location_code: Option<i64>,
    pub location_name: Option<String>,
    pub item_id: Option<String>,
    pub quantity: Option<f64>,
    pub total: Option<f64>,
    pub refunded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(table: SyncTable, processed: u64, inserted: u64, updated: u64, errors: usize) -> TableSyncResult {
        TableSyncResult {
            table,
            records_processed: processed,
            records_inserted: inserted,
            records_updated: updated,
            errors: (0..errors).map(|i| format!("error {}", i)).collect(),
            success: errors == 0,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_outcome_accumulates_and_seals() {
        let mut outcome = TableOutcome::new(SyncTable::Customers);
        outcome.note_processed(3);
        outcome.record_insert();
        outcome.record_update();
        outcome.record_error("Error upserting customers 7: boom".to_string());

        let result = outcome.finish();
        assert_eq!(result.records_processed, 3);
        assert_eq!(result.records_inserted, 1);
        assert_eq!(result.records_updated, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(!result.success);
    }

    #[test]
    fn test_success_holds_iff_no_errors() {
        let clean = TableOutcome::new(SyncTable::Products).finish();
        assert!(clean.success);
        assert!(clean.errors.is_empty());
    }

    #[test]
    fn test_summary_aggregates_across_tables() {
        let results = vec![
            result(SyncTable::Locations, 5, 5, 0, 0),
            result(SyncTable::Customers, 100, 40, 58, 2),
            result(SyncTable::Sales, 30, 0, 29, 1),
        ];
        let summary = RunSummary::aggregate(&results);
        assert_eq!(summary.total_records, 135);
        assert_eq!(summary.total_inserted, 45);
        assert_eq!(summary.total_updated, 87);
        assert_eq!(summary.total_errors, 3);
        assert_eq!(summary.status(), RunStatus::Partial);
    }

    #[test]
    fn test_table_result_serializes_camel_case() {
        let json = serde_json::to_value(result(SyncTable::Sales, 1, 1, 0, 0)).unwrap();
        assert!(json.get("recordsProcessed").is_some());
        assert!(json.get("recordsInserted").is_some());
        assert!(json.get("completedAt").is_some());
        assert_eq!(json["table"], "sales");
    }
}
