//! Sync run orchestration
//!
//! Sequences table syncs in dependency order over one per-run source
//! pool, accumulating per-table outcomes into a run report:
//!
//! Pending → Connecting → Syncing(table)* → Aggregating → Completed
//!
//! Row-level errors never escalate to table failure; a table-level
//! connectivity error never aborts the run; only an unreachable source
//! at run start (the precondition probe) aborts everything with no
//! partial results. Each run races a configurable deadline and a
//! cooperative cancellation token, checked between tables and between
//! rows.

use biosync_common::{SyncTable, SyncType};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::extract;
use super::history;
use super::load::{self, UpsertOutcome};
use super::models::{
    RunSummary, SyncRequest, SyncRunReport, TableOutcome, TableSyncResult,
};
use super::registry::{ConnectionProfile, DatabaseRegistry};
use super::schema;
use super::transform;
use crate::config::SyncConfig;

/// Run-fatal errors: nothing was synced when one of these is returned.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Unknown database configuration: {0}")]
    UnknownDatabase(String),

    #[error("No valid tables requested")]
    NoTables,

    #[error("Source database unreachable: {0}")]
    SourceUnreachable(String),
}

/// Engine tunables, derived from server configuration.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub page_size: i64,
    pub incremental_page_size: i64,
    pub run_deadline: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            incremental_page_size: 500,
            run_deadline: Duration::from_secs(1800),
        }
    }
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            page_size: config.page_size,
            incremental_page_size: config.incremental_page_size,
            run_deadline: Duration::from_secs(config.run_deadline_secs),
        }
    }
}

/// Injectable observability hooks for the engine.
///
/// The default implementations are no-ops so tests can observe exactly
/// the events they care about without capturing stdout.
pub trait SyncObserver: Send + Sync {
    fn table_started(&self, _table: SyncTable) {}
    fn row_error(&self, _table: SyncTable, _error: &str) {}
    fn table_completed(&self, _result: &TableSyncResult) {}
    fn run_completed(&self, _report: &SyncRunReport) {}
}

/// Default observer: structured tracing events.
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn table_started(&self, table: SyncTable) {
        info!(%table, "Table sync started");
    }

    fn row_error(&self, table: SyncTable, error: &str) {
        warn!(%table, error, "Row-scoped sync error");
    }

    fn table_completed(&self, result: &TableSyncResult) {
        info!(
            table = %result.table,
            processed = result.records_processed,
            inserted = result.records_inserted,
            updated = result.records_updated,
            errors = result.errors.len(),
            "Table sync completed"
        );
    }

    fn run_completed(&self, report: &SyncRunReport) {
        info!(
            run_id = %report.run_id,
            database = %report.database_id,
            status = %report.status,
            records = report.summary.total_records,
            errors = report.summary.total_errors,
            duration_ms = report.duration_ms(),
            "Sync run completed"
        );
    }
}

/// Order requested tables into fixed dependency order.
///
/// Locations must precede customers; duplicates collapse. Unknown names
/// are expected to have been dropped by the caller during parsing.
pub fn order_tables(requested: &[SyncTable]) -> Vec<SyncTable> {
    SyncTable::DEPENDENCY_ORDER
        .iter()
        .copied()
        .filter(|table| requested.contains(table))
        .collect()
}

/// Source connectivity snapshot for the status endpoint.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub connected: bool,
    pub table_counts: HashMap<String, i64>,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Deadline + cancellation guard for one run.
struct RunGuard {
    cancel: CancellationToken,
    deadline: Instant,
}

impl RunGuard {
    fn new(cancel: CancellationToken, deadline: Duration) -> Self {
        Self {
            cancel,
            deadline: Instant::now() + deadline,
        }
    }

    fn stop_reason(&self) -> Option<&'static str> {
        if self.cancel.is_cancelled() {
            Some("sync cancelled")
        } else if Instant::now() >= self.deadline {
            Some("run deadline exceeded")
        } else {
            None
        }
    }
}

/// The synchronization engine.
///
/// Holds the destination pool, the source registry, and the observer;
/// source connections are opened per run and closed on every exit path.
pub struct SyncEngine {
    dest: PgPool,
    registry: Arc<DatabaseRegistry>,
    settings: SyncSettings,
    observer: Arc<dyn SyncObserver>,
}

impl SyncEngine {
    pub fn new(dest: PgPool, registry: DatabaseRegistry, settings: SyncSettings) -> Self {
        Self {
            dest,
            registry: Arc::new(registry),
            settings,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the default tracing observer.
    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn registry(&self) -> &DatabaseRegistry {
        &self.registry
    }

    /// Execute one sync run.
    pub async fn run(
        &self,
        request: SyncRequest,
        cancel: CancellationToken,
    ) -> Result<SyncRunReport, SyncError> {
        let profile = self
            .registry
            .resolve(&request.database_id)
            .map_err(|_| SyncError::UnknownDatabase(request.database_id.clone()))?
            .clone();

        let tables = order_tables(&request.tables);
        if tables.is_empty() {
            return Err(SyncError::NoTables);
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            %run_id,
            database = %profile.id,
            sync_type = %request.sync_type,
            ?tables,
            "Sync run starting"
        );

        // Precondition: the source must be reachable before any table is
        // attempted; a failure here aborts the run with no partial results.
        let source = self.connect_source(&profile).await?;

        let guard = RunGuard::new(cancel, self.settings.run_deadline);
        let mut results = Vec::with_capacity(tables.len());

        for table in &tables {
            if let Some(reason) = guard.stop_reason() {
                warn!(%table, reason, "Skipping table");
                results.push(TableSyncResult::aborted(*table, reason));
                continue;
            }

            self.observer.table_started(*table);
            let result = self
                .sync_table(&source, &profile, *table, request.sync_type, &guard)
                .await;
            self.observer.table_completed(&result);
            results.push(result);
        }

        source.close().await;

        let summary = RunSummary::aggregate(&results);
        let status = summary.status();
        let finished_at = Utc::now();

        let report = SyncRunReport {
            run_id,
            database_id: profile.id.clone(),
            database_name: profile.name.clone(),
            sync_type: request.sync_type,
            tables,
            started_at,
            finished_at,
            results,
            summary,
            status,
        };

        if let Err(e) = history::record_run(&self.dest, &report).await {
            // The run itself already completed; history is best-effort.
            warn!(%run_id, error = %e, "Failed to persist sync history");
        }

        self.observer.run_completed(&report);
        Ok(report)
    }

    /// Source connectivity + table counts for the status endpoint.
    pub async fn source_status(&self, database_id: &str) -> Result<SourceStatus, SyncError> {
        let profile = self
            .registry
            .resolve(database_id)
            .map_err(|_| SyncError::UnknownDatabase(database_id.to_string()))?
            .clone();

        let mut status = SourceStatus {
            connected: false,
            table_counts: HashMap::new(),
            timestamp: Utc::now(),
        };

        let source = match self.connect_source(&profile).await {
            Ok(pool) => pool,
            Err(e) => {
                warn!(database = %profile.id, error = %e, "Source status probe failed");
                return Ok(status);
            },
        };

        status.connected = true;
        for table in SyncTable::DEPENDENCY_ORDER {
            let count: Result<i64, sqlx::Error> = sqlx::query_scalar(&format!(
                "SELECT COUNT(*)::bigint FROM {} WHERE deleted = 0",
                table.as_str()
            ))
            .fetch_one(&source)
            .await;

            match count {
                Ok(count) => {
                    status.table_counts.insert(table.to_string(), count);
                },
                Err(e) => {
                    warn!(%table, error = %e, "Failed to count source table");
                },
            }
        }

        source.close().await;
        Ok(status)
    }

    /// Open the per-run source pool and verify reachability.
    async fn connect_source(&self, profile: &ConnectionProfile) -> Result<PgPool, SyncError> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(profile.connect_options())
            .await
            .map_err(|e| SyncError::SourceUnreachable(e.to_string()))?;

        if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
            pool.close().await;
            return Err(SyncError::SourceUnreachable(e.to_string()));
        }

        Ok(pool)
    }

    /// Sync one table; never fails, always yields a sealed result.
    async fn sync_table(
        &self,
        source: &PgPool,
        profile: &ConnectionProfile,
        table: SyncTable,
        mode: SyncType,
        guard: &RunGuard,
    ) -> TableSyncResult {
        let mut outcome = TableOutcome::new(table);

        let table_result = match table {
            SyncTable::Locations => {
                self.sync_locations(source, profile, &mut outcome, guard).await
            },
            SyncTable::Customers => {
                self.sync_customers(source, profile, mode, &mut outcome, guard).await
            },
            SyncTable::Products => {
                self.sync_products(source, profile, &mut outcome, guard).await
            },
            SyncTable::Sales => {
                self.sync_sales(source, profile, mode, &mut outcome, guard).await
            },
        };

        if let Err(e) = table_result {
            // Connectivity failure scoped to this table: record it and let
            // the remaining tables still attempt to sync.
            let message = format!("Error syncing {}: {}", table, e);
            error!(%table, error = %e, "Table sync failed");
            outcome.record_error(message);
        }

        outcome.finish()
    }

    fn drain_transform_errors(
        &self,
        table: SyncTable,
        errors: Vec<String>,
        outcome: &mut TableOutcome,
    ) {
        for message in errors {
            self.observer.row_error(table, &message);
            outcome.record_error(message);
        }
    }

    async fn sync_locations(
        &self,
        source: &PgPool,
        profile: &ConnectionProfile,
        outcome: &mut TableOutcome,
        guard: &RunGuard,
    ) -> Result<(), sqlx::Error> {
        let rows = extract::fetch_locations(source, self.settings.page_size).await?;
        let batch = transform::transform_batch(
            &rows,
            SyncTable::Locations,
            |row| transform::transform_location(row, profile),
            |row| row.id,
        );

        outcome.note_processed(batch.processed);
        self.drain_transform_errors(SyncTable::Locations, batch.errors, outcome);

        let now = Utc::now();
        for record in &batch.records {
            if let Some(reason) = guard.stop_reason() {
                outcome.record_error(format!("Table locations interrupted: {}", reason));
                break;
            }
            match load::upsert_location(&self.dest, record, now).await {
                Ok(UpsertOutcome::Inserted) => outcome.record_insert(),
                Ok(UpsertOutcome::Updated) => outcome.record_update(),
                Err(e) => {
                    let message =
                        format!("Error upserting locations {}: {}", record.location_id, e);
                    self.observer.row_error(SyncTable::Locations, &message);
                    outcome.record_error(message);
                },
            }
        }

        Ok(())
    }

    async fn sync_customers(
        &self,
        source: &PgPool,
        profile: &ConnectionProfile,
        mode: SyncType,
        outcome: &mut TableOutcome,
        guard: &RunGuard,
    ) -> Result<(), sqlx::Error> {
        let cols = schema::probe_columns(
            source,
            SyncTable::Customers,
            &extract::CUSTOMER_OPTIONAL_COLUMNS,
        )
        .await;

        let rows = extract::fetch_customers(
            source,
            mode,
            &cols,
            profile.license_filter.as_ref(),
            self.settings.incremental_page_size,
        )
        .await?;

        let batch = transform::transform_batch(
            &rows,
            SyncTable::Customers,
            |row| transform::transform_customer(row, profile),
            |row| row.customerid,
        );

        outcome.note_processed(batch.processed);
        self.drain_transform_errors(SyncTable::Customers, batch.errors, outcome);

        let now = Utc::now();
        for record in &batch.records {
            if let Some(reason) = guard.stop_reason() {
                outcome.record_error(format!("Table customers interrupted: {}", reason));
                break;
            }
            match load::upsert_customer(&self.dest, record, now).await {
                Ok(UpsertOutcome::Inserted) => outcome.record_insert(),
                Ok(UpsertOutcome::Updated) => outcome.record_update(),
                Err(e) => {
                    let message =
                        format!("Error upserting customers {}: {}", record.customer_id, e);
                    self.observer.row_error(SyncTable::Customers, &message);
                    outcome.record_error(message);
                },
            }
        }

        Ok(())
    }

    async fn sync_products(
        &self,
        source: &PgPool,
        profile: &ConnectionProfile,
        outcome: &mut TableOutcome,
        guard: &RunGuard,
    ) -> Result<(), sqlx::Error> {
        let rows = extract::fetch_products(source, self.settings.page_size).await?;
        let batch = transform::transform_batch(
            &rows,
            SyncTable::Products,
            |row| transform::transform_product(row, profile),
            |row| row.id,
        );

        outcome.note_processed(batch.processed);
        self.drain_transform_errors(SyncTable::Products, batch.errors, outcome);

        let now = Utc::now();
        for record in &batch.records {
            if let Some(reason) = guard.stop_reason() {
                outcome.record_error(format!("Table products interrupted: {}", reason));
                break;
            }
            match load::upsert_product(&self.dest, record, now).await {
                Ok(UpsertOutcome::Inserted) => outcome.record_insert(),
                Ok(UpsertOutcome::Updated) => outcome.record_update(),
                Err(e) => {
                    let message =
                        format!("Error upserting products {}: {}", record.product_id, e);
                    self.observer.row_error(SyncTable::Products, &message);
                    outcome.record_error(message);
                },
            }
        }

        Ok(())
    }

    async fn sync_sales(
        &self,
        source: &PgPool,
        profile: &ConnectionProfile,
        mode: SyncType,
        outcome: &mut TableOutcome,
        guard: &RunGuard,
    ) -> Result<(), sqlx::Error> {
        let cols =
            schema::probe_columns(source, SyncTable::Sales, &extract::SALE_OPTIONAL_COLUMNS).await;

        let rows = extract::fetch_sales(source, mode, &cols, Utc::now()).await?;

        let batch = transform::transform_batch(
            &rows,
            SyncTable::Sales,
            |row| transform::transform_sale(row, profile),
            |row| row.id,
        );

        outcome.note_processed(batch.processed);
        self.drain_transform_errors(SyncTable::Sales, batch.errors, outcome);

        let now = Utc::now();
        for record in &batch.records {
            if let Some(reason) = guard.stop_reason() {
                outcome.record_error(format!("Table sales interrupted: {}", reason));
                break;
            }
            match load::upsert_sale(&self.dest, record, now).await {
                Ok(UpsertOutcome::Inserted) => outcome.record_insert(),
                Ok(UpsertOutcome::Updated) => outcome.record_update(),
                Err(e) => {
                    let message = format!("Error upserting sales {}: {}", record.sale_id, e);
                    self.observer.row_error(SyncTable::Sales, &message);
                    outcome.record_error(message);
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_tables_reorders_to_dependency_order() {
        let requested = vec![SyncTable::Customers, SyncTable::Locations];
        assert_eq!(
            order_tables(&requested),
            vec![SyncTable::Locations, SyncTable::Customers]
        );
    }

    #[test]
    fn test_order_tables_deduplicates() {
        let requested = vec![SyncTable::Sales, SyncTable::Sales, SyncTable::Products];
        assert_eq!(
            order_tables(&requested),
            vec![SyncTable::Products, SyncTable::Sales]
        );
    }

    #[test]
    fn test_order_tables_empty_request() {
        assert!(order_tables(&[]).is_empty());
    }

    #[test]
    fn test_guard_reports_cancellation() {
        let token = CancellationToken::new();
        let guard = RunGuard::new(token.clone(), Duration::from_secs(60));
        assert_eq!(guard.stop_reason(), None);

        token.cancel();
        assert_eq!(guard.stop_reason(), Some("sync cancelled"));
    }

    #[test]
    fn test_guard_reports_expired_deadline() {
        let guard = RunGuard::new(CancellationToken::new(), Duration::from_secs(0));
        assert_eq!(guard.stop_reason(), Some("run deadline exceeded"));
    }

    #[test]
    fn test_settings_from_config() {
        let config = SyncConfig {
            page_size: 10,
            incremental_page_size: 5,
            run_deadline_secs: 60,
            registry_file: None,
            schedule_enabled: false,
            schedule_interval_secs: 900,
            schedule_databases: Vec::new(),
        };
        let settings = SyncSettings::from(&config);
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.incremental_page_size, 5);
        assert_eq!(settings.run_deadline, Duration::from_secs(60));
    }
}
