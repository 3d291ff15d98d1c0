//! Persisted sync run history
//!
//! One row per completed run, written after the run finishes and never
//! mutated. Persistence failures are the caller's to log; they must not
//! change the outcome already reported to the operator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::SyncRunReport;

/// One row of the `sync_history` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SyncHistoryEntry {
    pub id: Uuid,
    pub database_id: String,
    pub database_name: String,
    pub sync_type: String,
    pub tables: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: i64,
    pub total_records: i64,
    pub total_inserted: i64,
    pub total_updated: i64,
    pub total_errors: i64,
    pub status: String,
    /// Full per-table result list, serialized.
    pub results: serde_json::Value,
}

/// Persist one completed run.
pub async fn record_run(pool: &PgPool, report: &SyncRunReport) -> Result<(), sqlx::Error> {
    let tables: Vec<String> = report.tables.iter().map(|t| t.to_string()).collect();
    let results = serde_json::to_value(&report.results).unwrap_or(serde_json::Value::Null);

    sqlx::query(
        r#"
        INSERT INTO sync_history
            (id, database_id, database_name, sync_type, tables,
             start_time, end_time, duration_ms,
             total_records, total_inserted, total_updated, total_errors,
             status, results)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(report.run_id)
    .bind(&report.database_id)
    .bind(&report.database_name)
    .bind(report.sync_type.as_str())
    .bind(&tables)
    .bind(report.started_at)
    .bind(report.finished_at)
    .bind(report.duration_ms())
    .bind(report.summary.total_records as i64)
    .bind(report.summary.total_inserted as i64)
    .bind(report.summary.total_updated as i64)
    .bind(report.summary.total_errors as i64)
    .bind(report.status.as_str())
    .bind(results)
    .execute(pool)
    .await?;

    Ok(())
}

/// Read persisted runs, newest first.
pub async fn list_runs(
    pool: &PgPool,
    database_id: Option<&str>,
    limit: i64,
) -> Result<Vec<SyncHistoryEntry>, sqlx::Error> {
    const COLUMNS: &str = "id, database_id, database_name, sync_type, tables, \
                           start_time, end_time, duration_ms, \
                           total_records, total_inserted, total_updated, total_errors, \
                           status, results";

    match database_id {
        Some(database_id) => {
            sqlx::query_as::<_, SyncHistoryEntry>(&format!(
                "SELECT {} FROM sync_history WHERE database_id = $1 \
                 ORDER BY start_time DESC LIMIT $2",
                COLUMNS
            ))
            .bind(database_id)
            .bind(limit)
            .fetch_all(pool)
            .await
        },
        None => {
            sqlx::query_as::<_, SyncHistoryEntry>(&format!(
                "SELECT {} FROM sync_history ORDER BY start_time DESC LIMIT $1",
                COLUMNS
            ))
            .bind(limit)
            .fetch_all(pool)
            .await
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_history_entry_serializes_camel_case() {
        let entry = SyncHistoryEntry {
            id: Uuid::new_v4(),
            database_id: "primary".to_string(),
            database_name: "Primary Dispensary".to_string(),
            sync_type: "full".to_string(),
            tables: vec!["locations".to_string(), "customers".to_string()],
            start_time: Utc::now(),
            end_time: Utc::now(),
            duration_ms: 1200,
            total_records: 10,
            total_inserted: 4,
            total_updated: 6,
            total_errors: 0,
            status: "success".to_string(),
            results: serde_json::json!([]),
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("databaseId").is_some());
        assert!(json.get("totalRecords").is_some());
        assert!(json.get("durationMs").is_some());
    }
}
