//! Trigger sync command
//!
//! Command: pure data structure with validation. Handler: standalone
//! async function that drives the sync engine and shapes the run report
//! into the API response.

use biosync_common::{RunStatus, SyncTable, SyncType};
use mediator::Request;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::sync::models::{RunSummary, SyncRequest, TableSyncResult};
use crate::sync::{SyncEngine, SyncError};

/// Command to trigger a sync run
///
/// ```json
/// {"syncType": "incremental", "tables": ["locations", "customers"], "databaseId": "primary"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSyncCommand {
    #[serde(default)]
    pub sync_type: SyncType,

    #[serde(default)]
    pub tables: Vec<String>,

    pub database_id: String,
}

/// Response from a completed sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSyncResponse {
    pub success: bool,
    pub results: Vec<TableSyncResult>,
    pub summary: RunSummary,
    /// Wall-clock duration of the run in milliseconds.
    pub duration: i64,
    pub status: RunStatus,
}

/// Errors that can occur when triggering a sync
#[derive(Debug, thiserror::Error)]
pub enum TriggerSyncError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown database configuration: {0}")]
    UnknownDatabase(String),

    #[error("Source database unreachable: {0}")]
    SourceUnreachable(String),
}

impl Request<Result<TriggerSyncResponse, TriggerSyncError>> for TriggerSyncCommand {}

impl TriggerSyncCommand {
    /// Validates the command and resolves the requested table names.
    ///
    /// Unknown table names are dropped with a warning; a request with no
    /// database id, or whose table list resolves to nothing, is rejected.
    pub fn validate(&self) -> Result<Vec<SyncTable>, TriggerSyncError> {
        if self.database_id.trim().is_empty() {
            return Err(TriggerSyncError::Validation(
                "databaseId must not be empty".to_string(),
            ));
        }

        if self.tables.is_empty() {
            return Err(TriggerSyncError::Validation(
                "tables must not be empty".to_string(),
            ));
        }

        let mut tables = Vec::new();
        for name in &self.tables {
            match SyncTable::from_str(name) {
                Ok(table) => tables.push(table),
                Err(_) => {
                    tracing::warn!(table = %name, "Dropping unknown table from sync request");
                },
            }
        }

        if tables.is_empty() {
            return Err(TriggerSyncError::Validation(
                "no valid tables requested".to_string(),
            ));
        }

        Ok(tables)
    }
}

pub async fn handle(
    engine: Arc<SyncEngine>,
    command: TriggerSyncCommand,
) -> Result<TriggerSyncResponse, TriggerSyncError> {
    let tables = command.validate()?;

    let request = SyncRequest {
        database_id: command.database_id.clone(),
        sync_type: command.sync_type,
        tables,
    };

    let report = engine
        .run(request, CancellationToken::new())
        .await
        .map_err(|e| match e {
            SyncError::UnknownDatabase(id) => TriggerSyncError::UnknownDatabase(id),
            SyncError::NoTables => {
                TriggerSyncError::Validation("no valid tables requested".to_string())
            },
            SyncError::SourceUnreachable(message) => {
                TriggerSyncError::SourceUnreachable(message)
            },
        })?;

    Ok(TriggerSyncResponse {
        success: report.status == RunStatus::Success,
        duration: report.duration_ms(),
        status: report.status,
        summary: report.summary,
        results: report.results,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_command_deserializes_camel_case() {
        let command: TriggerSyncCommand = serde_json::from_str(
            r#"{"syncType": "full", "tables": ["customers"], "databaseId": "primary"}"#,
        )
        .unwrap();
        assert_eq!(command.sync_type, SyncType::Full);
        assert_eq!(command.database_id, "primary");
    }

    #[test]
    fn test_sync_type_defaults_to_incremental() {
        let command: TriggerSyncCommand =
            serde_json::from_str(r#"{"tables": ["sales"], "databaseId": "primary"}"#).unwrap();
        assert_eq!(command.sync_type, SyncType::Incremental);
    }

    #[test]
    fn test_validate_rejects_empty_database_id() {
        let command = TriggerSyncCommand {
            sync_type: SyncType::Full,
            tables: vec!["customers".to_string()],
            database_id: "  ".to_string(),
        };
        assert!(matches!(
            command.validate(),
            Err(TriggerSyncError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_drops_unknown_tables() {
        let command = TriggerSyncCommand {
            sync_type: SyncType::Full,
            tables: vec!["customers".to_string(), "invoices".to_string()],
            database_id: "primary".to_string(),
        };
        assert_eq!(command.validate().unwrap(), vec![SyncTable::Customers]);
    }

    #[test]
    fn test_validate_rejects_all_unknown_tables() {
        let command = TriggerSyncCommand {
            sync_type: SyncType::Full,
            tables: vec!["invoices".to_string()],
            database_id: "primary".to_string(),
        };
        assert!(matches!(
            command.validate(),
            Err(TriggerSyncError::Validation(_))
        ));
    }
}
