//! Source status query
//!
//! Lightweight connectivity probe plus per-table row counts for one
//! configured source database.

use mediator::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::sync::orchestrator::SourceStatus;
use crate::sync::{SyncEngine, SyncError};

/// Query for the connectivity status of one source database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatusQuery {
    pub database_id: String,
}

/// Error type for source status queries
#[derive(Debug, thiserror::Error)]
pub enum SourceStatusError {
    #[error("Unknown database configuration: {0}")]
    UnknownDatabase(String),
}

impl Request<Result<SourceStatus, SourceStatusError>> for SourceStatusQuery {}

pub async fn handle(
    engine: Arc<SyncEngine>,
    query: SourceStatusQuery,
) -> Result<SourceStatus, SourceStatusError> {
    engine
        .source_status(&query.database_id)
        .await
        .map_err(|e| match e {
            SyncError::UnknownDatabase(id) => SourceStatusError::UnknownDatabase(id),
            // Unreachable sources are reported as connected = false, not
            // as errors; the remaining variants cannot occur here.
            other => SourceStatusError::UnknownDatabase(other.to_string()),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_deserializes_camel_case() {
        let query: SourceStatusQuery =
            serde_json::from_str(r#"{"databaseId": "primary"}"#).unwrap();
        assert_eq!(query.database_id, "primary");
    }
}
