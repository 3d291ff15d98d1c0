//! List sync history query
//!
//! Read-only projection of persisted run records, newest first.

use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::sync::history::{self, SyncHistoryEntry};

/// Default number of history entries returned.
const DEFAULT_LIMIT: i64 = 20;

/// Maximum number of history entries returned.
const MAX_LIMIT: i64 = 100;

/// Query for persisted sync runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListHistoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

/// Response for the history query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListHistoryResponse {
    pub history: Vec<SyncHistoryEntry>,
}

/// Error type for history queries
#[derive(Debug, thiserror::Error)]
pub enum ListHistoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<ListHistoryResponse, ListHistoryError>> for ListHistoryQuery {}

pub async fn handle(
    pool: PgPool,
    query: ListHistoryQuery,
) -> Result<ListHistoryResponse, ListHistoryError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let history = history::list_runs(&pool, query.database_id.as_deref(), limit).await?;

    Ok(ListHistoryResponse { history })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query: ListHistoryQuery = serde_json::from_str("{}").unwrap();
        assert!(query.database_id.is_none());
        assert!(query.limit.is_none());
    }

    #[test]
    fn test_query_deserializes_camel_case() {
        let query: ListHistoryQuery =
            serde_json::from_str(r#"{"databaseId": "primary", "limit": 5}"#).unwrap();
        assert_eq!(query.database_id.as_deref(), Some("primary"));
        assert_eq!(query.limit, Some(5));
    }
}
